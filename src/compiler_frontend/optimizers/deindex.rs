use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::optimizers::rewrite_engine::{TransformContext, Transformer, walk_expr};
use crate::compiler_frontend::syntax::ast_nodes::Expr;
use crate::compiler_frontend::values::value::Value;
use crate::transform_log;

/// Replaces constant index reads of a caller supplied sequence with one global name per element.
///
/// With `v = [a, b, c]`, `v[0] + v[-1]` becomes `v_0 + v_2`,
/// and the transformed function gets `v_0 = a`, `v_1 = b` and `v_2 = c` as globals.
/// Stores into the sequence and reads with a dynamic index are left alone.
pub struct Deindexer {
    name: String,
    values: Vec<Value>,
}

impl Deindexer {
    pub fn new(name: &str, values: Vec<Value>) -> Deindexer {
        Deindexer {
            name: name.to_owned(),
            values,
        }
    }

    pub fn element_name(&self, index: usize) -> String {
        format!("{}_{index}", self.name)
    }

    /// Makes every element name visible to the function being transformed
    pub fn install_globals(&self, ctx: &mut TransformContext) {
        for (index, value) in self.values.iter().enumerate() {
            let name = self.element_name(index);
            ctx.symbols.insert(name.to_owned(), value.clone());
            ctx.extra_globals.insert(name, value.clone());
        }
    }

    fn is_sequence_read(&self, base: &str, ctx: &TransformContext) -> bool {
        // A local with the same name hides the supplied sequence
        base == self.name && !ctx.local_names.contains(base) && !ctx.scope.contains(base)
    }

    fn normalized_index(&self, index: &Value) -> Option<usize> {
        let index = match index {
            Value::Int(index) => *index,
            Value::Bool(flag) => i64::from(*flag),
            _ => return None,
        };
        let len = i64::try_from(self.values.len()).ok()?;
        let index = if index < 0 { index + len } else { index };

        if (0..len).contains(&index) {
            usize::try_from(index).ok()
        } else {
            None
        }
    }
}

impl Transformer for Deindexer {
    fn visit_expr(&mut self, expr: &Expr, ctx: &mut TransformContext) -> Result<Expr, CompilerError> {
        let walked = walk_expr(self, expr, ctx)?;
        let Expr::Subscript { value, index } = &walked else {
            return Ok(walked);
        };
        let Some(base) = value.as_name() else {
            return Ok(walked);
        };
        if !self.is_sequence_read(base, ctx) {
            return Ok(walked);
        }

        let Some(position) = ctx.resolve(index).and_then(|index| self.normalized_index(&index)) else {
            return Ok(walked);
        };

        let name = self.element_name(position);
        transform_log!("Deindexed ", Cyan name);
        Ok(Expr::name(&name))
    }
}
