use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::optimizers::rewrite_engine::{
    Frame, Rewrite, TransformContext, Transformer, visit_deferred, walk_dynamic_if, walk_expr,
    walk_nested_block, walk_while,
};
use crate::compiler_frontend::optimizers::static_resolver::Unresolved;
use crate::compiler_frontend::syntax::ast_nodes::{BoolOperator, Expr, Stmt};
use crate::compiler_frontend::values::value::Value;
use crate::transform_log;

/// Constant folding and dead branch elimination.
///
/// Expressions with a static value are replaced by their literal.
/// Conditionals with a static test keep only the branch that runs.
/// Running the collapser on its own output changes nothing.
#[derive(Default)]
pub struct LiteralCollapser;

impl LiteralCollapser {
    pub fn new() -> Self {
        LiteralCollapser
    }

    // Walks a branch that is certain to run and keeps what it binds
    fn take_branch(&mut self, branch: &[Stmt], ctx: &mut TransformContext) -> Result<Rewrite, CompilerError> {
        let (stmts, frame) = walk_nested_block(self, branch, Frame::default(), ctx)?;
        ctx.merge_frame(frame)?;
        Ok(Rewrite::Expand(stmts))
    }

    // `a and b`: a leading operand known to be truthy never decides the result, so it can go.
    // The same holds for falsy operands of `or`.
    fn simplify_bool_op(&self, op: BoolOperator, values: Vec<Expr>, ctx: &mut TransformContext) -> Expr {
        let Some((last, leading)) = values.split_last() else {
            return Expr::BoolOp { op, values };
        };

        let mut kept: Vec<Expr> = Vec::with_capacity(values.len());
        for operand in leading {
            let skippable = match ctx.resolver().resolve(operand) {
                Ok(value) => match op {
                    BoolOperator::And => value.is_truthy(),
                    BoolOperator::Or => !value.is_truthy(),
                },
                Err(_) => false,
            };
            if !skippable {
                kept.push(operand.to_owned());
            }
        }
        kept.push(last.to_owned());

        if kept.len() == 1 {
            return kept.remove(0);
        }
        Expr::BoolOp { op, values: kept }
    }
}

// A name or element read that holds an object must stay a read, a copy would break identity
fn may_replace(expr: &Expr, value: &Value) -> bool {
    value.is_literal_expressible() && (!expr.is_storage_read() || value.is_immutable())
}

impl Transformer for LiteralCollapser {
    fn visit_if(
        &mut self,
        stmt: &Stmt,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        ctx: &mut TransformContext,
    ) -> Result<Rewrite, CompilerError> {
        let test = self.visit_expr(test, ctx)?;

        match ctx.resolve(&test) {
            Some(value) => {
                if value.is_truthy() {
                    transform_log!("Static condition, keeping the body");
                    self.take_branch(body, ctx)
                } else {
                    transform_log!("Static condition, keeping the else branch");
                    self.take_branch(orelse, ctx)
                }
            }
            None => walk_dynamic_if(self, stmt, test, body, orelse, ctx),
        }
    }

    fn visit_while(
        &mut self,
        stmt: &Stmt,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        ctx: &mut TransformContext,
    ) -> Result<Rewrite, CompilerError> {
        // A loop that never starts only runs its else clause
        if let Some(value) = ctx.resolve(test)
            && !value.is_truthy()
        {
            return self.take_branch(orelse, ctx);
        }

        walk_while(self, stmt, test, body, orelse, ctx)
    }

    fn visit_expr(&mut self, expr: &Expr, ctx: &mut TransformContext) -> Result<Expr, CompilerError> {
        let failure = match ctx.resolver().resolve(expr) {
            Ok(value) => {
                if may_replace(expr, &value)
                    && let Some(literal) = value.literal_expr()
                {
                    return Ok(literal);
                }
                None
            }
            Err(Unresolved::Failed(error)) => Some(error),
            Err(Unresolved::Dynamic) => None,
        };

        let warnings_before = ctx.warning_count();
        let rewritten = match expr {
            Expr::IfExp { test, body, orelse } => {
                let test = self.visit_expr(test, ctx)?;
                match ctx.resolve(&test) {
                    Some(value) if value.is_truthy() => return self.visit_expr(body, ctx),
                    Some(_) => return self.visit_expr(orelse, ctx),
                    None => Expr::IfExp {
                        test: Box::new(test),
                        body: Box::new(visit_deferred(self, body, ctx)?),
                        orelse: Box::new(visit_deferred(self, orelse, ctx)?),
                    },
                }
            }

            Expr::BoolOp { op, .. } => match walk_expr(self, expr, ctx)? {
                Expr::BoolOp { values, .. } => self.simplify_bool_op(*op, values, ctx),
                other => other,
            },

            _ => walk_expr(self, expr, ctx)?,
        };

        // Report only the innermost expression that raises
        if let Some(error) = failure
            && ctx.warning_count() == warnings_before
        {
            ctx.warn_fold_error(expr, &error);
        }
        Ok(rewritten)
    }

    fn prunes_unreachable(&self) -> bool {
        true
    }
}
