use crate::compiler_frontend::optimizers::scope_stack::ScopeStack;
use crate::compiler_frontend::syntax::ast_nodes::{BoolOperator, Expr, Keyword};
use crate::compiler_frontend::values::builtins::Builtin;
use crate::compiler_frontend::values::value::{FoldError, Value};
use crate::eval_log;
use rustc_hash::FxHashMap;

/// What the transformer knows about a name
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Known(Value),

    // A list or tuple display with some dynamic elements.
    // The unroller can iterate it, everything else treats it as dynamic.
    Display(Vec<Expr>),

    // An unrolled loop variable standing for a dynamic element expression
    Alias(Expr),

    Unknown,
}

impl Binding {
    pub fn known(&self) -> Option<&Value> {
        match self {
            Binding::Known(value) => Some(value),
            _ => None,
        }
    }
}

/// Why an expression has no static value
#[derive(Debug, Clone, PartialEq)]
pub enum Unresolved {
    Dynamic,

    // Evaluating it would raise, so it must stay a runtime expression
    Failed(FoldError),
}

impl From<FoldError> for Unresolved {
    fn from(error: FoldError) -> Self {
        match error {
            FoldError::Unrepresentable => Unresolved::Dynamic,
            raised => Unresolved::Failed(raised),
        }
    }
}

/// Decides whether an expression has a value known before the function runs, and computes it.
///
/// Names are looked up in the live scope stack first.
/// Names no block assigned fall through to the free symbols of the function
/// (closure values and globals) and then to the builtins.
pub struct StaticResolver<'a> {
    scope: &'a ScopeStack<Binding>,
    symbols: &'a FxHashMap<String, Value>,
}

impl<'a> StaticResolver<'a> {
    pub fn new(scope: &'a ScopeStack<Binding>, symbols: &'a FxHashMap<String, Value>) -> Self {
        StaticResolver { scope, symbols }
    }

    pub fn resolve(&self, expr: &Expr) -> Result<Value, Unresolved> {
        let value = match expr {
            Expr::Constant(constant) => Value::from_constant(constant),
            Expr::Name(name) => self.resolve_name(name)?,

            Expr::Tuple(elements) => Value::tuple(self.resolve_elements(elements)?),
            Expr::List(elements) => Value::list(self.resolve_elements(elements)?),
            Expr::Set(elements) => Value::set(self.resolve_elements(elements)?)?,
            Expr::Dict(entries) => {
                let mut resolved = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    match key {
                        Some(key) => resolved.push((self.resolve(key)?, self.resolve(value)?)),
                        None => match self.resolve(value)? {
                            Value::Dict(splat) => resolved.extend(splat.borrow().iter().cloned()),
                            other => {
                                return Err(Unresolved::Failed(FoldError::type_error(format!(
                                    "'{}' object is not a mapping",
                                    other.type_name()
                                ))));
                            }
                        },
                    }
                }
                Value::dict(resolved)?
            }

            Expr::Attribute { value, attr } => self.resolve(value)?.get_attribute(attr)?,

            Expr::Subscript { value, index } => {
                let base = self.resolve(value)?;
                match index.as_ref() {
                    Expr::Slice { lower, upper, step } => {
                        let lower = self.resolve_optional(lower.as_deref())?;
                        let upper = self.resolve_optional(upper.as_deref())?;
                        let step = self.resolve_optional(step.as_deref())?;
                        base.slice(lower.as_ref(), upper.as_ref(), step.as_ref())?
                    }
                    index => base.subscript(&self.resolve(index)?)?,
                }
            }

            Expr::Call {
                func,
                args,
                keywords,
            } => {
                // Only side effect free builtins are ever called while transforming
                let Value::Builtin(builtin) = self.resolve(func)? else {
                    return Err(Unresolved::Dynamic);
                };
                if !builtin.is_pure() {
                    return Err(Unresolved::Dynamic);
                }

                let args = self.resolve_elements(args)?;
                let keywords = self.resolve_keywords(keywords)?;
                let result = builtin.call(&args, &keywords)?;
                eval_log!("Called builtin ", builtin.name(), " -> ", result.repr());
                result
            }

            Expr::BinOp { left, op, right } => {
                let lhs = self.resolve(left)?;
                let rhs = self.resolve(right)?;
                lhs.evaluate_operator(&rhs, *op)?
            }

            Expr::UnaryOp { op, operand } => self.resolve(operand)?.evaluate_unary(*op)?,

            Expr::BoolOp { op, values } => self.resolve_bool_op(*op, values)?,

            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                let mut lhs = self.resolve(left)?;
                for (op, comparator) in ops.iter().zip(comparators) {
                    let rhs = self.resolve(comparator)?;
                    if !lhs.compare(*op, &rhs)? {
                        // Later links of the chain are never evaluated
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Value::Bool(true)
            }

            Expr::IfExp { test, body, orelse } => {
                if self.resolve(test)?.is_truthy() {
                    self.resolve(body)?
                } else {
                    self.resolve(orelse)?
                }
            }

            Expr::Starred(_) | Expr::Slice { .. } | Expr::Yield(_) => {
                return Err(Unresolved::Dynamic);
            }
        };

        Ok(value)
    }

    /// The static value of a name, if it has one
    pub fn resolve_name(&self, name: &str) -> Result<Value, Unresolved> {
        match self.scope.get(name) {
            // A single pass iterator bound to a name may already be partly consumed
            Some(Binding::Known(Value::Iterator(_))) => Err(Unresolved::Dynamic),
            Some(Binding::Known(value)) => Ok(value.to_owned()),
            Some(_) => Err(Unresolved::Dynamic),
            None => self.resolve_symbol(name),
        }
    }

    /// Free variables: closure values and globals, then builtins
    pub fn resolve_symbol(&self, name: &str) -> Result<Value, Unresolved> {
        if let Some(value) = self.symbols.get(name) {
            if matches!(value, Value::Iterator(_)) {
                return Err(Unresolved::Dynamic);
            }
            return Ok(value.to_owned());
        }

        match Builtin::from_name(name) {
            Some(builtin) => Ok(Value::Builtin(builtin)),
            None => Err(Unresolved::Dynamic),
        }
    }

    /// Resolves display or argument elements, expanding `*splats`
    pub fn resolve_elements(&self, elements: &[Expr]) -> Result<Vec<Value>, Unresolved> {
        let mut resolved = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Expr::Starred(inner) => resolved.extend(self.resolve(inner)?.iterate()?),
                element => resolved.push(self.resolve(element)?),
            }
        }
        Ok(resolved)
    }

    pub fn resolve_keywords(
        &self,
        keywords: &[Keyword],
    ) -> Result<Vec<(String, Value)>, Unresolved> {
        let mut resolved = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            match &keyword.name {
                Some(name) => resolved.push((name.to_owned(), self.resolve(&keyword.value)?)),
                None => resolved.extend(mapping_to_keywords(self.resolve(&keyword.value)?)?),
            }
        }
        Ok(resolved)
    }

    fn resolve_optional(&self, expr: Option<&Expr>) -> Result<Option<Value>, Unresolved> {
        match expr {
            Some(expr) => Ok(Some(self.resolve(expr)?)),
            None => Ok(None),
        }
    }

    // `and` returns the first falsy operand, `or` the first truthy one.
    // Operands after the deciding one are never evaluated, so they may be dynamic.
    fn resolve_bool_op(&self, op: BoolOperator, values: &[Expr]) -> Result<Value, Unresolved> {
        let Some((last, leading)) = values.split_last() else {
            return Err(Unresolved::Dynamic);
        };

        for operand in leading {
            let value = self.resolve(operand)?;
            let decides = match op {
                BoolOperator::And => !value.is_truthy(),
                BoolOperator::Or => value.is_truthy(),
            };
            if decides {
                return Ok(value);
            }
        }

        self.resolve(last)
    }
}

/// The (name, value) pairs of a `**mapping` argument
pub fn mapping_to_keywords(mapping: Value) -> Result<Vec<(String, Value)>, FoldError> {
    let Value::Dict(entries) = mapping else {
        return Err(FoldError::type_error(format!(
            "argument after ** must be a mapping, not {}",
            mapping.type_name()
        )));
    };

    let mut keywords = Vec::with_capacity(entries.borrow().len());
    for (key, value) in entries.borrow().iter() {
        match key {
            Value::Str(name) => keywords.push((name.to_owned(), value.to_owned())),
            _ => return Err(FoldError::type_error("keywords must be strings")),
        }
    }
    Ok(keywords)
}
