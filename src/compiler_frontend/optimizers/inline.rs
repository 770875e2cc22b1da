use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::compiler_warnings::WarningKind;
use crate::compiler_frontend::optimizers::rewrite_engine::{
    TransformContext, Transformer, walk_block, walk_expr,
};
use crate::compiler_frontend::optimizers::static_resolver::mapping_to_keywords;
use crate::compiler_frontend::syntax::ast_nodes::{
    Constant, ExceptHandler, Expr, ForLoop, Keyword, Parameters, Stmt, StmtKind, TryBlock, WithItem,
};
use crate::compiler_frontend::syntax::syntax_queries::{
    block_any, contains_return_in_loop, contains_yield, local_names,
};
use crate::compiler_frontend::values::value::Value;
use crate::projects::settings::RETURN_KEY;
use crate::runtime::function::{BoundArgument, Function, bind_arguments};
use crate::transform_log;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

/// A function that calls get replaced by its body.
/// Built once, used at every call site that resolves to the same function object.
pub struct CalleeDescriptor {
    pub function: Rc<Function>,
    pub name: String,
    pub params: Parameters,
    pub body: Vec<Stmt>,

    // Parameters and every name the body binds, all stored in the per call container
    pub locals: FxHashSet<String>,

    // Why the body can't be spliced into a caller
    pub refusal: Option<&'static str>,
}

impl CalleeDescriptor {
    pub fn new(function: Rc<Function>) -> CalleeDescriptor {
        let def = function.def.clone();
        let locals = local_names(&def.params, &def.body);

        let refusal = if contains_yield(&def.body) {
            Some("it is a generator")
        } else if block_any(&def.body, &|stmt: &Stmt| {
            matches!(stmt.kind, StmtKind::Global(_) | StmtKind::Nonlocal(_))
        }) {
            Some("it declares global or nonlocal names")
        } else if block_any(&def.body, &|stmt: &Stmt| {
            matches!(stmt.kind, StmtKind::FunctionDef(_) | StmtKind::ClassDef(_))
        }) {
            Some("it defines nested functions or classes")
        } else if contains_return_in_loop(&def.body) {
            Some("it returns from inside a loop")
        } else {
            None
        };

        CalleeDescriptor {
            function,
            name: def.name.to_owned(),
            params: def.params.to_owned(),
            body: def.body.to_owned(),
            locals,
            refusal,
        }
    }

    /// The body with locals moved into `container` and every return turned into
    /// a store of the result followed by an exit from the inline block
    pub fn localized_body(&self, container: &str) -> Vec<Stmt> {
        let localizer = Localizer {
            container,
            locals: &self.locals,
        };
        let mut body = localizer.block(&self.body);

        // Falling off the end returns None
        if !body.last().is_some_and(|stmt| matches!(stmt.kind, StmtKind::ExitInline(_))) {
            let location = body.last().map(|stmt| stmt.location).unwrap_or_default();
            body.push(Stmt::new(
                StmtKind::Assign {
                    targets: vec![container_item(container, RETURN_KEY)],
                    value: Expr::Constant(Constant::None),
                },
                location,
            ));
        }

        body
    }
}

/// Splices the bodies of the given functions into their call sites.
///
/// `z = add(2, 3)` becomes
/// ```text
/// _add_0 = {}
/// _add_0['a'] = 2
/// _add_0['b'] = 3
/// for ____ in range(1):
///     _add_0['return'] = _add_0['a'] + _add_0['b']
///     break
/// z = _add_0['return']
/// ```
pub struct FunctionInliner {
    callees: Vec<CalleeDescriptor>,
    sites: FxHashMap<String, usize>,
    warned: FxHashSet<String>,

    // Greater than zero while spliced bodies are visited, calls in them stay calls
    splicing: usize,
}

impl FunctionInliner {
    pub fn new(functions: &[Rc<Function>]) -> FunctionInliner {
        FunctionInliner {
            callees: functions.iter().cloned().map(CalleeDescriptor::new).collect(),
            sites: FxHashMap::default(),
            warned: FxHashSet::default(),
            splicing: 0,
        }
    }

    fn callee_for(&self, func: &Expr, ctx: &TransformContext) -> Option<usize> {
        let Ok(Value::Function(function)) = ctx.resolver().resolve(func) else {
            return None;
        };
        self.callees
            .iter()
            .position(|callee| Rc::ptr_eq(&callee.function, &function))
    }

    // `_add_0`, `_add_1`, ... skipping names the caller already uses
    fn container_name(&mut self, callee: &str, ctx: &TransformContext) -> String {
        let counter = self.sites.entry(callee.to_owned()).or_insert(0);
        loop {
            let candidate = format!("_{callee}_{counter}");
            *counter += 1;
            let taken = ctx.local_names.contains(&candidate)
                || ctx.scope.contains(&candidate)
                || ctx.symbols.contains_key(&candidate);
            if !taken {
                return candidate;
            }
        }
    }

    fn warn_once(&mut self, callee: &str, msg: &str, ctx: &mut TransformContext) {
        if self.warned.insert(format!("{callee}: {msg}")) {
            ctx.warn(WarningKind::UnsupportedConstruct, msg);
        }
    }

    // Positional and keyword argument expressions, with *splats and **splats expanded.
    // None when a splat has no static literal value.
    fn expand_arguments(
        &self,
        args: &[Expr],
        keywords: &[Keyword],
        ctx: &mut TransformContext,
    ) -> Option<(Vec<Expr>, Vec<(String, Expr)>)> {
        let mut positional = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Expr::Starred(inner) => {
                    let elements = ctx.resolve(inner)?.iterate().ok()?;
                    for element in elements {
                        positional.push(element.literal_expr()?);
                    }
                }
                arg => positional.push(arg.to_owned()),
            }
        }

        let mut named = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            match &keyword.name {
                Some(name) => named.push((name.to_owned(), keyword.value.to_owned())),
                None => {
                    let mapping = ctx.resolve(&keyword.value)?;
                    for (name, value) in mapping_to_keywords(mapping).ok()? {
                        named.push((name, value.literal_expr()?));
                    }
                }
            }
        }

        Some((positional, named))
    }

    fn inline_call(
        &mut self,
        index: usize,
        call: &Expr,
        args: &[Expr],
        keywords: &[Keyword],
        ctx: &mut TransformContext,
    ) -> Result<Expr, CompilerError> {
        let name = self.callees[index].name.to_owned();

        if let Some(reason) = self.callees[index].refusal {
            let msg = format!("calls to '{name}' are not inlined because {reason}");
            self.warn_once(&name, &msg, ctx);
            return Ok(call.to_owned());
        }

        let Some((positional, named)) = self.expand_arguments(args, keywords, ctx) else {
            let msg = format!("a call to '{name}' is not inlined because its unpacked arguments are not static");
            self.warn_once(&name, &msg, ctx);
            return Ok(call.to_owned());
        };

        let function = self.callees[index].function.clone();
        let bound = bind_arguments(
            &name,
            &self.callees[index].params,
            |param| function.defaults.contains_key(param),
            positional,
            named,
        )
        .map_err(|error| error.with_location(ctx.location()))?;

        let mut stored = Vec::with_capacity(bound.len());
        for (param, argument) in bound {
            let value = match argument {
                BoundArgument::Passed(expr) => expr,
                BoundArgument::Default => {
                    // A mutable default is shared between calls, a literal copy would not be
                    let literal = function
                        .defaults
                        .get(&param)
                        .filter(|default| default.is_immutable())
                        .and_then(Value::literal_expr);
                    match literal {
                        Some(literal) => literal,
                        None => {
                            let msg = format!(
                                "a call to '{name}' is not inlined because the default of '{param}' has no literal form"
                            );
                            self.warn_once(&name, &msg, ctx);
                            return Ok(call.to_owned());
                        }
                    }
                }
            };
            stored.push((param, value));
        }

        let container = self.container_name(&name, ctx);
        transform_log!("Inlining ", Cyan name, " as ", container);

        let location = ctx.location();
        let mut preludes = Vec::with_capacity(stored.len() + 2);
        preludes.push(Stmt::new(
            StmtKind::Assign {
                targets: vec![Expr::name(&container)],
                value: Expr::Dict(Vec::new()),
            },
            location,
        ));
        for (param, value) in stored {
            preludes.push(Stmt::new(
                StmtKind::Assign {
                    targets: vec![container_item(&container, &param)],
                    value,
                },
                location,
            ));
        }
        preludes.push(Stmt::new(
            StmtKind::InlineBlock {
                label: container.to_owned(),
                body: self.callees[index].localized_body(&container),
            },
            location,
        ));

        // The spliced statements still need the caller's scope tracking
        self.splicing += 1;
        let walked = walk_block(self, &preludes, ctx);
        self.splicing -= 1;
        ctx.queue_preludes(walked?)?;

        self.merge_globals(index, ctx);
        Ok(container_item(&container, RETURN_KEY))
    }

    // The callee's globals become visible to the caller, the caller's own win on conflict
    fn merge_globals(&self, index: usize, ctx: &mut TransformContext) {
        let callee_symbols = self.callees[index].function.free_symbols();
        let mut names: Vec<&String> = callee_symbols.keys().collect();
        names.sort();

        for name in names {
            if !ctx.symbols.contains_key(name) {
                let value = callee_symbols[name].clone();
                ctx.symbols.insert(name.to_owned(), value.clone());
                ctx.extra_globals.insert(name.to_owned(), value);
            }
        }
    }
}

impl Transformer for FunctionInliner {
    fn visit_expr(&mut self, expr: &Expr, ctx: &mut TransformContext) -> Result<Expr, CompilerError> {
        let Expr::Call { func, .. } = expr else {
            return walk_expr(self, expr, ctx);
        };
        if self.splicing > 0 || ctx.is_deferred() {
            return walk_expr(self, expr, ctx);
        }
        let Some(index) = self.callee_for(func, ctx) else {
            return walk_expr(self, expr, ctx);
        };

        // Arguments run first, and may contain inlined calls themselves
        let call = walk_expr(self, expr, ctx)?;
        let (args, keywords) = match &call {
            Expr::Call { args, keywords, .. } => (args.to_owned(), keywords.to_owned()),
            _ => return Ok(call),
        };
        self.inline_call(index, &call, &args, &keywords, ctx)
    }
}

fn container_item(container: &str, key: &str) -> Expr {
    Expr::subscript(Expr::name(container), Expr::string(key))
}

// Rewrites a callee body so its locals live in the call's container
struct Localizer<'a> {
    container: &'a str,
    locals: &'a FxHashSet<String>,
}

impl Localizer<'_> {
    fn block(&self, body: &[Stmt]) -> Vec<Stmt> {
        body.iter().flat_map(|stmt| self.stmt(stmt)).collect()
    }

    fn stmt(&self, stmt: &Stmt) -> Vec<Stmt> {
        let kind = match &stmt.kind {
            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => self.expr(value),
                    None => Expr::Constant(Constant::None),
                };
                return vec![
                    Stmt::new(
                        StmtKind::Assign {
                            targets: vec![container_item(self.container, RETURN_KEY)],
                            value,
                        },
                        stmt.location,
                    ),
                    Stmt::new(StmtKind::ExitInline(self.container.to_owned()), stmt.location),
                ];
            }

            StmtKind::Delete(targets) => StmtKind::Delete(self.exprs(targets)),
            StmtKind::Assign { targets, value } => StmtKind::Assign {
                targets: self.exprs(targets),
                value: self.expr(value),
            },
            StmtKind::AugAssign { target, op, value } => StmtKind::AugAssign {
                target: self.expr(target),
                op: *op,
                value: self.expr(value),
            },
            StmtKind::For(for_loop) => StmtKind::For(ForLoop {
                target: self.expr(&for_loop.target),
                iter: self.expr(&for_loop.iter),
                body: self.block(&for_loop.body),
                orelse: self.block(&for_loop.orelse),
            }),
            StmtKind::While { test, body, orelse } => StmtKind::While {
                test: self.expr(test),
                body: self.block(body),
                orelse: self.block(orelse),
            },
            StmtKind::If { test, body, orelse } => StmtKind::If {
                test: self.expr(test),
                body: self.block(body),
                orelse: self.block(orelse),
            },
            StmtKind::With { items, body } => StmtKind::With {
                items: items
                    .iter()
                    .map(|item| WithItem {
                        context: self.expr(&item.context),
                        target: item.target.as_ref().map(|target| self.expr(target)),
                    })
                    .collect(),
                body: self.block(body),
            },
            StmtKind::Raise(value) => StmtKind::Raise(value.as_ref().map(|value| self.expr(value))),
            StmtKind::Try(try_block) => StmtKind::Try(TryBlock {
                body: self.block(&try_block.body),
                handlers: try_block
                    .handlers
                    .iter()
                    .map(|handler| ExceptHandler {
                        exception: handler.exception.as_ref().map(|exception| self.expr(exception)),
                        name: handler.name.to_owned(),
                        body: self.block(&handler.body),
                    })
                    .collect(),
                orelse: self.block(&try_block.orelse),
                finalbody: self.block(&try_block.finalbody),
            }),
            StmtKind::Assert { test, msg } => StmtKind::Assert {
                test: self.expr(test),
                msg: msg.as_ref().map(|msg| self.expr(msg)),
            },
            StmtKind::Expr(value) => StmtKind::Expr(self.expr(value)),
            StmtKind::InlineBlock { label, body } => StmtKind::InlineBlock {
                label: label.to_owned(),
                body: self.block(body),
            },

            // Refused callees never get here
            other => other.to_owned(),
        };

        vec![Stmt::new(kind, stmt.location)]
    }

    fn exprs(&self, exprs: &[Expr]) -> Vec<Expr> {
        exprs.iter().map(|expr| self.expr(expr)).collect()
    }

    fn boxed(&self, expr: &Expr) -> Box<Expr> {
        Box::new(self.expr(expr))
    }

    fn expr(&self, expr: &Expr) -> Expr {
        match expr {
            Expr::Name(name) if self.locals.contains(name) => container_item(self.container, name),
            Expr::Constant(_) | Expr::Name(_) => expr.to_owned(),
            Expr::Tuple(elements) => Expr::Tuple(self.exprs(elements)),
            Expr::List(elements) => Expr::List(self.exprs(elements)),
            Expr::Set(elements) => Expr::Set(self.exprs(elements)),
            Expr::Dict(entries) => Expr::Dict(
                entries
                    .iter()
                    .map(|(key, value)| (key.as_ref().map(|key| self.expr(key)), self.expr(value)))
                    .collect(),
            ),
            Expr::Attribute { value, attr } => Expr::Attribute {
                value: self.boxed(value),
                attr: attr.to_owned(),
            },
            Expr::Subscript { value, index } => Expr::Subscript {
                value: self.boxed(value),
                index: self.boxed(index),
            },
            Expr::Slice { lower, upper, step } => Expr::Slice {
                lower: lower.as_deref().map(|lower| self.boxed(lower)),
                upper: upper.as_deref().map(|upper| self.boxed(upper)),
                step: step.as_deref().map(|step| self.boxed(step)),
            },
            Expr::Call {
                func,
                args,
                keywords,
            } => Expr::Call {
                func: self.boxed(func),
                args: self.exprs(args),
                keywords: keywords
                    .iter()
                    .map(|keyword| Keyword {
                        name: keyword.name.to_owned(),
                        value: self.expr(&keyword.value),
                    })
                    .collect(),
            },
            Expr::Starred(value) => Expr::Starred(self.boxed(value)),
            Expr::BinOp { left, op, right } => Expr::BinOp {
                left: self.boxed(left),
                op: *op,
                right: self.boxed(right),
            },
            Expr::UnaryOp { op, operand } => Expr::UnaryOp {
                op: *op,
                operand: self.boxed(operand),
            },
            Expr::BoolOp { op, values } => Expr::BoolOp {
                op: *op,
                values: self.exprs(values),
            },
            Expr::Compare {
                left,
                ops,
                comparators,
            } => Expr::Compare {
                left: self.boxed(left),
                ops: ops.to_owned(),
                comparators: self.exprs(comparators),
            },
            Expr::IfExp { test, body, orelse } => Expr::IfExp {
                test: self.boxed(test),
                body: self.boxed(body),
                orelse: self.boxed(orelse),
            },
            Expr::Yield(value) => Expr::Yield(value.as_deref().map(|value| self.boxed(value))),
        }
    }
}
