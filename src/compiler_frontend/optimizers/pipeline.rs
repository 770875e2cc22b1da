//! Runs rewrite passes over one function and turns the result back into
//! a callable or into source text.
//!
//! Each pass consumes the tree the previous pass produced. Every pass gets a fresh
//! scope stack: the outermost frame holds the overrides, the next one the parameters.

use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use crate::compiler_frontend::optimizers::collapse_literals::LiteralCollapser;
use crate::compiler_frontend::optimizers::deindex::Deindexer;
use crate::compiler_frontend::optimizers::inline::FunctionInliner;
use crate::compiler_frontend::optimizers::rewrite_engine::{
    Frame, TransformContext, Transformer, walk_block,
};
use crate::compiler_frontend::optimizers::static_resolver::Binding;
use crate::compiler_frontend::optimizers::unroll::LoopUnroller;
use crate::compiler_frontend::syntax::ast_nodes::{FunctionDef, Parameters, Stmt};
use crate::compiler_frontend::syntax::render_source::render_function;
use crate::compiler_frontend::syntax::syntax_queries::{local_names, names_read_outside_their_loops};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::compiler_frontend::values::value::Value;
use crate::runtime::function::Function;
use crate::runtime::new_namespace;
use crate::{return_syntax_error, timer_log, transform_log};
use rustc_hash::FxHashMap;
use std::rc::Rc;
use std::time::Instant;

#[derive(Clone)]
pub enum Pass {
    Unroll,
    CollapseLiterals,

    /// Splice calls to these functions into the caller
    Inline(Vec<Rc<Function>>),

    /// Replace constant index reads of the free sequence `name` holding `values`
    Deindex { name: String, values: Vec<Value> },
}

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::Unroll => "unroll",
            Pass::CollapseLiterals => "collapse_literals",
            Pass::Inline(_) => "inline",
            Pass::Deindex { .. } => "deindex",
        }
    }
}

#[derive(Clone, Default)]
pub struct PassConfig {
    /// Emit source text instead of a callable
    pub return_source: bool,

    /// Static bindings visible to every pass, shadowed by parameters and locals
    pub overrides: FxHashMap<String, Value>,
}

impl PassConfig {
    pub fn source() -> PassConfig {
        PassConfig {
            return_source: true,
            overrides: FxHashMap::default(),
        }
    }

    pub fn with_override(mut self, name: &str, value: Value) -> PassConfig {
        self.overrides.insert(name.to_owned(), value);
        self
    }
}

pub enum Transformed {
    Function(Rc<Function>),
    Source(String),
}

pub struct TransformOutput {
    pub transformed: Transformed,

    /// The transformed definition, whichever form was requested
    pub def: FunctionDef,
    pub warnings: Vec<CompilerWarning>,
}

impl TransformOutput {
    /// The rendered source, also for callable output
    pub fn source(&self) -> String {
        match &self.transformed {
            Transformed::Source(source) => source.to_owned(),
            Transformed::Function(_) => render_function(&self.def),
        }
    }

    pub fn function(&self) -> Option<Rc<Function>> {
        match &self.transformed {
            Transformed::Function(function) => Some(function.clone()),
            Transformed::Source(_) => None,
        }
    }
}

/// The signature, body and location of a callable.
/// Builtins and other values have no source.
pub fn parse(callable: &Value) -> Result<(Parameters, Vec<Stmt>, TextLocation), CompilerError> {
    match callable {
        Value::Function(function) => Ok((
            function.def.params.to_owned(),
            function.def.body.to_owned(),
            function.def.location,
        )),
        other => return_syntax_error!(
            format!("Can't get the source of {}", other.repr()),
            TextLocation::default(),
            {
                PrimarySuggestion => "Only functions defined with 'def' can be transformed",
            }
        ),
    }
}

/// Applies the passes in order.
/// Any error aborts the whole transformation, nothing partial is returned.
pub fn transform(
    function: &Rc<Function>,
    passes: &[Pass],
    config: &PassConfig,
) -> Result<TransformOutput, CompilerMessages> {
    let time = Instant::now();

    let mut def = function.def.as_ref().to_owned();
    def.decorators.clear();

    let mut symbols = function.free_symbols();
    let mut extra_globals: FxHashMap<String, Value> = FxHashMap::default();
    let mut warnings = Vec::new();

    for pass in passes {
        transform_log!("Running ", Cyan pass.name(), " on ", def.name.to_owned());

        let mut ctx = TransformContext::new(symbols.to_owned());
        ctx.local_names = local_names(&def.params, &def.body);
        ctx.read_outside_loops = names_read_outside_their_loops(&def.body);

        let body = match run_pass(pass, &def, config, &mut ctx) {
            Ok(body) => body,
            Err(error) => {
                extend_unique(&mut warnings, ctx.take_warnings());
                return Err(CompilerMessages::from_error(error, warnings));
            }
        };

        def.body = body;
        extend_unique(&mut warnings, ctx.take_warnings());
        for (name, value) in ctx.extra_globals {
            symbols.insert(name.to_owned(), value.clone());
            extra_globals.insert(name, value);
        }
    }

    timer_log!(time, "Transformed function in: ");

    let transformed = render(function, &def, extra_globals, config.return_source);
    Ok(TransformOutput {
        transformed,
        def,
        warnings,
    })
}

// Every pass walks the same statements, so they can report the same thing
fn extend_unique(warnings: &mut Vec<CompilerWarning>, new: Vec<CompilerWarning>) {
    for warning in new {
        if !warnings.contains(&warning) {
            warnings.push(warning);
        }
    }
}

fn run_pass(
    pass: &Pass,
    def: &FunctionDef,
    config: &PassConfig,
    ctx: &mut TransformContext,
) -> Result<Vec<Stmt>, CompilerError> {
    match pass {
        Pass::Unroll => walk_function_body(&mut LoopUnroller::new(), def, config, ctx),
        Pass::CollapseLiterals => walk_function_body(&mut LiteralCollapser::new(), def, config, ctx),
        Pass::Inline(functions) => {
            walk_function_body(&mut FunctionInliner::new(functions), def, config, ctx)
        }
        Pass::Deindex { name, values } => {
            let mut deindexer = Deindexer::new(name, values.to_owned());
            deindexer.install_globals(ctx);
            walk_function_body(&mut deindexer, def, config, ctx)
        }
    }
}

fn walk_function_body<T: Transformer>(
    pass: &mut T,
    def: &FunctionDef,
    config: &PassConfig,
    ctx: &mut TransformContext,
) -> Result<Vec<Stmt>, CompilerError> {
    let overrides: Frame = config
        .overrides
        .iter()
        .map(|(name, value)| (name.to_owned(), Binding::Known(value.clone())))
        .collect();
    let params: Frame = def
        .params
        .names()
        .into_iter()
        .map(|name| (name.to_owned(), Binding::Unknown))
        .collect();

    ctx.scope.push_frame(overrides);
    ctx.scope.push_frame(params);
    let walked = walk_block(pass, &def.body, ctx);
    ctx.scope.pop()?;
    ctx.scope.pop()?;

    walked
}

/// Turns a transformed definition into a callable or its source.
/// The callable shares the original globals unless the passes added new ones,
/// then it gets a copy extended with them.
pub fn render(
    original: &Function,
    def: &FunctionDef,
    extra_globals: FxHashMap<String, Value>,
    return_source: bool,
) -> Transformed {
    if return_source {
        return Transformed::Source(render_function(def));
    }

    let globals = if extra_globals.is_empty() {
        original.globals.clone()
    } else {
        let mut copied = original.globals.borrow().clone();
        for (name, value) in extra_globals {
            copied.entry(name).or_insert(value);
        }
        new_namespace(copied)
    };

    Transformed::Function(Rc::new(Function::new(
        Rc::new(def.to_owned()),
        globals,
        original.enclosing.to_owned(),
        original.defaults.to_owned(),
    )))
}

pub fn unroll(function: &Rc<Function>, config: &PassConfig) -> Result<TransformOutput, CompilerMessages> {
    transform(function, &[Pass::Unroll], config)
}

pub fn collapse_literals(
    function: &Rc<Function>,
    config: &PassConfig,
) -> Result<TransformOutput, CompilerMessages> {
    transform(function, &[Pass::CollapseLiterals], config)
}

pub fn inline(
    function: &Rc<Function>,
    callees: &[Rc<Function>],
    config: &PassConfig,
) -> Result<TransformOutput, CompilerMessages> {
    transform(function, &[Pass::Inline(callees.to_vec())], config)
}

pub fn deindex(
    function: &Rc<Function>,
    name: &str,
    values: Vec<Value>,
    config: &PassConfig,
) -> Result<TransformOutput, CompilerMessages> {
    transform(
        function,
        &[Pass::Deindex {
            name: name.to_owned(),
            values,
        }],
        config,
    )
}
