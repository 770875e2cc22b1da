use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::syntax::ast_nodes::{Expr, FunctionDef, Parameters};
use crate::compiler_frontend::syntax::syntax_queries::contains_yield;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::compiler_frontend::values::value::Value;
use crate::return_signature_error;
use crate::runtime::Namespace;
use crate::runtime::interpreter::call_function;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A user function: its definition plus the environment it was defined in
pub struct Function {
    pub def: Rc<FunctionDef>,
    pub globals: Namespace,

    // Local scopes of the enclosing functions, innermost last
    pub enclosing: Vec<Namespace>,

    // Default values, evaluated once when the def statement ran
    pub defaults: FxHashMap<String, Value>,
}

impl Function {
    pub fn new(
        def: Rc<FunctionDef>,
        globals: Namespace,
        enclosing: Vec<Namespace>,
        defaults: FxHashMap<String, Value>,
    ) -> Function {
        Function {
            def,
            globals,
            enclosing,
            defaults,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn params(&self) -> &Parameters {
        &self.def.params
    }

    /// Generator functions run eagerly and return the list of values they yielded
    pub fn is_generator(&self) -> bool {
        contains_yield(&self.def.body)
    }

    pub fn call(&self, positional: Vec<Value>, keywords: Vec<(String, Value)>) -> Result<Value, CompilerError> {
        call_function(self, positional, keywords, 0)
    }

    /// Every free variable the body can see, closure values shadowing globals
    pub fn free_symbols(&self) -> FxHashMap<String, Value> {
        let mut symbols = self.globals.borrow().clone();
        for scope in &self.enclosing {
            symbols.extend(scope.borrow().iter().map(|(name, value)| (name.to_owned(), value.clone())));
        }
        symbols
    }
}

/// Something a call site can pass for a parameter.
/// The runtime binds values, the inliner binds argument expressions.
pub trait ArgumentValue: Sized {
    fn pack_tuple(elements: Vec<Self>) -> Self;
    fn pack_dict(entries: Vec<(String, Self)>) -> Self;
}

impl ArgumentValue for Value {
    fn pack_tuple(elements: Vec<Self>) -> Self {
        Value::tuple(elements)
    }

    fn pack_dict(entries: Vec<(String, Self)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(name, value)| (Value::Str(name), value))
            .collect();
        Value::Dict(Rc::new(RefCell::new(entries)))
    }
}

impl ArgumentValue for Expr {
    fn pack_tuple(elements: Vec<Self>) -> Self {
        Expr::Tuple(elements)
    }

    fn pack_dict(entries: Vec<(String, Self)>) -> Self {
        Expr::Dict(
            entries
                .into_iter()
                .map(|(name, value)| (Some(Expr::string(&name)), value))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundArgument<T> {
    Passed(T),

    // Nothing was passed, the parameter takes its default
    Default,
}

/// Matches call arguments against a signature.
/// Returns every parameter in declaration order with what it receives.
pub fn bind_arguments<T: ArgumentValue>(
    function_name: &str,
    params: &Parameters,
    has_default: impl Fn(&str) -> bool,
    positional: Vec<T>,
    keywords: Vec<(String, T)>,
) -> Result<Vec<(String, BoundArgument<T>)>, CompilerError> {
    let named: Vec<&str> = params
        .positional
        .iter()
        .chain(params.keyword_only.iter())
        .map(|param| param.name.as_str())
        .collect();
    let mut slots: Vec<Option<T>> = named.iter().map(|_| None).collect();

    let given = positional.len();
    let mut extra_positional = Vec::new();
    for (index, arg) in positional.into_iter().enumerate() {
        if index < params.positional.len() {
            slots[index] = Some(arg);
        } else if params.vararg.is_some() {
            extra_positional.push(arg);
        } else {
            return_signature_error!(
                format!(
                    "{function_name}() takes {} positional argument{} but {given} {} given",
                    params.positional.len(),
                    plural(params.positional.len()),
                    if given == 1 { "was" } else { "were" }
                ),
                TextLocation::default(),
                {
                    FunctionName => function_name,
                    ExpectedArguments => params.positional.len(),
                    FoundArguments => given,
                }
            );
        }
    }

    let mut extra_keywords = Vec::new();
    for (name, arg) in keywords {
        match named.iter().position(|param| *param == name) {
            Some(slot) if slots[slot].is_some() => {
                return_signature_error!(
                    format!("{function_name}() got multiple values for argument '{name}'"),
                    TextLocation::default(),
                    {
                        FunctionName => function_name,
                        VariableName => name,
                    }
                );
            }
            Some(slot) => slots[slot] = Some(arg),
            None if params.kwarg.is_some() => extra_keywords.push((name, arg)),
            None => {
                return_signature_error!(
                    format!("{function_name}() got an unexpected keyword argument '{name}'"),
                    TextLocation::default(),
                    {
                        FunctionName => function_name,
                        VariableName => name,
                    }
                );
            }
        }
    }

    let missing = |range: std::ops::Range<usize>, slots: &[Option<T>]| -> Vec<String> {
        range
            .filter(|slot| slots[*slot].is_none() && !has_default(named[*slot]))
            .map(|slot| format!("'{}'", named[slot]))
            .collect()
    };
    let missing_positional = missing(0..params.positional.len(), &slots);
    let missing_keyword_only = missing(params.positional.len()..named.len(), &slots);

    for (names, kind) in [
        (missing_positional, "positional"),
        (missing_keyword_only, "keyword-only"),
    ] {
        if !names.is_empty() {
            return_signature_error!(
                format!(
                    "{function_name}() missing {} required {kind} argument{}: {}",
                    names.len(),
                    plural(names.len()),
                    join_names(&names)
                ),
                TextLocation::default(),
                {
                    FunctionName => function_name,
                    VariableName => names.join(", "),
                }
            );
        }
    }

    let mut bound: Vec<(String, BoundArgument<T>)> = Vec::with_capacity(named.len() + 2);
    let mut slots = slots.into_iter();
    for param in &params.positional {
        bound.push((param.name.to_owned(), into_bound(slots.next().flatten())));
    }
    if let Some(vararg) = &params.vararg {
        bound.push((vararg.to_owned(), BoundArgument::Passed(T::pack_tuple(extra_positional))));
    }
    for param in &params.keyword_only {
        bound.push((param.name.to_owned(), into_bound(slots.next().flatten())));
    }
    if let Some(kwarg) = &params.kwarg {
        bound.push((kwarg.to_owned(), BoundArgument::Passed(T::pack_dict(extra_keywords))));
    }

    Ok(bound)
}

fn into_bound<T>(slot: Option<T>) -> BoundArgument<T> {
    match slot {
        Some(arg) => BoundArgument::Passed(arg),
        None => BoundArgument::Default,
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

// 'a', 'b' and 'c'
fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [single] => single.to_owned(),
        [rest @ .., last] => format!("{} and {last}", rest.join(", ")),
    }
}

#[cfg(test)]
#[path = "tests/function_tests.rs"]
mod function_tests;
