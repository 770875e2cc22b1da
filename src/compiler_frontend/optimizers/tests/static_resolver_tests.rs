#![cfg(test)]

use crate::compiler_frontend::optimizers::scope_stack::ScopeStack;
use crate::compiler_frontend::optimizers::static_resolver::{Binding, StaticResolver, Unresolved};
use crate::compiler_frontend::optimizers::tests::test_support::expr;
use crate::compiler_frontend::values::builtins::Builtin;
use crate::compiler_frontend::values::value::{FoldError, Value};
use rustc_hash::FxHashMap;

fn scope_with(bindings: &[(&str, Binding)]) -> ScopeStack<Binding> {
    let mut scope = ScopeStack::new();
    scope.push();
    for (name, binding) in bindings {
        scope.set(name, binding.clone()).unwrap();
    }
    scope
}

fn resolve(source: &str, scope: &ScopeStack<Binding>, symbols: &FxHashMap<String, Value>) -> Result<Value, Unresolved> {
    StaticResolver::new(scope, symbols).resolve(&expr(source))
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().map(|value| Value::Int(*value)).collect())
}

#[test]
fn literal_arithmetic_folds() {
    let scope = scope_with(&[]);
    let symbols = FxHashMap::default();

    assert_eq!(resolve("1 + 2 * 3", &scope, &symbols), Ok(Value::Int(7)));
    assert_eq!(resolve("'ab' * 2", &scope, &symbols), Ok(Value::str("abab")));
    assert_eq!(resolve("(1, 2)[-1]", &scope, &symbols), Ok(Value::Int(2)));
}

#[test]
fn known_names_resolve_and_unknown_ones_stay_dynamic() {
    let scope = scope_with(&[
        ("x", Binding::Known(Value::Int(4))),
        ("y", Binding::Unknown),
        ("z", Binding::Display(vec![expr("y")])),
    ]);
    let symbols = FxHashMap::default();

    assert_eq!(resolve("x * 2", &scope, &symbols), Ok(Value::Int(8)));
    assert_eq!(resolve("x + y", &scope, &symbols), Err(Unresolved::Dynamic));
    assert_eq!(resolve("z", &scope, &symbols), Err(Unresolved::Dynamic));
}

#[test]
fn free_names_fall_back_to_symbols_then_builtins() {
    let scope = scope_with(&[]);
    let mut symbols = FxHashMap::default();
    symbols.insert("items".to_owned(), ints(&[4, 5, 6]));

    assert_eq!(resolve("len(items)", &scope, &symbols), Ok(Value::Int(3)));
    assert_eq!(resolve("range", &scope, &symbols), Ok(Value::Builtin(Builtin::Range)));
    assert_eq!(resolve("missing", &scope, &symbols), Err(Unresolved::Dynamic));
}

#[test]
fn local_bindings_shadow_symbols() {
    let scope = scope_with(&[("items", Binding::Unknown)]);
    let mut symbols = FxHashMap::default();
    symbols.insert("items".to_owned(), ints(&[1]));

    assert_eq!(resolve("items[0]", &scope, &symbols), Err(Unresolved::Dynamic));
}

#[test]
fn impure_calls_are_never_made() {
    let scope = scope_with(&[]);
    let symbols = FxHashMap::default();

    assert_eq!(resolve("print(1)", &scope, &symbols), Err(Unresolved::Dynamic));
    assert_eq!(resolve("object()", &scope, &symbols), Err(Unresolved::Dynamic));
}

#[test]
fn raising_folds_report_the_exception() {
    let scope = scope_with(&[]);
    let symbols = FxHashMap::default();

    match resolve("1 / 0", &scope, &symbols) {
        Err(Unresolved::Failed(FoldError::Raised { exception, .. })) => {
            assert_eq!(exception, "ZeroDivisionError");
        }
        other => panic!("expected a raised fold, got {other:?}"),
    }
}

#[test]
fn overflow_is_dynamic_rather_than_an_error() {
    let scope = scope_with(&[]);
    let symbols = FxHashMap::default();

    assert_eq!(
        resolve("9223372036854775807 + 1", &scope, &symbols),
        Err(Unresolved::Dynamic)
    );
}

#[test]
fn iterators_are_never_resolved() {
    let scope = scope_with(&[("it", Binding::Known(Value::iterator(vec![Value::Int(1)])))]);
    let mut symbols = FxHashMap::default();
    symbols.insert("global_it".to_owned(), Value::iterator(vec![Value::Int(1)]));

    assert_eq!(resolve("it", &scope, &symbols), Err(Unresolved::Dynamic));
    assert_eq!(resolve("global_it", &scope, &symbols), Err(Unresolved::Dynamic));
}

#[test]
fn short_circuits_skip_operands_that_would_raise() {
    let scope = scope_with(&[
        ("flag", Binding::Known(Value::Bool(true))),
        ("y", Binding::Unknown),
    ]);
    let symbols = FxHashMap::default();

    assert_eq!(resolve("1 > 2 > 1 / 0", &scope, &symbols), Ok(Value::Bool(false)));
    assert_eq!(resolve("'a' if flag else 1 / 0", &scope, &symbols), Ok(Value::str("a")));
    assert_eq!(resolve("0 and y", &scope, &symbols), Ok(Value::Int(0)));
    assert_eq!(resolve("flag or y", &scope, &symbols), Ok(Value::Bool(true)));
    assert_eq!(resolve("flag and y", &scope, &symbols), Err(Unresolved::Dynamic));
}

#[test]
fn attributes_of_known_objects_resolve() {
    let scope = scope_with(&[]);
    let mut attrs = FxHashMap::default();
    attrs.insert("a".to_owned(), ints(&[1, 2, 3]));
    let mut symbols = FxHashMap::default();
    symbols.insert("g".to_owned(), Value::new_object("object", attrs));

    assert_eq!(resolve("g.a[1]", &scope, &symbols), Ok(Value::Int(2)));
}

#[test]
fn splats_expand_into_builtin_calls() {
    let scope = scope_with(&[("args", Binding::Known(Value::tuple(vec![Value::Int(1), Value::Int(9)])))]);
    let symbols = FxHashMap::default();

    assert_eq!(resolve("max(*args)", &scope, &symbols), Ok(Value::Int(9)));
    assert_eq!(resolve("[*args, 3][2]", &scope, &symbols), Ok(Value::Int(3)));
}
