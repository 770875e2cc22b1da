#![cfg(test)]

use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::optimizers::scope_stack::ScopeStack;
use rustc_hash::FxHashMap;

#[test]
fn inner_frames_shadow_outer_frames() {
    let mut scope: ScopeStack<i64> = ScopeStack::new();
    scope.push();
    scope.set("x", 1).unwrap();
    scope.push();
    scope.set("x", 2).unwrap();

    assert_eq!(scope.get("x"), Some(&2));

    let popped = scope.pop().unwrap();
    assert_eq!(popped.get("x"), Some(&2));
    assert_eq!(scope.get("x"), Some(&1));
}

#[test]
fn writes_go_to_the_innermost_frame() {
    let mut scope: ScopeStack<i64> = ScopeStack::new();
    scope.push();
    scope.set("outer", 1).unwrap();
    scope.push();
    scope.set("inner", 2).unwrap();

    let inner = scope.pop().unwrap();
    assert!(inner.contains_key("inner"));
    assert!(!inner.contains_key("outer"));
    assert!(!scope.contains("inner"));
}

#[test]
fn delete_removes_the_nearest_binding_only() {
    let mut scope: ScopeStack<&str> = ScopeStack::new();
    scope.push();
    scope.set("x", "outer").unwrap();
    scope.push();
    scope.set("x", "inner").unwrap();

    assert_eq!(scope.delete("x"), Some("inner"));
    assert_eq!(scope.get("x"), Some(&"outer"));
    assert_eq!(scope.delete("missing"), None);
}

#[test]
fn items_and_keys_see_every_visible_name() {
    let mut seed = FxHashMap::default();
    seed.insert("b".to_owned(), 1);
    seed.insert("a".to_owned(), 1);

    let mut scope: ScopeStack<i64> = ScopeStack::new();
    scope.push_frame(seed);
    scope.push();
    scope.set("a", 5).unwrap();
    scope.set("c", 3).unwrap();

    assert_eq!(scope.keys(), vec!["a", "b", "c"]);
    assert_eq!(scope.items().get("a"), Some(&5));
    assert_eq!(scope.depth(), 2);
    assert_eq!(scope.innermost().map(FxHashMap::len), Some(2));
}

#[test]
fn underflow_is_a_compiler_bug() {
    let mut scope: ScopeStack<i64> = ScopeStack::new();

    let pop_error = scope.pop().unwrap_err();
    assert_eq!(pop_error.error_type, ErrorType::Compiler);

    let set_error = scope.set("x", 1).unwrap_err();
    assert_eq!(set_error.error_type, ErrorType::Compiler);
    assert_eq!(scope.get("x"), None);
}
