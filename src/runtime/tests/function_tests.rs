#![cfg(test)]

use super::*;
use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::syntax::parse_statements::parse_module;
use crate::compiler_frontend::syntax::ast_nodes::StmtKind;

fn params_of(source: &str) -> Parameters {
    let body = parse_module(source).expect("signature should parse");
    match &body[0].kind {
        StmtKind::FunctionDef(def) => def.params.to_owned(),
        other => panic!("expected a def, got {other:?}"),
    }
}

fn bind(
    source: &str,
    defaults: &[&str],
    positional: Vec<Value>,
    keywords: Vec<(&str, Value)>,
) -> Result<Vec<(String, BoundArgument<Value>)>, CompilerError> {
    let params = params_of(source);
    let keywords = keywords
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect();
    bind_arguments("f", &params, |name| defaults.contains(&name), positional, keywords)
}

#[test]
fn positional_and_keyword_arguments_fill_slots_in_order() {
    let bound = bind(
        "def f(a, b, c):\n    pass\n",
        &[],
        vec![Value::Int(1)],
        vec![("c", Value::Int(3)), ("b", Value::Int(2))],
    )
    .unwrap();

    assert_eq!(
        bound,
        vec![
            ("a".to_owned(), BoundArgument::Passed(Value::Int(1))),
            ("b".to_owned(), BoundArgument::Passed(Value::Int(2))),
            ("c".to_owned(), BoundArgument::Passed(Value::Int(3))),
        ]
    );
}

#[test]
fn missing_parameters_with_defaults_are_marked() {
    let bound = bind("def f(a, b=2):\n    pass\n", &["b"], vec![Value::Int(1)], Vec::new()).unwrap();
    assert_eq!(bound[1], ("b".to_owned(), BoundArgument::Default));
}

#[test]
fn extra_arguments_are_packed_into_varargs() {
    let bound = bind(
        "def f(a, *rest, **named):\n    pass\n",
        &[],
        vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        vec![("x", Value::Int(4))],
    )
    .unwrap();

    let names: Vec<&str> = bound.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["a", "rest", "named"]);
    match &bound[1].1 {
        BoundArgument::Passed(rest) => assert_eq!(rest.repr(), "(2, 3)"),
        other => panic!("expected packed varargs, got {other:?}"),
    }
    match &bound[2].1 {
        BoundArgument::Passed(named) => assert_eq!(named.repr(), "{'x': 4}"),
        other => panic!("expected packed keywords, got {other:?}"),
    }
}

#[test]
fn too_many_positional_arguments_is_a_signature_error() {
    let error = bind(
        "def f(a):\n    pass\n",
        &[],
        vec![Value::Int(1), Value::Int(2)],
        Vec::new(),
    )
    .unwrap_err();

    assert_eq!(error.error_type, ErrorType::SignatureBind);
    assert_eq!(error.msg, "f() takes 1 positional argument but 2 were given");
}

#[test]
fn duplicate_and_unknown_keywords_are_rejected() {
    let duplicate = bind(
        "def f(a):\n    pass\n",
        &[],
        vec![Value::Int(1)],
        vec![("a", Value::Int(2))],
    )
    .unwrap_err();
    assert_eq!(duplicate.msg, "f() got multiple values for argument 'a'");

    let unknown = bind("def f(a):\n    pass\n", &[], Vec::new(), vec![("z", Value::Int(2))]).unwrap_err();
    assert_eq!(unknown.msg, "f() got an unexpected keyword argument 'z'");
}

#[test]
fn missing_arguments_are_listed_together() {
    let error = bind("def f(a, b, c):\n    pass\n", &[], Vec::new(), Vec::new()).unwrap_err();
    assert_eq!(error.msg, "f() missing 3 required positional arguments: 'a', 'b' and 'c'");
}

#[test]
fn keyword_only_parameters_need_names() {
    let error = bind(
        "def f(a, *, key):\n    pass\n",
        &[],
        vec![Value::Int(1)],
        Vec::new(),
    )
    .unwrap_err();
    assert_eq!(error.msg, "f() missing 1 required keyword-only argument: 'key'");
}

#[test]
fn expression_arguments_pack_into_displays() {
    let params = params_of("def f(*rest):\n    pass\n");
    let bound = bind_arguments(
        "f",
        &params,
        |_| false,
        vec![Expr::int(1), Expr::name("y")],
        Vec::new(),
    )
    .unwrap();

    assert_eq!(
        bound[0].1,
        BoundArgument::Passed(Expr::Tuple(vec![Expr::int(1), Expr::name("y")]))
    );
}
