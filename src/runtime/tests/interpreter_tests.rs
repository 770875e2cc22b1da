#![cfg(test)]

use super::*;
use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::runtime::module::Module;
use crate::runtime::with_interpreter_stack;
use std::path::Path;

fn load(source: &str) -> Module {
    Module::from_source(source, Path::new("interpreter_test.py")).expect("module should run")
}

fn call(module: &Module, name: &str, args: Vec<Value>) -> Result<Value, CompilerError> {
    let function = module.function(name).expect("function should exist");
    function.call(args, Vec::new())
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().map(|value| Value::Int(*value)).collect())
}

#[test]
fn module_level_assignments_land_in_globals() {
    let module = load(
        "
a = 2
b = a * 3
c, d = b, a
",
    );

    assert_eq!(module.global("b"), Some(Value::Int(6)));
    assert_eq!(module.global("c"), Some(Value::Int(6)));
    assert_eq!(module.global("d"), Some(Value::Int(2)));
}

#[test]
fn functions_see_globals_at_call_time() {
    let module = load(
        "
scale = 2

def f(x):
    return x * scale

scale = 10
",
    );

    assert_eq!(call(&module, "f", vec![Value::Int(3)]).unwrap(), Value::Int(30));
}

#[test]
fn generators_return_what_they_yielded() {
    let module = load(
        "
def f(n):
    for i in range(n):
        if i % 2 == 0:
            continue
        yield i * 10
",
    );

    let result = call(&module, "f", vec![Value::Int(6)]).unwrap();
    assert!(result.py_eq(&ints(&[10, 30, 50])));
}

#[test]
fn while_else_runs_only_without_break() {
    let module = load(
        "
def f(limit):
    i = 0
    while i < 10:
        if i == limit:
            break
        i += 1
    else:
        return -1
    return i
",
    );

    assert_eq!(call(&module, "f", vec![Value::Int(4)]).unwrap(), Value::Int(4));
    assert_eq!(call(&module, "f", vec![Value::Int(20)]).unwrap(), Value::Int(-1));
}

#[test]
fn raised_exceptions_are_caught_by_matching_handlers() {
    let module = load(
        "
def f(x):
    try:
        return 10 // x
    except ZeroDivisionError:
        return 'zero'
    finally:
        x = 0
",
    );

    assert_eq!(call(&module, "f", vec![Value::Int(2)]).unwrap(), Value::Int(5));
    assert_eq!(call(&module, "f", vec![Value::Int(0)]).unwrap(), Value::str("zero"));
}

#[test]
fn uncaught_exceptions_keep_their_class() {
    let module = load(
        "
def f(items):
    return items[5]
",
    );

    let error = call(&module, "f", vec![ints(&[1, 2])]).unwrap_err();
    assert_eq!(error.error_type, ErrorType::Runtime);
    assert_eq!(error.exception_type(), Some("IndexError"));
}

#[test]
fn closures_read_and_write_enclosing_scopes() {
    let module = load(
        "
def counter():
    count = 0
    def bump():
        nonlocal count
        count += 1
        return count
    bump()
    bump()
    return bump()
",
    );

    assert_eq!(call(&module, "counter", Vec::new()).unwrap(), Value::Int(3));
}

#[test]
fn global_declarations_write_module_names() {
    let module = load(
        "
total = 0

def add(x):
    global total
    total += x
",
    );

    call(&module, "add", vec![Value::Int(4)]).unwrap();
    call(&module, "add", vec![Value::Int(5)]).unwrap();
    assert_eq!(module.global("total"), Some(Value::Int(9)));
}

#[test]
fn inline_blocks_exit_to_their_end() {
    let module = load(
        "
def f(a):
    result = {}
    for ____ in range(1):
        if a:
            result['return'] = 1
            break
        result['return'] = 2
        break
    return result['return']
",
    );

    assert_eq!(call(&module, "f", vec![Value::Bool(true)]).unwrap(), Value::Int(1));
    assert_eq!(call(&module, "f", vec![Value::Bool(false)]).unwrap(), Value::Int(2));
}

#[test]
fn unbounded_recursion_raises() {
    let exception = with_interpreter_stack(|| {
        let module = load(
            "
def f(x):
    return f(x + 1)
",
        );

        let error = call(&module, "f", vec![Value::Int(0)]).unwrap_err();
        error.exception_type().map(str::to_owned)
    })
    .expect("interpreter thread should start");

    assert_eq!(exception.as_deref(), Some("RecursionError"));
}

#[test]
fn recursion_inside_the_limit_returns() {
    let results = with_interpreter_stack(|| {
        let module = load(
            "
def depth(n):
    if n == 0:
        return 0
    return depth(n - 1) + 1

def over(n):
    try:
        return depth(n)
    except RecursionError:
        return -1
",
        );

        let call_int = |name: &str, n: i64| call(&module, name, vec![Value::Int(n)]).map(|value| value.repr());
        (call_int("depth", 40), call_int("over", 400))
    })
    .expect("interpreter thread should start");

    assert_eq!(results.0.ok().as_deref(), Some("40"));
    assert_eq!(results.1.ok().as_deref(), Some("-1"));
}

#[test]
fn return_outside_function_is_rejected() {
    let result = Module::from_source("return 1\n", Path::new("bad.py"));
    assert!(result.is_err());
}

#[test]
fn objects_accept_attributes() {
    let module = load(
        "
g = object()
g.a = [1, 2, 3]

def f():
    return sum(g.a)
",
    );

    assert_eq!(call(&module, "f", Vec::new()).unwrap(), Value::Int(6));
}
