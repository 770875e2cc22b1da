#![cfg(test)]

use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::compiler_warnings::WarningKind;
use crate::compiler_frontend::optimizers::pipeline::{Pass, PassConfig, inline};
use crate::compiler_frontend::optimizers::tests::test_support::{
    call, dedent, function, load, run_passes, transformed, transformed_function, try_passes,
};
use crate::compiler_frontend::values::value::Value;
use crate::runtime::module::Module;

fn inline_pass(module: &Module, names: &[&str]) -> Pass {
    Pass::Inline(names.iter().map(|name| function(module, name)).collect())
}

const ADD: &str = "
    def add(a, b):
        return a + b

    def f():
        z = add(2, 3)
        return z
    ";

#[test]
fn calls_become_spliced_blocks() {
    let module = load(ADD);
    let expected = "
        def f():
            _add_0 = {}
            _add_0['a'] = 2
            _add_0['b'] = 3
            for ____ in range(1):
                _add_0['return'] = _add_0['a'] + _add_0['b']
                break
            z = _add_0['return']
            return z
        ";

    assert_eq!(transformed(&module, "f", &[inline_pass(&module, &["add"])]), dedent(expected));
}

#[test]
fn inlined_results_collapse() {
    let module = load(ADD);
    let expected = "
        def f():
            _add_0 = {}
            _add_0['a'] = 2
            _add_0['b'] = 3
            for ____ in range(1):
                _add_0['return'] = 5
                break
            z = 5
            return 5
        ";

    let passes = [inline_pass(&module, &["add"]), Pass::CollapseLiterals];
    assert_eq!(transformed(&module, "f", &passes), dedent(expected));
}

#[test]
fn inlined_callables_return_the_same_result() {
    let module = load(ADD);
    let inlined = inline(&function(&module, "f"), &[function(&module, "add")], &PassConfig::default())
        .unwrap()
        .function()
        .expect("callable output");

    assert_eq!(call(&inlined, Vec::new()), Value::Int(5));
}

#[test]
fn keywords_and_defaults_are_stored_in_parameter_order() {
    let module = load(
        "
        def scale(x, factor=2):
            return x * factor

        def f(y):
            return scale(factor=y, x=1) + scale(y)
        ",
    );
    let expected = "
        def f(y):
            _scale_0 = {}
            _scale_0['x'] = 1
            _scale_0['factor'] = y
            for ____ in range(1):
                _scale_0['return'] = _scale_0['x'] * _scale_0['factor']
                break
            _scale_1 = {}
            _scale_1['x'] = y
            _scale_1['factor'] = 2
            for ____ in range(1):
                _scale_1['return'] = _scale_1['x'] * _scale_1['factor']
                break
            return _scale_0['return'] + _scale_1['return']
        ";

    let passes = [inline_pass(&module, &["scale"])];
    assert_eq!(transformed(&module, "f", &passes), dedent(expected));

    let inlined = transformed_function(&module, "f", &passes);
    assert_eq!(call(&inlined, vec![Value::Int(3)]), Value::Int(9));
}

#[test]
fn nested_calls_inline_arguments_first() {
    let module = load(
        "
        def add(a, b):
            return a + b

        def f():
            return add(add(1, 2), 3)
        ",
    );
    let expected = "
        def f():
            _add_0 = {}
            _add_0['a'] = 1
            _add_0['b'] = 2
            for ____ in range(1):
                _add_0['return'] = _add_0['a'] + _add_0['b']
                break
            _add_1 = {}
            _add_1['a'] = _add_0['return']
            _add_1['b'] = 3
            for ____ in range(1):
                _add_1['return'] = _add_1['a'] + _add_1['b']
                break
            return _add_1['return']
        ";

    let passes = [inline_pass(&module, &["add"])];
    assert_eq!(transformed(&module, "f", &passes), dedent(expected));
    assert_eq!(call(&transformed_function(&module, "f", &passes), Vec::new()), Value::Int(6));
}

#[test]
fn callees_without_return_give_none() {
    let module = load(
        "
        def log(x):
            y = x + 1
            print(y)

        def f():
            log(1)
        ",
    );
    let expected = "
        def f():
            _log_0 = {}
            _log_0['x'] = 1
            for ____ in range(1):
                _log_0['y'] = _log_0['x'] + 1
                print(_log_0['y'])
                _log_0['return'] = None
            _log_0['return']
        ";

    assert_eq!(transformed(&module, "f", &[inline_pass(&module, &["log"])]), dedent(expected));
}

#[test]
fn early_returns_exit_the_block() {
    let module = load(
        "
        def sign(x):
            if x < 0:
                return -1
            return 1

        def f(y):
            return sign(y)
        ",
    );
    let expected = "
        def f(y):
            _sign_0 = {}
            _sign_0['x'] = y
            for ____ in range(1):
                if _sign_0['x'] < 0:
                    _sign_0['return'] = -1
                    break
                _sign_0['return'] = 1
                break
            return _sign_0['return']
        ";

    let passes = [inline_pass(&module, &["sign"])];
    assert_eq!(transformed(&module, "f", &passes), dedent(expected));

    let inlined = transformed_function(&module, "f", &passes);
    assert_eq!(call(&inlined, vec![Value::Int(-4)]), Value::Int(-1));
    assert_eq!(call(&inlined, vec![Value::Int(4)]), Value::Int(1));
}

#[test]
fn conditionally_evaluated_calls_stay_calls() {
    let module = load(
        "
        def add(a, b):
            return a + b

        def f(y):
            return y and add(1, 2)
        ",
    );

    let expected = "
        def f(y):
            return y and add(1, 2)
        ";
    assert_eq!(transformed(&module, "f", &[inline_pass(&module, &["add"])]), dedent(expected));
}

#[test]
fn refused_callees_are_reported_once() {
    let module = load(
        "
        def gen(n):
            yield n

        def f():
            return [gen(1), gen(2)]
        ",
    );

    let output = run_passes(&module, "f", &[inline_pass(&module, &["gen"])], &PassConfig::source());

    assert_eq!(output.source(), dedent("def f():\n    return [gen(1), gen(2)]"));
    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].warning_kind, WarningKind::UnsupportedConstruct);
}

#[test]
fn arguments_that_do_not_fit_the_signature_are_errors() {
    let module = load(
        "
        def add(a, b):
            return a + b

        def f():
            return add(1)
        ",
    );

    let Err(messages) = try_passes(&module, "f", &[inline_pass(&module, &["add"])], &PassConfig::source())
    else {
        panic!("a call missing an argument should not inline");
    };

    assert_eq!(messages.errors.len(), 1);
    assert_eq!(messages.errors[0].error_type, ErrorType::SignatureBind);
    assert_eq!(messages.errors[0].msg, "add() missing 1 required positional argument: 'b'");
}

#[test]
fn callee_globals_travel_with_the_inlined_body() {
    let library = load(
        "
        scale = 3

        def mul(x):
            return x * scale
        ",
    );
    let module = load(
        "
        def f(y):
            return mul(y)
        ",
    );

    let mul = function(&library, "mul");
    let config = PassConfig::default().with_override("mul", Value::Function(mul.clone()));
    let output = run_passes(&module, "f", &[Pass::Inline(vec![mul])], &config);

    let inlined = output.function().expect("callable output");
    assert_eq!(inlined.globals.borrow().get("scale"), Some(&Value::Int(3)));
    assert_eq!(call(&inlined, vec![Value::Int(2)]), Value::Int(6));
}

#[test]
fn container_names_skip_names_already_in_use() {
    let module = load(
        "
        def add(a, b):
            return a + b

        def f():
            _add_0 = 1
            return add(_add_0, 2)
        ",
    );

    let source = transformed(&module, "f", &[inline_pass(&module, &["add"])]);
    assert!(source.contains("_add_1 = {}"));
    assert!(!source.contains("_add_0 = {}"));
}

#[test]
fn calls_in_except_clauses_stay_calls() {
    let module = load(
        "
        def check(a):
            raise ValueError()

        def f():
            try:
                x = 1
            except check(1):
                return 1
            return 2
        ",
    );

    let expected = "
        def f():
            try:
                x = 1
            except check(1):
                return 1
            return 2
        ";
    let passes = [inline_pass(&module, &["check"])];
    assert_eq!(transformed(&module, "f", &passes), dedent(expected));
    assert_eq!(call(&transformed_function(&module, "f", &passes), Vec::new()), Value::Int(2));
}
