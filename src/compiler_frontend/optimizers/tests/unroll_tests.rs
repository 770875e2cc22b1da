#![cfg(test)]

use crate::compiler_frontend::compiler_warnings::WarningKind;
use crate::compiler_frontend::optimizers::pipeline::{Pass, PassConfig};
use crate::compiler_frontend::optimizers::tests::test_support::{
    call, dedent, function, load, run_passes, transformed, transformed_function,
};
use crate::compiler_frontend::syntax::render_source::render_function;
use crate::compiler_frontend::values::builtins::Builtin;
use crate::compiler_frontend::values::value::Value;

#[test]
fn unrolls_every_statically_known_sequence() {
    let module = load(
        "
        g = object()
        g.a = [1, 2, 3]
        g.b = 6

        def f(x):
            y = 5
            a = range(3)
            b = [1, 2, 4]
            c = (1, 2, 5)
            d = reversed(a)
            e = [x, x, x]
            f = [y, y, y]
            for i in a:
                yield i
            for i in b:
                yield i
            for i in c:
                yield i
            for i in d:
                yield i
            for i in e:
                yield i
            for i in f:
                yield i
            for i in g.a:
                yield i
            for i in [g.b + 0, g.b + 1, g.b + 2]:
                yield i
        ",
    );

    let expected = dedent(
        "
        def f(x):
            y = 5
            a = range(3)
            b = [1, 2, 4]
            c = 1, 2, 5
            d = reversed(a)
            e = [x, x, x]
            f = [y, y, y]
            yield 0
            yield 1
            yield 2
            yield 1
            yield 2
            yield 4
            yield 1
            yield 2
            yield 5
            for i in d:
                yield i
            yield x
            yield x
            yield x
            yield 5
            yield 5
            yield 5
            yield 1
            yield 2
            yield 3
            yield 6
            yield 7
            yield 8
        ",
    );

    assert_eq!(transformed(&module, "f", &[Pass::Unroll]), expected);

    let original = call(&function(&module, "f"), vec![Value::Int(9)]);
    let unrolled = call(&transformed_function(&module, "f", &[Pass::Unroll]), vec![Value::Int(9)]);
    assert!(original.py_eq(&unrolled));
}

#[test]
fn displays_are_read_when_the_loop_starts() {
    let module = load(
        "
        def f():
            x = 3
            a = [x, x, x]
            for i in a:
                yield i
            x = 4
            a = [x, x, x]
            for i in a:
                yield i
        ",
    );

    let expected = dedent(
        "
        def f():
            x = 3
            a = [x, x, x]
            yield 3
            yield 3
            yield 3
            x = 4
            a = [x, x, x]
            yield 4
            yield 4
            yield 4
        ",
    );

    assert_eq!(transformed(&module, "f", &[Pass::Unroll]), expected);
}

#[test]
fn dynamic_elements_are_substituted_as_expressions() {
    let module = load(
        "
        def f(x=0):
            a = [x, x, x]
            v = 0
            for _a in a:
                v += _a
            return v
        ",
    );

    let expected = dedent(
        "
        def f(x=0):
            a = [x, x, x]
            v = 0
            v += x
            v += x
            v += x
            return v
        ",
    );

    assert_eq!(transformed(&module, "f", &[Pass::Unroll]), expected);

    let unrolled = transformed_function(&module, "f", &[Pass::Unroll]);
    assert_eq!(call(&unrolled, vec![Value::Int(4)]), Value::Int(12));
}

#[test]
fn nested_loops_unroll_inside_out() {
    let module = load(
        "
        def nested():
            for i in [[1, 2, 3], [4, 5], [6]]:
                for j in i:
                    yield j

        def pairs():
            for i in range(2):
                for j in range(2):
                    yield i + j
        ",
    );

    let nested = dedent(
        "
        def nested():
            yield 1
            yield 2
            yield 3
            yield 4
            yield 5
            yield 6
        ",
    );
    let pairs = dedent(
        "
        def pairs():
            yield 0 + 0
            yield 0 + 1
            yield 1 + 0
            yield 1 + 1
        ",
    );

    assert_eq!(transformed(&module, "nested", &[Pass::Unroll]), nested);
    assert_eq!(transformed(&module, "pairs", &[Pass::Unroll]), pairs);
}

#[test]
fn overrides_supply_values_the_module_lacks() {
    let module = load(
        "
        def f():
            for i in a(3):
                print(i)
        ",
    );

    let config = PassConfig::source().with_override("a", Value::Builtin(Builtin::Range));
    let output = run_passes(&module, "f", &[Pass::Unroll], &config);

    let expected = dedent(
        "
        def f():
            print(0)
            print(1)
            print(2)
        ",
    );
    assert_eq!(output.source(), expected);
}

#[test]
fn tuple_targets_make_their_names_dynamic() {
    let module = load(
        "
        def f():
            (y, x), z = (1, 2), 3
            for i in [x, x, x]:
                print(i)
        ",
    );

    let output = run_passes(&module, "f", &[Pass::Unroll], &PassConfig::source());
    let expected = dedent(
        "
        def f():
            (y, x), z = (1, 2), 3
            print(x)
            print(x)
            print(x)
        ",
    );

    assert_eq!(output.source(), expected);
    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].warning_kind, WarningKind::UnsupportedConstruct);
}

#[test]
fn else_clauses_run_once_after_the_copies() {
    let module = load(
        "
        def f():
            for i in [1, 2]:
                print(i)
            else:
                print('done')
        ",
    );

    let expected = dedent(
        "
        def f():
            print(1)
            print(2)
            print('done')
        ",
    );
    assert_eq!(transformed(&module, "f", &[Pass::Unroll]), expected);
}

#[test]
fn loops_that_cannot_be_copied_are_kept() {
    let module = load(
        "
        def with_break():
            for i in range(3):
                if i:
                    break
                print(i)

        def too_long():
            for i in range(100000):
                print(i)

        def rebinds_elements(x):
            for i in [x, x]:
                x = x + 1
                print(i)

        def unpacks():
            for a, b in [(1, 2), (3, 4)]:
                print(a)
        ",
    );

    for name in ["with_break", "too_long", "rebinds_elements", "unpacks"] {
        let original = render_function(&function(&module, name).def);
        assert_eq!(transformed(&module, name, &[Pass::Unroll]), original, "{name} changed");
    }
}

#[test]
fn loops_inside_nested_functions_still_unroll() {
    let module = load(
        "
        def f():
            def inner():
                for i in range(2):
                    print(i)
            return inner
        ",
    );

    let expected = dedent(
        "
        def f():
            def inner():
                print(0)
                print(1)
            return inner
        ",
    );
    assert_eq!(transformed(&module, "f", &[Pass::Unroll]), expected);
}

#[test]
fn loop_variable_keeps_its_last_value_after_the_copies() {
    let module = load(
        "
        def f():
            for i in range(3):
                pass
            return i

        def g(x):
            for i in [x, x + 1]:
                print(i)
            return i * 2
        ",
    );

    let expected = dedent(
        "
        def f():
            pass
            pass
            pass
            i = 2
            return i
        ",
    );
    assert_eq!(transformed(&module, "f", &[Pass::Unroll]), expected);
    assert_eq!(call(&transformed_function(&module, "f", &[Pass::Unroll]), Vec::new()), Value::Int(2));

    let expected = dedent(
        "
        def g(x):
            print(x)
            print(x + 1)
            i = x + 1
            return i * 2
        ",
    );
    assert_eq!(transformed(&module, "g", &[Pass::Unroll]), expected);
    assert_eq!(
        call(&transformed_function(&module, "g", &[Pass::Unroll]), vec![Value::Int(4)]),
        Value::Int(10)
    );
}

#[test]
fn loops_whose_variable_is_captured_by_a_definition_are_kept() {
    let module = load(
        "
        def f():
            for i in [1, 2]:
                def g():
                    return i
            return g()
        ",
    );

    let original = render_function(&function(&module, "f").def);
    assert_eq!(transformed(&module, "f", &[Pass::Unroll]), original);
    assert_eq!(call(&transformed_function(&module, "f", &[Pass::Unroll]), Vec::new()), Value::Int(2));
}
