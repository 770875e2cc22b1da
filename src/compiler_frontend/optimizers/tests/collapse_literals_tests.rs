#![cfg(test)]

use crate::compiler_frontend::compiler_warnings::WarningKind;
use crate::compiler_frontend::optimizers::pipeline::{Pass, PassConfig};
use crate::compiler_frontend::optimizers::tests::test_support::{
    call, dedent, function, load, run_passes, transformed, transformed_function,
};
use crate::compiler_frontend::syntax::render_source::render_function;
use crate::compiler_frontend::values::value::Value;

fn collapsed(source: &str) -> String {
    transformed(&load(source), "f", &[Pass::CollapseLiterals])
}

#[test]
fn folds_constant_expressions() {
    let source = "
        def f():
            return 1 + 1
        ";

    assert_eq!(collapsed(source), dedent("def f():\n    return 2"));
}

#[test]
fn folds_through_known_variables() {
    let source = "
        def f():
            x = 2
            y = 3
            return x + y
        ";
    let expected = "
        def f():
            x = 2
            y = 3
            return 5
        ";

    assert_eq!(collapsed(source), dedent(expected));
}

#[test]
fn folds_the_static_part_of_a_dynamic_expression() {
    let source = "
        def f(y):
            x = 3
            return 1 + 1 + x + y
        ";
    let expected = "
        def f(y):
            x = 3
            return 5 + y
        ";

    assert_eq!(collapsed(source), dedent(expected));
}

#[test]
fn constant_indexes_of_known_lists_fold() {
    let source = "
        def f():
            x = [1, 2, 3]
            return x[0]
        ";
    let expected = "
        def f():
            x = [1, 2, 3]
            return 1
        ";

    assert_eq!(collapsed(source), dedent(expected));
}

#[test]
fn unrolled_loop_variables_fold() {
    let module = load(
        "
        def f():
            for i in range(3):
                print(i + 2)
        ",
    );
    let expected = "
        def f():
            print(2)
            print(3)
            print(4)
        ";

    assert_eq!(
        transformed(&module, "f", &[Pass::Unroll, Pass::CollapseLiterals]),
        dedent(expected)
    );
}

#[test]
fn objects_and_mutable_containers_keep_their_identity() {
    let module = load(
        "
        g = object()
        items = [1, 2]

        def f():
            x = g
            y = items
            return x, y, items[0]
        ",
    );
    let expected = "
        def f():
            x = g
            y = items
            return x, y, 1
        ";

    assert_eq!(transformed(&module, "f", &[Pass::CollapseLiterals]), dedent(expected));
}

#[test]
fn folds_that_raise_are_left_with_one_warning() {
    let module = load(
        "
        def f():
            return 1 + '2'
        ",
    );

    let output = run_passes(&module, "f", &[Pass::CollapseLiterals], &PassConfig::source());

    assert_eq!(output.source(), dedent("def f():\n    return 1 + '2'"));
    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].warning_kind, WarningKind::FoldError);
}

#[test]
fn static_conditions_keep_only_the_taken_branch() {
    let source = "
        def f():
            x = 0
            if x == 0:
                x = 1
            return x
        ";
    let expected = "
        def f():
            x = 0
            x = 1
            return 1
        ";

    assert_eq!(collapsed(source), dedent(expected));
}

#[test]
fn overrides_pick_the_branch() {
    let module = load(
        "
        def f():
            if x == 0:
                x = 'a'
            elif x == 1:
                x = 'b'
            else:
                x = 'c'
            return x
        ",
    );

    for (value, letter) in [(0, "a"), (1, "b"), (2, "c")] {
        let config = PassConfig::source().with_override("x", Value::Int(value));
        let output = run_passes(&module, "f", &[Pass::CollapseLiterals], &config);
        let expected = format!("def f():\n    x = '{letter}'\n    return '{letter}'\n");
        assert_eq!(output.source(), expected);
    }
}

#[test]
fn agreeing_branches_keep_their_binding() {
    let source = "
        def f(y):
            if y:
                x = 1
            else:
                x = 1
            return x
        ";
    let expected = "
        def f(y):
            if y:
                x = 1
            else:
                x = 1
            return 1
        ";

    assert_eq!(collapsed(source), dedent(expected));
}

#[test]
fn unreachable_statements_are_dropped() {
    let source = "
        def f():
            while False:
                print(1)
            else:
                print(2)
            return 1
            print('never')
        ";
    let expected = "
        def f():
            print(2)
            return 1
        ";

    assert_eq!(collapsed(source), dedent(expected));
}

#[test]
fn boolean_operands_that_never_decide_are_removed() {
    let source = "
        def f(y):
            a = 1 and y
            b = 0 or y
            c = y and 1
            return (1 if y else 2) if True else 3
        ";
    let expected = "
        def f(y):
            a = y
            b = y
            c = y and 1
            return 1 if y else 2
        ";

    assert_eq!(collapsed(source), dedent(expected));
}

#[test]
fn method_calls_make_their_receiver_dynamic() {
    let source = "
        def f():
            a = [1, 2]
            a.append(3)
            return len(a)
        ";

    assert_eq!(collapsed(source), dedent(source));
}

#[test]
fn collapsing_twice_changes_nothing() {
    let module = load(
        "
        def f(y):
            x = 4
            if y > x * 2:
                return [x, y]
            for i in range(x):
                y += i
            return y - x
        ",
    );

    let once = transformed(&module, "f", &[Pass::CollapseLiterals]);
    let twice = transformed(&module, "f", &[Pass::CollapseLiterals, Pass::CollapseLiterals]);
    assert_eq!(once, twice);
}

#[test]
fn transformed_functions_behave_like_the_original() {
    let module = load(
        "
        def f(x):
            total = 0
            for i in range(3):
                if i == 1:
                    total += x
                else:
                    total += i * 2
            if x > 2:
                return total + 1
            return total
        ",
    );

    let original = function(&module, "f");
    let collapsed = transformed_function(&module, "f", &[Pass::CollapseLiterals]);
    let unrolled = transformed_function(&module, "f", &[Pass::Unroll, Pass::CollapseLiterals]);

    for x in [0, 1, 5, -1] {
        let expected = call(&original, vec![Value::Int(x)]);
        assert_eq!(call(&collapsed, vec![Value::Int(x)]), expected);
        assert_eq!(call(&unrolled, vec![Value::Int(x)]), expected);
    }

    // The loop is gone once unrolled and folded
    let source = render_function(&unrolled.def);
    assert!(!source.contains("for "));
}
