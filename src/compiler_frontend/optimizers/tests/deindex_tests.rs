#![cfg(test)]

use crate::compiler_frontend::optimizers::pipeline::{Pass, PassConfig, deindex};
use crate::compiler_frontend::optimizers::tests::test_support::{
    call, dedent, function, load, transformed, transformed_function,
};
use crate::compiler_frontend::values::value::Value;
use crate::runtime::module::Module;

fn deindex_pass(module: &Module, name: &str) -> Pass {
    let values = module
        .global(name)
        .expect("sequence should be a global")
        .iterate()
        .expect("sequence should be iterable");

    Pass::Deindex {
        name: name.to_owned(),
        values,
    }
}

#[test]
fn constant_reads_become_element_names() {
    let module = load(
        "
        v = [1, 2, 3]

        def f():
            return v[0] + v[1] + v[-1]
        ",
    );

    assert_eq!(
        transformed(&module, "f", &[deindex_pass(&module, "v")]),
        dedent("def f():\n    return v_0 + v_1 + v_2")
    );
    assert_eq!(
        transformed(&module, "f", &[deindex_pass(&module, "v"), Pass::CollapseLiterals]),
        dedent("def f():\n    return 6")
    );
}

#[test]
fn element_names_are_globals_of_the_callable() {
    let module = load(
        "
        v = [object(), object(), object()]

        def f():
            return v[0], v[2]
        ",
    );

    let values = module.global("v").unwrap().iterate().unwrap();
    let output = deindex(&function(&module, "f"), "v", values.clone(), &PassConfig::default()).unwrap();
    let deindexed = output.function().expect("callable output");

    assert_eq!(output.source(), dedent("def f():\n    return v_0, v_2"));
    assert_eq!(deindexed.globals.borrow().get("v_1"), Some(&values[1]));

    // Same objects, not copies
    let result = call(&deindexed, Vec::new());
    assert_eq!(result, Value::tuple(vec![values[0].clone(), values[2].clone()]));

    // The original function keeps its own globals
    assert!(function(&module, "f").globals.borrow().get("v_0").is_none());
}

#[test]
fn unrolled_indexes_deindex() {
    let module = load(
        "
        v = [object(), object(), object()]

        def f():
            for i in range(3):
                yield v[i]
        ",
    );
    let expected = "
        def f():
            yield v_0
            yield v_1
            yield v_2
        ";

    assert_eq!(
        transformed(&module, "f", &[Pass::Unroll, deindex_pass(&module, "v")]),
        dedent(expected)
    );
}

#[test]
fn dynamic_and_out_of_range_indexes_are_kept() {
    let module = load(
        "
        v = [1, 2]

        def f(x):
            yield v[0]
            yield v[x]
            yield v[5]
            yield v[0:1]
        ",
    );
    let expected = "
        def f(x):
            yield v_0
            yield v[x]
            yield v[5]
            yield v[0:1]
        ";

    assert_eq!(
        transformed(&module, "f", &[deindex_pass(&module, "v")]),
        dedent(expected)
    );
}

#[test]
fn locals_with_the_same_name_hide_the_sequence() {
    let module = load(
        "
        v = [1, 2]

        def shadowed(v):
            return v[0]

        def stored():
            v[0] = 5
            return v[1]
        ",
    );

    let shadowed = "
        def shadowed(v):
            return v[0]
        ";
    let stored = "
        def stored():
            v[0] = 5
            return v[1]
        ";

    assert_eq!(transformed(&module, "shadowed", &[deindex_pass(&module, "v")]), dedent(shadowed));
    assert_eq!(transformed(&module, "stored", &[deindex_pass(&module, "v")]), dedent(stored));
}

#[test]
fn deindexed_callables_dispatch_like_the_original() {
    let module = load(
        "
        def one(x):
            return x

        def square(x):
            return x * x

        def cube(x):
            return x * x * x

        funcs = [one, square, cube]

        def run(i, x):
            for j in range(3):
                if i == j:
                    return funcs[j](x)
        ",
    );
    let passes = [Pass::Unroll, deindex_pass(&module, "funcs")];

    let expected = "
        def run(i, x):
            if i == 0:
                return funcs_0(x)
            if i == 1:
                return funcs_1(x)
            if i == 2:
                return funcs_2(x)
        ";
    assert_eq!(transformed(&module, "run", &passes), dedent(expected));

    let run = transformed_function(&module, "run", &passes);
    for (i, expected) in [(0, 5), (1, 25), (2, 125)] {
        assert_eq!(call(&run, vec![Value::Int(i), Value::Int(5)]), Value::Int(expected));
    }
}
