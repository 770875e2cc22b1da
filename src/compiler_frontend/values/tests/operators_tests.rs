use super::*;
use crate::compiler_frontend::values::value::RangeValue;

fn binary(lhs: Value, op: BinaryOperator, rhs: Value) -> Result<Value, FoldError> {
    lhs.evaluate_operator(&rhs, op)
}

fn raised_exception(result: Result<Value, FoldError>) -> &'static str {
    match result {
        Err(FoldError::Raised { exception, .. }) => exception,
        other => panic!("expected a raised exception, found {other:?}"),
    }
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|value| Value::Int(*value)).collect()
}

#[test]
fn integer_arithmetic() {
    assert_eq!(binary(Value::Int(7), BinaryOperator::Add, Value::Int(5)), Ok(Value::Int(12)));
    assert_eq!(binary(Value::Int(7), BinaryOperator::Multiply, Value::Int(-3)), Ok(Value::Int(-21)));
    assert_eq!(binary(Value::Int(2), BinaryOperator::Exponent, Value::Int(10)), Ok(Value::Int(1024)));
    assert_eq!(binary(Value::Int(2), BinaryOperator::Exponent, Value::Int(-1)), Ok(Value::Float(0.5)));
    assert_eq!(binary(Value::Int(7), BinaryOperator::Divide, Value::Int(2)), Ok(Value::Float(3.5)));
    assert_eq!(binary(Value::Int(1), BinaryOperator::ShiftLeft, Value::Int(4)), Ok(Value::Int(16)));
    assert_eq!(binary(Value::Int(-16), BinaryOperator::ShiftRight, Value::Int(2)), Ok(Value::Int(-4)));
    assert_eq!(binary(Value::Int(6), BinaryOperator::BitXor, Value::Int(3)), Ok(Value::Int(5)));
}

#[test]
fn floor_division_and_modulo_round_towards_negative_infinity() {
    assert_eq!(binary(Value::Int(-7), BinaryOperator::FloorDivide, Value::Int(2)), Ok(Value::Int(-4)));
    assert_eq!(binary(Value::Int(-7), BinaryOperator::Modulus, Value::Int(2)), Ok(Value::Int(1)));
    assert_eq!(binary(Value::Int(7), BinaryOperator::Modulus, Value::Int(-2)), Ok(Value::Int(-1)));
    assert_eq!(binary(Value::Float(-7.5), BinaryOperator::FloorDivide, Value::Int(2)), Ok(Value::Float(-4.0)));
    assert_eq!(binary(Value::Float(-1.0), BinaryOperator::Modulus, Value::Float(3.0)), Ok(Value::Float(2.0)));
}

#[test]
fn bools_take_part_as_integers() {
    assert_eq!(binary(Value::Bool(true), BinaryOperator::Add, Value::Int(1)), Ok(Value::Int(2)));
    assert_eq!(binary(Value::Bool(true), BinaryOperator::BitAnd, Value::Bool(false)), Ok(Value::Bool(false)));
    assert_eq!(binary(Value::Bool(true), BinaryOperator::Add, Value::Bool(true)), Ok(Value::Int(2)));
    assert_eq!(binary(Value::Bool(true), BinaryOperator::Add, Value::Float(0.5)), Ok(Value::Float(1.5)));
}

#[test]
fn division_by_zero_raises() {
    assert_eq!(raised_exception(binary(Value::Int(1), BinaryOperator::Divide, Value::Int(0))), "ZeroDivisionError");
    assert_eq!(raised_exception(binary(Value::Int(1), BinaryOperator::Modulus, Value::Int(0))), "ZeroDivisionError");
    assert_eq!(raised_exception(binary(Value::Float(1.0), BinaryOperator::FloorDivide, Value::Float(0.0))), "ZeroDivisionError");
    assert_eq!(raised_exception(binary(Value::Int(0), BinaryOperator::Exponent, Value::Int(-1))), "ZeroDivisionError");
}

#[test]
fn overflow_is_unrepresentable_not_an_exception() {
    assert_eq!(binary(Value::Int(i64::MAX), BinaryOperator::Add, Value::Int(1)), Err(FoldError::Unrepresentable));
    assert_eq!(binary(Value::Int(10), BinaryOperator::Exponent, Value::Int(30)), Err(FoldError::Unrepresentable));
    assert_eq!(binary(Value::Int(1), BinaryOperator::ShiftLeft, Value::Int(64)), Err(FoldError::Unrepresentable));
    assert_eq!(Value::Int(i64::MIN).evaluate_unary(UnaryOperator::Negative), Err(FoldError::Unrepresentable));
}

#[test]
fn mismatched_types_raise_type_error() {
    let error = binary(Value::Int(1), BinaryOperator::Add, Value::str("2"));
    assert_eq!(
        error,
        Err(FoldError::type_error("unsupported operand type(s) for +: 'int' and 'str'"))
    );
    assert_eq!(raised_exception(binary(Value::None, BinaryOperator::Multiply, Value::Int(2))), "TypeError");
    assert_eq!(
        raised_exception(Value::str("a").evaluate_unary(UnaryOperator::Negative)),
        "TypeError"
    );
}

#[test]
fn sequence_operators() {
    assert_eq!(binary(Value::str("ab"), BinaryOperator::Add, Value::str("cd")), Ok(Value::str("abcd")));
    assert_eq!(binary(Value::Int(3), BinaryOperator::Multiply, Value::str("ab")), Ok(Value::str("ababab")));
    assert_eq!(binary(Value::str("ab"), BinaryOperator::Multiply, Value::Int(-1)), Ok(Value::str("")));

    let joined = binary(Value::list(ints(&[1])), BinaryOperator::Add, Value::list(ints(&[2, 3])))
        .expect("lists should concatenate");
    assert!(joined.py_eq(&Value::list(ints(&[1, 2, 3]))));

    let repeated = binary(Value::tuple(ints(&[0])), BinaryOperator::Multiply, Value::Int(3))
        .expect("tuples should repeat");
    assert_eq!(repeated, Value::tuple(ints(&[0, 0, 0])));

    assert_eq!(
        binary(Value::list(ints(&[1])), BinaryOperator::Multiply, Value::Int(i64::MAX)),
        Err(FoldError::Unrepresentable)
    );
}

#[test]
fn set_algebra() {
    let a = Value::set(ints(&[1, 2, 3])).expect("ints are hashable");
    let b = Value::set(ints(&[2, 3, 4])).expect("ints are hashable");

    let union = binary(a.clone(), BinaryOperator::BitOr, b.clone()).expect("union");
    assert_eq!(union.repr(), "{1, 2, 3, 4}");

    let intersection = binary(a.clone(), BinaryOperator::BitAnd, b.clone()).expect("intersection");
    assert_eq!(intersection.repr(), "{2, 3}");

    let difference = binary(a.clone(), BinaryOperator::Subtract, b.clone()).expect("difference");
    assert_eq!(difference.repr(), "{1}");

    let symmetric = binary(a, BinaryOperator::BitXor, b).expect("symmetric difference");
    assert_eq!(symmetric.repr(), "{1, 4}");
}

#[test]
fn comparisons() {
    assert_eq!(Value::Int(1).compare(CompareOperator::Equal, &Value::Float(1.0)), Ok(true));
    assert_eq!(Value::Bool(true).compare(CompareOperator::Equal, &Value::Int(1)), Ok(true));
    assert_eq!(Value::str("a").compare(CompareOperator::LessThan, &Value::str("b")), Ok(true));
    assert_eq!(
        Value::tuple(ints(&[1, 2])).compare(CompareOperator::LessThan, &Value::tuple(ints(&[1, 3]))),
        Ok(true)
    );
    assert_eq!(
        Value::tuple(ints(&[1])).compare(CompareOperator::LessThan, &Value::tuple(ints(&[1, 0]))),
        Ok(true)
    );
    assert_eq!(Value::Float(f64::NAN).compare(CompareOperator::Equal, &Value::Float(f64::NAN)), Ok(false));
    assert!(Value::Int(1).compare(CompareOperator::LessThan, &Value::str("a")).is_err());
}

#[test]
fn identity_follows_sharing() {
    let list = Value::list(ints(&[1]));
    let alias = list.clone();
    let copy = Value::list(ints(&[1]));

    assert_eq!(list.compare(CompareOperator::Is, &alias), Ok(true));
    assert_eq!(list.compare(CompareOperator::Is, &copy), Ok(false));
    assert_eq!(list.compare(CompareOperator::Equal, &copy), Ok(true));
    assert_eq!(Value::None.compare(CompareOperator::Is, &Value::None), Ok(true));
}

#[test]
fn membership() {
    let range = Value::Range(RangeValue { start: 0, stop: 10, step: 3 });
    assert_eq!(Value::Int(6).compare(CompareOperator::In, &range), Ok(true));
    assert_eq!(Value::Int(7).compare(CompareOperator::In, &range), Ok(false));
    assert_eq!(Value::str("ell").compare(CompareOperator::In, &Value::str("hello")), Ok(true));
    assert_eq!(Value::Int(2).compare(CompareOperator::NotIn, &Value::list(ints(&[1, 2]))), Ok(false));

    let dict = Value::dict(vec![(Value::str("k"), Value::Int(1))]).expect("str keys are hashable");
    assert_eq!(Value::str("k").compare(CompareOperator::In, &dict), Ok(true));
    assert!(Value::Int(1).compare(CompareOperator::In, &Value::str("1")).is_err());
}

#[test]
fn subscripts_and_negative_indexes() {
    let list = Value::list(ints(&[10, 20, 30]));
    assert_eq!(list.subscript(&Value::Int(-1)), Ok(Value::Int(30)));
    assert_eq!(raised_exception(list.subscript(&Value::Int(3))), "IndexError");
    assert_eq!(raised_exception(list.subscript(&Value::str("0"))), "TypeError");

    assert_eq!(Value::str("héllo").subscript(&Value::Int(1)), Ok(Value::str("é")));

    let range = Value::Range(RangeValue { start: 5, stop: 0, step: -2 });
    assert_eq!(range.subscript(&Value::Int(2)), Ok(Value::Int(1)));

    let dict = Value::dict(vec![(Value::Int(1), Value::str("one"))]).expect("int keys are hashable");
    assert_eq!(dict.subscript(&Value::Float(1.0)), Ok(Value::str("one")));
    assert_eq!(raised_exception(dict.subscript(&Value::Int(2))), "KeyError");
    assert_eq!(raised_exception(dict.subscript(&Value::list(Vec::new()))), "TypeError");
}

#[test]
fn slices() {
    let list = Value::list(ints(&[0, 1, 2, 3, 4]));
    let slice = |lower: Option<i64>, upper: Option<i64>, step: Option<i64>| {
        list.slice(
            lower.map(Value::Int).as_ref(),
            upper.map(Value::Int).as_ref(),
            step.map(Value::Int).as_ref(),
        )
        .expect("slice should succeed")
        .repr()
    };

    assert_eq!(slice(Some(1), Some(3), None), "[1, 2]");
    assert_eq!(slice(None, None, Some(2)), "[0, 2, 4]");
    assert_eq!(slice(None, None, Some(-1)), "[4, 3, 2, 1, 0]");
    assert_eq!(slice(Some(-2), None, None), "[3, 4]");
    assert_eq!(slice(Some(10), Some(20), None), "[]");

    assert_eq!(
        Value::str("hello").slice(Some(&Value::Int(1)), Some(&Value::Int(4)), None),
        Ok(Value::str("ell"))
    );
    assert_eq!(
        raised_exception(list.slice(None, None, Some(&Value::Int(0)))),
        "ValueError"
    );
}

#[test]
fn range_lengths() {
    assert_eq!(RangeValue { start: 0, stop: 10, step: 3 }.len(), 4);
    assert_eq!(RangeValue { start: 10, stop: 0, step: -3 }.len(), 4);
    assert_eq!(RangeValue { start: 5, stop: 5, step: 1 }.len(), 0);
    assert_eq!(RangeValue { start: 0, stop: 10, step: -1 }.len(), 0);
}

#[test]
fn attributes() {
    let range = Value::Range(RangeValue { start: 1, stop: 9, step: 2 });
    assert_eq!(range.get_attribute("step"), Ok(Value::Int(2)));
    assert_eq!(raised_exception(Value::Int(1).get_attribute("real")), "AttributeError");
}
