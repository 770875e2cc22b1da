use super::*;

fn call(name: &str, args: Vec<Value>) -> Result<Value, FoldError> {
    let builtin = Builtin::from_name(name).expect("builtin should exist");
    builtin.call(&args, &[])
}

fn repr_of(name: &str, args: Vec<Value>) -> String {
    call(name, args).expect("builtin call should succeed").repr()
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().map(|value| Value::Int(*value)).collect())
}

#[test]
fn names_round_trip() {
    for name in ["range", "len", "sorted", "zip", "print", "object", "ValueError"] {
        let builtin = Builtin::from_name(name).expect("builtin should exist");
        assert_eq!(builtin.name(), name);
    }
    assert_eq!(Builtin::from_name("open"), None);
}

#[test]
fn purity() {
    assert!(Builtin::Len.is_pure());
    assert!(Builtin::Range.is_pure());
    assert!(!Builtin::Print.is_pure());
    assert!(!Builtin::Object.is_pure());
    assert!(!Builtin::Exception("KeyError").is_pure());
}

#[test]
fn reprs() {
    assert_eq!(Builtin::Len.repr(), "<built-in function len>");
    assert_eq!(Builtin::List.repr(), "<class 'list'>");
    assert_eq!(Builtin::Exception("KeyError").repr(), "<class 'KeyError'>");
}

#[test]
fn ranges() {
    assert_eq!(repr_of("range", vec![Value::Int(3)]), "range(0, 3)");
    assert_eq!(
        repr_of("range", vec![Value::Int(5), Value::Int(0), Value::Int(-2)]),
        "range(5, 0, -2)"
    );
    assert!(call("range", vec![Value::Int(0), Value::Int(1), Value::Int(0)]).is_err());
    assert!(call("range", vec![Value::Float(1.0)]).is_err());
    assert!(call("range", Vec::new()).is_err());
}

#[test]
fn conversions() {
    assert_eq!(call("int", vec![Value::Float(-2.7)]), Ok(Value::Int(-2)));
    assert_eq!(call("int", vec![Value::str(" 1_000 ")]), Ok(Value::Int(1000)));
    assert!(call("int", vec![Value::str("x")]).is_err());
    assert_eq!(call("float", vec![Value::str("2.5")]), Ok(Value::Float(2.5)));
    assert_eq!(call("float", vec![Value::Int(2)]), Ok(Value::Float(2.0)));
    assert_eq!(call("str", vec![Value::Float(1.0)]), Ok(Value::str("1.0")));
    assert_eq!(call("str", vec![Value::str("raw")]), Ok(Value::str("raw")));
    assert_eq!(call("bool", vec![ints(&[])]), Ok(Value::Bool(false)));
    assert_eq!(repr_of("list", vec![Value::str("ab")]), "['a', 'b']");
    assert_eq!(repr_of("tuple", vec![ints(&[1])]), "(1,)");
    assert_eq!(repr_of("set", vec![ints(&[1, 1, 2])]), "{1, 2}");
}

#[test]
fn aggregates() {
    assert_eq!(call("len", vec![Value::str("héllo")]), Ok(Value::Int(5)));
    assert_eq!(call("sum", vec![ints(&[1, 2, 3])]), Ok(Value::Int(6)));
    assert_eq!(call("sum", vec![ints(&[1, 2]), Value::Int(10)]), Ok(Value::Int(13)));
    assert!(call("sum", vec![ints(&[]), Value::str("")]).is_err());
    assert_eq!(call("min", vec![Value::Int(3), Value::Int(1), Value::Int(2)]), Ok(Value::Int(1)));
    assert_eq!(call("max", vec![ints(&[3, 9, 2])]), Ok(Value::Int(9)));
    assert!(call("max", vec![ints(&[])]).is_err());
    assert_eq!(call("abs", vec![Value::Int(-4)]), Ok(Value::Int(4)));
    assert_eq!(call("all", vec![ints(&[1, 2])]), Ok(Value::Bool(true)));
    assert_eq!(call("any", vec![ints(&[0, 0])]), Ok(Value::Bool(false)));
}

#[test]
fn keyword_arguments() {
    let max = Builtin::Max.call(&[ints(&[])], &[("default".to_owned(), Value::Int(0))]);
    assert_eq!(max, Ok(Value::Int(0)));

    let sorted = Builtin::Sorted
        .call(&[ints(&[2, 3, 1])], &[("reverse".to_owned(), Value::Bool(true))])
        .expect("sorted should succeed");
    assert_eq!(sorted.repr(), "[3, 2, 1]");

    let error = Builtin::Len.call(&[ints(&[])], &[("key".to_owned(), Value::None)]);
    assert_eq!(
        error,
        Err(FoldError::type_error("len() got an unexpected keyword argument 'key'"))
    );
}

#[test]
fn sorting_mixed_types_fails() {
    let mixed = Value::list(vec![Value::Int(1), Value::str("a")]);
    assert!(call("sorted", vec![mixed]).is_err());
    assert_eq!(
        repr_of("sorted", vec![Value::list(vec![Value::Float(2.5), Value::Int(1), Value::Bool(true)])]),
        "[1, True, 2.5]"
    );
}

#[test]
fn iterators_are_consumed_once() {
    let zipped = call("zip", vec![ints(&[1, 2, 3]), Value::str("ab")]).expect("zip should succeed");
    assert_eq!(
        Value::list(zipped.iterate().expect("zip is iterable")).repr(),
        "[(1, 'a'), (2, 'b')]"
    );
    assert_eq!(zipped.iterate(), Ok(Vec::new()));

    let reversed = call("reversed", vec![ints(&[1, 2])]).expect("reversed should succeed");
    assert_eq!(Value::list(reversed.iterate().expect("iterable")).repr(), "[2, 1]");

    let enumerated = Builtin::Enumerate
        .call(&[Value::str("xy")], &[("start".to_owned(), Value::Int(1))])
        .expect("enumerate should succeed");
    assert_eq!(
        Value::list(enumerated.iterate().expect("iterable")).repr(),
        "[(1, 'x'), (2, 'y')]"
    );
}

#[test]
fn exceptions_are_objects_with_args() {
    let error = call("ValueError", vec![Value::str("bad")]).expect("exceptions construct");
    assert_eq!(error.type_name(), "ValueError");
    assert_eq!(error.repr(), "ValueError('bad')");
    assert_eq!(error.display_str(), "bad");
    assert_eq!(error.get_attribute("args").map(|args| args.repr()), Ok("('bad',)".to_owned()));
}

#[test]
fn exception_hierarchy() {
    assert!(exception_matches("KeyError", "KeyError"));
    assert!(exception_matches("KeyError", "LookupError"));
    assert!(exception_matches("ZeroDivisionError", "ArithmeticError"));
    assert!(exception_matches("IndexError", "Exception"));
    assert!(exception_matches("IndexError", "BaseException"));
    assert!(!exception_matches("KeyError", "IndexError"));
    assert!(!exception_matches("BaseException", "Exception"));
}

#[test]
fn list_methods_mutate_in_place() {
    let list = ints(&[3, 1]);
    let alias = list.clone();

    call_method(&list, "append", &[Value::Int(2)]).expect("append");
    call_method(&list, "sort", &[]).expect("sort");
    assert_eq!(alias.repr(), "[1, 2, 3]");

    assert_eq!(call_method(&list, "pop", &[Value::Int(0)]), Ok(Value::Int(1)));
    assert_eq!(call_method(&list, "index", &[Value::Int(3)]), Ok(Value::Int(1)));
    assert_eq!(alias.repr(), "[2, 3]");

    let copy = call_method(&list, "copy", &[]).expect("copy");
    call_method(&copy, "clear", &[]).expect("clear");
    assert_eq!(list.repr(), "[2, 3]");
}

#[test]
fn dict_and_string_methods() {
    let dict = Value::dict(vec![(Value::str("a"), Value::Int(1))]).expect("str keys are hashable");
    assert_eq!(call_method(&dict, "get", &[Value::str("b"), Value::Int(0)]), Ok(Value::Int(0)));
    call_method(&dict, "setdefault", &[Value::str("b"), Value::Int(2)]).expect("setdefault");
    assert_eq!(call_method(&dict, "items", &[]).map(|items| items.repr()), Ok("[('a', 1), ('b', 2)]".to_owned()));

    let text = Value::str(" a,b ");
    let parts = call_method(&text, "strip", &[])
        .and_then(|stripped| call_method(&stripped, "split", &[Value::str(",")]))
        .expect("split should succeed");
    assert_eq!(parts.repr(), "['a', 'b']");
    assert_eq!(call_method(&Value::str("-"), "join", &[parts]), Ok(Value::str("a-b")));

    let missing = call_method(&Value::Int(1), "append", &[]);
    assert!(matches!(missing, Err(FoldError::Raised { exception: "AttributeError", .. })));
}
