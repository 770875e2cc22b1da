use crate::compiler_frontend::syntax::ast_nodes::{BinaryOperator, CompareOperator};
use crate::compiler_frontend::values::value::{FoldError, RangeValue, Value, dict_insert, dict_lookup};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    // Pure, evaluated eagerly while transforming
    Range,
    Reversed,
    Len,
    Abs,
    Min,
    Max,
    Sum,
    Sorted,
    List,
    Tuple,
    Set,
    Str,
    Int,
    Float,
    Bool,
    Enumerate,
    Zip,
    All,
    Any,

    // Runtime only
    Print,
    Object,
    Exception(&'static str),
}

const EXCEPTION_NAMES: [&str; 18] = [
    "BaseException",
    "Exception",
    "ArithmeticError",
    "LookupError",
    "ValueError",
    "TypeError",
    "KeyError",
    "IndexError",
    "ZeroDivisionError",
    "OverflowError",
    "RuntimeError",
    "RecursionError",
    "AssertionError",
    "NameError",
    "AttributeError",
    "StopIteration",
    "NotImplementedError",
    "UnboundLocalError",
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        let builtin = match name {
            "range" => Builtin::Range,
            "reversed" => Builtin::Reversed,
            "len" => Builtin::Len,
            "abs" => Builtin::Abs,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "sum" => Builtin::Sum,
            "sorted" => Builtin::Sorted,
            "list" => Builtin::List,
            "tuple" => Builtin::Tuple,
            "set" => Builtin::Set,
            "str" => Builtin::Str,
            "int" => Builtin::Int,
            "float" => Builtin::Float,
            "bool" => Builtin::Bool,
            "enumerate" => Builtin::Enumerate,
            "zip" => Builtin::Zip,
            "all" => Builtin::All,
            "any" => Builtin::Any,
            "print" => Builtin::Print,
            "object" => Builtin::Object,
            _ => {
                let exception = EXCEPTION_NAMES.into_iter().find(|exception| *exception == name)?;
                Builtin::Exception(exception)
            }
        };

        Some(builtin)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Range => "range",
            Builtin::Reversed => "reversed",
            Builtin::Len => "len",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Sorted => "sorted",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Set => "set",
            Builtin::Str => "str",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::Enumerate => "enumerate",
            Builtin::Zip => "zip",
            Builtin::All => "all",
            Builtin::Any => "any",
            Builtin::Print => "print",
            Builtin::Object => "object",
            Builtin::Exception(name) => name,
        }
    }

    /// Side effect free builtins that static resolution may call
    pub fn is_pure(&self) -> bool {
        !matches!(self, Builtin::Print | Builtin::Object | Builtin::Exception(_))
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, Builtin::Exception(_))
    }

    pub fn repr(&self) -> String {
        match self {
            Builtin::Exception(name) => format!("<class '{name}'>"),
            Builtin::List
            | Builtin::Tuple
            | Builtin::Set
            | Builtin::Str
            | Builtin::Int
            | Builtin::Float
            | Builtin::Bool
            | Builtin::Range
            | Builtin::Reversed
            | Builtin::Enumerate
            | Builtin::Zip
            | Builtin::Object => format!("<class '{}'>", self.name()),
            _ => format!("<built-in function {}>", self.name()),
        }
    }

    pub fn call(&self, args: &[Value], keywords: &[(String, Value)]) -> Result<Value, FoldError> {
        call_builtin(*self, args, keywords)
    }
}

/// Whether an `except` clause naming `handler` catches an exception of class `raised`
pub fn exception_matches(raised: &str, handler: &str) -> bool {
    if raised == handler || handler == "BaseException" {
        return true;
    }

    match handler {
        "Exception" => raised != "BaseException",
        "ArithmeticError" => matches!(raised, "ZeroDivisionError" | "OverflowError"),
        "LookupError" => matches!(raised, "KeyError" | "IndexError"),
        "NameError" => raised == "UnboundLocalError",
        "RuntimeError" => matches!(raised, "NotImplementedError" | "RecursionError"),
        _ => false,
    }
}

pub fn new_exception(class_name: &str, args: Vec<Value>) -> Value {
    let mut attrs = FxHashMap::default();
    attrs.insert("args".to_owned(), Value::tuple(args));
    Value::new_object(class_name, attrs)
}

pub fn call_builtin(
    builtin: Builtin,
    args: &[Value],
    keywords: &[(String, Value)],
) -> Result<Value, FoldError> {
    let accepted: &[&str] = match builtin {
        Builtin::Min | Builtin::Max => &["default"],
        Builtin::Sum => &["start"],
        Builtin::Sorted => &["reverse"],
        Builtin::Enumerate => &["start"],
        Builtin::Print => &["sep", "end"],
        _ => &[],
    };
    for (name, _) in keywords {
        if !accepted.contains(&name.as_str()) {
            return Err(FoldError::type_error(format!(
                "{}() got an unexpected keyword argument '{name}'",
                builtin.name()
            )));
        }
    }
    let keyword = |name: &str| {
        keywords
            .iter()
            .find(|(keyword, _)| keyword == name)
            .map(|(_, value)| value.clone())
    };

    match builtin {
        Builtin::Range => {
            let bounds = args
                .iter()
                .map(|arg| {
                    arg.as_int().ok_or_else(|| {
                        FoldError::type_error(format!(
                            "'{}' object cannot be interpreted as an integer",
                            arg.type_name()
                        ))
                    })
                })
                .collect::<Result<Vec<i64>, FoldError>>()?;

            let (start, stop, step) = match bounds.as_slice() {
                [stop] => (0, *stop, 1),
                [start, stop] => (*start, *stop, 1),
                [start, stop, step] => (*start, *stop, *step),
                _ => return Err(arity_error(builtin, "1 to 3", args.len())),
            };
            if step == 0 {
                return Err(FoldError::value_error("range() arg 3 must not be zero"));
            }

            Ok(Value::Range(RangeValue { start, stop, step }))
        }

        Builtin::Reversed => {
            let [sequence] = args else {
                return Err(arity_error(builtin, "1", args.len()));
            };
            match sequence {
                Value::List(_) | Value::Tuple(_) | Value::Str(_) | Value::Range(_) => {
                    let mut items = sequence.iterate()?;
                    items.reverse();
                    Ok(Value::iterator(items))
                }
                other => Err(FoldError::type_error(format!(
                    "'{}' object is not reversible",
                    other.type_name()
                ))),
            }
        }

        Builtin::Len => {
            let [value] = args else {
                return Err(arity_error(builtin, "1", args.len()));
            };
            Ok(Value::Int(value.length()?))
        }

        Builtin::Abs => match args {
            [Value::Float(value)] => Ok(Value::Float(value.abs())),
            [value] => match value.as_int() {
                Some(int) => Ok(Value::Int(int.checked_abs().ok_or(FoldError::Unrepresentable)?)),
                None => Err(FoldError::type_error(format!(
                    "bad operand type for abs(): '{}'",
                    value.type_name()
                ))),
            },
            _ => Err(arity_error(builtin, "1", args.len())),
        },

        Builtin::Min | Builtin::Max => {
            let candidates = match args {
                [] => return Err(arity_error(builtin, "at least 1", 0)),
                [iterable] => iterable.iterate()?,
                _ => args.to_vec(),
            };

            let wanted = if builtin == Builtin::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best: Option<Value> = None;
            for candidate in candidates {
                best = match best {
                    Some(current)
                        if candidate.order(&current, CompareOperator::LessThan)? != wanted =>
                    {
                        Some(current)
                    }
                    _ => Some(candidate),
                };
            }

            match (best, keyword("default")) {
                (Some(best), _) => Ok(best),
                (None, Some(default)) => Ok(default),
                (None, None) => Err(FoldError::value_error(format!(
                    "{}() arg is an empty sequence",
                    builtin.name()
                ))),
            }
        }

        Builtin::Sum => {
            let (iterable, start) = match args {
                [iterable] => (iterable, keyword("start").unwrap_or(Value::Int(0))),
                [iterable, start] => (iterable, start.clone()),
                _ => return Err(arity_error(builtin, "1 or 2", args.len())),
            };
            if matches!(start, Value::Str(_)) {
                return Err(FoldError::type_error(
                    "sum() can't sum strings [use ''.join(seq) instead]",
                ));
            }

            let mut total = start;
            for value in iterable.iterate()? {
                total = total.evaluate_operator(&value, BinaryOperator::Add)?;
            }
            Ok(total)
        }

        Builtin::Sorted => {
            let [iterable] = args else {
                return Err(arity_error(builtin, "1", args.len()));
            };
            let mut items = iterable.iterate()?;
            sort_values(&mut items)?;
            if keyword("reverse").is_some_and(|reverse| reverse.is_truthy()) {
                items.reverse();
            }
            Ok(Value::list(items))
        }

        Builtin::List => Ok(Value::list(single_iterable(builtin, args)?)),
        Builtin::Tuple => Ok(Value::tuple(single_iterable(builtin, args)?)),
        Builtin::Set => Value::set(single_iterable(builtin, args)?),

        Builtin::Str => match args {
            [] => Ok(Value::str("")),
            [value] => Ok(Value::Str(value.display_str())),
            _ => Err(arity_error(builtin, "at most 1", args.len())),
        },

        Builtin::Int => match args {
            [] => Ok(Value::Int(0)),
            [Value::Float(value)] => {
                if value.is_nan() {
                    return Err(FoldError::value_error("cannot convert float NaN to integer"));
                }
                if value.is_infinite() {
                    return Err(FoldError::raised(
                        "OverflowError",
                        "cannot convert float infinity to integer",
                    ));
                }
                let truncated = value.trunc();
                if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                    return Err(FoldError::Unrepresentable);
                }
                Ok(Value::Int(truncated as i64))
            }
            [Value::Str(text)] => {
                let cleaned = text.trim().replace('_', "");
                cleaned.parse::<i64>().map(Value::Int).map_err(|_| {
                    FoldError::value_error(format!(
                        "invalid literal for int() with base 10: {}",
                        Value::str(text).repr()
                    ))
                })
            }
            [value] => value.as_int().map(Value::Int).ok_or_else(|| {
                FoldError::type_error(format!(
                    "int() argument must be a string or a number, not '{}'",
                    value.type_name()
                ))
            }),
            _ => Err(arity_error(builtin, "at most 1", args.len())),
        },

        Builtin::Float => match args {
            [] => Ok(Value::Float(0.0)),
            [Value::Str(text)] => {
                let cleaned = text.trim().to_lowercase();
                let parsed = match cleaned.as_str() {
                    "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
                    "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                    "nan" | "+nan" | "-nan" => Some(f64::NAN),
                    _ => cleaned.replace('_', "").parse::<f64>().ok(),
                };
                parsed.map(Value::Float).ok_or_else(|| {
                    FoldError::value_error(format!(
                        "could not convert string to float: {}",
                        Value::str(text).repr()
                    ))
                })
            }
            [value] => value.as_number().map(Value::Float).ok_or_else(|| {
                FoldError::type_error(format!(
                    "float() argument must be a string or a number, not '{}'",
                    value.type_name()
                ))
            }),
            _ => Err(arity_error(builtin, "at most 1", args.len())),
        },

        Builtin::Bool => match args {
            [] => Ok(Value::Bool(false)),
            [value] => Ok(Value::Bool(value.is_truthy())),
            _ => Err(arity_error(builtin, "at most 1", args.len())),
        },

        Builtin::Enumerate => {
            let (iterable, start) = match args {
                [iterable] => (iterable, keyword("start").unwrap_or(Value::Int(0))),
                [iterable, start] => (iterable, start.clone()),
                _ => return Err(arity_error(builtin, "1 or 2", args.len())),
            };
            let Some(start) = start.as_int() else {
                return Err(FoldError::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    start.type_name()
                )));
            };

            let mut items = Vec::new();
            for (offset, value) in iterable.iterate()?.into_iter().enumerate() {
                let offset = i64::try_from(offset).map_err(|_| FoldError::Unrepresentable)?;
                let counter = start.checked_add(offset).ok_or(FoldError::Unrepresentable)?;
                items.push(Value::tuple(vec![Value::Int(counter), value]));
            }
            Ok(Value::iterator(items))
        }

        Builtin::Zip => {
            let columns = args
                .iter()
                .map(Value::iterate)
                .collect::<Result<Vec<Vec<Value>>, FoldError>>()?;
            let length = columns.iter().map(Vec::len).min().unwrap_or(0);

            let items = (0..length)
                .map(|row| Value::tuple(columns.iter().map(|column| column[row].clone()).collect()))
                .collect();
            Ok(Value::iterator(items))
        }

        Builtin::All | Builtin::Any => {
            let [iterable] = args else {
                return Err(arity_error(builtin, "1", args.len()));
            };
            let items = iterable.iterate()?;
            if builtin == Builtin::All {
                Ok(Value::Bool(items.iter().all(Value::is_truthy)))
            } else {
                Ok(Value::Bool(items.iter().any(Value::is_truthy)))
            }
        }

        Builtin::Print => {
            let separator = match keyword("sep") {
                None | Some(Value::None) => " ".to_owned(),
                Some(value) => value.display_str(),
            };
            let end = match keyword("end") {
                None | Some(Value::None) => "\n".to_owned(),
                Some(value) => value.display_str(),
            };

            let line = args
                .iter()
                .map(Value::display_str)
                .collect::<Vec<String>>()
                .join(&separator);
            print!("{line}{end}");
            Ok(Value::None)
        }

        Builtin::Object => {
            if !args.is_empty() {
                return Err(FoldError::type_error("object() takes no arguments"));
            }
            Ok(Value::new_object("object", FxHashMap::default()))
        }

        Builtin::Exception(name) => Ok(new_exception(name, args.to_vec())),
    }
}

/// Calls a method on a runtime value. Mutating methods change the receiver in place.
pub fn call_method(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, FoldError> {
    let no_method = || {
        FoldError::raised(
            "AttributeError",
            format!("'{}' object has no attribute '{method}'", receiver.type_name()),
        )
    };

    match receiver {
        Value::List(elements) => match (method, args) {
            ("append", [value]) => {
                elements.borrow_mut().push(value.clone());
                Ok(Value::None)
            }
            ("extend", [iterable]) => {
                let items = iterable.iterate()?;
                elements.borrow_mut().extend(items);
                Ok(Value::None)
            }
            ("insert", [index, value]) => {
                let mut elements = elements.borrow_mut();
                let length = i64::try_from(elements.len()).map_err(|_| FoldError::Unrepresentable)?;
                let index = index.as_int().ok_or_else(|| {
                    FoldError::type_error("list indices must be integers")
                })?;
                let position = if index < 0 { (index + length).max(0) } else { index.min(length) };
                elements.insert(position as usize, value.clone());
                Ok(Value::None)
            }
            ("pop", []) => elements
                .borrow_mut()
                .pop()
                .ok_or_else(|| FoldError::raised("IndexError", "pop from empty list")),
            ("pop", [index]) => {
                let removed = receiver.subscript(index)?;
                let length = receiver.length()?;
                let index = index.as_int().unwrap_or(0);
                let position = if index < 0 { index + length } else { index };
                elements.borrow_mut().remove(position as usize);
                Ok(removed)
            }
            ("index", [value]) => elements
                .borrow()
                .iter()
                .position(|element| element.py_eq(value))
                .map(|position| Value::Int(position as i64))
                .ok_or_else(|| FoldError::value_error(format!("{} is not in list", value.repr()))),
            ("count", [value]) => Ok(Value::Int(
                elements.borrow().iter().filter(|element| element.py_eq(value)).count() as i64,
            )),
            ("copy", []) => Ok(Value::list(elements.borrow().clone())),
            ("reverse", []) => {
                elements.borrow_mut().reverse();
                Ok(Value::None)
            }
            ("sort", []) => {
                let mut items = elements.borrow().clone();
                sort_values(&mut items)?;
                *elements.borrow_mut() = items;
                Ok(Value::None)
            }
            ("clear", []) => {
                elements.borrow_mut().clear();
                Ok(Value::None)
            }
            _ => Err(no_method()),
        },

        Value::Dict(entries) => match (method, args) {
            ("keys", []) => Ok(Value::list(
                entries.borrow().iter().map(|(key, _)| key.clone()).collect(),
            )),
            ("values", []) => Ok(Value::list(
                entries.borrow().iter().map(|(_, value)| value.clone()).collect(),
            )),
            ("items", []) => Ok(Value::list(
                entries
                    .borrow()
                    .iter()
                    .map(|(key, value)| Value::tuple(vec![key.clone(), value.clone()]))
                    .collect(),
            )),
            ("get", [key]) => Ok(dict_lookup(&entries.borrow(), key).unwrap_or(Value::None)),
            ("get", [key, default]) => {
                Ok(dict_lookup(&entries.borrow(), key).unwrap_or_else(|| default.clone()))
            }
            ("copy", []) => Value::dict(entries.borrow().clone()),
            ("pop", [key, rest @ ..]) if rest.len() <= 1 => {
                let mut entries = entries.borrow_mut();
                match entries.iter().position(|(existing, _)| existing.py_eq(key)) {
                    Some(position) => Ok(entries.remove(position).1),
                    None => rest
                        .first()
                        .cloned()
                        .ok_or_else(|| FoldError::raised("KeyError", key.repr())),
                }
            }
            ("update", [Value::Dict(other)]) => {
                let other = other.borrow().clone();
                let mut entries = entries.borrow_mut();
                for (key, value) in other {
                    dict_insert(&mut entries, key, value)?;
                }
                Ok(Value::None)
            }
            ("setdefault", [key, rest @ ..]) if rest.len() <= 1 => {
                let mut entries = entries.borrow_mut();
                if let Some(existing) = dict_lookup(&entries, key) {
                    return Ok(existing);
                }
                let default = rest.first().cloned().unwrap_or(Value::None);
                dict_insert(&mut entries, key.clone(), default.clone())?;
                Ok(default)
            }
            _ => Err(no_method()),
        },

        Value::Set(elements) => match (method, args) {
            ("add", [value]) => {
                value.check_hashable()?;
                let mut elements = elements.borrow_mut();
                if !elements.iter().any(|element| element.py_eq(value)) {
                    elements.push(value.clone());
                }
                Ok(Value::None)
            }
            ("discard", [value]) => {
                elements.borrow_mut().retain(|element| !element.py_eq(value));
                Ok(Value::None)
            }
            _ => Err(no_method()),
        },

        Value::Str(text) => string_method(text, method, args).unwrap_or_else(|| Err(no_method())),

        _ => Err(no_method()),
    }
}

fn string_method(text: &str, method: &str, args: &[Value]) -> Option<Result<Value, FoldError>> {
    let result = match (method, args) {
        ("upper", []) => Ok(Value::Str(text.to_uppercase())),
        ("lower", []) => Ok(Value::Str(text.to_lowercase())),
        ("strip", []) => Ok(Value::str(text.trim())),
        ("lstrip", []) => Ok(Value::str(text.trim_start())),
        ("rstrip", []) => Ok(Value::str(text.trim_end())),
        ("startswith", [Value::Str(prefix)]) => Ok(Value::Bool(text.starts_with(prefix.as_str()))),
        ("endswith", [Value::Str(suffix)]) => Ok(Value::Bool(text.ends_with(suffix.as_str()))),
        ("replace", [Value::Str(from), Value::Str(to)]) => {
            Ok(Value::Str(text.replace(from.as_str(), to)))
        }
        ("split", []) => Ok(Value::list(text.split_whitespace().map(Value::str).collect())),
        ("split", [Value::Str(separator)]) => {
            if separator.is_empty() {
                Err(FoldError::value_error("empty separator"))
            } else {
                Ok(Value::list(text.split(separator.as_str()).map(Value::str).collect()))
            }
        }
        ("join", [iterable]) => iterable.iterate().and_then(|items| {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(part) => parts.push(part),
                    other => {
                        return Err(FoldError::type_error(format!(
                            "sequence item: expected str instance, {} found",
                            other.type_name()
                        )));
                    }
                }
            }
            Ok(Value::Str(parts.join(text)))
        }),
        _ => return None,
    };

    Some(result)
}

fn single_iterable(builtin: Builtin, args: &[Value]) -> Result<Vec<Value>, FoldError> {
    match args {
        [] => Ok(Vec::new()),
        [iterable] => iterable.iterate(),
        _ => Err(arity_error(builtin, "at most 1", args.len())),
    }
}

// Stable sort that stops at the first pair of values that can't be ordered
fn sort_values(items: &mut [Value]) -> Result<(), FoldError> {
    let mut failure: Option<FoldError> = None;
    items.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        match a.order(b, CompareOperator::LessThan) {
            Ok(ordering) => ordering,
            Err(error) => {
                failure = Some(error);
                Ordering::Equal
            }
        }
    });

    match failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn arity_error(builtin: Builtin, expected: &str, found: usize) -> FoldError {
    FoldError::type_error(format!(
        "{}() expected {expected} arguments, got {found}",
        builtin.name()
    ))
}

#[cfg(test)]
#[path = "tests/builtins_tests.rs"]
mod builtins_tests;
