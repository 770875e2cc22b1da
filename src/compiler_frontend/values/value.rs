use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::syntax::ast_nodes::{Constant, Expr};
use crate::compiler_frontend::syntax::render_source::{float_repr, string_repr};
use crate::compiler_frontend::values::builtins::Builtin;
use crate::projects::settings::MAX_MATERIALIZED_LENGTH;
use crate::runtime::function::Function;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Why a constant fold or a runtime operation failed
#[derive(Debug, Clone, PartialEq)]
pub enum FoldError {
    /// The operation raises an exception (type mismatch, division by zero, bad index).
    /// Folding surfaces these as warnings, the runtime raises them.
    Raised {
        exception: &'static str,
        msg: String,
    },

    /// The result exists but can't be held by the value domain (64-bit overflow, huge ranges)
    Unrepresentable,
}

impl FoldError {
    pub fn raised(exception: &'static str, msg: impl Into<String>) -> FoldError {
        FoldError::Raised {
            exception,
            msg: msg.into(),
        }
    }

    pub fn type_error(msg: impl Into<String>) -> FoldError {
        FoldError::raised("TypeError", msg)
    }

    pub fn value_error(msg: impl Into<String>) -> FoldError {
        FoldError::raised("ValueError", msg)
    }

    pub fn into_runtime_error(self) -> CompilerError {
        match self {
            FoldError::Raised { exception, msg } => CompilerError::new_runtime_error(exception, msg),
            FoldError::Unrepresentable => CompilerError::new_runtime_error(
                "OverflowError",
                "result does not fit in a 64-bit value",
            ),
        }
    }
}

impl fmt::Display for FoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoldError::Raised { exception, msg } => write!(f, "{exception}: {msg}"),
            FoldError::Unrepresentable => write!(f, "result does not fit in a 64-bit value"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn len(&self) -> i64 {
        let span = if self.step > 0 {
            self.stop.saturating_sub(self.start)
        } else {
            self.start.saturating_sub(self.stop)
        };

        if span <= 0 {
            return 0;
        }

        let step = self.step.saturating_abs();
        (span - 1) / step + 1
    }

    pub fn get(&self, index: i64) -> i64 {
        self.start + index * self.step
    }

    pub fn contains(&self, value: i64) -> bool {
        let in_bounds = if self.step > 0 {
            value >= self.start && value < self.stop
        } else {
            value <= self.start && value > self.stop
        };

        in_bounds && (value - self.start) % self.step == 0
    }
}

/// A single pass iterator, e.g. the result of reversed() or zip().
/// The items are produced eagerly; iteration consumes them.
#[derive(Debug)]
pub struct IteratorState {
    pub items: Vec<Value>,
    pub position: usize,
}

/// An opaque instance. Exceptions are objects with an 'args' attribute.
#[derive(Debug)]
pub struct Object {
    pub class_name: String,
    pub attrs: RefCell<FxHashMap<String, Value>>,
}

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Rc<Vec<Value>>),

    // Mutable containers are shared by reference like the language they model.
    // Static evaluation never mutates them in place, it builds new ones.
    List(Rc<RefCell<Vec<Value>>>),
    Set(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Vec<(Value, Value)>>>),

    Range(RangeValue),
    Iterator(Rc<RefCell<IteratorState>>),
    Builtin(Builtin),
    Function(Rc<Function>),
    Object(Rc<Object>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

// Structural equality used to compare what the transformer knows about a name.
// Mutable containers and objects are only equal to themselves.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    pub fn str(value: &str) -> Value {
        Value::Str(value.to_owned())
    }

    pub fn tuple(elements: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(elements))
    }

    pub fn list(elements: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(elements)))
    }

    pub fn iterator(items: Vec<Value>) -> Value {
        Value::Iterator(Rc::new(RefCell::new(IteratorState { items, position: 0 })))
    }

    /// Builds a set, dropping duplicates in first-seen order
    pub fn set(elements: Vec<Value>) -> Result<Value, FoldError> {
        let mut unique: Vec<Value> = Vec::with_capacity(elements.len());
        for element in elements {
            element.check_hashable()?;
            if !unique.iter().any(|existing| existing.py_eq(&element)) {
                unique.push(element);
            }
        }
        Ok(Value::Set(Rc::new(RefCell::new(unique))))
    }

    /// Builds a dict, later keys overwrite earlier ones in place
    pub fn dict(entries: Vec<(Value, Value)>) -> Result<Value, FoldError> {
        let mut unique: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            dict_insert(&mut unique, key, value)?;
        }
        Ok(Value::Dict(Rc::new(RefCell::new(unique))))
    }

    pub fn new_object(class_name: &str, attrs: FxHashMap<String, Value>) -> Value {
        Value::Object(Rc::new(Object {
            class_name: class_name.to_owned(),
            attrs: RefCell::new(attrs),
        }))
    }

    pub fn from_constant(constant: &Constant) -> Value {
        match constant {
            Constant::None => Value::None,
            Constant::Bool(value) => Value::Bool(*value),
            Constant::Int(value) => Value::Int(*value),
            Constant::Float(value) => Value::Float(*value),
            Constant::Str(value) => Value::Str(value.to_owned()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
            Value::Range(_) => "range",
            Value::Iterator(_) => "iterator",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Function(_) => "function",
            Value::Object(object) => &object.class_name,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Str(value) => !value.is_empty(),
            Value::Tuple(elements) => !elements.is_empty(),
            Value::List(elements) | Value::Set(elements) => !elements.borrow().is_empty(),
            Value::Dict(entries) => !entries.borrow().is_empty(),
            Value::Range(range) => range.len() > 0,
            _ => true,
        }
    }

    /// Numeric view of bools, ints and floats
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Bool(value) => Some(f64::from(u8::from(*value))),
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer view of bools and ints
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Bool(value) => Some(i64::from(*value)),
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Equality with the source language's semantics (1 == 1.0 == True)
    pub fn py_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => sequences_equal(a, b),
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || sequences_equal(&a.borrow(), &b.borrow())
            }
            (Value::Set(a), Value::Set(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.py_eq(y)))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.iter()
                            .any(|(other_key, other_value)| key.py_eq(other_key) && value.py_eq(other_value))
                    })
            }
            (Value::Range(a), Value::Range(b)) => {
                let (len_a, len_b) = (a.len(), b.len());
                len_a == len_b
                    && (len_a == 0 || (a.start == b.start && (len_a == 1 || a.step == b.step)))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => self.is_identical(other),
            },
        }
    }

    /// Identity, as tested by 'is'.
    /// Immutable scalars with equal values count as the same object.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Float(_), Value::Float(_)) | (Value::Range(_), Value::Range(_)) => false,
            _ => self == other,
        }
    }

    pub fn check_hashable(&self) -> Result<(), FoldError> {
        match self {
            Value::List(_) | Value::Set(_) | Value::Dict(_) => Err(FoldError::type_error(
                format!("unhashable type: '{}'", self.type_name()),
            )),
            Value::Tuple(elements) => {
                for element in elements.iter() {
                    element.check_hashable()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Values that can be written back into source as a literal
    pub fn is_literal_expressible(&self) -> bool {
        match self {
            Value::None | Value::Bool(_) | Value::Int(_) | Value::Str(_) => true,
            Value::Float(value) => value.is_finite(),
            Value::Tuple(elements) => elements.iter().all(Value::is_literal_expressible),
            Value::List(elements) | Value::Set(elements) => {
                elements.borrow().iter().all(Value::is_literal_expressible)
            }
            Value::Dict(entries) => entries
                .borrow()
                .iter()
                .all(|(key, value)| key.is_literal_expressible() && value.is_literal_expressible()),
            _ => false,
        }
    }

    /// Values with no identity worth preserving.
    /// Copying them into source can't be observed by the program.
    pub fn is_immutable(&self) -> bool {
        match self {
            Value::None
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Str(_)
            | Value::Range(_)
            | Value::Builtin(_) => true,
            Value::Tuple(elements) => elements.iter().all(Value::is_immutable),
            _ => false,
        }
    }

    /// Mutable containers, whose contents can change behind a name
    pub fn is_mutable_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Set(_) | Value::Dict(_))
    }

    /// The literal source form of this value, if it has one
    pub fn literal_expr(&self) -> Option<Expr> {
        let expr = match self {
            Value::None => Expr::Constant(Constant::None),
            Value::Bool(value) => Expr::Constant(Constant::Bool(*value)),
            Value::Int(value) => Expr::Constant(Constant::Int(*value)),
            Value::Float(value) if value.is_finite() => Expr::Constant(Constant::Float(*value)),
            Value::Str(value) => Expr::Constant(Constant::Str(value.to_owned())),
            Value::Tuple(elements) => Expr::Tuple(literal_elements(elements)?),
            Value::List(elements) => Expr::List(literal_elements(&elements.borrow())?),
            Value::Set(elements) => Expr::Set(literal_elements(&elements.borrow())?),
            Value::Dict(entries) => {
                let mut literal_entries = Vec::with_capacity(entries.borrow().len());
                for (key, value) in entries.borrow().iter() {
                    literal_entries.push((Some(key.literal_expr()?), value.literal_expr()?));
                }
                Expr::Dict(literal_entries)
            }
            _ => return None,
        };

        Some(expr)
    }

    /// All elements produced by iterating this value.
    /// Iterators are consumed.
    pub fn iterate(&self) -> Result<Vec<Value>, FoldError> {
        match self {
            Value::Tuple(elements) => Ok(elements.as_ref().clone()),
            Value::List(elements) | Value::Set(elements) => Ok(elements.borrow().clone()),
            Value::Dict(entries) => Ok(entries.borrow().iter().map(|(key, _)| key.clone()).collect()),
            Value::Str(value) => Ok(value.chars().map(|ch| Value::Str(ch.to_string())).collect()),
            Value::Range(range) => {
                let length = range.len();
                if length > MAX_MATERIALIZED_LENGTH {
                    return Err(FoldError::Unrepresentable);
                }
                Ok((0..length).map(|index| Value::Int(range.get(index))).collect())
            }
            Value::Iterator(state) => {
                let mut state = state.borrow_mut();
                let remaining = state.items[state.position..].to_vec();
                state.position = state.items.len();
                Ok(remaining)
            }
            other => Err(FoldError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    pub fn length(&self) -> Result<i64, FoldError> {
        let length = match self {
            Value::Str(value) => value.chars().count(),
            Value::Tuple(elements) => elements.len(),
            Value::List(elements) | Value::Set(elements) => elements.borrow().len(),
            Value::Dict(entries) => entries.borrow().len(),
            Value::Range(range) => return Ok(range.len()),
            other => {
                return Err(FoldError::type_error(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                )));
            }
        };

        i64::try_from(length).map_err(|_| FoldError::Unrepresentable)
    }

    /// str(value)
    pub fn display_str(&self) -> String {
        match self {
            Value::Str(value) => value.to_owned(),
            Value::Object(object) if is_exception_object(object) => {
                let args = object.attrs.borrow().get("args").cloned();
                match args {
                    Some(Value::Tuple(args)) => match args.as_slice() {
                        [] => String::new(),
                        [single] => single.display_str(),
                        _ => Value::Tuple(args).repr(),
                    },
                    _ => String::new(),
                }
            }
            other => other.repr(),
        }
    }

    /// repr(value)
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_owned(),
            Value::Bool(true) => "True".to_owned(),
            Value::Bool(false) => "False".to_owned(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => float_repr(*value),
            Value::Str(value) => string_repr(value),
            Value::Tuple(elements) => match elements.as_slice() {
                [single] => format!("({},)", single.repr()),
                _ => format!("({})", join_reprs(elements)),
            },
            Value::List(elements) => format!("[{}]", join_reprs(&elements.borrow())),
            Value::Set(elements) => {
                let elements = elements.borrow();
                if elements.is_empty() {
                    return "set()".to_owned();
                }
                format!("{{{}}}", join_reprs(&elements))
            }
            Value::Dict(entries) => {
                let rendered: Vec<String> = entries
                    .borrow()
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.repr(), value.repr()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Value::Range(range) => {
                if range.step == 1 {
                    format!("range({}, {})", range.start, range.stop)
                } else {
                    format!("range({}, {}, {})", range.start, range.stop, range.step)
                }
            }
            Value::Iterator(_) => "<iterator object>".to_owned(),
            Value::Builtin(builtin) => builtin.repr(),
            Value::Function(function) => format!("<function {}>", function.name()),
            Value::Object(object) => {
                if is_exception_object(object) {
                    let args = object.attrs.borrow().get("args").cloned();
                    let rendered_args = match args {
                        Some(Value::Tuple(args)) => join_reprs(&args),
                        _ => String::new(),
                    };
                    return format!("{}({rendered_args})", object.class_name);
                }
                format!("<{} object>", object.class_name)
            }
        }
    }
}

fn is_exception_object(object: &Object) -> bool {
    Builtin::from_name(&object.class_name).is_some_and(|builtin| builtin.is_exception())
}

fn join_reprs(elements: &[Value]) -> String {
    elements
        .iter()
        .map(Value::repr)
        .collect::<Vec<String>>()
        .join(", ")
}

fn literal_elements(elements: &[Value]) -> Option<Vec<Expr>> {
    elements.iter().map(Value::literal_expr).collect()
}

fn sequences_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y))
}

/// Inserts or overwrites a key, keeping first insertion order
pub fn dict_insert(
    entries: &mut Vec<(Value, Value)>,
    key: Value,
    value: Value,
) -> Result<(), FoldError> {
    key.check_hashable()?;

    match entries.iter_mut().find(|(existing, _)| existing.py_eq(&key)) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }

    Ok(())
}

pub fn dict_lookup(entries: &[(Value, Value)], key: &Value) -> Option<Value> {
    entries
        .iter()
        .find(|(existing, _)| existing.py_eq(key))
        .map(|(_, value)| value.clone())
}
