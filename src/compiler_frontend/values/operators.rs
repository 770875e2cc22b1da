use crate::compiler_frontend::syntax::ast_nodes::{BinaryOperator, CompareOperator, UnaryOperator};
use crate::compiler_frontend::values::value::{FoldError, Value, dict_lookup};
use crate::projects::settings::MAX_MATERIALIZED_LENGTH;
use std::cmp::Ordering;

impl Value {
    // Evaluates a binary operation between two values based on the operator.
    // Shared by constant folding and the runtime so both agree on every result.
    pub fn evaluate_operator(&self, rhs: &Value, op: BinaryOperator) -> Result<Value, FoldError> {
        let result = match (self, rhs) {
            // Integer operations (bools take part as 0 and 1)
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
                let (Some(lhs_val), Some(rhs_val)) = (self.as_int(), rhs.as_int()) else {
                    return Err(unsupported_operands(self, rhs, op));
                };

                // Bitwise operations on two bools stay bools
                if let (Value::Bool(a), Value::Bool(b)) = (self, rhs) {
                    match op {
                        BinaryOperator::BitAnd => return Ok(Value::Bool(a & b)),
                        BinaryOperator::BitOr => return Ok(Value::Bool(a | b)),
                        BinaryOperator::BitXor => return Ok(Value::Bool(a ^ b)),
                        _ => {}
                    }
                }

                integer_operation(lhs_val, rhs_val, op)?
            }

            // Float operations, ints are promoted
            (
                Value::Float(_) | Value::Int(_) | Value::Bool(_),
                Value::Float(_) | Value::Int(_) | Value::Bool(_),
            ) => {
                let (Some(lhs_val), Some(rhs_val)) = (self.as_number(), rhs.as_number()) else {
                    return Err(unsupported_operands(self, rhs, op));
                };
                match float_operation(lhs_val, rhs_val, op) {
                    Some(result) => result?,
                    None => return Err(unsupported_operands(self, rhs, op)),
                }
            }

            // String operations
            (Value::Str(lhs_val), Value::Str(rhs_val)) => match op {
                BinaryOperator::Add => Value::Str(format!("{lhs_val}{rhs_val}")),
                _ => return Err(unsupported_operands(self, rhs, op)),
            },

            (Value::Str(text), Value::Int(_) | Value::Bool(_))
            | (Value::Int(_) | Value::Bool(_), Value::Str(text))
                if op == BinaryOperator::Multiply =>
            {
                let count = repeat_count(self, rhs)?;
                Value::Str(text.repeat(count))
            }

            // Sequence operations
            (Value::List(lhs_val), Value::List(rhs_val)) if op == BinaryOperator::Add => {
                let mut elements = lhs_val.borrow().clone();
                elements.extend(rhs_val.borrow().iter().cloned());
                Value::list(elements)
            }

            (Value::Tuple(lhs_val), Value::Tuple(rhs_val)) if op == BinaryOperator::Add => {
                let mut elements = lhs_val.as_ref().clone();
                elements.extend(rhs_val.iter().cloned());
                Value::tuple(elements)
            }

            (Value::List(elements), Value::Int(_) | Value::Bool(_))
            | (Value::Int(_) | Value::Bool(_), Value::List(elements))
                if op == BinaryOperator::Multiply =>
            {
                let count = repeat_count(self, rhs)?;
                Value::list(repeat_elements(&elements.borrow(), count)?)
            }

            (Value::Tuple(elements), Value::Int(_) | Value::Bool(_))
            | (Value::Int(_) | Value::Bool(_), Value::Tuple(elements))
                if op == BinaryOperator::Multiply =>
            {
                let count = repeat_count(self, rhs)?;
                Value::tuple(repeat_elements(elements, count)?)
            }

            // Set algebra
            (Value::Set(lhs_val), Value::Set(rhs_val)) => {
                let lhs_elements = lhs_val.borrow();
                let rhs_elements = rhs_val.borrow();
                let in_rhs = |value: &Value| rhs_elements.iter().any(|other| other.py_eq(value));
                let in_lhs = |value: &Value| lhs_elements.iter().any(|other| other.py_eq(value));

                let elements: Vec<Value> = match op {
                    BinaryOperator::BitOr => lhs_elements
                        .iter()
                        .chain(rhs_elements.iter())
                        .cloned()
                        .collect(),
                    BinaryOperator::BitAnd => {
                        lhs_elements.iter().filter(|v| in_rhs(v)).cloned().collect()
                    }
                    BinaryOperator::Subtract => {
                        lhs_elements.iter().filter(|v| !in_rhs(v)).cloned().collect()
                    }
                    BinaryOperator::BitXor => lhs_elements
                        .iter()
                        .filter(|v| !in_rhs(v))
                        .chain(rhs_elements.iter().filter(|v| !in_lhs(v)))
                        .cloned()
                        .collect(),
                    _ => return Err(unsupported_operands(self, rhs, op)),
                };

                Value::set(elements)?
            }

            // Any other combination of types
            _ => return Err(unsupported_operands(self, rhs, op)),
        };

        Ok(result)
    }

    pub fn evaluate_unary(&self, op: UnaryOperator) -> Result<Value, FoldError> {
        if op == UnaryOperator::Not {
            return Ok(Value::Bool(!self.is_truthy()));
        }

        let result = match (op, self) {
            (UnaryOperator::Negative, Value::Float(value)) => Value::Float(-value),
            (UnaryOperator::Positive, Value::Float(value)) => Value::Float(*value),
            (_, Value::Int(_) | Value::Bool(_)) => {
                let Some(value) = self.as_int() else {
                    return Err(bad_unary_operand(self, op));
                };
                match op {
                    UnaryOperator::Negative => {
                        Value::Int(value.checked_neg().ok_or(FoldError::Unrepresentable)?)
                    }
                    UnaryOperator::Positive => Value::Int(value),
                    _ => Value::Int(!value),
                }
            }
            _ => return Err(bad_unary_operand(self, op)),
        };

        Ok(result)
    }

    /// One link of a comparison chain
    pub fn compare(&self, op: CompareOperator, rhs: &Value) -> Result<bool, FoldError> {
        let result = match op {
            CompareOperator::Equal => self.py_eq(rhs),
            CompareOperator::NotEqual => !self.py_eq(rhs),
            CompareOperator::Is => self.is_identical(rhs),
            CompareOperator::IsNot => !self.is_identical(rhs),
            CompareOperator::In => rhs.contains(self)?,
            CompareOperator::NotIn => !rhs.contains(self)?,
            CompareOperator::LessThan => self.order(rhs, op)? == Ordering::Less,
            CompareOperator::LessThanOrEqual => self.order(rhs, op)? != Ordering::Greater,
            CompareOperator::GreaterThan => self.order(rhs, op)? == Ordering::Greater,
            CompareOperator::GreaterThanOrEqual => self.order(rhs, op)? != Ordering::Less,
        };

        Ok(result)
    }

    /// Ordering used by <, sorted(), min() and max().
    /// NaN compares as neither smaller nor larger.
    pub fn order(&self, rhs: &Value, op: CompareOperator) -> Result<Ordering, FoldError> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Tuple(a), Value::Tuple(b)) => order_sequences(a, b, op),
            (Value::List(a), Value::List(b)) => order_sequences(&a.borrow(), &b.borrow(), op),
            _ => match (self.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) => Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
                _ => Err(FoldError::type_error(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    op.symbol(),
                    self.type_name(),
                    rhs.type_name()
                ))),
            },
        }
    }

    /// Membership test, `element in self`
    pub fn contains(&self, element: &Value) -> Result<bool, FoldError> {
        match self {
            Value::Str(text) => match element {
                Value::Str(needle) => Ok(text.contains(needle.as_str())),
                other => Err(FoldError::type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    other.type_name()
                ))),
            },
            Value::Tuple(elements) => Ok(elements.iter().any(|value| value.py_eq(element))),
            Value::List(elements) | Value::Set(elements) => {
                Ok(elements.borrow().iter().any(|value| value.py_eq(element)))
            }
            Value::Dict(entries) => Ok(entries.borrow().iter().any(|(key, _)| key.py_eq(element))),
            Value::Range(range) => match element.as_number() {
                Some(number) if number.fract() == 0.0 => Ok(range.contains(number as i64)),
                _ => Ok(false),
            },
            Value::Iterator(_) => Ok(self.iterate()?.iter().any(|value| value.py_eq(element))),
            other => Err(FoldError::type_error(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }

    /// self[index]
    pub fn subscript(&self, index: &Value) -> Result<Value, FoldError> {
        match self {
            Value::Dict(entries) => {
                index.check_hashable()?;
                dict_lookup(&entries.borrow(), index)
                    .ok_or_else(|| FoldError::raised("KeyError", index.repr()))
            }
            Value::List(elements) => {
                let elements = elements.borrow();
                let position = sequence_position(index, elements.len(), "list")?;
                Ok(elements[position].clone())
            }
            Value::Tuple(elements) => {
                let position = sequence_position(index, elements.len(), "tuple")?;
                Ok(elements[position].clone())
            }
            Value::Str(text) => {
                let chars: Vec<char> = text.chars().collect();
                let position = sequence_position(index, chars.len(), "string")?;
                Ok(Value::Str(chars[position].to_string()))
            }
            Value::Range(range) => {
                let length = usize::try_from(range.len()).map_err(|_| FoldError::Unrepresentable)?;
                let position = sequence_position(index, length, "range object")?;
                Ok(Value::Int(range.get(position as i64)))
            }
            other => Err(FoldError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    /// self[lower:upper:step]
    pub fn slice(
        &self,
        lower: Option<&Value>,
        upper: Option<&Value>,
        step: Option<&Value>,
    ) -> Result<Value, FoldError> {
        let step = match step {
            None | Some(Value::None) => 1,
            Some(value) => slice_bound(value)?,
        };
        if step == 0 {
            return Err(FoldError::value_error("slice step cannot be zero"));
        }

        let select = |length: usize| -> Result<Vec<usize>, FoldError> {
            let length = i64::try_from(length).map_err(|_| FoldError::Unrepresentable)?;
            let (default_lower, default_upper) = if step > 0 { (0, length) } else { (length - 1, -1) };

            let clamp = |bound: Option<&Value>, default: i64| -> Result<i64, FoldError> {
                let bound = match bound {
                    None | Some(Value::None) => return Ok(default),
                    Some(value) => slice_bound(value)?,
                };
                let bound = if bound < 0 { bound + length } else { bound };
                Ok(if step > 0 {
                    bound.clamp(0, length)
                } else {
                    bound.clamp(-1, length - 1)
                })
            };

            let mut position = clamp(lower, default_lower)?;
            let end = clamp(upper, default_upper)?;
            let mut positions = Vec::new();
            while (step > 0 && position < end) || (step < 0 && position > end) {
                positions.push(position as usize);
                position += step;
            }
            Ok(positions)
        };

        match self {
            Value::List(elements) => {
                let elements = elements.borrow();
                let positions = select(elements.len())?;
                Ok(Value::list(positions.into_iter().map(|i| elements[i].clone()).collect()))
            }
            Value::Tuple(elements) => {
                let positions = select(elements.len())?;
                Ok(Value::tuple(positions.into_iter().map(|i| elements[i].clone()).collect()))
            }
            Value::Str(text) => {
                let chars: Vec<char> = text.chars().collect();
                let positions = select(chars.len())?;
                Ok(Value::Str(positions.into_iter().map(|i| chars[i]).collect()))
            }
            other => Err(FoldError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    /// self.attr, for values that carry attributes
    pub fn get_attribute(&self, attr: &str) -> Result<Value, FoldError> {
        let found = match self {
            Value::Object(object) => object.attrs.borrow().get(attr).cloned(),
            Value::Function(function) if attr == "__name__" => Some(Value::str(function.name())),
            Value::Range(range) => match attr {
                "start" => Some(Value::Int(range.start)),
                "stop" => Some(Value::Int(range.stop)),
                "step" => Some(Value::Int(range.step)),
                _ => None,
            },
            _ => None,
        };

        found.ok_or_else(|| {
            FoldError::raised(
                "AttributeError",
                format!("'{}' object has no attribute '{attr}'", self.type_name()),
            )
        })
    }
}

fn integer_operation(lhs_val: i64, rhs_val: i64, op: BinaryOperator) -> Result<Value, FoldError> {
    let checked = |result: Option<i64>| result.map(Value::Int).ok_or(FoldError::Unrepresentable);

    match op {
        BinaryOperator::Add => checked(lhs_val.checked_add(rhs_val)),
        BinaryOperator::Subtract => checked(lhs_val.checked_sub(rhs_val)),
        BinaryOperator::Multiply => checked(lhs_val.checked_mul(rhs_val)),
        BinaryOperator::Divide => {
            if rhs_val == 0 {
                return Err(FoldError::raised("ZeroDivisionError", "division by zero"));
            }
            Ok(Value::Float(lhs_val as f64 / rhs_val as f64))
        }
        BinaryOperator::FloorDivide | BinaryOperator::Modulus => {
            if rhs_val == 0 {
                return Err(FoldError::raised(
                    "ZeroDivisionError",
                    "integer division or modulo by zero",
                ));
            }

            // Rounds towards negative infinity, the remainder takes the divisor's sign
            let quotient = lhs_val.checked_div(rhs_val).ok_or(FoldError::Unrepresentable)?;
            let remainder = lhs_val.wrapping_rem(rhs_val);
            let adjust = remainder != 0 && ((remainder < 0) != (rhs_val < 0));

            if op == BinaryOperator::FloorDivide {
                Ok(Value::Int(if adjust { quotient - 1 } else { quotient }))
            } else {
                Ok(Value::Int(if adjust { remainder + rhs_val } else { remainder }))
            }
        }
        BinaryOperator::Exponent => {
            // Negative exponents produce floats
            if rhs_val < 0 {
                if lhs_val == 0 {
                    return Err(FoldError::raised(
                        "ZeroDivisionError",
                        "0.0 cannot be raised to a negative power",
                    ));
                }
                return Ok(Value::Float((lhs_val as f64).powf(rhs_val as f64)));
            }

            let exponent = u32::try_from(rhs_val).map_err(|_| FoldError::Unrepresentable)?;
            checked(lhs_val.checked_pow(exponent))
        }
        BinaryOperator::ShiftLeft => {
            if rhs_val < 0 {
                return Err(FoldError::value_error("negative shift count"));
            }
            if lhs_val == 0 {
                return Ok(Value::Int(0));
            }
            if rhs_val >= 63 {
                return Err(FoldError::Unrepresentable);
            }

            let shifted = lhs_val << rhs_val;
            if shifted >> rhs_val != lhs_val {
                return Err(FoldError::Unrepresentable);
            }
            Ok(Value::Int(shifted))
        }
        BinaryOperator::ShiftRight => {
            if rhs_val < 0 {
                return Err(FoldError::value_error("negative shift count"));
            }
            Ok(Value::Int(lhs_val >> rhs_val.min(63)))
        }
        BinaryOperator::BitAnd => Ok(Value::Int(lhs_val & rhs_val)),
        BinaryOperator::BitOr => Ok(Value::Int(lhs_val | rhs_val)),
        BinaryOperator::BitXor => Ok(Value::Int(lhs_val ^ rhs_val)),
    }
}

// None when the operator doesn't apply to floats at all
fn float_operation(
    lhs_val: f64,
    rhs_val: f64,
    op: BinaryOperator,
) -> Option<Result<Value, FoldError>> {
    let zero_division = |msg: &str| Err(FoldError::raised("ZeroDivisionError", msg));

    let result = match op {
        BinaryOperator::Add => Ok(Value::Float(lhs_val + rhs_val)),
        BinaryOperator::Subtract => Ok(Value::Float(lhs_val - rhs_val)),
        BinaryOperator::Multiply => Ok(Value::Float(lhs_val * rhs_val)),
        BinaryOperator::Divide => {
            if rhs_val == 0.0 {
                zero_division("float division by zero")
            } else {
                Ok(Value::Float(lhs_val / rhs_val))
            }
        }
        BinaryOperator::FloorDivide => {
            if rhs_val == 0.0 {
                zero_division("float floor division by zero")
            } else {
                Ok(Value::Float((lhs_val / rhs_val).floor()))
            }
        }
        BinaryOperator::Modulus => {
            if rhs_val == 0.0 {
                zero_division("float modulo")
            } else {
                let remainder = lhs_val % rhs_val;
                if remainder != 0.0 && ((remainder < 0.0) != (rhs_val < 0.0)) {
                    Ok(Value::Float(remainder + rhs_val))
                } else {
                    Ok(Value::Float(remainder))
                }
            }
        }
        BinaryOperator::Exponent => {
            if lhs_val == 0.0 && rhs_val < 0.0 {
                zero_division("0.0 cannot be raised to a negative power")
            } else {
                let result = lhs_val.powf(rhs_val);
                if result.is_nan() && !lhs_val.is_nan() && !rhs_val.is_nan() {
                    // A negative base with a fractional exponent is a complex number
                    Err(FoldError::Unrepresentable)
                } else if result.is_infinite() && lhs_val.is_finite() && rhs_val.is_finite() {
                    Err(FoldError::raised("OverflowError", "(34, 'Numerical result out of range')"))
                } else {
                    Ok(Value::Float(result))
                }
            }
        }
        _ => return None,
    };

    Some(result)
}

fn unsupported_operands(lhs: &Value, rhs: &Value, op: BinaryOperator) -> FoldError {
    FoldError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn bad_unary_operand(value: &Value, op: UnaryOperator) -> FoldError {
    let symbol = match op {
        UnaryOperator::Negative => "-",
        UnaryOperator::Positive => "+",
        UnaryOperator::Invert => "~",
        UnaryOperator::Not => "not",
    };
    FoldError::type_error(format!(
        "bad operand type for unary {symbol}: '{}'",
        value.type_name()
    ))
}

// The integer side of a sequence repetition, negative counts repeat zero times
fn repeat_count(lhs: &Value, rhs: &Value) -> Result<usize, FoldError> {
    let count = lhs.as_int().or_else(|| rhs.as_int()).unwrap_or(0);
    let count = usize::try_from(count.max(0)).map_err(|_| FoldError::Unrepresentable)?;
    if count > MAX_MATERIALIZED_LENGTH as usize {
        return Err(FoldError::Unrepresentable);
    }
    Ok(count)
}

fn repeat_elements(elements: &[Value], count: usize) -> Result<Vec<Value>, FoldError> {
    let total = elements.len().checked_mul(count).ok_or(FoldError::Unrepresentable)?;
    if total > MAX_MATERIALIZED_LENGTH as usize {
        return Err(FoldError::Unrepresentable);
    }

    let mut repeated = Vec::with_capacity(total);
    for _ in 0..count {
        repeated.extend(elements.iter().cloned());
    }
    Ok(repeated)
}

fn order_sequences(a: &[Value], b: &[Value], op: CompareOperator) -> Result<Ordering, FoldError> {
    for (x, y) in a.iter().zip(b) {
        if !x.py_eq(y) {
            return x.order(y, op);
        }
    }
    Ok(a.len().cmp(&b.len()))
}

// Normalises a possibly negative index into a sequence of the given length
fn sequence_position(index: &Value, length: usize, kind: &str) -> Result<usize, FoldError> {
    let Some(index) = index.as_int() else {
        return Err(FoldError::type_error(format!(
            "{kind} indices must be integers, not {}",
            index.type_name()
        )));
    };

    let length = i64::try_from(length).map_err(|_| FoldError::Unrepresentable)?;
    let position = if index < 0 { index + length } else { index };
    if position < 0 || position >= length {
        return Err(FoldError::raised(
            "IndexError",
            format!("{kind} index out of range"),
        ));
    }

    Ok(position as usize)
}

fn slice_bound(value: &Value) -> Result<i64, FoldError> {
    value.as_int().ok_or_else(|| {
        FoldError::type_error("slice indices must be integers or None")
    })
}

#[cfg(test)]
#[path = "tests/operators_tests.rs"]
mod operators_tests;
