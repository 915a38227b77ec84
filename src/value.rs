use std::fmt;
use std::rc::Rc;

use crate::callable::{Callable, Instance};
use crate::token::Number;

/// A runtime value.
///
/// Integers and floats are both "numeric"; they interoperate in arithmetic
/// and compare equal when both are whole and the same.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Callable(Callable),
    Instance(Rc<Instance>),
}

impl Value {
    /// `nil` and `false` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Both numeric, or exactly the same variant otherwise.
    pub fn same_type(&self, other: &Value) -> bool {
        (self.is_numeric() && other.is_numeric())
            || std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Language equality: operands must share a type; whole numerics compare
    /// as integers; callables and instances compare by identity.
    pub fn equals(&self, other: &Value) -> bool {
        if !self.same_type(other) {
            return false;
        }

        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.same(b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
                whole_equals(*i, *f)
            }
            _ => false,
        }
    }

    /// The answer of `typeof`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::Float(_) => "number",
            Value::Str(_) => "str",
            Value::Callable(_) => "function",
            Value::Instance(_) => "instance",
        }
    }
}

/// `3 == 3.0`: a whole float equals the integer it represents exactly.
fn whole_equals(i: i64, f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 && f as i64 == i
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Int(n) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*n))
            }

            // `{:?}` keeps the fractional digit: 2.0, 2.5, 1e300
            Value::Float(n) => write!(f, "{:?}", n),

            Value::Str(s) => f.write_str(s),

            Value::Callable(c) => write!(f, "{}", c),

            Value::Instance(instance) => write!(f, "<{} instance>", instance.class.name),
        }
    }
}
