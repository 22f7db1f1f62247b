use crate::error::EvaluationError;
use std::cmp::Ordering;
use std::fmt;

/// Runtime value of the formula language.
///
/// There is no dedicated boolean: comparisons and logical operators yield `Int(1)` or
/// `Int(0)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Decimal(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    pub fn from_bool(b: bool) -> Self {
        Value::Int(i64::from(b))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Int(n) => *n != 0,
            Value::Decimal(d) => *d != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }

    /// The form shown in the execution trace: strings quoted, lists bracketed.
    pub fn to_debug_string(&self) -> String {
        match self {
            Value::Null => "null()".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Decimal(d) => format_decimal(*d),
            Value::String(s) => format!("'{s}'"),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::to_debug_string).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn add(&self, rhs: &Value) -> Result<Value, EvaluationError> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| EvaluationError::Overflow("+".to_string())),
            (Value::List(a), Value::List(b)) => {
                Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            (Value::String(a), b) => Ok(Value::String(format!("{a}{}", b.to_display_string()))),
            (a, Value::String(b)) => Ok(Value::String(format!("{}{b}", a.to_display_string()))),
            _ => self.decimal_op("+", rhs, |a, b| a + b),
        }
    }

    pub fn sub(&self, rhs: &Value) -> Result<Value, EvaluationError> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or_else(|| EvaluationError::Overflow("-".to_string())),
            _ => self.decimal_op("-", rhs, |a, b| a - b),
        }
    }

    pub fn mul(&self, rhs: &Value) -> Result<Value, EvaluationError> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or_else(|| EvaluationError::Overflow("*".to_string())),
            _ => self.decimal_op("*", rhs, |a, b| a * b),
        }
    }

    pub fn div(&self, rhs: &Value) -> Result<Value, EvaluationError> {
        if rhs.as_f64() == Some(0.0) {
            return Err(EvaluationError::DivisionByZero("/".to_string()));
        }
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_div(*b)
                .map(Value::Int)
                .ok_or_else(|| EvaluationError::Overflow("/".to_string())),
            _ => self.decimal_op("/", rhs, |a, b| a / b),
        }
    }

    pub fn rem(&self, rhs: &Value) -> Result<Value, EvaluationError> {
        match (self, rhs) {
            (Value::Int(_), Value::Int(0)) => {
                Err(EvaluationError::DivisionByZero("%".to_string()))
            }
            (Value::Int(a), Value::Int(b)) => a
                .checked_rem(*b)
                .map(Value::Int)
                .ok_or_else(|| EvaluationError::Overflow("%".to_string())),
            _ => Err(self.mismatch("%", rhs)),
        }
    }

    pub fn pow(&self, rhs: &Value) -> Result<Value, EvaluationError> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) if *b >= 0 => {
                let exp = u32::try_from(*b)
                    .map_err(|_| EvaluationError::Overflow("^".to_string()))?;
                a.checked_pow(exp)
                    .map(Value::Int)
                    .ok_or_else(|| EvaluationError::Overflow("^".to_string()))
            }
            _ => self.decimal_op("^", rhs, f64::powf),
        }
    }

    pub fn neg(&self) -> Result<Value, EvaluationError> {
        match self {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvaluationError::Overflow("-".to_string())),
            Value::Decimal(d) => Ok(Value::Decimal(-d)),
            other => Err(EvaluationError::InvalidOperand {
                op: "-".to_string(),
                operand: other.type_name().to_string(),
            }),
        }
    }

    /// Ordering used by `<`, `<=`, `>`, `>=`, `min` and `max`.
    pub fn compare(&self, rhs: &Value, op: &str) -> Result<Ordering, EvaluationError> {
        match (self, rhs) {
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            _ => match (self.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| self.mismatch(op, rhs)),
                _ => Err(self.mismatch(op, rhs)),
            },
        }
    }

    /// Equality for `=` and `!=`. Integers and decimals compare numerically.
    pub fn loose_eq(&self, rhs: &Value) -> bool {
        match (self.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == rhs,
        }
    }

    fn decimal_op(
        &self,
        op: &str,
        rhs: &Value,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, EvaluationError> {
        match (self.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Decimal(f(a, b))),
            _ => Err(self.mismatch(op, rhs)),
        }
    }

    fn mismatch(&self, op: &str, rhs: &Value) -> EvaluationError {
        EvaluationError::TypeMismatch {
            op: op.to_string(),
            left: self.type_name().to_string(),
            right: rhs.type_name().to_string(),
        }
    }

    fn to_display_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_debug_string(),
        }
    }
}

fn format_decimal(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 {
        format!("{d:.1}")
    } else {
        d.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::from_bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::List(
                map.into_iter()
                    .map(|(k, v)| Value::List(vec![Value::String(k), Value::from(v)]))
                    .collect(),
            ),
        }
    }
}
