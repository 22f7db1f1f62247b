use crate::error::{EvaluationError, ParseError};
use crate::value::Value;
use std::cmp::Ordering;

/// Built-in functions callable from a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `if(c1, v1, c2, v2, ..., [else])`, evaluated lazily.
    If,
    Abs,
    Min,
    Max,
    Size,
    Sum,
    Null,
}

impl Function {
    pub fn lookup(name: &str) -> Option<Self> {
        let function = match name {
            "if" => Function::If,
            "abs" => Function::Abs,
            "min" => Function::Min,
            "max" => Function::Max,
            "size" => Function::Size,
            "sum" => Function::Sum,
            "null" => Function::Null,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::If => "if",
            Function::Abs => "abs",
            Function::Min => "min",
            Function::Max => "max",
            Function::Size => "size",
            Function::Sum => "sum",
            Function::Null => "null",
        }
    }

    /// Inclusive bounds on the argument count; `None` means unbounded.
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::If => (2, None),
            Function::Abs | Function::Size | Function::Sum => (1, Some(1)),
            Function::Min | Function::Max => (1, None),
            Function::Null => (0, Some(0)),
        }
    }

    pub fn check_arity(self, got: usize) -> Result<(), ParseError> {
        let (min, max) = self.arity();
        if got >= min && max.map_or(true, |max| got <= max) {
            return Ok(());
        }
        let expected = match max {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{min} to {max}"),
            None => format!("at least {min}"),
        };
        Err(ParseError::WrongArgumentCount {
            function: self.name().to_string(),
            expected,
            got,
        })
    }

    /// Apply a strict function to its fully evaluated arguments.
    ///
    /// `if` never reaches this point; the evaluator picks its branch itself.
    pub fn apply(self, args: &[Value]) -> Result<Value, EvaluationError> {
        match self {
            Function::If => Ok(args.last().cloned().unwrap_or(Value::Null)),
            Function::Null => Ok(Value::Null),
            Function::Abs => match &args[0] {
                Value::Int(n) => n
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| EvaluationError::Overflow("abs".to_string())),
                Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
                other => Err(invalid_operand("abs", other)),
            },
            Function::Size => match &args[0] {
                Value::List(items) => Ok(Value::Int(items.len() as i64)),
                Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(invalid_operand("size", other)),
            },
            Function::Sum => match &args[0] {
                Value::List(items) => items
                    .iter()
                    .try_fold(Value::Int(0), |acc, item| acc.add(item)),
                other => Err(invalid_operand("sum", other)),
            },
            Function::Min => extreme("min", args, Ordering::Less),
            Function::Max => extreme("max", args, Ordering::Greater),
        }
    }
}

/// `min` / `max` over the arguments, or over the elements of a single list argument.
fn extreme(name: &str, args: &[Value], keep: Ordering) -> Result<Value, EvaluationError> {
    let candidates = match args {
        [Value::List(items)] => items.as_slice(),
        _ => args,
    };
    let mut best: Option<&Value> = None;
    for candidate in candidates {
        best = match best {
            Some(current) if candidate.compare(current, name)? != keep => Some(current),
            _ => Some(candidate),
        };
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

fn invalid_operand(op: &str, value: &Value) -> EvaluationError {
    EvaluationError::InvalidOperand {
        op: op.to_string(),
        operand: value.type_name().to_string(),
    }
}
