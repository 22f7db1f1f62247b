use thiserror::Error;

pub type DebugResult<T> = Result<T, DebugError>;

/// Malformed formula text. Raised before any evaluation starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("expected {expected}, found {found}")]
    Expected { expected: String, found: String },
    #[error("unexpected end of formula")]
    UnexpectedEof,
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{function}' expects {expected} arguments, got {got}")]
    WrongArgumentCount {
        function: String,
        expected: String,
        got: usize,
    },
    #[error("formula nests deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// Failure while computing a value. Deterministic, never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("type mismatch: cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },
    #[error("type mismatch: '{op}' does not accept {operand}")]
    InvalidOperand { op: String, operand: String },
    #[error("division by zero in '{0}'")]
    DivisionByZero(String),
    #[error("integer overflow in '{0}'")]
    Overflow(String),
    /// The evaluator lost its active node before producing a result.
    #[error("evaluation stack is empty")]
    StackExhausted,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DebugError {
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    /// The evaluator asked to leave a frame that the call stack does not have.
    #[error("call stack underflow")]
    StackUnderflow,
    #[error("call stack out of sync: expected '{expected}', found '{found}'")]
    FrameMismatch { expected: String, found: String },
    #[error("debug session already finished")]
    SessionFinished,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read launch config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed launch config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid variable '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },
}
