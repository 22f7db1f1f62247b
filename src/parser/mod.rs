mod expression;
mod lexer;
mod node;
mod types;

pub use expression::parse_formula;
pub use lexer::Lexer;
pub use node::{BinaryOp, ExpressionNode, NodeKind, UnaryOp};
pub use types::{Span, Token, TokenKind};
