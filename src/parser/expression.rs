use super::lexer::Lexer;
use super::node::{BinaryOp, ExpressionNode, NodeKind, UnaryOp};
use super::types::{Span, Token, TokenKind};
use crate::error::ParseError;
use crate::executor::Function;

/// Deepest run of parentheses, brackets, calls and prefix operators the parser will follow.
pub const MAX_NESTING: usize = 64;
/// Tallest tree the parser will build, counting operator chains like `1 + 1 + 1`.
pub const MAX_TREE_HEIGHT: usize = 1024;

/// Parse a complete formula.
pub fn parse_formula(input: &str) -> Result<ExpressionNode, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
        depth: 0,
    };
    let node = parser.parse_expr()?;
    match parser.peek().kind {
        TokenKind::End => Ok(node),
        ref other => Err(ParseError::Expected {
            expected: "end of formula".to_string(),
            found: other.describe(),
        }),
    }
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn parse_expr(&mut self) -> Result<ExpressionNode, ParseError> {
        self.parse_or()
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::NestingTooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let parsed = parse(self);
        self.depth -= 1;
        parsed
    }

    fn parse_or(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek().kind, TokenKind::Or) {
            self.next();
            let right = self.parse_and()?;
            left = self.binary(BinaryOp::Or, left, right)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek().kind, TokenKind::And) {
            self.next();
            let right = self.parse_not()?;
            left = self.binary(BinaryOp::And, left, right)?;
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<ExpressionNode, ParseError> {
        if matches!(self.peek().kind, TokenKind::Not) {
            let tok = self.next();
            let operand = self.nested(Self::parse_not)?;
            return self.unary(UnaryOp::Not, tok.span, operand);
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.next();
            let right = self.parse_additive()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.next();
            let right = self.parse_term()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.next();
            let right = self.parse_unary()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExpressionNode, ParseError> {
        if matches!(self.peek().kind, TokenKind::Minus) {
            let tok = self.next();
            let operand = self.nested(Self::parse_unary)?;
            return self.unary(UnaryOp::Neg, tok.span, operand);
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<ExpressionNode, ParseError> {
        let base = self.parse_primary()?;
        if matches!(self.peek().kind, TokenKind::Caret) {
            self.next();
            // Right associative, binds tighter than unary minus on its left.
            let exponent = self.nested(Self::parse_unary)?;
            return self.binary(BinaryOp::Pow, base, exponent);
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<ExpressionNode, ParseError> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Integer(n) => Ok(self.leaf(NodeKind::Integer(n), tok.span)),
            TokenKind::Decimal(d) => Ok(self.leaf(NodeKind::Decimal(d), tok.span)),
            TokenKind::String(s) => Ok(self.leaf(NodeKind::String(s), tok.span)),
            TokenKind::Ident(name) => {
                if matches!(self.peek().kind, TokenKind::LParen) {
                    self.parse_call(name, tok.span)
                } else {
                    Ok(self.leaf(NodeKind::Identifier(name), tok.span))
                }
            }
            TokenKind::LParen => {
                let inner = self.nested(Self::parse_expr)?;
                let close = self.expect(TokenKind::RParen)?;
                Ok(inner.with_span(tok.span.to(close.span)))
            }
            TokenKind::LBracket => {
                let items = self.nested(|p| p.parse_args(TokenKind::RBracket))?;
                let close = self.expect(TokenKind::RBracket)?;
                self.node(NodeKind::List, items, tok.span.to(close.span))
            }
            TokenKind::End => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::Expected {
                expected: "an operand".to_string(),
                found: other.describe(),
            }),
        }
    }

    fn parse_call(&mut self, name: String, name_span: Span) -> Result<ExpressionNode, ParseError> {
        let function = Function::lookup(&name).ok_or(ParseError::UnknownFunction(name))?;
        self.expect(TokenKind::LParen)?;
        let args = self.nested(|p| p.parse_args(TokenKind::RParen))?;
        let close = self.expect(TokenKind::RParen)?;
        function.check_arity(args.len())?;
        self.node(NodeKind::Call(function), args, name_span.to(close.span))
    }

    fn parse_args(&mut self, close: TokenKind) -> Result<Vec<ExpressionNode>, ParseError> {
        let mut args = Vec::new();
        if self.peek().kind == close {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.next();
                continue;
            }
            break;
        }
        Ok(args)
    }

    fn leaf(&self, kind: NodeKind, span: Span) -> ExpressionNode {
        ExpressionNode::new(kind, Vec::new(), &self.input[span.start..span.end], span)
    }

    fn unary(
        &self,
        op: UnaryOp,
        op_span: Span,
        operand: ExpressionNode,
    ) -> Result<ExpressionNode, ParseError> {
        let span = op_span.to(operand.span());
        self.node(NodeKind::Unary(op), vec![operand], span)
    }

    fn binary(
        &self,
        op: BinaryOp,
        left: ExpressionNode,
        right: ExpressionNode,
    ) -> Result<ExpressionNode, ParseError> {
        let span = left.span().to(right.span());
        self.node(NodeKind::Binary(op), vec![left, right], span)
    }

    fn node(
        &self,
        kind: NodeKind,
        children: Vec<ExpressionNode>,
        span: Span,
    ) -> Result<ExpressionNode, ParseError> {
        let node = ExpressionNode::new(kind, children, &self.input[span.start..span.end], span);
        if node.height() > MAX_TREE_HEIGHT {
            return Err(ParseError::NestingTooDeep(MAX_TREE_HEIGHT));
        }
        Ok(node)
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with `End`.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let got = self.next();
        if got.kind == expected {
            Ok(got)
        } else if got.kind == TokenKind::End {
            Err(ParseError::UnexpectedEof)
        } else {
            Err(ParseError::Expected {
                expected: expected.describe(),
                found: got.kind.describe(),
            })
        }
    }
}
