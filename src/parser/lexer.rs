use super::types::{Span, Token, TokenKind};
use crate::error::ParseError;

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
                continue;
            }

            let start = self.pos;
            let kind = match ch {
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ',' => self.single(TokenKind::Comma),
                '+' => self.single(TokenKind::Plus),
                '-' => self.single(TokenKind::Minus),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '%' => self.single(TokenKind::Percent),
                '^' => self.single(TokenKind::Caret),
                '=' => self.single(TokenKind::Eq),
                '!' if self.peek_str("!=") => {
                    self.pos += 2;
                    TokenKind::Ne
                }
                '<' if self.peek_str("<=") => {
                    self.pos += 2;
                    TokenKind::Le
                }
                '<' => self.single(TokenKind::Lt),
                '>' if self.peek_str(">=") => {
                    self.pos += 2;
                    TokenKind::Ge
                }
                '>' => self.single(TokenKind::Gt),
                '\'' => self.lex_string()?,
                '0'..='9' => self.lex_number()?,
                _ if is_ident_start(ch) => self.lex_ident(),
                _ => {
                    return Err(ParseError::UnexpectedCharacter {
                        ch,
                        offset: self.pos,
                    })
                }
            };
            tokens.push(Token {
                kind,
                span: Span::new(start, self.pos),
            });
        }
        tokens.push(Token {
            kind: TokenKind::End,
            span: Span::new(self.pos, self.pos),
        });
        Ok(tokens)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn lex_ident(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        match &self.input[start..self.pos] {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            name => TokenKind::Ident(name.to_string()),
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let mut saw_dot = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' => self.pos += 1,
                // `1.` without a following digit is not a decimal.
                '.' if !saw_dot
                    && self.input[self.pos + 1..]
                        .chars()
                        .next()
                        .is_some_and(|c| c.is_ascii_digit()) =>
                {
                    saw_dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let s = &self.input[start..self.pos];
        if saw_dot {
            s.parse::<f64>()
                .map(TokenKind::Decimal)
                .map_err(|_| ParseError::InvalidNumber(s.to_string()))
        } else {
            s.parse::<i64>()
                .map(TokenKind::Integer)
                .map_err(|_| ParseError::InvalidNumber(s.to_string()))
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek_char() {
                Some('\'') => {
                    if self.peek_str("''") {
                        out.push('\'');
                        self.pos += 2;
                        continue;
                    }
                    self.pos += 1;
                    break;
                }
                Some(ch) => {
                    out.push(ch);
                    self.pos += ch.len_utf8();
                }
                None => return Err(ParseError::UnterminatedString(start)),
            }
        }
        Ok(TokenKind::String(out))
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}
