//! Token sequence to expression tree.
//!
//! A precedence-climbing parser over classified tokens. Conditions and
//! calculations share the same grammar; whether the result must be a
//! boolean or a number is decided at evaluation time.

use pricing_core::Value;
use pricing_core::token::{Literal, Operator, Token, classify};

use crate::ast::{BinaryOp, Expr};

/// Errors raised while compiling a token sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected token {token:?} at position {pos}")]
    Unexpected { token: String, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unclosed parenthesis at position {0}")]
    Unclosed(usize),
}

/// Compiles a token sequence into an expression tree.
pub fn compile(tokens: &[String]) -> Result<Expr, SyntaxError> {
    if tokens.is_empty() {
        return Err(SyntaxError::Empty);
    }
    let mut parser = Parser {
        tokens: tokens.iter().map(|t| classify(t)).collect(),
        raw: tokens,
        pos: 0,
    };
    let expr = parser.expression(0)?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    raw: &'a [String],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn unexpected(&self) -> SyntaxError {
        match self.raw.get(self.pos) {
            Some(token) => SyntaxError::Unexpected {
                token: token.clone(),
                pos: self.pos,
            },
            None => SyntaxError::UnexpectedEnd,
        }
    }

    fn expression(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Operator(op)) = self.peek() {
            let Some(bin) = BinaryOp::from_operator(*op) else {
                break;
            };
            let prec = bin.precedence();
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.expression(prec + 1)?;
            lhs = Expr::binary(bin, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek() {
            Some(Token::Operator(Operator::Sub)) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Operator(Operator::Add)) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let Some(token) = self.peek().cloned() else {
            return Err(SyntaxError::UnexpectedEnd);
        };
        match token {
            Token::Literal(lit) => {
                self.pos += 1;
                Ok(Expr::Const(match lit {
                    Literal::Number(n) => Value::Number(n),
                    Literal::Bool(b) => Value::Boolean(b),
                    Literal::Text(s) => Value::Text(s),
                }))
            }
            Token::Reference(name) => {
                self.pos += 1;
                Ok(Expr::Ref(name.to_string()))
            }
            Token::Operator(Operator::LParen) => {
                let open = self.pos;
                self.pos += 1;
                let inner = self.expression(0)?;
                match self.peek() {
                    Some(Token::Operator(Operator::RParen)) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some(_) => Err(self.unexpected()),
                    None => Err(SyntaxError::Unclosed(open)),
                }
            }
            Token::Operator(_) => Err(self.unexpected()),
        }
    }
}
