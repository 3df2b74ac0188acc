use regex::Regex;

use super::lexer::{Spanned, Token, tokenize};
use crate::error::PredicateError;

/// Literal values
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::StrictEq => "===",
            Self::StrictNe => "!==",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// Expression tree
#[derive(Clone, Debug)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    /// The record itself
    This,
    /// `object.name` or `object[index]`
    Member(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `value =~ "pattern"`
    Match(Box<Expr>, Regex),
}

/// Binding power of an infix token; higher binds tighter
fn infix_power(token: &Token) -> Option<u8> {
    let power = match token {
        Token::Or => 1,
        Token::And => 2,
        Token::Eq | Token::Ne | Token::StrictEq | Token::StrictNe | Token::Match => 3,
        Token::Lt | Token::Le | Token::Gt | Token::Ge => 4,
        Token::Plus | Token::Minus => 5,
        Token::Star | Token::Slash | Token::Percent => 6,
        _ => return None,
    };
    Some(power)
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    let op = match token {
        Token::Or => BinaryOp::Or,
        Token::And => BinaryOp::And,
        Token::Eq => BinaryOp::Eq,
        Token::Ne => BinaryOp::Ne,
        Token::StrictEq => BinaryOp::StrictEq,
        Token::StrictNe => BinaryOp::StrictNe,
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Rem,
        _ => return None,
    };
    Some(op)
}

/// Parse a complete expression
pub fn parse(src: &str) -> Result<Expr, PredicateError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression(0)?;
    parser.expect(Token::Eof, "end of expression")?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Spanned {
        // tokenize() always ends with Eof, and Eof is never consumed
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned {
        let current = self.peek().clone();
        if current.token != Token::Eof {
            self.pos += 1;
        }
        current
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), PredicateError> {
        let current = self.advance();
        if current.token == token {
            Ok(())
        } else {
            Err(unexpected(&current, expected))
        }
    }

    /// Precedence climbing over binary operators
    fn expression(&mut self, min_power: u8) -> Result<Expr, PredicateError> {
        let mut left = self.unary()?;

        loop {
            let op_token = self.peek().token.clone();
            let Some(power) = infix_power(&op_token) else {
                break;
            };
            if power <= min_power {
                break;
            }
            self.advance();

            if op_token == Token::Match {
                let pattern = self.advance();
                let Token::Str(pattern_text) = &pattern.token else {
                    return Err(PredicateError::PatternNotLiteral {
                        offset: pattern.offset,
                    });
                };
                left = Expr::Match(Box::new(left), Regex::new(pattern_text)?);
                continue;
            }

            let right = self.expression(power)?;
            if let Some(op) = binary_op(&op_token) {
                left = Expr::Binary(op, Box::new(left), Box::new(right));
            }
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, PredicateError> {
        match self.peek().token {
            Token::Not => {
                self.advance();
                Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)))
            }
            Token::Minus => {
                self.advance();
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, PredicateError> {
        let mut expr = self.primary()?;

        loop {
            match self.peek().token {
                Token::Dot => {
                    self.advance();
                    let name = self.advance();
                    let Token::Ident(property) = &name.token else {
                        return Err(unexpected(&name, "property name"));
                    };
                    expr = Expr::Member(
                        Box::new(expr),
                        Box::new(Expr::Literal(Literal::Str(property.clone()))),
                    );
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.expression(0)?;
                    self.expect(Token::RBracket, "`]`")?;
                    expr = Expr::Member(Box::new(expr), Box::new(index));
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, PredicateError> {
        let current = self.advance();
        let expr = match current.token {
            Token::Number(n) => Expr::Literal(Literal::Number(n)),
            Token::Str(s) => Expr::Literal(Literal::Str(s)),
            Token::Ident(name) => match name.as_str() {
                "true" => Expr::Literal(Literal::Bool(true)),
                "false" => Expr::Literal(Literal::Bool(false)),
                "null" => Expr::Literal(Literal::Null),
                "undefined" => Expr::Literal(Literal::Undefined),
                "this" => Expr::This,
                _ => Expr::Ident(name),
            },
            Token::LParen => {
                let inner = self.expression(0)?;
                self.expect(Token::RParen, "`)`")?;
                inner
            }
            _ => return Err(unexpected(&current, "a value")),
        };
        Ok(expr)
    }
}

fn unexpected(spanned: &Spanned, expected: &'static str) -> PredicateError {
    PredicateError::UnexpectedToken {
        found: spanned.token.describe(),
        expected,
        offset: spanned.offset,
    }
}
