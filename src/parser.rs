use std::mem;

use thiserror::Error;

use crate::ast::{BinOp, Expr, Stmt, Token, UnaryOp};
use crate::lexer::{LexError, Lexer};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected token {0:?}")]
    UnexpectedToken(Token),
    #[error("unexpected end of expression")]
    UnexpectedEof,
    #[error("expected {expected:?}, got {got:?}")]
    Expected { expected: Token, got: Token },
    #[error("invalid assignment target")]
    InvalidAssignTarget,
    #[error("trailing input after expression: {0:?}")]
    TrailingInput(Token),
}

/// A parsed template expression: either a single expression or a
/// statement block (`var`/assignment/`return` sequences).
#[derive(Debug, Clone, PartialEq)]
pub enum Program {
    Expr(Expr),
    Block(Vec<Stmt>),
}

/// Parses template expression text.
///
/// Input carrying statement syntax (`;`, `var`, `return`, `=`) is parsed
/// as a block. Anything else is parsed as an expression, with a single
/// fallback to the block parse before the error is surfaced.
pub fn parse_program(input: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::tokenize(input)?;
    if has_statement_syntax(&tokens) {
        return Parser::new(tokens).parse_block().map(Program::Block);
    }
    let expr_err = match Parser::new(tokens.clone()).parse_expression_to_end() {
        Ok(expr) => return Ok(Program::Expr(expr)),
        Err(err) => err,
    };
    match Parser::new(tokens).parse_block() {
        Ok(stmts) => Ok(Program::Block(stmts)),
        Err(_) => Err(expr_err),
    }
}

fn has_statement_syntax(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .any(|t| matches!(t, Token::Semicolon | Token::KwVar | Token::KwReturn))
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn take(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .ok_or(ParseError::UnexpectedEof)?;
        self.advance();
        Ok(token)
    }

    fn check(&self, token: &Token) -> bool {
        self.current()
            .is_some_and(|t| mem::discriminant(t) == mem::discriminant(token))
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        match self.current() {
            Some(t) if mem::discriminant(t) == mem::discriminant(&expected) => {
                self.advance();
                Ok(())
            }
            Some(t) => Err(ParseError::Expected {
                expected,
                got: t.clone(),
            }),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.take()? {
            Token::Ident(name) => Ok(name),
            token => Err(ParseError::UnexpectedToken(token)),
        }
    }

    fn parse_expression_to_end(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        match self.current() {
            None => Ok(expr),
            Some(t) => Err(ParseError::TrailingInput(t.clone())),
        }
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_or()?;
        if self.check(&Token::Question) {
            self.advance();
            let then = self.parse_expression()?;
            self.expect(Token::Colon)?;
            let otherwise = self.parse_expression()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.check(&Token::OrOr) {
            self.advance();
            let right = self.parse_and()?;
            left = binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.check(&Token::AndAnd) {
            self.advance();
            let right = self.parse_equality()?;
            left = binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::LtEq) => BinOp::LtEq,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::GtEq) => BinOp::GtEq,
                Some(Token::KwIn) => BinOp::In,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.current() {
            Some(Token::Bang) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            Some(Token::Minus) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_postfix(),
        }
    }

    /// Parses access chains and calls: `a.b`, `a[i]`, `a.m(x)`, `f(x)`.
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&Token::Dot) {
                self.advance();
                let name = self.expect_ident()?;
                if self.check(&Token::LParen) {
                    self.advance();
                    let args = self.parse_args()?;
                    expr = Expr::MethodCall {
                        object: Box::new(expr),
                        method: name,
                        args,
                    };
                } else {
                    expr = Expr::Member {
                        object: Box::new(expr),
                        name,
                    };
                }
            } else if self.check(&Token::LBracket) {
                self.advance();
                let index = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.check(&Token::LParen) {
                let Expr::Ident(name) = &expr else { break };
                let name = name.clone();
                self.advance();
                let args = self.parse_args()?;
                expr = Expr::Call { name, args };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = vec![];
        while !self.check(&Token::RParen) {
            args.push(self.parse_expression()?);
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.take()? {
            Token::Int(n) => Ok(Expr::Int(n)),
            Token::Float(n) => Ok(Expr::Float(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Bool(b) => Ok(Expr::Bool(b)),
            Token::Null => Ok(Expr::Null),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_object_literal(),
            token => Err(ParseError::UnexpectedToken(token)),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let mut elements = vec![];
        while !self.check(&Token::RBracket) {
            elements.push(self.parse_expression()?);
            if !self.check(&Token::RBracket) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RBracket)?;
        Ok(Expr::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let mut pairs = vec![];
        while !self.check(&Token::RBrace) {
            let key = match self.take()? {
                Token::Str(s) => s,
                Token::Ident(s) => s,
                token => return Err(ParseError::UnexpectedToken(token)),
            };
            self.expect(Token::Colon)?;
            let value = self.parse_expression()?;
            pairs.push((key, value));
            if !self.check(&Token::RBrace) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RBrace)?;
        Ok(Expr::Object(pairs))
    }

    /// Parses a statement block: `var a = 1; return a + 1;`
    pub fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = vec![];

        while self.current().is_some() {
            while self.check(&Token::Semicolon) {
                self.advance();
            }
            let Some(token) = self.current() else { break };

            match token {
                Token::KwVar => {
                    self.advance();
                    let name = self.expect_ident()?;
                    self.expect(Token::Assign)?;
                    let value = self.parse_expression()?;
                    stmts.push(Stmt::Var { name, value });
                }
                Token::KwReturn => {
                    self.advance();
                    let value = self.parse_expression()?;
                    stmts.push(Stmt::Return(value));
                }
                _ => {
                    let expr = self.parse_expression()?;
                    if self.check(&Token::Assign) {
                        if !is_assign_target(&expr) {
                            return Err(ParseError::InvalidAssignTarget);
                        }
                        self.advance();
                        let value = self.parse_expression()?;
                        stmts.push(Stmt::Assign {
                            target: expr,
                            value,
                        });
                    } else {
                        stmts.push(Stmt::Expr(expr));
                    }
                }
            }

            match self.current() {
                None => break,
                Some(Token::Semicolon) => {}
                Some(t) => return Err(ParseError::TrailingInput(t.clone())),
            }
        }

        Ok(stmts)
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn is_assign_target(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) => true,
        Expr::Member { object, .. } | Expr::Index { object, .. } => is_assign_target(object),
        _ => false,
    }
}
