use thiserror::Error;

use crate::ast::Token;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
    #[error("invalid escape sequence: \\{0}")]
    InvalidEscape(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number literal: {0}")]
    InvalidNumber(String),
    #[error("unexpected '&' (did you mean '&&'?)")]
    LoneAmpersand,
    #[error("unexpected '|' (did you mean '||'?)")]
    LonePipe,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Runs the lexer to completion, returning the full token stream.
    pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut result = String::new();
        self.advance(); // consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some(ch) => return Err(LexError::InvalidEscape(ch)),
                        None => return Err(LexError::UnterminatedString),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString)
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| LexError::InvalidNumber(number))
        } else {
            number
                .parse::<i64>()
                .map(Token::Int)
                .map_err(|_| LexError::InvalidNumber(number))
        }
    }

    /// Returns the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let token = match self.current_char() {
            None => return Ok(None),
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some('/') => {
                self.advance();
                Token::Slash
            }
            Some('%') => {
                self.advance();
                Token::Percent
            }
            Some('?') => {
                self.advance();
                Token::Question
            }
            Some(':') => {
                self.advance();
                Token::Colon
            }
            Some(';') => {
                self.advance();
                Token::Semicolon
            }
            Some('&') => {
                if self.peek_char(1) == Some('&') {
                    self.advance();
                    self.advance();
                    Token::AndAnd
                } else {
                    return Err(LexError::LoneAmpersand);
                }
            }
            Some('|') => {
                if self.peek_char(1) == Some('|') {
                    self.advance();
                    self.advance();
                    Token::OrOr
                } else {
                    return Err(LexError::LonePipe);
                }
            }
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    // '===' lexes the same as '=='
                    if self.current_char() == Some('=') {
                        self.advance();
                    }
                    Token::EqEq
                } else {
                    self.advance();
                    Token::Assign
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    if self.current_char() == Some('=') {
                        self.advance();
                    }
                    Token::NotEq
                } else {
                    self.advance();
                    Token::Bang
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::GtEq
                } else {
                    self.advance();
                    Token::Gt
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::LtEq
                } else {
                    self.advance();
                    Token::Lt
                }
            }
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some('[') => {
                self.advance();
                Token::LBracket
            }
            Some(']') => {
                self.advance();
                Token::RBracket
            }
            Some('{') => {
                self.advance();
                Token::LBrace
            }
            Some('}') => {
                self.advance();
                Token::RBrace
            }
            Some('"') => Token::Str(self.read_string('"')?),
            Some('\'') => Token::Str(self.read_string('\'')?),
            Some(ch) if ch.is_alphabetic() || ch == '_' || ch == '$' => {
                let ident = self.read_identifier();

                match ident.as_str() {
                    "var" => Token::KwVar,
                    "return" => Token::KwReturn,
                    "in" => Token::KwIn,
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    "null" => Token::Null,
                    _ => Token::Ident(ident),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) => {
                return Err(LexError::UnexpectedChar {
                    ch,
                    position: self.position,
                });
            }
        };

        Ok(Some(token))
    }
}

#[test]
fn test_keywords_and_references() {
    let tokens = Lexer::tokenize("var x in $root true false null").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::KwVar,
            Token::Ident("x".to_string()),
            Token::KwIn,
            Token::Ident("$root".to_string()),
            Token::Bool(true),
            Token::Bool(false),
            Token::Null,
        ]
    );
}

#[test]
fn test_strict_equality_lexes_as_loose() {
    let tokens = Lexer::tokenize("a === 1 && b !== 2").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Ident("a".to_string()),
            Token::EqEq,
            Token::Int(1),
            Token::AndAnd,
            Token::Ident("b".to_string()),
            Token::NotEq,
            Token::Int(2),
        ]
    );
}

#[test]
fn test_access_chain() {
    let tokens = Lexer::tokenize("$jason.items[0].name").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Ident("$jason".to_string()),
            Token::Dot,
            Token::Ident("items".to_string()),
            Token::LBracket,
            Token::Int(0),
            Token::RBracket,
            Token::Dot,
            Token::Ident("name".to_string()),
        ]
    );
}

#[test]
fn test_lone_ampersand_is_an_error() {
    assert!(Lexer::tokenize("a & b").is_err());
    assert!(Lexer::tokenize("'unterminated").is_err());
}
