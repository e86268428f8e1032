//! Parser for engine expressions
//!
//! Implements a recursive descent parser with operator precedence climbing
//! for parsing mathematical expressions into AST nodes.

use crate::EngineError;
use crate::ast::{BinaryOp, CompareOp, Expr};
use crate::number::Rational;
use std::fmt;

type Result<T> = std::result::Result<T, EngineError>;

/// Deepest parenthesis, list or call nesting the parser accepts
pub const MAX_NESTING_DEPTH: usize = 64;

/// Tallest tree accepted; evaluation and printing recurse once per level
pub const MAX_TREE_DEPTH: usize = 128;

/// Token types recognized by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Integer(Rational),
    Decimal(f64),
    Identifier(String),
    True,
    False,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "{n}"),
            Token::Decimal(n) => write!(f, "{n}"),
            Token::Identifier(name) => write!(f, "{name}"),
            Token::True => write!(f, "True"),
            Token::False => write!(f, "False"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Lexer for tokenizing engine expressions
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self { input: chars, position: 0, current_char }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let mut number = String::new();
        let mut is_decimal = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.' && !is_decimal {
                is_decimal = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Exponent suffix, as printed by numeric approximation (1.5E20)
        if self.current_char == Some('E')
            && matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '-')
        {
            is_decimal = true;
            number.push('e');
            self.advance();
            if self.current_char == Some('-') {
                number.push('-');
                self.advance();
            }
            while let Some(ch) = self.current_char.filter(char::is_ascii_digit) {
                number.push(ch);
                self.advance();
            }
        }

        if is_decimal {
            let value = number
                .parse::<f64>()
                .map_err(|e| EngineError::Parse(format!("invalid number '{number}': {e}")))?;
            Ok(Token::Decimal(value))
        } else {
            // Integers too large for exact arithmetic degrade to approximate values
            match number.parse::<i64>() {
                Ok(value) => Ok(Token::Integer(Rational::integer(value))),
                Err(_) => number
                    .parse::<f64>()
                    .map(Token::Decimal)
                    .map_err(|e| EngineError::Parse(format!("invalid number '{number}': {e}"))),
            }
        }
    }

    fn read_identifier(&mut self) -> Token {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match identifier.as_str() {
            "True" => Token::True,
            "False" => Token::False,
            _ => Token::Identifier(identifier),
        }
    }

    fn single(&mut self, token: Token) -> Result<Token> {
        self.advance();
        Ok(token)
    }

    fn pair(&mut self, second: char, matched: Token, otherwise: Token) -> Result<Token> {
        if self.peek() == Some(second) {
            self.advance();
            self.advance();
            Ok(matched)
        } else {
            self.advance();
            Ok(otherwise)
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        match self.current_char {
            None => Ok(Token::Eof),
            Some(ch) => match ch {
                '0'..='9' | '.' => self.read_number(),
                'a'..='z' | 'A'..='Z' | '_' => Ok(self.read_identifier()),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '*' => self.single(Token::Star),
                '/' => self.single(Token::Slash),
                '^' => self.single(Token::Caret),
                '(' => self.single(Token::LeftParen),
                ')' => self.single(Token::RightParen),
                '[' => self.single(Token::LeftBracket),
                ']' => self.single(Token::RightBracket),
                '{' => self.single(Token::LeftBrace),
                '}' => self.single(Token::RightBrace),
                ',' => self.single(Token::Comma),
                '<' => self.pair('=', Token::LessEqual, Token::Less),
                '>' => self.pair('=', Token::GreaterEqual, Token::Greater),
                '=' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        self.advance();
                        Ok(Token::Equal)
                    } else {
                        Err(EngineError::Parse("unexpected character '='. Did you mean '=='?".into()))
                    }
                }
                '!' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        self.advance();
                        Ok(Token::NotEqual)
                    } else {
                        Err(EngineError::Parse("unexpected character '!'".into()))
                    }
                }
                _ => Err(EngineError::Parse(format!("unexpected character '{ch}'"))),
            },
        }
    }
}

/// Parser for engine expressions
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    depth: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self> {
        let current_token = lexer.next_token()?;
        Ok(Self { lexer, current_token, depth: 0 })
    }

    fn advance(&mut self) -> Result<()> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.current_token == expected {
            self.advance()
        } else {
            Err(EngineError::Parse(format!("expected {}, found {}", expected, self.current_token)))
        }
    }

    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.nested(Self::parse_comparison)
    }

    /// Run `parse` one nesting level deeper, failing past `MAX_NESTING_DEPTH`.
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Result<Expr>) -> Result<Expr> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(EngineError::Parse("expression nested too deeply".to_string()));
        }
        self.depth += 1;
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current_token {
                Token::Equal => CompareOp::Equal,
                Token::NotEqual => CompareOp::NotEqual,
                Token::Less => CompareOp::Less,
                Token::LessEqual => CompareOp::LessEqual,
                Token::Greater => CompareOp::Greater,
                Token::GreaterEqual => CompareOp::GreaterEqual,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive()?;
            left = Expr::compare(left, op, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            match self.current_token {
                Token::Star | Token::Slash => {
                    let op =
                        if self.current_token == Token::Star { BinaryOp::Multiply } else { BinaryOp::Divide };
                    self.advance()?;
                    let right = self.parse_unary()?;
                    left = Expr::binary(left, op, right);
                }
                // Juxtaposition: 2x, 2(x+1), (a)(b)
                Token::Identifier(_) | Token::LeftParen => {
                    let right = self.parse_power()?;
                    left = Expr::binary(left, BinaryOp::Multiply, right);
                }
                _ => break,
            }
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.current_token {
            Token::Minus => {
                self.advance()?;
                let operand = self.nested(Self::parse_unary)?;
                Ok(Expr::neg(operand))
            }
            Token::Plus => {
                self.advance()?;
                self.nested(Self::parse_unary)
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_postfix()?;

        // Power is right-associative and binds tighter than unary minus on its left
        if self.current_token == Token::Caret {
            self.advance()?;
            let exponent = self.nested(Self::parse_unary)?;
            return Ok(Expr::binary(base, BinaryOp::Power, exponent));
        }

        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let expr = self.parse_primary()?;

        if let Expr::Symbol(name) = &expr {
            let close = match self.current_token {
                Token::LeftParen => Token::RightParen,
                Token::LeftBracket => Token::RightBracket,
                _ => return Ok(expr),
            };
            let name = name.clone();
            self.advance()?;
            let args = self.parse_arguments(&close)?;
            self.expect(close)?;
            return Ok(Expr::Call { name, args });
        }

        Ok(expr)
    }

    fn parse_arguments(&mut self, close: &Token) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if &self.current_token == close {
            return Ok(args);
        }

        args.push(self.parse_expression()?);
        while self.current_token == Token::Comma {
            self.advance()?;
            args.push(self.parse_expression()?);
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match &self.current_token {
            Token::Integer(value) => {
                let value = *value;
                self.advance()?;
                Ok(Expr::Exact(value))
            }
            Token::Decimal(value) => {
                let value = *value;
                self.advance()?;
                Ok(Expr::Real(value))
            }
            Token::True => {
                self.advance()?;
                Ok(Expr::Boolean(true))
            }
            Token::False => {
                self.advance()?;
                Ok(Expr::Boolean(false))
            }
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(Expr::Symbol(name))
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::LeftBrace => {
                self.advance()?;
                let items = self.parse_arguments(&Token::RightBrace)?;
                self.expect(Token::RightBrace)?;
                Ok(Expr::List(items))
            }
            _ => Err(EngineError::Parse(format!("unexpected token: {}", self.current_token))),
        }
    }
}

/// Parse an expression string into an AST
pub fn parse_expression(input: &str) -> Result<Expr> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    let expr = parser.parse_expression()?;

    // Ensure we've consumed all tokens
    if parser.current_token != Token::Eof {
        return Err(EngineError::Parse(format!(
            "unexpected token after expression: {}",
            parser.current_token
        )));
    }
    if expr.depth() > MAX_TREE_DEPTH {
        return Err(EngineError::Parse("expression nested too deeply".to_string()));
    }

    Ok(expr)
}
