use crate::core::diag::{Position, Span, SpannedError};
use enum_display::EnumDisplay;
use std::fmt::{Display, Formatter};
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

#[derive(Debug, PartialEq, Clone, EnumDisplay)]
pub enum TokenKind {
    // Identifiers
    #[display("Ident({0})")]
    Ident(String),
    #[display("Operator({0})")]
    Operator(String),

    // Literals
    #[display("IntLit({0})")]
    IntLit(i64),
    #[display("FloatLit({0})")]
    FloatLit(f64),
    #[display("BoolLit({0})")]
    BoolLit(bool),
    #[display("StringLit({0})")]
    StringLit(String),

    // Keywords
    #[display("func")]
    KwFunc,
    #[display("struct")]
    KwStruct,
    #[display("class")]
    KwClass,
    #[display("enum")]
    KwEnum,
    #[display("case")]
    KwCase,
    #[display("protocol")]
    KwProtocol,
    #[display("init")]
    KwInit,
    #[display("var")]
    KwVar,
    #[display("let")]
    KwLet,
    #[display("static")]
    KwStatic,
    #[display("prefix")]
    KwPrefix,
    #[display("postfix")]
    KwPostfix,
    #[display("return")]
    KwReturn,
    #[display("if")]
    KwIf,
    #[display("else")]
    KwElse,
    #[display("in")]
    KwIn,
    #[display("type")]
    KwType,
    #[display("Self")]
    KwSelfType,
    #[display("self")]
    KwSelfValue,

    // Punctuation
    #[display("(")]
    LParen,
    #[display(")")]
    RParen,
    #[display("{{")]
    LBrace,
    #[display("}}")]
    RBrace,
    #[display("[")]
    LBracket,
    #[display("]")]
    RBracket,
    #[display(",")]
    Comma,
    #[display(":")]
    Colon,
    #[display(";")]
    Semi,
    #[display(".")]
    Dot,
    #[display("->")]
    Arrow,
    #[display("=")]
    Assign,
    #[display("...")]
    Ellipsis,
    #[display("_")]
    Underscore,

    #[display("<EOF>")]
    Eof,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LexErrorKind {
    #[error("Unexpected character: {0}")]
    UnexpectedChar(char),

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("Unterminated string literal")]
    UnterminatedString,
}

pub type LexError = SpannedError<LexErrorKind>;

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    pos: Position,
}

const OPERATOR_CHARS: &str = "+-*/%<>=!&|^~?";

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            pos: Position::start(),
        }
    }

    /// Tokenizes the whole source, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia();
        let start = self.pos;
        let Some(&ch) = self.chars.peek() else {
            return Ok(self.token_at(TokenKind::Eof, start));
        };

        if ch.is_ascii_digit() {
            return self.lex_number(start);
        }
        if ch == '"' {
            return self.lex_string(start);
        }
        if ch.is_alphabetic() || ch == '_' {
            return Ok(self.lex_word(start));
        }

        match ch {
            '(' => Ok(self.single(TokenKind::LParen, start)),
            ')' => Ok(self.single(TokenKind::RParen, start)),
            '{' => Ok(self.single(TokenKind::LBrace, start)),
            '}' => Ok(self.single(TokenKind::RBrace, start)),
            '[' => Ok(self.single(TokenKind::LBracket, start)),
            ']' => Ok(self.single(TokenKind::RBracket, start)),
            ',' => Ok(self.single(TokenKind::Comma, start)),
            ':' => Ok(self.single(TokenKind::Colon, start)),
            ';' => Ok(self.single(TokenKind::Semi, start)),
            '.' => {
                self.advance();
                if self.chars.peek() == Some(&'.') {
                    self.advance();
                    if self.chars.peek() == Some(&'.') {
                        self.advance();
                        Ok(self.token_at(TokenKind::Ellipsis, start))
                    } else {
                        Err(LexErrorKind::UnexpectedChar('.').at(self.span_from(start)))
                    }
                } else {
                    Ok(self.token_at(TokenKind::Dot, start))
                }
            }
            c if OPERATOR_CHARS.contains(c) => Ok(self.lex_operator(start)),
            other => {
                self.advance();
                Err(LexErrorKind::UnexpectedChar(other).at(self.span_from(start)))
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    // Line comments only; a lone '/' is an operator.
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'/') {
                        while let Some(&c) = self.chars.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn lex_number(&mut self, start: Position) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        // A '.' is part of the number only when followed by a digit, so member
        // access on literals still lexes as Dot.
        let mut is_float = false;
        if self.chars.peek() == Some(&'.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('.');
                self.advance();
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        let kind = if is_float {
            text.parse::<f64>()
                .map(TokenKind::FloatLit)
                .map_err(|_| LexErrorKind::InvalidNumber(text.clone()).at(self.span_from(start)))?
        } else {
            text.parse::<i64>()
                .map(TokenKind::IntLit)
                .map_err(|_| LexErrorKind::InvalidNumber(text.clone()).at(self.span_from(start)))?
        };
        Ok(self.token_at(kind, start))
    }

    fn lex_string(&mut self, start: Position) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.chars.peek() {
                None | Some('\n') => {
                    return Err(LexErrorKind::UnterminatedString.at(self.span_from(start)));
                }
                Some('"') => {
                    self.advance();
                    return Ok(self.token_at(TokenKind::StringLit(text), start));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.chars.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(&other) => other,
                        None => {
                            return Err(LexErrorKind::UnterminatedString.at(self.span_from(start)));
                        }
                    };
                    text.push(escaped);
                    self.advance();
                }
                Some(&c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }

    fn lex_word(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = match text.as_str() {
            "func" => TokenKind::KwFunc,
            "struct" => TokenKind::KwStruct,
            "class" => TokenKind::KwClass,
            "enum" => TokenKind::KwEnum,
            "case" => TokenKind::KwCase,
            "protocol" => TokenKind::KwProtocol,
            "init" => TokenKind::KwInit,
            "var" => TokenKind::KwVar,
            "let" => TokenKind::KwLet,
            "static" => TokenKind::KwStatic,
            "prefix" => TokenKind::KwPrefix,
            "postfix" => TokenKind::KwPostfix,
            "return" => TokenKind::KwReturn,
            "if" => TokenKind::KwIf,
            "else" => TokenKind::KwElse,
            "in" => TokenKind::KwIn,
            "type" => TokenKind::KwType,
            "Self" => TokenKind::KwSelfType,
            "self" => TokenKind::KwSelfValue,
            "true" => TokenKind::BoolLit(true),
            "false" => TokenKind::BoolLit(false),
            "_" => TokenKind::Underscore,
            _ => TokenKind::Ident(text),
        };
        self.token_at(kind, start)
    }

    fn lex_operator(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if OPERATOR_CHARS.contains(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = match text.as_str() {
            "=" => TokenKind::Assign,
            "->" => TokenKind::Arrow,
            _ => TokenKind::Operator(text),
        };
        self.token_at(kind, start)
    }

    fn single(&mut self, kind: TokenKind, start: Position) -> Token {
        self.advance();
        self.token_at(kind, start)
    }

    fn advance(&mut self) {
        if let Some(c) = self.chars.next() {
            self.pos.offset += c.len_utf8();
            if c == '\n' {
                self.pos.line += 1;
                self.pos.column = 1;
            } else {
                self.pos.column += 1;
            }
        }
    }

    fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.pos)
    }

    fn token_at(&self, kind: TokenKind, start: Position) -> Token {
        Token {
            kind,
            span: self.span_from(start),
        }
    }
}

impl LexErrorKind {
    pub fn at(self, span: Span) -> LexError {
        LexError::new(self, span)
    }
}

#[cfg(test)]
#[path = "../tests/t_lexer.rs"]
mod tests;
