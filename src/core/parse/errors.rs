use thiserror::Error;

use crate::core::diag::{Span, SpannedError};
use crate::core::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("Expected declaration, found: {0}")]
    ExpectedDecl(Token),

    #[error("Expected {0}, found: {1}")]
    ExpectedToken(TokenKind, Token),

    #[error("Expected identifier, found: {0}")]
    ExpectedIdent(Token),

    #[error("Expected type, found: {0}")]
    ExpectedType(Token),

    #[error("Expected primary expression, found: {0}")]
    ExpectedPrimary(Token),

    #[error("Expected pattern, found: {0}")]
    ExpectedPattern(Token),

    #[error("Expected statement, found: {0}")]
    ExpectedStmt(Token),

    #[error("Expected closure parameter, found: {0}")]
    ExpectedClosureParam(Token),

    #[error("Expected `>` to close generic arguments, found: {0}")]
    ExpectedGenericClose(Token),

    #[error("Adjacent non-associative operators `{0}` and `{1}`")]
    NonAssociativeOperators(String, String),

    #[error("Protocol members cannot have bodies")]
    ProtocolMemberHasBody,
}

pub type ParseError = SpannedError<ParseErrorKind>;

impl ParseErrorKind {
    pub fn at(self, span: Span) -> ParseError {
        ParseError::new(self, span)
    }
}
