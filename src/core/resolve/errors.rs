use thiserror::Error;

use crate::core::diag::{Span, SpannedError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveErrorKind {
    #[error("Unresolved name: {0}")]
    UnresolvedName(String),

    #[error("Unresolved type name: {0}")]
    UnresolvedType(String),

    #[error("Duplicate declaration: {0}")]
    DuplicateDecl(String),

    #[error("`self` used outside of a type member")]
    SelfOutsideType,

    #[error("`Self` used outside of a protocol or type member")]
    SelfTypeOutsideType,

    #[error("{0} is not a protocol")]
    NotAProtocol(String),

    #[error("Invalid type argument count for {0}: expected {1}, found {2}")]
    TypeArgCountMismatch(String, usize, usize),
}

pub type ResolveError = SpannedError<ResolveErrorKind>;

impl ResolveErrorKind {
    pub fn at(self, span: Span) -> ResolveError {
        ResolveError::new(self, span)
    }
}
