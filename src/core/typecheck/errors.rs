//! Type-check diagnostics.
//!
//! The checker carries errors as structured `TypeCheckErrorKind` and converts
//! them to spans/messages at reporting boundaries. Constraint-level failures
//! are recorded as `Failure` values first and promoted to error kinds only
//! when no fork of the solver survives.

use thiserror::Error;

use crate::core::decls::DeclId;
use crate::core::diag::{Span, SpannedError};
use crate::core::types::Type;

use super::constraints::LocatorId;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeCheckErrorKind {
    #[error("Type mismatch: {0} is not convertible to {1}")]
    TypeMismatch(Type, Type),

    #[error("Tuple size mismatch: {0} vs {1}")]
    TupleSizeMismatch(Type, Type),

    #[error("Tuple element name mismatch: {0} vs {1}")]
    TupleNameMismatch(Type, Type),

    #[error("Function types do not match: {0} vs {1}")]
    FunctionTypesMismatch(Type, Type),

    #[error("Type {0} does not conform to protocol {1}")]
    DoesNotConformToProtocol(Type, String),

    #[error("Type {0} has no member named {1}")]
    DoesNotHaveMember(Type, String),

    #[error("Type {0} has no constructors")]
    DoesNotHaveConstructor(Type),

    #[error("Type {0} is not an archetype")]
    NotAnArchetype(Type),

    #[error("Cannot form an infinite type binding {0} to {1}")]
    InfiniteType(Type, Type),

    #[error("Cannot bind lvalue-capable and rvalue-only type variables: {0} vs {1}")]
    LValueCapabilityMismatch(Type, Type),

    #[error("Expression type is ambiguous: candidates {}", render_candidates(.0))]
    Ambiguous(Vec<String>),

    #[error("No viable overload for {0}")]
    NoViableOverload(String),

    #[error("Type cannot be inferred")]
    CannotInferType,

    #[error("Value of type {0} is not callable")]
    NotCallable(Type),

    #[error("Cannot take the address of a value of type {0}")]
    NotAddressable(Type),

    #[error("Protocol {0}: missing witness for requirement {1}")]
    MissingWitness(String, String),

    #[error("Protocol {0}: ambiguous witnesses for requirement {1}")]
    AmbiguousWitness(String, String),

    #[error("Protocol {0}: associated type {1} deduced to conflicting types {2} and {3}")]
    ConflictingAssociatedType(String, String, Type, Type),

    #[error("Invalid reference in expression")]
    PoisonedReference,
}

fn render_candidates(candidates: &[String]) -> String {
    candidates.join(", ")
}

pub type TypeCheckError = SpannedError<TypeCheckErrorKind>;
pub use TypeCheckErrorKind as TEK;

impl TypeCheckErrorKind {
    pub fn at(self, span: Span) -> TypeCheckError {
        TypeCheckError::new(self, span)
    }
}

/// Failure category for one unsatisfiable constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    TypeMismatch,
    TupleSizeMismatch,
    TupleNameMismatch,
    FunctionTypesMismatch,
    DoesNotConform(DeclId),
    DoesNotHaveMember(String),
    DoesNotHaveConstructor,
    NotAnArchetype,
    OccursCheck,
    LValueCapability,
    NotCallable,
    NotAddressable,
    CannotInfer,
}

/// A recorded constraint failure: the kind, the two offending types, and the
/// provenance locator. Only the most advanced solver fork records failures.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    pub first: Type,
    pub second: Type,
    pub locator: LocatorId,
}
