//! Business-layer errors.

use thiserror::Error;

use crate::dispatch::{Failure, FailureKind};

/// A rule violation raised by a concept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConceptError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotAllowed(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    BadValues(String),
}

impl ConceptError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ConceptError::NotFound(_) => FailureKind::NotFound,
            ConceptError::Unauthenticated(_) => FailureKind::Unauthorized,
            ConceptError::NotAllowed(_) => FailureKind::Forbidden,
            ConceptError::AlreadyExists(_) => FailureKind::Conflict,
            ConceptError::BadValues(_) => FailureKind::BadValues,
        }
    }
}

impl From<ConceptError> for Failure {
    fn from(err: ConceptError) -> Self {
        Failure::new(err.kind(), err.to_string())
    }
}

pub type ConceptResult<T> = Result<T, ConceptError>;
