//! The module contains the errors the engine can return.
//!
//! Every variant belongs to one [`ErrorKind`], which is what collaborators
//! (API layer, CLI) should branch on:
//!
//! - [`Validation`]: malformed input ([`InvalidAmount`], [`InvalidInput`],
//!   [`InvalidId`]).
//! - [`Authorization`]: the caller lacks the role for the action
//!   ([`Forbidden`]).
//! - [`Conflict`]: a state-machine precondition failed ([`Conflict`],
//!   [`ExistingKey`]).
//! - [`NotFound`]: a referenced record is absent ([`KeyNotFound`]).
//!
//!  [`Validation`]: ErrorKind::Validation
//!  [`Authorization`]: ErrorKind::Authorization
//!  [`Conflict`]: EngineError::Conflict
//!  [`NotFound`]: ErrorKind::NotFound
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`InvalidId`]: EngineError::InvalidId
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`KeyNotFound`]: EngineError::KeyNotFound
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Coarse error taxonomy exposed to collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Conflict,
    NotFound,
    Internal,
}

impl EngineError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) | Self::InvalidInput(_) | Self::InvalidId(_) => {
                ErrorKind::Validation
            }
            Self::Forbidden(_) => ErrorKind::Authorization,
            Self::Conflict(_) | Self::ExistingKey(_) => ErrorKind::Conflict,
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Maps a unique-index violation to [`EngineError::Conflict`], leaving any
    /// other database error untouched.
    pub(crate) fn conflict_on_unique(err: DbErr, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict(message.to_string()),
            _ => Self::Database(err),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
