//! # AppError
//!
//! Centralized error handling for the Rusty-Forum data layer.
//! Typed outcomes (`AlreadyExists`, `NotFound`) are kept apart from
//! infrastructure failures so the API layer can map them to distinct codes.

use std::fmt;

use thiserror::Error;

/// The entity kind an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Session,
    Category,
    Sub,
    Thread,
    Post,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::User => "user",
            Entity::Session => "session",
            Entity::Category => "category",
            Entity::Sub => "sub",
            Entity::Thread => "thread",
            Entity::Post => "post",
        };
        f.write_str(name)
    }
}

/// The primary error type for all rf-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// A unique field value is already held by a live record
    /// (e.g., duplicate username, category title).
    #[error("{entity} already exists: {value}")]
    AlreadyExists { entity: Entity, value: String },

    /// A mutation targeted a record that is absent.
    /// Lookups never produce this; they return `None`.
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: Entity, id: String },

    /// A stored hash could not be mapped onto its typed record.
    #[error("invalid record at {key}: {reason}")]
    InvalidRecord { key: String, reason: String },

    /// Input rejected before touching the store
    /// (e.g., a session token that cannot be a store key).
    #[error("validation error: {0}")]
    Validation(String),

    /// Infrastructure failure (e.g., store connection lost), passed through unmodified.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl AppError {
    pub fn already_exists(entity: Entity, value: impl Into<String>) -> Self {
        AppError::AlreadyExists {
            entity,
            value: value.into(),
        }
    }

    pub fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        AppError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for the uniqueness-violation outcome of any entity.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, AppError::AlreadyExists { .. })
    }
}

/// A specialized Result type for Rusty-Forum logic.
pub type Result<T> = std::result::Result<T, AppError>;
