//! # AppError
//!
//! Centralized error handling for the UpNest interaction engine.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Post, Comment, Conversation)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty comment body, unknown permission kind)
    #[error("validation error: {0}")]
    Validation(String),

    /// Permission check failed — the action is denied, never attempted
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend answered but refused the operation (`success: false`)
    #[error("remote error: {0}")]
    Remote(String),

    /// The backend could not be reached at all
    #[error("transport error: {0}")]
    Transport(String),

    /// Illegal state transition (e.g., moderating an already-rejected comment)
    #[error("conflict: {0}")]
    Conflict(String),
}

/// A specialized Result type for UpNest domain logic.
pub type Result<T> = std::result::Result<T, AppError>;
