//! # Response Envelope
//!
//! Every transport operation — real REST backend or in-memory mock —
//! answers with the same `{ success, data, message }` shape. Services are
//! written against this envelope, never against a specific transport.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "none")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn ok_with(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Unwraps the payload, mapping a refused or malformed envelope to
    /// `AppError::Remote`.
    pub fn into_result(self) -> Result<T, AppError> {
        let message = self.message;
        if !self.success {
            return Err(AppError::Remote(
                message.unwrap_or_else(|| "operation refused".into()),
            ));
        }
        self.data
            .ok_or_else(|| AppError::Remote("response missing data".into()))
    }

    /// Like `into_result`, but for operations whose payload is irrelevant
    /// (deletes return `data: null` on some backends).
    pub fn accepted(self) -> Result<(), AppError> {
        if self.success {
            Ok(())
        } else {
            Err(AppError::Remote(
                self.message.unwrap_or_else(|| "operation refused".into()),
            ))
        }
    }
}
