//! # domains
//!
//! The central domain model and interface definitions for the UpNest
//! interaction engine: roles, permission kinds, posts/comments/replies,
//! chat entities, the API response envelope, and the port traits every
//! transport adapter must implement.

pub mod envelope;
pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use envelope::*;
pub use error::*;
pub use models::*;
pub use traits::*;
