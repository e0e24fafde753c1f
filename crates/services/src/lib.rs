//! # services
//!
//! The application logic of the UpNest interaction engine: the role
//! permission matrix and checker, the optimistic interaction store for
//! posts and comments, and the chat service. Everything here is written
//! against the port traits in `domains` and never against a transport.

pub mod chat;
pub mod interactions;
pub mod permissions;

pub use chat::ChatService;
pub use interactions::InteractionStore;
pub use permissions::{grants, has_permission, PermissionChecker};
