//! # transport-adapters
//!
//! Implementations of the `domains` port traits: an in-memory mock
//! transport with simulated latency and an offline switch, a REST client
//! for the real backend (feature `http-rest`), a failover wrapper that
//! falls back to a secondary transport when the primary is unreachable,
//! and an in-process token store.

pub mod failover;
pub mod memory;
pub mod token;

#[cfg(feature = "http-rest")]
pub mod rest;

pub use failover::Failover;
pub use memory::{MemoryTransport, SeedData};
pub use token::MemoryTokenStore;

#[cfg(feature = "http-rest")]
pub use rest::RestTransport;
