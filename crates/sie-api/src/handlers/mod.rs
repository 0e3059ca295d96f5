//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod discovery;
pub mod entities;
pub mod health;
pub mod relationships;

/// Largest page a list endpoint returns
pub const MAX_LIMIT: usize = 1000;

/// Page size when the caller gives none
pub const DEFAULT_LIMIT: usize = 100;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}
