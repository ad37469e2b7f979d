// crates/backend-lib/src/middleware/mod.rs

//! Request middleware and session cookie plumbing.

pub mod cookie;
pub mod gate;

pub use gate::require_identity;
