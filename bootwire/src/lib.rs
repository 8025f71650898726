//! # Bootwire: name-based dependency injection for Rust
//!
//! Declare services by name with their constructor dependencies, and
//! Bootwire works out a deterministic initialization order, builds each
//! service once per scope, and hands them out through a thread-safe
//! [`ServiceLocator`].

pub use bootwire_container::*;
pub use bootwire_support::*;
