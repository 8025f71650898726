//! # Bootwire Support
//!
//! Shared utilities for the Bootwire DI runtime.
//!
//! This crate provides:
//! - Text rendering for error messages and initialization plans
//! - Conventional service naming (`UserService` → `user_service`)

pub mod rendering;
