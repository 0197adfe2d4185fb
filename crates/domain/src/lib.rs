//! # Meridian Domain
//!
//! Shared domain types for the Meridian client runtime.
//!
//! This crate contains:
//! - The request error taxonomy and `Result` alias
//!
//! ## Architecture
//! - No dependencies on other Meridian crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod errors;

// Re-export commonly used items
pub use errors::*;
