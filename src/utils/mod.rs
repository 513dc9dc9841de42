//! Utilities
//!
//! Common utilities used throughout the application.

pub mod error;
pub mod fence;

pub use error::*;
pub use fence::*;
