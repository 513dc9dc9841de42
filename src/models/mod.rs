//! Data Models
//!
//! Contains all data structures used throughout the application.

pub mod dsl;
pub mod platform_rule;
pub mod rule;
pub mod settings;

pub use dsl::*;
pub use platform_rule::*;
pub use rule::*;
pub use settings::*;
