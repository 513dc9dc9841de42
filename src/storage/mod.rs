//! Storage Layer
//!
//! Configuration loading. Nothing is persisted by the application.

pub mod config;

pub use config::*;
