//! RulePilot - Rust Library
//!
//! Generates, repairs and translates security detection rules with LLM
//! pipelines. It includes:
//! - Data models (platforms, DSL programs, platform rules, settings)
//! - Generation services (decomposition, rendering, reflection, repair, conversion)
//! - Platform oracles used as repair feedback
//! - Configuration loading and utilities

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export commonly used items
pub use models::dsl::{DslKeyword, DslProgram, DslStatement};
pub use models::platform_rule::{PlatformRule, Segment, SegmentLabel};
pub use models::rule::{Platform, RuleDescription};
pub use models::settings::AppConfig;
pub use storage::config::ConfigService;
pub use utils::error::{AppError, AppResult};
