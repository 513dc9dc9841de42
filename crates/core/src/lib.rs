//! RulePilot Core
//!
//! Foundational error types and pipeline event types for the RulePilot
//! workspace. This crate has no dependencies on the completion client,
//! the oracles, or the generation services.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `streaming` - Progress events pushed by the generation pipeline (`PipelineEvent`)

pub mod error;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{PipelineEvent, FINAL_RESULT_STAGE, FINAL_RULE_STAGE};
