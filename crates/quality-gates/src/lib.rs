//! RulePilot Quality Gates
//!
//! Reflection score types, the threshold gate that decides whether a
//! candidate query is accepted, and the traits of the external oracles used
//! as repair feedback:
//!
//! - `models` - Quality dimensions and reflection scores
//! - `gate` - Threshold evaluation (`QualityGate`, `GateReport`)
//! - `oracle` - Syntax and execution oracle traits

pub mod gate;
pub mod models;
pub mod oracle;

// Re-export core model types
pub use models::{GateStatus, QualityDimension, ReflectionScore, ASSUME_PASS_COMMENT};

// Re-export gate types
pub use gate::{DimensionResult, GateReport, QualityGate, DEFAULT_THRESHOLD};

// Re-export oracle types
pub use oracle::{
    ExecutionOracle, OracleError, OracleResult, SyntaxOracle, SyntaxVerdict, UnavailableOracle,
};
