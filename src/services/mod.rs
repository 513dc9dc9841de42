//! Services
//!
//! The generation pipeline and its collaborators:
//!
//! - `decomposer` / `dsl_optimizer` - description to DSL program
//! - `renderer` - DSL program to platform query
//! - `scorer` / `repair` / `agent` - reflection, repair and the iteration loop
//! - `generator` - non-agent generation paths
//! - `conversion` - segment-wise translation between platforms
//! - `oracles` - platform syntax and execution oracles

pub mod agent;
pub mod conversion;
pub mod decomposer;
pub mod dsl_optimizer;
pub mod generator;
pub mod oracles;
pub mod prompts;
pub mod renderer;
pub mod repair;
pub mod scorer;


pub use agent::{AgentRun, IterationLoop, IterationRound, RunOutcome};
pub use conversion::{RuleConverter, SegmentClassifier};
pub use decomposer::{
    Decomposer, Decomposition, DecompositionStep, StepError, StepOutput, StepRecord,
};
pub use dsl_optimizer::DslOptimizer;
pub use generator::RuleGenerator;
pub use oracles::{OracleSet, SplunkClient};
pub use renderer::Renderer;
pub use repair::{DimensionFeedback, RepairController, RepairOutcome};
pub use scorer::ReflectionScorer;
