//! Platform Oracles
//!
//! Concrete syntax and execution oracles, and the factory choosing between a
//! live platform connection and the unavailable stand-in.

pub mod splunk;

use std::sync::Arc;

use rule_pilot_quality_gates::{ExecutionOracle, SyntaxOracle, UnavailableOracle};

use crate::models::rule::Platform;
use crate::models::settings::AppConfig;
use crate::utils::error::AppResult;

pub use splunk::SplunkClient;

/// Syntax and execution oracles for one platform.
#[derive(Clone)]
pub struct OracleSet {
    pub syntax: Arc<dyn SyntaxOracle>,
    pub execution: Arc<dyn ExecutionOracle>,
}

impl OracleSet {
    /// Oracles for `platform`, falling back to [`UnavailableOracle`] when the
    /// platform has no live connection configured.
    pub fn for_platform(platform: Platform, config: &AppConfig) -> AppResult<Self> {
        match (platform, &config.splunk) {
            (Platform::Splunk, Some(settings)) => {
                let client = Arc::new(SplunkClient::new(settings)?);
                Ok(Self {
                    syntax: client.clone(),
                    execution: client,
                })
            }
            (Platform::Splunk, None) => Ok(Self::unavailable("no Splunk connection is configured")),
            (other, _) => Ok(Self::unavailable(format!(
                "no oracle exists for {}",
                other.display_name()
            ))),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        let oracle = Arc::new(UnavailableOracle::new(reason));
        Self {
            syntax: oracle.clone(),
            execution: oracle,
        }
    }
}
