//! Rule Models
//!
//! Target platforms and the natural-language rule description that starts
//! every pipeline run.

use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

// ============================================================================
// Platform
// ============================================================================

/// A SIEM platform a detection query can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Splunk,
    Sentinel,
    Elastic,
}

/// Separator lookup table. Platforms absent here cannot be segmented.
const SEGMENT_SEPARATORS: &[(Platform, char)] = &[(Platform::Splunk, '|'), (Platform::Sentinel, '|')];

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Splunk, Platform::Sentinel, Platform::Elastic];

    /// Name used inside prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Splunk => "Splunk",
            Platform::Sentinel => "Microsoft Sentinel",
            Platform::Elastic => "Elastic",
        }
    }

    /// Language tag of the code fence a query for this platform is wrapped in.
    pub fn fence_tag(&self) -> &'static str {
        match self {
            Platform::Splunk => "spl",
            Platform::Sentinel => "kql",
            Platform::Elastic => "eql",
        }
    }

    /// Lower-case identifier, as accepted by `FromStr`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Splunk => "splunk",
            Platform::Sentinel => "sentinel",
            Platform::Elastic => "elastic",
        }
    }

    /// Character separating the segments of a query, if the platform has one.
    pub fn segment_separator(&self) -> Option<char> {
        SEGMENT_SEPARATORS
            .iter()
            .find(|(platform, _)| platform == self)
            .map(|(_, separator)| *separator)
    }

    /// Whether rules for this platform can be segmented and converted.
    pub fn supports_conversion(&self) -> bool {
        self.segment_separator().is_some()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "splunk" => Ok(Platform::Splunk),
            "sentinel" | "microsoft sentinel" => Ok(Platform::Sentinel),
            "elastic" => Ok(Platform::Elastic),
            other => Err(AppError::config(format!("Rule type {} is not supported.", other))),
        }
    }
}

// ============================================================================
// Rule Description
// ============================================================================

/// Natural-language request for a detection rule.
///
/// Immutable once built; every stage of a run reads from the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDescription {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_log: Option<String>,
    pub platform: Platform,
}

impl RuleDescription {
    pub fn new(text: impl Into<String>, platform: Platform) -> Self {
        Self {
            text: text.into(),
            required_fields: None,
            sample_log: None,
            platform,
        }
    }

    /// Attach the field list the query must produce. Blank text is ignored.
    pub fn with_required_fields(mut self, fields: impl Into<String>) -> Self {
        self.required_fields = non_blank(fields.into());
        self
    }

    /// Attach an example log line. Blank text is ignored.
    pub fn with_sample_log(mut self, log: impl Into<String>) -> Self {
        self.sample_log = non_blank(log.into());
        self
    }
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
