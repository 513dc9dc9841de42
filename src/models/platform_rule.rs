//! Platform Rules
//!
//! A detection query tagged with its platform and split into segments on the
//! platform's separator. Segment text is kept raw (surrounding whitespace
//! included) so the pieces always join back to the original text.

use serde::{Deserialize, Serialize};

use crate::models::rule::Platform;
use crate::utils::error::{AppError, AppResult};

/// Separator used when joining converted segments back into a query.
pub const CONVERTED_SEGMENT_JOINER: &str = " | ";

/// Operation label inferred for a segment by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentLabel {
    pub operation_type: String,
    #[serde(default)]
    pub input_fields: Vec<String>,
    #[serde(default)]
    pub output_fields: Vec<String>,
}

/// One syntactic unit of a platform query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operation_kind: Option<String>,
    #[serde(default)]
    input_fields: Vec<String>,
    #[serde(default)]
    output_fields: Vec<String>,
}

impl Segment {
    fn raw(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            operation_kind: None,
            input_fields: Vec::new(),
            output_fields: Vec::new(),
        }
    }

    fn labelled(text: String, label: Option<SegmentLabel>) -> Self {
        match label {
            Some(label) => Self {
                text,
                operation_kind: Some(label.operation_type),
                input_fields: label.input_fields,
                output_fields: label.output_fields,
            },
            None => Self::raw(text),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn operation_kind(&self) -> Option<&str> {
        self.operation_kind.as_deref()
    }

    pub fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    pub fn output_fields(&self) -> &[String] {
        &self.output_fields
    }
}

/// A platform-tagged query and its segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRule {
    platform: Platform,
    text: String,
    segments: Vec<Segment>,
}

impl PlatformRule {
    /// Split raw query text on the platform separator.
    ///
    /// Fails with a configuration error for platforms without a separator.
    pub fn parse(platform: Platform, text: impl Into<String>) -> AppResult<Self> {
        let separator = separator_for(platform)?;
        let text = text.into();
        let segments = text.split(separator).map(Segment::raw).collect();
        Ok(Self {
            platform,
            text,
            segments,
        })
    }

    /// Build a rule from converted segments, in order.
    ///
    /// The segments are kept exactly as given and the text is their
    /// `" | "`-joined concatenation.
    pub fn from_converted_segments(platform: Platform, segments: Vec<String>) -> AppResult<Self> {
        separator_for(platform)?;
        let text = segments.join(CONVERTED_SEGMENT_JOINER);
        Ok(Self {
            platform,
            text,
            segments: segments.into_iter().map(Segment::raw).collect(),
        })
    }

    /// Attach classifier labels, one slot per segment.
    pub fn with_labels(self, labels: Vec<Option<SegmentLabel>>) -> AppResult<Self> {
        if labels.len() != self.segments.len() {
            return Err(AppError::internal(format!(
                "expected {} segment labels, got {}",
                self.segments.len(),
                labels.len()
            )));
        }
        let segments = self
            .segments
            .into_iter()
            .zip(labels)
            .map(|(segment, label)| Segment::labelled(segment.text, label))
            .collect();
        Ok(Self {
            platform: self.platform,
            text: self.text,
            segments,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl std::fmt::Display for PlatformRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rule Type: {}\nRule Content: {}",
            self.platform.display_name(),
            self.text
        )
    }
}

fn separator_for(platform: Platform) -> AppResult<char> {
    platform.segment_separator().ok_or_else(|| {
        AppError::config(format!(
            "{} rules cannot be split into segments",
            platform.display_name()
        ))
    })
}
