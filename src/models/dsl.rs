//! Intermediate Representation
//!
//! The DSL the decomposer emits: a closed vocabulary of operation kinds and
//! programs made of one statement per line. Statements are free text; a
//! leading keyword is recognised but not required.

use serde::{Deserialize, Serialize};

// ============================================================================
// Vocabulary
// ============================================================================

/// Operation kinds of the DSL vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DslKeyword {
    Filter,
    Extract,
    Transform,
    Lookup,
    Aggregate,
    Rename,
    Join,
    Sort,
    Append,
    Fill,
    Dedup,
    Output,
    Bucket,
    Apply,
    Debug,
}

impl DslKeyword {
    /// The whole vocabulary, in listing order.
    pub const ALL: [DslKeyword; 15] = [
        DslKeyword::Filter,
        DslKeyword::Extract,
        DslKeyword::Transform,
        DslKeyword::Lookup,
        DslKeyword::Aggregate,
        DslKeyword::Rename,
        DslKeyword::Join,
        DslKeyword::Sort,
        DslKeyword::Append,
        DslKeyword::Fill,
        DslKeyword::Dedup,
        DslKeyword::Output,
        DslKeyword::Bucket,
        DslKeyword::Apply,
        DslKeyword::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DslKeyword::Filter => "FILTER",
            DslKeyword::Extract => "EXTRACT",
            DslKeyword::Transform => "TRANSFORM",
            DslKeyword::Lookup => "LOOKUP",
            DslKeyword::Aggregate => "AGGREGATE",
            DslKeyword::Rename => "RENAME",
            DslKeyword::Join => "JOIN",
            DslKeyword::Sort => "SORT",
            DslKeyword::Append => "APPEND",
            DslKeyword::Fill => "FILL",
            DslKeyword::Dedup => "DEDUP",
            DslKeyword::Output => "OUTPUT",
            DslKeyword::Bucket => "BUCKET",
            DslKeyword::Apply => "APPLY",
            DslKeyword::Debug => "DEBUG",
        }
    }

    pub fn definition(&self) -> &'static str {
        match self {
            DslKeyword::Filter => "Filters data based on conditions or field values.",
            DslKeyword::Extract => "Extracts fields or values from raw data or JSON-like structures.",
            DslKeyword::Transform => {
                "Performs calculations or transformations on fields, including renaming or formatting."
            }
            DslKeyword::Lookup => "Joins external lookup tables with the current dataset to enrich data.",
            DslKeyword::Aggregate => {
                "Groups and summarizes data by applying statistical functions like count, sum, min, or max."
            }
            DslKeyword::Rename => "Renames fields to simplify field names or align with conventions.",
            DslKeyword::Join => {
                "Combines results from different datasets or subqueries based on common fields."
            }
            DslKeyword::Sort => "Sorts results based on specified fields in ascending or descending order.",
            DslKeyword::Append => "Appends additional data or results from a subquery to the current dataset.",
            DslKeyword::Fill => "Fills null or missing values in fields with default or calculated values.",
            DslKeyword::Dedup => "Removes duplicate records based on specified fields.",
            DslKeyword::Output => "Formats or outputs results for display or export.",
            DslKeyword::Bucket => {
                "Groups data into discrete ranges or intervals, such as time or numeric ranges."
            }
            DslKeyword::Apply => {
                "Applies pre-trained models or predefined rules to the data for evaluation."
            }
            DslKeyword::Debug => "Used for debugging queries or analyzing performance issues.",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|keyword| keyword.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for DslKeyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The vocabulary as `KIND: definition` lines, for embedding in prompts.
pub fn vocabulary_listing() -> String {
    DslKeyword::ALL
        .iter()
        .map(|keyword| format!("{}: {}", keyword.as_str(), keyword.definition()))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Statements & Programs
// ============================================================================

/// One line of the intermediate representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DslStatement(String);

impl DslStatement {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Operation kind the line starts with, if any.
    pub fn keyword(&self) -> Option<DslKeyword> {
        let head = self
            .0
            .trim_start()
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()?;
        DslKeyword::from_name(head)
    }
}

impl std::fmt::Display for DslStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered DSL statements. Order is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DslProgram {
    statements: Vec<DslStatement>,
}

impl DslProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a program from text, keeping non-blank lines in order.
    pub fn from_text(text: &str) -> Self {
        Self {
            statements: text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(DslStatement::new)
                .collect(),
        }
    }

    /// Append statements at the end.
    pub fn append<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statements.extend(lines.into_iter().map(DslStatement::new));
    }

    pub fn statements(&self) -> &[DslStatement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statements that do not start with a vocabulary keyword.
    pub fn untagged(&self) -> impl Iterator<Item = &DslStatement> {
        self.statements.iter().filter(|s| s.keyword().is_none())
    }

    /// Newline-joined statements.
    pub fn to_text(&self) -> String {
        self.statements
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Display for DslProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_text())
    }
}
