//! Type definitions for vibe-corpus manifests

use serde::{Deserialize, Serialize};
use vibe_fixture_model::{Category, Finding, Severity};

/// Corpus manifest structure.
///
/// Loaded from `.vibe-corpus.toml` (or a `.yaml`/`.yml` file), this struct
/// describes the defect kinds, fixture files and variant groups of a corpus.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CorpusManifest {
    /// Start from the standard defect catalog before registering `kinds`
    #[serde(default = "default_true")]
    pub standard_catalog: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<KindEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupEntry>,
}

impl Default for CorpusManifest {
    fn default() -> Self {
        Self {
            standard_catalog: true,
            kinds: Vec::new(),
            files: Vec::new(),
            groups: Vec::new(),
        }
    }
}

/// Extra defect kind registered on top of (or instead of) the standard catalog
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KindEntry {
    pub id: String,
    pub category: Category,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

/// One fixture file and its units in declaration order
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    /// Closing text after the last unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epilogue: Option<String>,
    #[serde(default)]
    pub records: Vec<RecordEntry>,
}

/// One fixture unit
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecordEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub kinds: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<String>,
    /// Raw suppression annotation as written in `source`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Overrides the expected detections (defaults to `kinds`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Vec<String>>,
    /// Keys declared by map literals in the unit, in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub literal_keys: Vec<String>,
    pub source: String,
}

/// Variant group declaration.
///
/// Without `reduced` the member files must cover identical kinds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GroupEntry {
    pub id: String,
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reduced: Vec<String>,
}

/// Scanner findings file accepted by `--verify`.
///
/// Either a bare JSON array of findings or an object with a `findings` array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FindingsFile {
    List(Vec<Finding>),
    Wrapped { findings: Vec<Finding> },
}

impl FindingsFile {
    pub fn into_findings(self) -> Vec<Finding> {
        match self {
            FindingsFile::List(findings) | FindingsFile::Wrapped { findings } => findings,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_severity() -> Severity {
    Severity::Medium
}
