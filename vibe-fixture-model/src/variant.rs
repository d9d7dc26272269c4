//! Variant groups and reconciliation of near-duplicate corpus files

use crate::catalog::KindId;
use crate::corpus::CorpusFile;
use crate::error::{ModelError, ModelResult};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

/// How sibling files in a group are allowed to differ in defect coverage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageDeclaration {
    /// Every sibling covers exactly the same kinds
    Identical,
    /// Siblings may omit the listed kinds and nothing else
    Reduced(BTreeSet<KindId>),
}

/// Two or more corpus files representing the same scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantGroup {
    pub id: String,
    /// Member file names; the first one is the baseline for diffs
    pub files: Vec<String>,
    pub coverage: CoverageDeclaration,
}

impl VariantGroup {
    pub fn identical<S, I, F>(id: S, files: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            id: id.into(),
            files: files.into_iter().map(Into::into).collect(),
            coverage: CoverageDeclaration::Identical,
        }
    }

    pub fn reduced<S, I, F, R, K>(id: S, files: I, reduced: R) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
        R: IntoIterator<Item = K>,
        K: Into<KindId>,
    {
        Self {
            id: id.into(),
            files: files.into_iter().map(Into::into).collect(),
            coverage: CoverageDeclaration::Reduced(reduced.into_iter().map(Into::into).collect()),
        }
    }

    /// Kinds the group is allowed to drop between siblings
    pub fn declared_reduction(&self) -> BTreeSet<&KindId> {
        match &self.coverage {
            CoverageDeclaration::Identical => BTreeSet::new(),
            CoverageDeclaration::Reduced(kinds) => kinds.iter().collect(),
        }
    }
}

/// Where a kind is covered when comparing two files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Coverage {
    PresentInBoth,
    OnlyInLeft,
    OnlyInRight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub kind: KindId,
    pub left: String,
    pub right: String,
    pub coverage: Coverage,
}

/// Per-kind coverage comparison between files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub entries: Vec<DiffEntry>,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose kind is missing on one side
    pub fn drift(&self) -> impl Iterator<Item = &DiffEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.coverage != Coverage::PresentInBoth)
    }

    pub fn has_drift(&self) -> bool {
        self.drift().next().is_some()
    }
}

/// Compares the defect coverage of two files.
///
/// Produces one entry per kind present in either file, ordered by kind id.
pub fn compare(left: &CorpusFile, right: &CorpusFile) -> DiffReport {
    let left_kinds = left.kinds();
    let right_kinds = right.kinds();

    let entries = left_kinds
        .union(&right_kinds)
        .map(|kind| {
            let coverage = match (left_kinds.contains(kind), right_kinds.contains(kind)) {
                (true, true) => Coverage::PresentInBoth,
                (true, false) => Coverage::OnlyInLeft,
                _ => Coverage::OnlyInRight,
            };
            DiffEntry {
                kind: (*kind).clone(),
                left: left.name().to_string(),
                right: right.name().to_string(),
                coverage,
            }
        })
        .collect();

    DiffReport { entries }
}

/// Diffs the baseline file of a group against each sibling.
///
/// A single-file group yields an empty report.
pub fn diff_group(files: &[&CorpusFile]) -> DiffReport {
    let mut report = DiffReport::default();
    if let Some((baseline, siblings)) = files.split_first() {
        for sibling in siblings {
            report.entries.extend(compare(baseline, sibling).entries);
        }
    }
    report
}

/// Checks that sibling files only differ within the declared reduction.
///
/// `files` must be the resolved members of `group`, in group order.
///
/// # Errors
///
/// * `EmptyGroup` - the group names no member files
/// * `UndeclaredDrift` - a sibling misses kinds covered elsewhere in the
///   group that the declaration does not allow it to drop
pub fn validate_group(group: &VariantGroup, files: &[&CorpusFile]) -> ModelResult<()> {
    if group.files.is_empty() {
        return Err(ModelError::EmptyGroup { group: group.id.clone() });
    }

    let coverage: Vec<BTreeSet<&KindId>> = files.iter().map(|file| file.kinds()).collect();
    let union: BTreeSet<&KindId> = coverage.iter().flatten().copied().collect();
    let reduction = group.declared_reduction();

    for (file, kinds) in files.iter().zip(&coverage) {
        let missing: Vec<String> = union
            .iter()
            .filter(|kind| !kinds.contains(*kind) && !reduction.contains(*kind))
            .map(|kind| kind.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ModelError::undeclared_drift(group.id.clone(), file.name().to_string(), missing));
        }
    }

    for kind in &reduction {
        if coverage.iter().all(|kinds| kinds.contains(*kind)) {
            warn!(group = %group.id, kind = %kind, "declared reduction is stale: every variant still covers it");
        }
    }

    Ok(())
}
