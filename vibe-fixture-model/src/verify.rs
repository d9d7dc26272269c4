//! Expected detections and cross-checking of scanner findings

use crate::catalog::KindId;
use crate::corpus::{CorpusFile, CorpusStore};
use crate::record::FixtureRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kinds the scanner must report for one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    pub file: String,
    pub unit: String,
    /// Tells overloaded units apart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub kinds: Vec<KindId>,
    /// Kinds carrying a suppression annotation; still expected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<KindId>,
}

/// Expectations for a whole corpus, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectationSet {
    pub expectations: Vec<Expectation>,
}

impl ExpectationSet {
    pub fn from_store(store: &CorpusStore) -> Self {
        let expectations = store
            .entries()
            .map(|entry| Expectation {
                file: entry.file.to_string(),
                unit: entry.record.name().to_string(),
                signature: entry.record.signature().map(str::to_string),
                kinds: entry.record.expected_detected().iter().cloned().collect(),
                suppressed: entry
                    .record
                    .suppression()
                    .map(|suppression| suppression.targets.iter().cloned().collect())
                    .unwrap_or_default(),
            })
            .collect();
        Self { expectations }
    }

    pub fn len(&self) -> usize {
        self.expectations.iter().map(|expectation| expectation.kinds.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One finding reported by the external scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub file: String,
    /// Unit the scanner attributed the finding to, when it knows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// An expected detection the scanner did not report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissedDetection {
    pub file: String,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub kind: KindId,
}

/// Outcome of checking scanner findings against the corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Expected detections without a matching finding
    pub missed: Vec<MissedDetection>,
    /// Findings for kinds the file or unit does not claim
    pub unexpected: Vec<Finding>,
    /// Findings whose kind is not in the catalog
    pub unknown_kinds: Vec<Finding>,
    /// Number of expected detections that were matched
    pub matched: usize,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.missed.is_empty() && self.unexpected.is_empty() && self.unknown_kinds.is_empty()
    }
}

/// Checks scanner findings against every record's expected detections.
///
/// Units are identified by their declaration position, so overloads that
/// share a name are satisfied independently. A finding names its unit by
/// bare name or by name plus signature; a bare name, or no unit at all,
/// satisfies the first matching unit in the file that still awaits that
/// kind. Findings on kinds a unit exhibits but does not expect are
/// tolerated rather than reported as unexpected.
pub fn verify_findings(store: &CorpusStore, findings: &[Finding]) -> VerificationReport {
    let mut report = VerificationReport::default();
    // (file, unit index, kind)
    let mut satisfied: HashSet<(&str, usize, &str)> = HashSet::new();

    for finding in findings {
        if !store.catalog().contains(&finding.kind) {
            report.unknown_kinds.push(finding.clone());
            continue;
        }

        let Ok(file) = store.file(&finding.file) else {
            report.unexpected.push(finding.clone());
            continue;
        };

        let units = candidates(file, finding.unit.as_deref());
        let kind = finding.kind.as_str();
        let target = units
            .iter()
            .find(|(index, record)| {
                record.expected_detected().contains(kind) && !satisfied.contains(&(file.name(), *index, kind))
            })
            .or_else(|| units.iter().find(|(_, record)| record.exhibits(kind)))
            .map(|(index, _)| *index);

        match target {
            Some(index) => {
                satisfied.insert((file.name(), index, kind));
            }
            None => report.unexpected.push(finding.clone()),
        }
    }

    for file in store.files() {
        for (index, record) in file.records().iter().enumerate() {
            for kind in record.expected_detected() {
                if satisfied.contains(&(file.name(), index, kind.as_str())) {
                    report.matched += 1;
                } else {
                    report.missed.push(MissedDetection {
                        file: file.name().to_string(),
                        unit: record.name().to_string(),
                        signature: record.signature().map(str::to_string),
                        kind: kind.clone(),
                    });
                }
            }
        }
    }

    report
}

/// Units a finding may be attributed to, with their declaration index
fn candidates<'a>(file: &'a CorpusFile, unit: Option<&str>) -> Vec<(usize, &'a FixtureRecord)> {
    let records = file.records().iter().enumerate();
    let Some(unit) = unit else {
        return records.collect();
    };

    match file.position(unit) {
        // A signed unit named in full is the only candidate
        Some(index) if file.records()[index].signature().is_some() && file.records()[index].unit_key() == unit => {
            vec![(index, &file.records()[index])]
        }
        Some(_) => records.filter(|(_, record)| record.name() == unit).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DefectCatalog;
    use crate::corpus::CorpusFile;
    use crate::record::FixtureDraft;

    fn store() -> CorpusStore {
        let catalog = DefectCatalog::shared_standard();
        let mut store = CorpusStore::new(catalog.clone());
        store
            .add_file(
                CorpusFile::new("main.go")
                    .with_record(
                        FixtureDraft::new("WeakHash", "md5.Sum(...)")
                            .kinds(["weak-hash"])
                            .marker("// #nosec")
                            .build(&catalog)
                            .unwrap(),
                    )
                    .with_record(
                        FixtureDraft::new("SQLInjection", "\"SELECT \" + id")
                            .kinds(["sql-injection"])
                            .build(&catalog)
                            .unwrap(),
                    ),
            )
            .unwrap();
        store
    }

    fn finding(file: &str, unit: Option<&str>, kind: &str) -> Finding {
        Finding {
            file: file.to_string(),
            unit: unit.map(str::to_string),
            kind: kind.to_string(),
            line: None,
        }
    }

    #[test]
    fn test_expectations_include_suppressed_kinds() {
        let expectations = ExpectationSet::from_store(&store());

        assert_eq!(expectations.len(), 2);
        let weak_hash = &expectations.expectations[0];
        assert_eq!(weak_hash.unit, "WeakHash");
        assert_eq!(weak_hash.kinds, vec![KindId::new("weak-hash")]);
        assert_eq!(weak_hash.suppressed, vec![KindId::new("weak-hash")]);
    }

    #[test]
    fn test_all_findings_match() {
        let report = verify_findings(
            &store(),
            &[
                finding("main.go", Some("WeakHash"), "weak-hash"),
                finding("main.go", None, "sql-injection"),
            ],
        );

        assert!(report.is_clean());
        assert_eq!(report.matched, 2);
    }

    #[test]
    fn test_suppressed_defect_must_still_be_found() {
        let report = verify_findings(&store(), &[finding("main.go", None, "sql-injection")]);

        assert!(!report.is_clean());
        assert_eq!(
            report.missed,
            vec![MissedDetection {
                file: "main.go".to_string(),
                unit: "WeakHash".to_string(),
                signature: None,
                kind: KindId::new("weak-hash"),
            }]
        );
    }

    #[test]
    fn test_unexpected_and_unknown_findings() {
        let report = verify_findings(
            &store(),
            &[
                finding("main.go", Some("WeakHash"), "weak-hash"),
                finding("main.go", Some("SQLInjection"), "sql-injection"),
                finding("main.go", Some("WeakHash"), "xss"),
                finding("other.go", None, "xss"),
                finding("main.go", None, "made-up-rule"),
            ],
        );

        assert!(report.missed.is_empty());
        assert_eq!(report.unexpected.len(), 2);
        assert_eq!(report.unknown_kinds, vec![finding("main.go", None, "made-up-rule")]);
    }

    fn overloaded_store() -> CorpusStore {
        let catalog = DefectCatalog::shared_standard();
        let mut store = CorpusStore::new(catalog.clone());
        store
            .add_file(
                CorpusFile::new("Handler.java")
                    .with_record(
                        FixtureDraft::new("handle", "void handle(int id) { out.print(id); }")
                            .signature("(int)")
                            .kinds(["xss"])
                            .build(&catalog)
                            .unwrap(),
                    )
                    .with_record(
                        FixtureDraft::new("handle", "void handle(String name) { out.print(name); }")
                            .signature("(str)")
                            .kinds(["xss"])
                            .build(&catalog)
                            .unwrap(),
                    ),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_overloads_are_verified_independently() {
        let report = verify_findings(
            &overloaded_store(),
            &[finding("Handler.java", Some("handle(int)"), "xss")],
        );

        assert!(!report.is_clean());
        assert_eq!(report.matched, 1);
        assert_eq!(
            report.missed,
            vec![MissedDetection {
                file: "Handler.java".to_string(),
                unit: "handle".to_string(),
                signature: Some("(str)".to_string()),
                kind: KindId::new("xss"),
            }]
        );
    }

    #[test]
    fn test_bare_name_findings_fill_overloads_in_order() {
        let store = overloaded_store();
        let one = verify_findings(&store, &[finding("Handler.java", Some("handle"), "xss")]);
        assert_eq!(one.matched, 1);
        assert_eq!(one.missed[0].signature.as_deref(), Some("(str)"));

        let both = verify_findings(
            &store,
            &[
                finding("Handler.java", Some("handle"), "xss"),
                finding("Handler.java", Some("handle"), "xss"),
            ],
        );
        assert!(both.is_clean());
        assert_eq!(both.matched, 2);
    }

    #[test]
    fn test_expectations_distinguish_overloads() {
        let expectations = ExpectationSet::from_store(&overloaded_store());

        let signatures: Vec<Option<&str>> = expectations
            .expectations
            .iter()
            .map(|expectation| expectation.signature.as_deref())
            .collect();
        assert_eq!(signatures, vec![Some("(int)"), Some("(str)")]);
    }
}
