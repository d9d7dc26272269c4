//! Fixture records: one sample code unit bound to catalog entries

use crate::catalog::{DefectCatalog, KindId};
use crate::error::{ModelError, ModelResult};
use serde::Serialize;
use std::collections::BTreeSet;

/// Suppression annotation attached to a unit.
///
/// Records *that* a unit carries a scanner suppression and which kinds it
/// targets. The marker text is kept verbatim and never interpreted. A
/// suppression documents intent for reviewers; it does not exempt the unit
/// from detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suppression {
    /// Kinds the annotation targets
    pub targets: BTreeSet<KindId>,
    /// Raw annotation text as written in the fixture, e.g. `#nosec`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

/// One named code unit (function or declaration) that instantiates defects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureRecord {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    source: String,
    kinds: BTreeSet<KindId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suppression: Option<Suppression>,
    expected_detected: BTreeSet<KindId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    literal_keys: Vec<String>,
    deliberate_trigger: bool,
}

/// Unvalidated description of a fixture record.
///
/// Collects the pieces of a unit and turns into a [`FixtureRecord`] once
/// checked against a catalog with [`FixtureDraft::build`].
#[derive(Debug, Clone, Default)]
pub struct FixtureDraft {
    name: String,
    signature: Option<String>,
    source: String,
    kinds: Vec<KindId>,
    suppressed: Vec<KindId>,
    marker: Option<String>,
    expected: Option<Vec<KindId>>,
    literal_keys: Vec<String>,
}

impl FixtureDraft {
    pub fn new<N: Into<String>, S: Into<String>>(name: N, source: S) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            ..Self::default()
        }
    }

    /// Distinguishes units that share a name, e.g. overloads
    pub fn signature<S: Into<String>>(mut self, signature: S) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn kinds<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<KindId>,
    {
        self.kinds.extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn suppressed<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<KindId>,
    {
        self.suppressed.extend(kinds.into_iter().map(Into::into));
        self
    }

    /// Raw suppression annotation text. Without explicit suppressed kinds the
    /// annotation targets every kind of the unit.
    pub fn marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Overrides the expected detections, which otherwise equal the unit's kinds
    pub fn expected<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<KindId>,
    {
        self.expected = Some(kinds.into_iter().map(Into::into).collect());
        self
    }

    /// Keys declared by map literals inside the unit, in source order
    pub fn literal_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.literal_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Validates the draft against `catalog`.
    ///
    /// # Errors
    ///
    /// * `EmptyDefectSet` - no kinds were given
    /// * `UnknownKind` - a kind is not registered in `catalog`
    /// * `InvalidSuppression` - a suppressed kind is not one of the unit's kinds
    /// * `InvalidExpectation` - expected detections name a foreign kind or
    ///   drop a kind that is not suppressed
    pub fn build(self, catalog: &DefectCatalog) -> ModelResult<FixtureRecord> {
        if self.kinds.is_empty() {
            return Err(ModelError::EmptyDefectSet { unit: self.name });
        }

        for kind in &self.kinds {
            catalog.lookup(kind.as_str())?;
        }
        let kinds: BTreeSet<KindId> = self.kinds.into_iter().collect();

        let mut suppressed = BTreeSet::new();
        for kind in self.suppressed {
            if !kinds.contains(&kind) {
                return Err(ModelError::invalid_suppression(self.name, kind.to_string()));
            }
            suppressed.insert(kind);
        }
        if suppressed.is_empty() && self.marker.is_some() {
            suppressed = kinds.clone();
        }

        let expected_detected = match self.expected {
            None => kinds.clone(),
            Some(expected) => {
                let expected: BTreeSet<KindId> = expected.into_iter().collect();
                if let Some(foreign) = expected.iter().find(|kind| !kinds.contains(*kind)) {
                    return Err(ModelError::invalid_expectation(
                        self.name,
                        format!("'{foreign}' is not one of the unit's defect kinds"),
                    ));
                }
                if let Some(live) = kinds
                    .iter()
                    .find(|kind| !suppressed.contains(*kind) && !expected.contains(*kind))
                {
                    return Err(ModelError::invalid_expectation(
                        self.name,
                        format!("unsuppressed kind '{live}' must be expected to be detected"),
                    ));
                }
                expected
            }
        };

        let suppression = if suppressed.is_empty() {
            None
        } else {
            Some(Suppression {
                targets: suppressed,
                marker: self.marker,
            })
        };

        Ok(FixtureRecord {
            name: self.name,
            signature: self.signature,
            source: self.source,
            kinds,
            suppression,
            expected_detected,
            literal_keys: self.literal_keys,
            deliberate_trigger: false,
        })
    }
}

impl FixtureRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Display form of the unit: name followed by its signature when present
    pub fn unit_key(&self) -> String {
        match &self.signature {
            Some(signature) => format!("{}{}", self.name, signature),
            None => self.name.clone(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kinds(&self) -> &BTreeSet<KindId> {
        &self.kinds
    }

    pub fn exhibits(&self, id: &str) -> bool {
        self.kinds.contains(id)
    }

    /// Returns the kind when the unit instantiates exactly one
    pub fn sole_kind(&self) -> Option<&KindId> {
        if self.kinds.len() == 1 {
            self.kinds.iter().next()
        } else {
            None
        }
    }

    pub fn suppression(&self) -> Option<&Suppression> {
        self.suppression.as_ref()
    }

    pub fn is_suppressed(&self, id: &str) -> bool {
        self.suppression
            .as_ref()
            .is_some_and(|suppression| suppression.targets.contains(id))
    }

    /// Kinds the scanner must report for this unit
    pub fn expected_detected(&self) -> &BTreeSet<KindId> {
        &self.expected_detected
    }

    /// Suppressed kinds that were also dropped from the expected detections.
    ///
    /// Non-empty means the suppression is being used to make the scanner go
    /// quiet on a live defect, which the corpus treats as a meta-defect.
    pub fn hidden_by_suppression(&self) -> Vec<&KindId> {
        match &self.suppression {
            Some(suppression) => suppression
                .targets
                .iter()
                .filter(|kind| !self.expected_detected.contains(*kind))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn literal_keys(&self) -> &[String] {
        &self.literal_keys
    }

    /// Whether the unit repeats a literal key on purpose to trigger `duplicate-key`
    pub fn is_deliberate_trigger(&self) -> bool {
        self.deliberate_trigger
    }

    pub(crate) fn mark_deliberate_trigger(&mut self) {
        self.deliberate_trigger = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> DefectCatalog {
        DefectCatalog::standard()
    }

    #[test]
    fn test_expected_defaults_to_kinds() {
        let record = FixtureDraft::new("WeakHash", "hash := md5.Sum([]byte(password))")
            .kinds(["weak-hash"])
            .suppressed(["weak-hash"])
            .marker("// #nosec")
            .build(&catalog())
            .unwrap();

        assert!(record.is_suppressed("weak-hash"));
        assert!(record.expected_detected().contains("weak-hash"));
        assert!(record.hidden_by_suppression().is_empty());
        assert_eq!(record.suppression().unwrap().marker.as_deref(), Some("// #nosec"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = FixtureDraft::new("Overflow", "buf[10] = 0")
            .kinds(["buffer-overflow"])
            .build(&catalog())
            .unwrap_err();
        assert_eq!(err, ModelError::unknown_kind("buffer-overflow"));
    }

    #[test]
    fn test_suppression_outside_kinds_rejected() {
        let err = FixtureDraft::new("SQLInjection", "query := \"SELECT \" + id")
            .kinds(["sql-injection"])
            .suppressed(["xss"])
            .build(&catalog())
            .unwrap_err();
        assert_eq!(err, ModelError::invalid_suppression("SQLInjection", "xss"));
    }

    #[test]
    fn test_empty_kind_set_rejected() {
        let err = FixtureDraft::new("main", "func main() {}")
            .build(&catalog())
            .unwrap_err();
        assert!(matches!(err, ModelError::EmptyDefectSet { .. }));
    }

    #[test]
    fn test_marker_without_kinds_targets_every_kind() {
        let record = FixtureDraft::new("InsecureHTTPServer", "http.ListenAndServe(\":8080\", nil)")
            .kinds(["xss", "insecure-http-server"])
            .marker("// #nosec")
            .build(&catalog())
            .unwrap();

        assert!(record.is_suppressed("xss"));
        assert!(record.is_suppressed("insecure-http-server"));
    }

    #[test]
    fn test_expected_may_not_drop_live_kind() {
        let err = FixtureDraft::new("ProcessUserInput", "...")
            .kinds(["unused-symbol", "deprecated-api"])
            .suppressed(["deprecated-api"])
            .expected(["deprecated-api"])
            .build(&catalog())
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidExpectation { .. }));
    }

    #[test]
    fn test_expected_may_not_name_foreign_kind() {
        let err = FixtureDraft::new("WeakHash", "...")
            .kinds(["weak-hash"])
            .expected(["weak-hash", "xss"])
            .build(&catalog())
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidExpectation { .. }));
    }

    #[test]
    fn test_dropping_suppressed_kind_is_flagged_as_hidden() {
        let record = FixtureDraft::new("CommandInjection", "exec.Command(\"sh\", \"-c\", input)")
            .kinds(["command-injection", "unused-symbol"])
            .suppressed(["command-injection"])
            .expected(["unused-symbol"])
            .build(&catalog())
            .unwrap();

        let hidden: Vec<&str> = record.hidden_by_suppression().iter().map(|k| k.as_str()).collect();
        assert_eq!(hidden, vec!["command-injection"]);
    }

    #[test]
    fn test_expected_covers_unsuppressed_kinds() {
        let record = FixtureDraft::new("main", "unusedVar := \"x\"\ndb, _ := sql.Open(\"mysql\", \"root:password@/db\")")
            .kinds(["unused-symbol", "hardcoded-secret"])
            .suppressed(["hardcoded-secret"])
            .build(&catalog())
            .unwrap();

        let live: Vec<&KindId> = record
            .kinds()
            .iter()
            .filter(|kind| !record.is_suppressed(kind.as_str()))
            .collect();
        assert!(live.iter().all(|kind| record.expected_detected().contains(*kind)));
    }

    #[test]
    fn test_unit_key_includes_signature() {
        let record = FixtureDraft::new("handle", "...")
            .signature("(w http.ResponseWriter)")
            .kinds(["xss"])
            .build(&catalog())
            .unwrap();
        assert_eq!(record.unit_key(), "handle(w http.ResponseWriter)");
        assert_eq!(record.sole_kind().map(KindId::as_str), Some("xss"));
    }
}
