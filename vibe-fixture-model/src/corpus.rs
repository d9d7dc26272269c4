//! Corpus files and the store that aggregates them

use crate::catalog::{Category, DefectCatalog, DefectKind, KindId};
use crate::error::{ModelError, ModelResult};
use crate::record::FixtureRecord;
use crate::variant::{self, DiffReport, VariantGroup};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Kind that legitimises repeated literal keys
pub const DUPLICATE_KEY: &str = "duplicate-key";

/// Ordered sequence of fixture records sharing one compilation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusFile {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<String>,
    records: Vec<FixtureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    epilogue: Option<String>,
}

impl CorpusFile {
    /// Creates an empty file. `name` is the path the file renders to.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            language: None,
            preamble: None,
            records: Vec::new(),
            epilogue: None,
        }
    }

    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Text emitted before the first unit (package clause, imports)
    pub fn with_preamble<S: Into<String>>(mut self, preamble: S) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    /// Text emitted after the last unit (closing `end` of a Ruby class)
    pub fn with_epilogue<S: Into<String>>(mut self, epilogue: S) -> Self {
        self.epilogue = Some(epilogue.into());
        self
    }

    pub fn with_record(mut self, record: FixtureRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn push(&mut self, record: FixtureRecord) {
        self.records.push(record);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn records(&self) -> &[FixtureRecord] {
        &self.records
    }

    /// Finds a unit by name plus signature, or by bare name.
    ///
    /// Resolution order: an unsigned unit with that exact name, then a
    /// signed unit whose name plus signature matches, then the first unit
    /// declared under the bare name.
    pub fn record(&self, unit: &str) -> Option<&FixtureRecord> {
        self.position(unit).map(|index| &self.records[index])
    }

    /// Declaration index of the unit `unit`, resolved like [`Self::record`]
    pub fn position(&self, unit: &str) -> Option<usize> {
        let records = &self.records;
        records
            .iter()
            .position(|record| record.signature().is_none() && record.name() == unit)
            .or_else(|| {
                records
                    .iter()
                    .position(|record| record.signature().is_some() && record.unit_key() == unit)
            })
            .or_else(|| records.iter().position(|record| record.name() == unit))
    }

    /// Union of the kinds instantiated by the file's records
    pub fn kinds(&self) -> BTreeSet<&KindId> {
        self.records.iter().flat_map(|record| record.kinds()).collect()
    }

    /// Renders the file as the scanner sees it: preamble then every unit in
    /// declaration order, separated by blank lines.
    pub fn render(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.records.len() + 1);
        if let Some(preamble) = &self.preamble {
            parts.push(preamble.trim_end());
        }
        parts.extend(self.records.iter().map(|record| record.source().trim_end()));

        let mut rendered = parts.join("\n\n");
        rendered.push('\n');
        if let Some(epilogue) = &self.epilogue {
            rendered.push_str(epilogue.trim_end());
            rendered.push('\n');
        }
        rendered
    }
}

/// A record paired with the file that declares it
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FixtureEntry<'a> {
    pub file: &'a str,
    #[serde(flatten)]
    pub record: &'a FixtureRecord,
}

/// A record whose suppression also removes expected detections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HiddenSuppression {
    pub file: String,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub kinds: Vec<KindId>,
}

/// Validated collection of corpus files and variant groups.
///
/// Every mutation is all-or-nothing: a rejected file or group leaves the
/// store exactly as it was.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    catalog: Arc<DefectCatalog>,
    files: Vec<CorpusFile>,
    groups: Vec<VariantGroup>,
}

impl CorpusStore {
    pub fn new(catalog: Arc<DefectCatalog>) -> Self {
        Self {
            catalog,
            files: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &DefectCatalog {
        &self.catalog
    }

    /// Adds a file after checking its structural invariants.
    ///
    /// # Errors
    ///
    /// * `DuplicateFile` - a file with the same name is already stored
    /// * `DuplicateUnit` - two records share a name and signature
    /// * `UnknownKind` - a record references a kind missing from the catalog
    /// * `StructuralCollision` - a record repeats a literal key without
    ///   `duplicate-key` being its only kind
    pub fn add_file(&mut self, mut file: CorpusFile) -> ModelResult<()> {
        if self.files.iter().any(|existing| existing.name == file.name) {
            return Err(ModelError::DuplicateFile { file: file.name });
        }

        let mut units = HashSet::new();
        for record in &mut file.records {
            let identity = (record.name().to_string(), record.signature().map(str::to_string));
            if !units.insert(identity) {
                return Err(ModelError::duplicate_unit(file.name.clone(), record.unit_key()));
            }

            for kind in record.kinds() {
                self.catalog.lookup(kind.as_str())?;
            }

            if let Some(key) = first_repeated_key(record.literal_keys()) {
                let is_trigger = record
                    .sole_kind()
                    .is_some_and(|kind| kind.as_str() == DUPLICATE_KEY);
                if !is_trigger {
                    return Err(ModelError::structural_collision(
                        file.name.clone(),
                        record.name().to_string(),
                        key.to_string(),
                    ));
                }
                debug!(file = %file.name, unit = record.name(), key, "accepted deliberate duplicate-key trigger");
                record.mark_deliberate_trigger();
            }

            for kind in record.hidden_by_suppression() {
                warn!(file = %file.name, unit = record.name(), kind = %kind, "suppression hides an expected detection");
            }
        }

        debug!(file = %file.name, records = file.records.len(), "added corpus file");
        self.files.push(file);
        Ok(())
    }

    /// Adds a variant group after validating its members' coverage.
    ///
    /// # Errors
    ///
    /// * `DuplicateGroup` - the group id is already in use
    /// * `UnknownFile` - a member file is not in the store
    /// * `UndeclaredDrift` - see [`variant::validate_group`]
    pub fn add_group(&mut self, group: VariantGroup) -> ModelResult<()> {
        if self.groups.iter().any(|existing| existing.id == group.id) {
            return Err(ModelError::DuplicateGroup { group: group.id });
        }

        let members = self.members(&group)?;
        variant::validate_group(&group, &members)?;

        debug!(group = %group.id, files = group.files.len(), "added variant group");
        self.groups.push(group);
        Ok(())
    }

    /// Checks an already stored group again
    pub fn validate_group(&self, id: &str) -> ModelResult<()> {
        let group = self.group(id)?;
        variant::validate_group(group, &self.members(group)?)
    }

    pub fn files(&self) -> &[CorpusFile] {
        &self.files
    }

    pub fn file(&self, name: &str) -> ModelResult<&CorpusFile> {
        self.files
            .iter()
            .find(|file| file.name == name)
            .ok_or_else(|| ModelError::UnknownFile { file: name.to_string() })
    }

    /// Finds a unit by file name and unit name (or name plus signature)
    pub fn record(&self, file: &str, unit: &str) -> Option<&FixtureRecord> {
        self.file(file).ok().and_then(|file| file.record(unit))
    }

    pub fn group(&self, id: &str) -> ModelResult<&VariantGroup> {
        self.groups
            .iter()
            .find(|group| group.id == id)
            .ok_or_else(|| ModelError::UnknownGroup { group: id.to_string() })
    }

    /// Every record in file-declaration order
    pub fn entries(&self) -> impl Iterator<Item = FixtureEntry<'_>> + Clone + '_ {
        self.files.iter().flat_map(|file| {
            file.records
                .iter()
                .map(move |record| FixtureEntry { file: &file.name, record })
        })
    }

    /// Lazily yields records with at least one kind in `category`.
    ///
    /// Order is file-declaration order. The iterator can be cloned to
    /// restart it, and repeated calls yield identical sequences.
    pub fn query(&self, category: Category) -> impl Iterator<Item = FixtureEntry<'_>> + Clone + '_ {
        let catalog = &self.catalog;
        self.entries().filter(move |entry| {
            entry.record.kinds().iter().any(|kind| {
                catalog
                    .lookup(kind.as_str())
                    .is_ok_and(|defect| defect.category == category)
            })
        })
    }

    /// Records that instantiate `id`, in declaration order
    pub fn fixtures_for_kind<'a>(&'a self, id: &'a str) -> impl Iterator<Item = FixtureEntry<'a>> + Clone + 'a {
        self.entries().filter(move |entry| entry.record.exhibits(id))
    }

    pub fn list_defect_kinds(&self) -> Vec<&DefectKind> {
        self.catalog.iter().collect()
    }

    pub fn list_fixtures(&self, category: Option<Category>) -> Vec<FixtureEntry<'_>> {
        match category {
            Some(category) => self.query(category).collect(),
            None => self.entries().collect(),
        }
    }

    pub fn get_variant_groups(&self) -> &[VariantGroup] {
        &self.groups
    }

    /// Diffs a group's baseline file against each of its siblings
    pub fn diff_variant_group(&self, id: &str) -> ModelResult<DiffReport> {
        let group = self.group(id)?;
        Ok(variant::diff_group(&self.members(group)?))
    }

    /// Records that use a suppression to drop expected detections
    pub fn suppression_audit(&self) -> Vec<HiddenSuppression> {
        self.entries()
            .filter_map(|entry| {
                let kinds = entry.record.hidden_by_suppression();
                if kinds.is_empty() {
                    return None;
                }
                Some(HiddenSuppression {
                    file: entry.file.to_string(),
                    unit: entry.record.name().to_string(),
                    signature: entry.record.signature().map(str::to_string),
                    kinds: kinds.into_iter().cloned().collect(),
                })
            })
            .collect()
    }

    fn members(&self, group: &VariantGroup) -> ModelResult<Vec<&CorpusFile>> {
        group.files.iter().map(|name| self.file(name)).collect()
    }
}

fn first_repeated_key(keys: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    keys.iter()
        .find(|key| !seen.insert(key.as_str()))
        .map(String::as_str)
}
