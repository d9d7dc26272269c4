//! Defect kind taxonomy and the catalog that owns it

use crate::error::{ModelError, ModelResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

static KIND_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("kind id pattern is valid"));

static STANDARD_CATALOG: Lazy<Arc<DefectCatalog>> = Lazy::new(|| Arc::new(DefectCatalog::standard()));

/// Stable identifier of a defect kind, e.g. `sql-injection`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindId(String);

impl KindId {
    /// Wraps an identifier without validating it.
    ///
    /// Validation happens when a kind is registered; lookups against a
    /// catalog reject anything that was never registered.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Parses and validates a kebab-case identifier
    pub fn parse(id: &str) -> ModelResult<Self> {
        if KIND_ID_PATTERN.is_match(id) {
            Ok(Self(id.to_string()))
        } else {
            Err(ModelError::invalid_kind_id(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for KindId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KindId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for KindId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broad class a defect kind belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Exploitable vulnerability pattern
    Security,
    /// Maintainability or correctness smell
    Quality,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Security => write!(f, "security"),
            Category::Quality => write!(f, "quality"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "security" => Ok(Category::Security),
            "quality" => Ok(Category::Quality),
            other => Err(format!("unknown category '{other}' (expected 'security' or 'quality')")),
        }
    }
}

/// Informational ranking of a defect kind. Nothing enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// A uniquely identified class of intentional defect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectKind {
    /// Stable kebab-case identifier
    pub id: KindId,
    /// Security or quality
    pub category: Category,
    /// Informational severity
    pub severity: Severity,
    /// Canonical one-line description
    pub description: String,
}

impl DefectKind {
    pub fn new<I, D>(id: I, category: Category, severity: Severity, description: D) -> Self
    where
        I: Into<String>,
        D: Into<String>,
    {
        Self {
            id: KindId::new(id),
            category,
            severity,
            description: description.into(),
        }
    }

    pub fn security<I: Into<String>, D: Into<String>>(id: I, severity: Severity, description: D) -> Self {
        Self::new(id, Category::Security, severity, description)
    }

    pub fn quality<I: Into<String>, D: Into<String>>(id: I, severity: Severity, description: D) -> Self {
        Self::new(id, Category::Quality, severity, description)
    }
}

/// Registry of every defect kind a corpus may reference.
///
/// Kinds keep their registration order. Once a catalog is shared with a
/// store it is only ever read.
#[derive(Debug, Clone, Default)]
pub struct DefectCatalog {
    kinds: Vec<DefectKind>,
    index: HashMap<KindId, usize>,
}

impl DefectCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a list of kinds, failing on the first invalid one
    pub fn from_kinds<I: IntoIterator<Item = DefectKind>>(kinds: I) -> ModelResult<Self> {
        let mut catalog = Self::new();
        for kind in kinds {
            catalog.register(kind)?;
        }
        Ok(catalog)
    }

    /// Registers a new kind.
    ///
    /// Fails with `InvalidKindId` for identifiers that are not kebab-case and
    /// with `DuplicateKind` when the identifier is already present.
    pub fn register(&mut self, kind: DefectKind) -> ModelResult<()> {
        KindId::parse(kind.id.as_str())?;
        if self.index.contains_key(&kind.id) {
            return Err(ModelError::duplicate_kind(kind.id.as_str()));
        }

        debug!(kind = %kind.id, category = %kind.category, "registered defect kind");
        self.index.insert(kind.id.clone(), self.kinds.len());
        self.kinds.push(kind);
        Ok(())
    }

    /// Looks up a kind by identifier
    pub fn lookup(&self, id: &str) -> ModelResult<&DefectKind> {
        self.index
            .get(id)
            .map(|&position| &self.kinds[position])
            .ok_or_else(|| ModelError::unknown_kind(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterates kinds in registration order
    pub fn iter(&self) -> impl Iterator<Item = &DefectKind> + Clone + '_ {
        self.kinds.iter()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Returns the process-wide standard catalog
    pub fn shared_standard() -> Arc<DefectCatalog> {
        Arc::clone(&STANDARD_CATALOG)
    }

    /// Builds a fresh copy of the standard catalog.
    ///
    /// Use this when a manifest needs to extend the standard vocabulary with
    /// its own kinds before sharing the catalog.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for kind in standard_kinds() {
            // Identifiers below are literals checked by the tests.
            if let Err(err) = catalog.register(kind) {
                unreachable!("standard catalog entry rejected: {err}");
            }
        }
        catalog
    }
}

/// The built-in defect vocabulary.
pub fn standard_kinds() -> Vec<DefectKind> {
    use Severity::*;

    vec![
        // ===== Security =====
        DefectKind::security("command-injection", Critical, "Untrusted input reaches a shell or process invocation"),
        DefectKind::security("sql-injection", Critical, "Untrusted input is concatenated into a SQL statement"),
        DefectKind::security("weak-hash", Medium, "A broken hash such as MD5 or SHA-1 protects sensitive data"),
        DefectKind::security("insecure-file-perms", Medium, "A file is created with world-writable permissions"),
        DefectKind::security("hardcoded-secret", High, "A credential or API key is embedded in source"),
        DefectKind::security("weak-random", Medium, "A non-cryptographic generator produces security tokens"),
        DefectKind::security("timing-unsafe-compare", Medium, "Secrets are compared with a short-circuiting equality"),
        DefectKind::security("xss", High, "Untrusted input is written into HTML without escaping"),
        DefectKind::security("path-traversal", High, "Untrusted input selects a filesystem path"),
        DefectKind::security("insecure-http-server", Medium, "A server listens over cleartext HTTP"),
        DefectKind::security("eval-injection", Critical, "Untrusted input is evaluated as code"),
        DefectKind::security("insecure-deserialization", Critical, "Untrusted bytes are deserialized into live objects"),
        DefectKind::security("weak-cipher", Medium, "An encoding or broken cipher stands in for encryption"),
        DefectKind::security("sensitive-data-in-url", Low, "Credentials are read from query parameters"),
        DefectKind::security("regex-dos", Low, "A regular expression is prone to catastrophic backtracking"),
        DefectKind::security("prototype-pollution", High, "Untrusted keys are merged into an object prototype chain"),
        DefectKind::security("open-redirect", Medium, "A redirect target comes from untrusted input"),
        DefectKind::security("insecure-cookie", Medium, "A cookie is set without the Secure or HttpOnly flags"),
        DefectKind::security("missing-csrf", Medium, "A state-changing handler skips CSRF protection"),
        DefectKind::security("mass-assignment", High, "Request parameters are bound to model attributes wholesale"),
        DefectKind::security("tls-verification-disabled", High, "Peer certificate verification is turned off"),
        DefectKind::security("information-exposure", Low, "Internal details leak into responses or logs"),
        DefectKind::security("xxe", High, "XML from untrusted input is parsed with external entities enabled"),
        // ===== Quality =====
        DefectKind::quality("duplicate-key", Low, "A map literal declares the same key twice"),
        DefectKind::quality("unused-symbol", Info, "A variable or function is declared but never used"),
        DefectKind::quality("unused-import", Info, "A module is imported but never used"),
        DefectKind::quality("deprecated-api", Low, "A deprecated API is called"),
        DefectKind::quality("hardcoded-path", Info, "An absolute filesystem path is embedded in source"),
        DefectKind::quality("redundant-condition", Info, "A condition repeats a check already implied"),
        DefectKind::quality("bare-except", Low, "An exception handler catches everything"),
        DefectKind::quality("mutable-default", Low, "A mutable value is used as a default argument"),
        DefectKind::quality("unreachable-code", Low, "Statements follow an unconditional return"),
        DefectKind::quality("loose-equality", Info, "A comparison relies on implicit type coercion"),
        DefectKind::quality("undeclared-global", Low, "A global variable is assigned without declaration"),
        DefectKind::quality("empty-catch", Low, "An exception handler silently swallows errors"),
    ]
}
