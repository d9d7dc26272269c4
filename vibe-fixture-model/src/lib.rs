//! Vibe Fixture Model - defect fixture corpus model
//!
//! Describes a corpus of deliberately defective code samples so that a
//! scanner's findings can be asserted deterministically:
//! - [`DefectCatalog`]: the closed vocabulary of defect kinds
//! - [`FixtureRecord`]: one code unit bound to catalog kinds, with
//!   suppression and expected-detection metadata
//! - [`CorpusStore`]: ordered files of records with category queries
//! - [`variant`]: reconciliation of near-duplicate files
//!
//! # Example Usage
//!
//! ```rust
//! use vibe_fixture_model::{Category, CorpusFile, CorpusStore, DefectCatalog, FixtureDraft, VariantGroup};
//!
//! let catalog = DefectCatalog::shared_standard();
//! let record = FixtureDraft::new("WeakHash", "hash := md5.Sum([]byte(password)) // #nosec")
//!     .kinds(["weak-hash"])
//!     .marker("// #nosec")
//!     .build(&catalog)
//!     .unwrap();
//!
//! let mut store = CorpusStore::new(catalog);
//! store.add_file(CorpusFile::new("main.go").with_record(record)).unwrap();
//! store.add_group(VariantGroup::identical("go-main", ["main.go"])).unwrap();
//!
//! assert_eq!(store.list_fixtures(Some(Category::Security)).len(), 1);
//! assert!(store.diff_variant_group("go-main").unwrap().is_empty());
//! ```

pub mod catalog;
pub mod corpus;
pub mod error;
pub mod record;
pub mod variant;
pub mod verify;

// Re-export key types for convenience
pub use catalog::{standard_kinds, Category, DefectCatalog, DefectKind, KindId, Severity};
pub use corpus::{CorpusFile, CorpusStore, FixtureEntry, HiddenSuppression, DUPLICATE_KEY};
pub use error::{ModelError, ModelResult};
pub use record::{FixtureDraft, FixtureRecord, Suppression};
pub use variant::{compare, Coverage, CoverageDeclaration, DiffEntry, DiffReport, VariantGroup};
pub use verify::{verify_findings, Expectation, ExpectationSet, Finding, MissedDetection, VerificationReport};
