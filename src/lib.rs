//! Vibe Corpus
//!
//! A CLI tool that builds, validates and exports a corpus of deliberately
//! defective code fixtures, so that a code scanner's findings can be asserted
//! against known expected detections.

// Public API - main functions and essential types for external users
pub use cli::run_cli;
pub use config::{build_store, load_corpus};
pub use types::CorpusManifest;

// Modules needed by internal binary and tests
pub mod cli;
pub mod config;
pub mod types;

// Private implementation modules
mod builtin;
mod export;
mod logging;
