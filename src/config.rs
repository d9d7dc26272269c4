//! Manifest loading and corpus construction

use crate::builtin::default_manifest;
use crate::types::CorpusManifest;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use vibe_fixture_model::{
    CorpusFile, CorpusStore, DefectCatalog, DefectKind, FixtureDraft, ModelResult, VariantGroup,
};

/// Loads a corpus manifest from a TOML or YAML file.
///
/// Files ending in `.yaml` or `.yml` are parsed as YAML, anything else as
/// TOML.
///
/// # Returns
/// * `Ok(Some(CorpusManifest))` - Parsed manifest
/// * `Ok(None)` - The file does not exist
/// * `Err` - If the file exists but cannot be read or parsed
pub fn load_manifest(config_path: &str) -> Result<Option<CorpusManifest>> {
    let path = Path::new(config_path);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest file: {config_path}"))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let manifest: CorpusManifest = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse manifest file: {config_path}"))?
    } else {
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse manifest file: {config_path}"))?
    };

    Ok(Some(manifest))
}

/// Loads and builds the corpus described by `config_path`.
///
/// If the manifest doesn't exist, logs a warning and falls back to the
/// built-in corpus so the tool is usable without any configuration.
pub fn load_corpus(config_path: &str) -> Result<CorpusStore> {
    let manifest = match load_manifest(config_path)? {
        Some(manifest) => manifest,
        None => {
            warn!("Manifest '{config_path}' not found. Using the built-in corpus.");
            default_manifest()
        }
    };

    let store = build_store(&manifest)
        .with_context(|| format!("Invalid fixture corpus in {config_path}"))?;
    info!(
        files = store.files().len(),
        groups = store.get_variant_groups().len(),
        kinds = store.catalog().len(),
        "corpus loaded"
    );
    Ok(store)
}

/// Builds a validated store from a manifest.
///
/// Construction is total: the first invariant violation aborts the build
/// and no partial corpus is returned.
pub fn build_store(manifest: &CorpusManifest) -> ModelResult<CorpusStore> {
    let catalog = if manifest.standard_catalog && manifest.kinds.is_empty() {
        DefectCatalog::shared_standard()
    } else {
        let mut catalog = if manifest.standard_catalog {
            DefectCatalog::standard()
        } else {
            DefectCatalog::new()
        };
        for kind in &manifest.kinds {
            catalog.register(DefectKind::new(
                kind.id.as_str(),
                kind.category,
                kind.severity,
                kind.description.as_str(),
            ))?;
        }
        Arc::new(catalog)
    };

    let mut store = CorpusStore::new(Arc::clone(&catalog));

    for file in &manifest.files {
        let mut corpus_file = CorpusFile::new(file.name.as_str());
        if let Some(language) = &file.language {
            corpus_file = corpus_file.with_language(language.as_str());
        }
        if let Some(preamble) = &file.preamble {
            corpus_file = corpus_file.with_preamble(preamble.as_str());
        }
        if let Some(epilogue) = &file.epilogue {
            corpus_file = corpus_file.with_epilogue(epilogue.as_str());
        }

        for record in &file.records {
            let mut draft = FixtureDraft::new(record.name.as_str(), record.source.as_str())
                .kinds(record.kinds.iter().map(String::as_str))
                .suppressed(record.suppressed.iter().map(String::as_str))
                .literal_keys(record.literal_keys.iter().map(String::as_str));
            if let Some(signature) = &record.signature {
                draft = draft.signature(signature.as_str());
            }
            if let Some(marker) = &record.marker {
                draft = draft.marker(marker.as_str());
            }
            if let Some(expected) = &record.expected {
                draft = draft.expected(expected.iter().map(String::as_str));
            }
            corpus_file.push(draft.build(&catalog)?);
        }

        store.add_file(corpus_file)?;
    }

    for group in &manifest.groups {
        let group = if group.reduced.is_empty() {
            VariantGroup::identical(group.id.as_str(), group.files.iter().map(String::as_str))
        } else {
            VariantGroup::reduced(
                group.id.as_str(),
                group.files.iter().map(String::as_str),
                group.reduced.iter().map(String::as_str),
            )
        };
        store.add_group(group)?;
    }

    Ok(store)
}
