//! Writing the corpus to disk for an external scanner

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use vibe_fixture_model::{CorpusStore, ExpectationSet};

/// Name of the expectations file written next to the fixtures
pub const EXPECTATIONS_FILE: &str = "expectations.json";

/// Renders every corpus file under `out_dir` and writes the expected
/// detections alongside them.
///
/// All target paths are checked before anything is written.
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Paths written, fixtures first, expectations last
/// * `Err` - If a file name escapes `out_dir`, two names resolve to the same
///   path, a name collides with the expectations file, or writing fails
pub fn export_corpus(store: &CorpusStore, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let targets = plan_targets(store)?;
    let mut written = Vec::with_capacity(targets.len() + 1);

    for (file, relative) in store.files().iter().zip(targets) {
        let target = out_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(&target, file.render())
            .with_context(|| format!("Failed to write fixture file: {}", target.display()))?;
        debug!(path = %target.display(), "exported fixture file");
        written.push(target);
    }

    let expectations = ExpectationSet::from_store(store);
    let target = out_dir.join(EXPECTATIONS_FILE);
    let json = serde_json::to_string_pretty(&expectations).context("Failed to serialize expectations")?;
    fs::write(&target, json)
        .with_context(|| format!("Failed to write expectations: {}", target.display()))?;
    written.push(target);

    Ok(written)
}

/// Normalized relative path of every corpus file, in store order
fn plan_targets(store: &CorpusStore) -> Result<Vec<PathBuf>> {
    let mut seen: HashMap<PathBuf, &str> = HashMap::new();
    let mut targets = Vec::with_capacity(store.files().len());

    for file in store.files() {
        let name = file.name();
        let mut relative = PathBuf::new();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                _ => bail!("Refusing to export '{name}': file names must be relative paths inside the output directory"),
            }
        }

        if relative.as_os_str().is_empty() {
            bail!("Refusing to export '{name}': the file name is empty");
        }
        if relative == Path::new(EXPECTATIONS_FILE) {
            bail!("Refusing to export '{name}': it would be overwritten by {EXPECTATIONS_FILE}");
        }
        if let Some(previous) = seen.insert(relative.clone(), name) {
            bail!(
                "Refusing to export '{name}': it resolves to the same path as '{previous}' ({})",
                relative.display()
            );
        }
        targets.push(relative);
    }

    Ok(targets)
}
