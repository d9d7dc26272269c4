//! Vibe Corpus
//!
//! Builds and validates a corpus of deliberately defective fixtures used to
//! test code scanners.
//!
//! # Usage
//!
//! - `--list-fixtures [--category <security|quality>]`: Query the corpus
//! - `--diff-group <ID>`: Compare the files of a variant group
//! - `--export <DIR>` / `--verify <FILE>`: Scanner integration
//! - `--config <path>`: Use custom manifest path

use anyhow::Result;

fn main() -> Result<()> {
    vibe_corpus::run_cli()
}
