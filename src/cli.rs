//! CLI interface and main entry point

use crate::builtin::default_manifest;
use crate::config::load_corpus;
use crate::export::export_corpus;
use crate::logging::init_logging;
use crate::types::FindingsFile;
use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, Command};
use serde::Serialize;
use std::fs;
use std::path::Path;
use vibe_fixture_model::{
    verify_findings, Category, CorpusStore, Coverage, CoverageDeclaration, DiffReport, VerificationReport,
};

/// Main entry point for vibe-corpus.
///
/// Parses command-line arguments, loads the corpus and dispatches to the
/// requested action:
/// - `--list-kinds`, `--list-fixtures`, `--list-groups`: query the corpus
/// - `--diff-group <ID>`: coverage diff of a variant group
/// - `--export <DIR>`: write fixture files and expectations for a scanner
/// - `--verify <FILE>`: check scanner findings against the expectations
/// - `--audit`: report suppressions that hide expected detections
/// - `--check`: validate the corpus and print a summary
/// - `--init`: write the built-in corpus as a manifest file
/// - Default: Show usage information
pub fn run_cli() -> Result<()> {
    let matches = build_command().get_matches();

    init_logging(matches.get_flag("verbose"));

    let config_path = matches
        .get_one::<String>("config")
        .expect("config argument has default value");
    let json = matches.get_flag("json");

    if matches.get_flag("init") {
        return write_example_manifest(config_path);
    }

    let has_action = [
        "list-kinds",
        "list-fixtures",
        "list-groups",
        "audit",
        "check",
    ]
    .iter()
    .any(|flag| matches.get_flag(flag))
        || matches.contains_id("diff-group")
        || matches.contains_id("export")
        || matches.contains_id("verify");
    if !has_action {
        print_usage();
        return Ok(());
    }

    let store = load_corpus(config_path)?;

    if matches.get_flag("check") {
        println!("{}", summarize(&store));
    }
    if matches.get_flag("list-kinds") {
        print_output(&store.list_defect_kinds(), json, || format_kinds(&store))?;
    }
    if matches.get_flag("list-fixtures") {
        let category = matches
            .get_one::<String>("category")
            .map(|value| value.parse::<Category>())
            .transpose()
            .map_err(anyhow::Error::msg)?;
        print_output(&store.list_fixtures(category), json, || format_fixtures(&store, category))?;
    }
    if matches.get_flag("list-groups") {
        print_output(&store.get_variant_groups(), json, || format_groups(&store))?;
    }
    if let Some(group) = matches.get_one::<String>("diff-group") {
        let report = store.diff_variant_group(group)?;
        print_output(&report, json, || format_diff(&report))?;
    }
    if matches.get_flag("audit") {
        let audit = store.suppression_audit();
        print_output(&audit, json, || {
            if audit.is_empty() {
                return "No suppression hides an expected detection".to_string();
            }
            audit
                .iter()
                .map(|hidden| {
                    let kinds: Vec<&str> = hidden.kinds.iter().map(|kind| kind.as_str()).collect();
                    format!(
                        "{}::{}{} hides [{}]",
                        hidden.file,
                        hidden.unit,
                        hidden.signature.as_deref().unwrap_or_default(),
                        kinds.join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        })?;
    }
    if let Some(out_dir) = matches.get_one::<String>("export") {
        let written = export_corpus(&store, Path::new(out_dir))?;
        println!("Exported {} files to {out_dir}", written.len());
    }
    if let Some(findings_path) = matches.get_one::<String>("verify") {
        let report = verify_from_file(&store, findings_path)?;
        print_output(&report, json, || format_verification(&report))?;
        if !report.is_clean() {
            bail!(
                "Scanner findings do not match the corpus: {} missed, {} unexpected, {} unknown",
                report.missed.len(),
                report.unexpected.len(),
                report.unknown_kinds.len()
            );
        }
    }

    Ok(())
}

fn build_command() -> Command {
    Command::new("vibe-corpus")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds, validates and exports a corpus of deliberately defective fixtures for scanner testing")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to the corpus manifest (TOML or YAML)")
                .default_value(".vibe-corpus.toml"),
        )
        .arg(
            Arg::new("list-kinds")
                .long("list-kinds")
                .help("List every defect kind in the catalog")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-fixtures")
                .long("list-fixtures")
                .help("List fixtures in declaration order")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("category")
                .long("category")
                .value_name("CATEGORY")
                .help("Only list fixtures with a kind in this category")
                .value_parser(["security", "quality"])
                .requires("list-fixtures"),
        )
        .arg(
            Arg::new("list-groups")
                .long("list-groups")
                .help("List variant groups and their coverage declarations")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("diff-group")
                .long("diff-group")
                .value_name("ID")
                .help("Show the coverage diff of a variant group"),
        )
        .arg(
            Arg::new("export")
                .long("export")
                .value_name("DIR")
                .help("Write rendered fixture files and expectations.json to DIR"),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .value_name("FILE")
                .help("Check scanner findings (JSON) against the expected detections"),
        )
        .arg(
            Arg::new("audit")
                .long("audit")
                .help("Report suppressions that hide expected detections")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Validate the corpus and print a summary")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("init")
                .long("init")
                .help("Write the built-in corpus to the manifest path")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print machine-readable JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log progress to stderr")
                .action(ArgAction::SetTrue),
        )
}

fn print_usage() {
    println!("vibe-corpus v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Queries:");
    println!("  --list-kinds              List every defect kind in the catalog");
    println!("  --list-fixtures           List fixtures (filter with --category security|quality)");
    println!("  --list-groups             List variant groups");
    println!("  --diff-group <ID>         Show the coverage diff of a variant group");
    println!();
    println!("Scanner integration:");
    println!("  --export <DIR>            Write fixture files and expectations.json");
    println!("  --verify <FILE>           Check scanner findings against the expected detections");
    println!("  --audit                   Report suppressions that hide expected detections");
    println!("  --check                   Validate the corpus and print a summary");
    println!();
    println!("Configuration:");
    println!("  -c, --config <FILE>       Path to the manifest [default: .vibe-corpus.toml]");
    println!("  --init                    Write the built-in corpus to the manifest path");
    println!("  --json                    Print machine-readable JSON");
}

/// Prints `value` as pretty JSON, or the text produced by `text` otherwise
fn print_output<T, F>(value: &T, json: bool, text: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn summarize(store: &CorpusStore) -> String {
    format!(
        "Corpus OK: {} kinds, {} files, {} fixtures, {} variant groups",
        store.catalog().len(),
        store.files().len(),
        store.entries().count(),
        store.get_variant_groups().len()
    )
}

fn format_kinds(store: &CorpusStore) -> String {
    store
        .list_defect_kinds()
        .iter()
        .map(|kind| {
            format!(
                "{:<26} {:<9} {:<9} {}",
                kind.id.as_str(),
                kind.category.to_string(),
                kind.severity.to_string(),
                kind.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_fixtures(store: &CorpusStore, category: Option<Category>) -> String {
    let entries = store.list_fixtures(category);
    if entries.is_empty() {
        return "No fixtures found".to_string();
    }

    entries
        .iter()
        .map(|entry| {
            let kinds: Vec<&str> = entry.record.kinds().iter().map(|kind| kind.as_str()).collect();
            let mut line = format!("{}::{} [{}]", entry.file, entry.record.unit_key(), kinds.join(", "));
            if let Some(suppression) = entry.record.suppression() {
                let targets: Vec<&str> = suppression.targets.iter().map(|kind| kind.as_str()).collect();
                line.push_str(&format!(" suppressed: [{}]", targets.join(", ")));
            }
            if entry.record.is_deliberate_trigger() {
                line.push_str(" (deliberate trigger)");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_groups(store: &CorpusStore) -> String {
    let groups = store.get_variant_groups();
    if groups.is_empty() {
        return "No variant groups configured".to_string();
    }

    groups
        .iter()
        .map(|group| {
            let coverage = match &group.coverage {
                CoverageDeclaration::Identical => "identical".to_string(),
                CoverageDeclaration::Reduced(kinds) => {
                    let kinds: Vec<&str> = kinds.iter().map(|kind| kind.as_str()).collect();
                    format!("reduced: {}", kinds.join(", "))
                }
            };
            format!("{}: {} ({coverage})", group.id, group.files.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_diff(report: &DiffReport) -> String {
    if report.is_empty() {
        return "No sibling files to compare".to_string();
    }

    report
        .entries
        .iter()
        .map(|entry| {
            let coverage = match entry.coverage {
                Coverage::PresentInBoth => "present in both",
                Coverage::OnlyInLeft => "only in left",
                Coverage::OnlyInRight => "only in right",
            };
            format!("{} vs {}: {:<26} {coverage}", entry.left, entry.right, entry.kind.as_str())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_verification(report: &VerificationReport) -> String {
    let mut lines = vec![format!("Matched {} expected detections", report.matched)];
    lines.extend(report.missed.iter().map(|missed| {
        format!(
            "missed: {}::{}{} {}",
            missed.file,
            missed.unit,
            missed.signature.as_deref().unwrap_or_default(),
            missed.kind
        )
    }));
    lines.extend(
        report
            .unexpected
            .iter()
            .map(|finding| format!("unexpected: {} {}", finding.file, finding.kind)),
    );
    lines.extend(
        report
            .unknown_kinds
            .iter()
            .map(|finding| format!("unknown kind: {} {}", finding.file, finding.kind)),
    );
    lines.join("\n")
}

fn verify_from_file(store: &CorpusStore, findings_path: &str) -> Result<VerificationReport> {
    let content = fs::read_to_string(findings_path)
        .with_context(|| format!("Failed to read findings file: {findings_path}"))?;
    let findings: FindingsFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse findings file: {findings_path}"))?;

    Ok(verify_findings(store, &findings.into_findings()))
}

/// Writes the built-in corpus as a TOML manifest.
///
/// Leaves an existing manifest untouched.
fn write_example_manifest(config_path: &str) -> Result<()> {
    if Path::new(config_path).exists() {
        println!("Manifest already exists: {config_path}");
        return Ok(());
    }

    let header = "# vibe-corpus manifest\n\
        # Fixtures are deliberately defective. Do not fix them.\n\n";
    let body = toml::to_string_pretty(&default_manifest()).context("Failed to serialize built-in corpus")?;

    fs::write(config_path, format!("{header}{body}"))
        .with_context(|| format!("Failed to write manifest file: {config_path}"))?;

    println!("Created manifest with the built-in corpus: {config_path}");
    Ok(())
}
