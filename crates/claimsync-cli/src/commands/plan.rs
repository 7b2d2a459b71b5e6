//! Plan command - preview mutations against a local snapshot.

use std::path::PathBuf;

use claimsync::{
    CatalogNormalizer, MemoryStore, Stores, Subject, SubjectCache, SubjectOutcome, SyncError,
    Syncer,
};
use colored::Colorize;
use serde_json::json;

use super::{load_config, read_observations};

pub fn run(
    file: PathBuf,
    snapshot: Option<PathBuf>,
    config_path: Option<PathBuf>,
    json: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path.as_deref())?;
    config.submitter.dry_run = true;
    // Planning an unknown subject shows the creation it would need
    config.run.create_missing = true;

    let subjects = match &snapshot {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
            serde_json::from_str::<Vec<Subject>>(&content)?
        }
        None => Vec::new(),
    };

    let cache: SubjectCache = subjects
        .iter()
        .filter_map(|s| s.id.clone().map(|id| (s.external_id.clone(), id)))
        .collect();
    let store = MemoryStore::new();
    for subject in subjects {
        store.insert_subject(subject);
    }

    let normalizer = CatalogNormalizer::new(config.catalog.clone()).with_parser(config.run.parser());
    let mut syncer = Syncer::new(&config, &normalizer, Stores::single(&store)).with_cache(cache);

    let mut plans = Vec::new();
    for observation in read_observations(&file)? {
        let raw = match observation {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("{} {}", "Skipping:".yellow(), e);
                continue;
            }
        };

        match syncer.sync_one(&raw) {
            Ok(SubjectOutcome::Planned { ops }) => {
                if !json {
                    println!("{} ({} mutation(s))", raw.external_id.cyan().bold(), ops.len());
                    for op in &ops {
                        println!("  {} {}", "+".green(), op);
                    }
                }
                plans.push(json!({
                    "external_id": raw.external_id,
                    "ops": ops.iter().map(|op| json!({
                        "kind": op.label(),
                        "property": op.property().map(|p| p.as_str()),
                        "description": op.to_string(),
                    })).collect::<Vec<_>>(),
                }));
            }
            Ok(outcome) => {
                if verbose && !json {
                    println!("{} {:?}", raw.external_id.dimmed(), outcome);
                }
            }
            Err(e) => {
                eprintln!("{} {} {}", "✗".red(), raw.external_id.cyan(), e);
            }
        }
    }

    let duplicates = syncer.ledger().len();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "subjects": plans,
                "duplicates": duplicates,
            }))?
        );
    } else {
        println!();
        println!(
            "{} {} subject(s) would change, {} duplicate asset(s) linked",
            "Plan:".white().bold(),
            plans.len(),
            duplicates
        );
    }
    Ok(())
}
