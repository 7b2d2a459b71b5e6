//! Sync command - reconcile observations and submit the changes.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use claimsync::{
    CatalogNormalizer, Credentials, FileReportSink, LedgerReport, MemoryStore, RunSummary,
    SparqlClient, Stores, SubjectCache, SyncConfig, Syncer, WikibaseClient,
};
use colored::Colorize;

use super::{load_config, read_observations};

/// Command-line switches layered over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub dry_run: bool,
    pub create: bool,
    pub offline: bool,
    pub report: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, config: &mut SyncConfig) {
        if self.dry_run {
            config.submitter.dry_run = true;
        }
        if self.create {
            config.run.create_missing = true;
        }
        if let Some(path) = &self.report {
            config.report.path = path.clone();
        }
    }
}

pub fn run(
    file: PathBuf,
    config_path: Option<PathBuf>,
    overrides: Overrides,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path.as_deref())?;
    overrides.apply(&mut config);
    config.validate()?;

    let observations = read_observations(&file)?;
    let normalizer = CatalogNormalizer::new(config.catalog.clone()).with_parser(config.run.parser());

    // Ctrl-C stops the run between subjects
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })?;
    let should_stop = || stop.load(Ordering::SeqCst);

    let mode = if config.submitter.dry_run { "dry run" } else { "live" };
    println!(
        "{} {} ({})",
        "Syncing".cyan().bold(),
        file.display(),
        mode.white().bold()
    );

    let (summary, report) = if overrides.offline {
        let store = MemoryStore::new();
        let syncer = Syncer::new(&config, &normalizer, Stores::single(&store));
        execute(syncer, &config, observations, should_stop)?
    } else {
        let mut client = WikibaseClient::new(config.store.clone())?
            .with_time_qualifiers(config.catalog.time.clone());
        if !config.submitter.dry_run {
            client = client.with_credentials(Credentials::from_env()?);
        }

        let cache = match &config.run.collection {
            Some(filter) => SubjectCache::from_bulk(&SparqlClient::new(&config.store)?, filter)?,
            None => SubjectCache::new(),
        };
        let syncer = Syncer::new(&config, &normalizer, Stores::single(&client)).with_cache(cache);
        execute(syncer, &config, observations, should_stop)?
    };

    print_summary(&summary, &report, &config, verbose);

    if summary.failed() > 0 {
        return Err(format!("{} subject(s) failed", summary.failed()).into());
    }
    Ok(())
}

fn execute<I, F>(
    mut syncer: Syncer<'_>,
    config: &SyncConfig,
    observations: I,
    should_stop: F,
) -> claimsync::Result<(RunSummary, LedgerReport)>
where
    I: IntoIterator<Item = claimsync::Result<claimsync::RawObservation>>,
    F: Fn() -> bool,
{
    syncer.run(observations, should_stop);
    syncer.finish(&FileReportSink::new(config.report.path.clone()))
}

fn print_summary(summary: &RunSummary, report: &LedgerReport, config: &SyncConfig, verbose: bool) {
    println!();
    println!("{}", "Run summary".white().bold());
    println!("  {} {}", "processed".dimmed(), summary.processed);
    println!("  {} {}", "updated".dimmed(), summary.updated.to_string().green());
    println!("  {} {}", "created".dimmed(), summary.created.to_string().green());
    println!("  {} {}", "unchanged".dimmed(), summary.unchanged);
    if summary.planned > 0 {
        println!("  {} {}", "planned".dimmed(), summary.planned.to_string().cyan());
    }
    if summary.not_created > 0 {
        println!("  {} {}", "not created".dimmed(), summary.not_created.to_string().yellow());
    }
    println!("  {} {}", "mutations".dimmed(), summary.ops);
    if summary.field_issues > 0 {
        println!("  {} {}", "dropped fields".dimmed(), summary.field_issues.to_string().yellow());
    }
    println!(
        "  {} {} ({})",
        "duplicates".dimmed(),
        report.count,
        config.report.path.display()
    );

    if verbose {
        let stats = &summary.submit;
        println!(
            "  {} {} submitted, {} attempts, {} token refreshes",
            "submitter".dimmed(),
            stats.submitted,
            stats.attempts,
            stats.refreshes
        );
    }

    if summary.stopped {
        println!("{} Run stopped early on request", "Note:".yellow());
    }

    for failure in &summary.failures {
        let id = if failure.external_id.is_empty() { "?" } else { failure.external_id.as_str() };
        println!("  {} {} {}", "✗".red(), id.cyan(), failure.message);
    }
}
