use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

use seowatch::args::Args;
use seowatch::notify::Notifier;
use seowatch::sheet::TabularStore;
use seowatch::{analyzer, config, fetch, notify, report, sheet, snapshot, utils};

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    match run(&args) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(action = "fail", component = "main", error = %e, "Run failed");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let cfg = config::load_sites_config(&args.config)?;

    if args.list_sites {
        config::print_sites(&cfg);
        return Ok(());
    }

    let urls = if let Some(urls) = &args.urls {
        urls.clone()
    } else if let Some(site) = &args.site {
        cfg.site_urls(site)
    } else {
        cfg.all_urls()
    };
    if urls.is_empty() {
        anyhow::bail!("No URLs to analyze");
    }

    let counts_path = args.counts.as_ref().context("--counts is required")?;
    let fetcher = fetch::FileFetcher::load(counts_path)?;

    let snapshot_path = args
        .snapshot
        .clone()
        .or_else(|| cfg.settings.snapshot_file.clone())
        .unwrap_or_else(|| PathBuf::from("seo_snapshot.json"));
    let store = snapshot::SnapshotStore::new(snapshot_path);

    let summary = analyzer::run_analysis(&cfg, &urls, &fetcher, &store)?;
    analyzer::print_results(&summary);

    if !args.no_local {
        let path = analyzer::save_results_locally(&summary)?;
        println!("💾 Results saved to {}", path.display());
    }

    if !args.no_export {
        let export_path = args
            .export
            .clone()
            .or_else(|| cfg.settings.export_file.clone())
            .unwrap_or_else(|| PathBuf::from("seo_results.csv"));
        let mut table = sheet::CsvTable::new(export_path);
        for page in &summary.pages {
            table.write_row(&sheet::to_row(page, summary.timestamp))?;
        }
        println!("✅ Exported {} rows to {}", summary.pages.len(), table.path().display());
    }

    if !args.no_notify {
        let notifier = notify::ConsoleNotifier;
        notifier.send(&report::render_summary(&summary))?;
        for chunk in report::render_changes(&summary.changes, report::MESSAGE_LIMIT)? {
            notifier.send(&chunk)?;
        }
    }

    Ok(())
}
