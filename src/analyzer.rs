use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::compare::{self, PageComparison, PageStatus};
use crate::config::SitesConfig;
use crate::fetch::PageFetcher;
use crate::snapshot::SnapshotStore;
use crate::stats::{ChangeRecord, RunSummary, SiteBreakdown};
use crate::utils::format_number;

/// Runs one analysis pass: fetch each URL in order, compare against the
/// stored baseline, persist the merged snapshot, and aggregate the run.
/// A single URL's fetch failure is recorded as an error page and keeps
/// its previous snapshot entry; the loop never aborts for it.
pub fn run_analysis(
    config: &SitesConfig,
    urls: &[String],
    fetcher: &dyn PageFetcher,
    store: &SnapshotStore,
) -> Result<RunSummary> {
    let total_start = Instant::now();
    info!(
        action = "start",
        component = "analysis",
        url_count = urls.len(),
        "Starting site analysis"
    );

    let timestamp = Utc::now();
    let mut snapshot = store.load()?;
    let mut pages = Vec::with_capacity(urls.len());

    for url in urls {
        match fetcher.fetch(url) {
            Ok(counts) => {
                let comparison = compare::compare(url, snapshot.get(url.as_str()), &counts);
                info!(
                    action = "page",
                    component = "analysis",
                    url = %url,
                    status = comparison.status.as_str(),
                    "Page analyzed"
                );
                snapshot.insert(url.clone(), counts);
                pages.push(comparison);
            }
            Err(e) => {
                warn!(
                    action = "page",
                    component = "analysis",
                    url = %url,
                    error = %e,
                    "Fetch failed, previous snapshot entry retained"
                );
                pages.push(PageComparison::fetch_failed(url, e.to_string()));
            }
        }
    }

    store.save(&snapshot)?;

    let summary = summarize(config, timestamp, pages);
    info!(
        action = "complete",
        component = "analysis",
        duration_ms = total_start.elapsed().as_millis() as u64,
        pages = summary.total_pages,
        errors = summary.error_pages,
        regressions = summary.regressed_pages,
        "Analysis completed"
    );
    Ok(summary)
}

fn summarize(
    config: &SitesConfig,
    timestamp: chrono::DateTime<Utc>,
    pages: Vec<PageComparison>,
) -> RunSummary {
    let total_pages = pages.len();
    let successful_pages = pages.iter().filter(|p| p.is_analyzed()).count();
    let error_pages = total_pages - successful_pages;
    let baseline_pages = pages
        .iter()
        .filter(|p| p.status == PageStatus::Baseline)
        .count();
    let regressed_pages = pages
        .iter()
        .filter(|p| p.status == PageStatus::Regression)
        .count();

    let pages_with_title = pages
        .iter()
        .filter(|p| p.is_analyzed() && p.current_count("title_count").unwrap_or(0) > 0)
        .count();
    let pages_with_description = pages
        .iter()
        .filter(|p| p.is_analyzed() && p.current_count("description_count").unwrap_or(0) > 0)
        .count();

    // Group pages per configured site in first-seen run order; URLs
    // outside every site fall into an "unknown" bucket.
    let mut per_site: BTreeMap<&str, (String, usize, usize)> = BTreeMap::new();
    let mut order: Vec<&str> = Vec::new();
    for page in &pages {
        let (key, name) = match config.site_for(&page.url) {
            Some((key, site)) => (key, site.name.clone()),
            None => ("unknown", "Unknown site".to_string()),
        };
        let entry = per_site.entry(key).or_insert_with(|| {
            order.push(key);
            (name, 0, 0)
        });
        entry.1 += 1;
        if page.is_analyzed() {
            entry.2 += 1;
        }
    }
    let sites: Vec<SiteBreakdown> = order
        .iter()
        .map(|key| {
            let (name, page_count, ok) = &per_site[key];
            SiteBreakdown {
                key: key.to_string(),
                name: name.clone(),
                pages: *page_count,
                successful: *ok,
            }
        })
        .collect();

    // Flattened change feed in run order. Baseline pages set the first
    // baseline and report no changes, matching the previous behavior of
    // only diffing when prior data existed.
    let mut changes = Vec::new();
    for page in &pages {
        if !matches!(page.status, PageStatus::Success | PageStatus::Regression) {
            continue;
        }
        for delta in &page.deltas {
            if let (Some(previous), Some(current), Some(d)) =
                (delta.previous, delta.current, delta.delta)
            {
                if d != 0 {
                    changes.push(ChangeRecord {
                        url: page.url.clone(),
                        field: delta.field,
                        previous,
                        current,
                        delta: d,
                    });
                }
            }
        }
    }

    RunSummary {
        timestamp,
        total_sites: sites.len(),
        total_pages,
        successful_pages,
        error_pages,
        baseline_pages,
        regressed_pages,
        pages_with_title,
        pages_with_description,
        sites,
        pages,
        changes,
    }
}

pub fn print_results(summary: &RunSummary) {
    println!("\n{}", "=".repeat(100));
    println!("MULTI-SITE SEO ANALYSIS RESULTS");
    println!("{}", "=".repeat(100));

    for (i, page) in summary.pages.iter().enumerate() {
        println!("\n{}. {}", i + 1, page.url);
        println!("   Status: {}", page.status.as_str());

        if page.is_analyzed() {
            println!("   📈 Heading counts:");
            for level in 1..=6 {
                let total = page
                    .current_count(&format!("h{level}_total"))
                    .unwrap_or(0);
                let non_empty = page
                    .current_count(&format!("h{level}_non_empty"))
                    .unwrap_or(0);
                if total > 0 {
                    println!("     H{level}: {non_empty} (total: {total})");
                }
            }
            println!(
                "   📝 Title with content: {}",
                page.current_count("title_count").unwrap_or(0)
            );
            println!(
                "   📄 Description with content: {}",
                page.current_count("description_count").unwrap_or(0)
            );

            let moved = page
                .deltas
                .iter()
                .filter(|d| matches!(d.delta, Some(d) if d != 0))
                .count();
            match page.status {
                PageStatus::Baseline => println!("   🔍 Comparison: first check, baseline stored"),
                PageStatus::Regression => println!("   ⚠️ Regression: {moved} fields changed"),
                _ if moved > 0 => println!("   ✅ Changes: {moved} fields"),
                _ => println!("   ✅ No changes"),
            }
        }
        for error in &page.errors {
            println!("   ❌ {error}");
        }
    }

    println!("\n{}", "=".repeat(100));
    println!("📈 TOTALS:");
    println!("   🌐 Sites: {}", format_number(summary.total_sites as u64));
    println!("   📄 Pages: {}", format_number(summary.total_pages as u64));
    println!(
        "   ✅ Successful: {}",
        format_number(summary.successful_pages as u64)
    );
    println!("   ❌ Errors: {}", format_number(summary.error_pages as u64));
    println!("   📊 Success rate: {:.1}%", summary.success_rate());
    println!("{}", "=".repeat(100));
}

/// Dumps the full run summary to a timestamped JSON file next to the
/// working directory, mirroring the exported payloads for later
/// inspection.
pub fn save_results_locally(summary: &RunSummary) -> Result<PathBuf> {
    let filename = format!(
        "seo_results_{}.json",
        summary.timestamp.format("%Y%m%d_%H%M%S")
    );
    let path = PathBuf::from(filename);
    let text = serde_json::to_string_pretty(summary).context("Failed to encode run results")?;
    fs::write(&path, text).with_context(|| format!("Failed to write results file {path:?}"))?;

    info!(
        action = "save",
        component = "results_dump",
        path = ?path,
        "Run results saved locally"
    );
    Ok(path)
}
