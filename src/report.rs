//! Pure rendering of a run summary into bounded-size text payloads for
//! the messaging sink. The sink's character limit is a hard contract:
//! change lines are packed greedily into chunks and never split, and a
//! single line that cannot fit on its own is a producer bug surfaced as
//! an error, not truncated.

use std::fmt::Write;
use thiserror::Error;

use crate::stats::{ChangeRecord, RunSummary};

/// Hard payload limit of the messaging sink (Telegram message size).
pub const MESSAGE_LIMIT: usize = 4096;

/// Sites listed individually before the summary falls back to a
/// "+N more" suffix.
const SITE_CAP: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("change record of {len} chars exceeds the {limit}-char payload limit")]
    RecordTooLong { len: usize, limit: usize },
}

/// Renders the header payload: run totals, presence ratios for the two
/// key fields, and a capped per-site breakdown. Always a single payload.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "📊 SEO ANALYSIS REPORT");
    let _ = writeln!(out, "{}", summary.timestamp.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out);
    let _ = writeln!(out, "📈 TOTALS:");
    let _ = writeln!(out, "🌐 Sites: {}", summary.total_sites);
    let _ = writeln!(out, "📄 Pages: {}", summary.total_pages);
    let _ = writeln!(out, "✅ Successful: {}", summary.successful_pages);
    let _ = writeln!(out, "❌ Errors: {}", summary.error_pages);
    let _ = writeln!(out, "📊 Success rate: {:.1}%", summary.success_rate());
    let _ = writeln!(out);
    let _ = writeln!(out, "🔍 SEO ELEMENTS:");
    let _ = writeln!(
        out,
        "📝 Title: {}/{} ({:.1}%)",
        summary.pages_with_title,
        summary.successful_pages,
        pct(summary.pages_with_title, summary.successful_pages)
    );
    let _ = writeln!(
        out,
        "📄 Description: {}/{} ({:.1}%)",
        summary.pages_with_description,
        summary.successful_pages,
        pct(summary.pages_with_description, summary.successful_pages)
    );

    if !summary.sites.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "🌐 SITES:");
        for site in summary.sites.iter().take(SITE_CAP) {
            let _ = writeln!(
                out,
                "{} ({}): {} pages, {} ok, {} errors",
                site.name,
                site.key,
                site.pages,
                site.successful,
                site.pages - site.successful
            );
        }
        if summary.sites.len() > SITE_CAP {
            let _ = writeln!(out, "... and {} more sites", summary.sites.len() - SITE_CAP);
        }
    }

    if !summary.changes.is_empty() {
        let mut changed_urls: Vec<&str> = summary.changes.iter().map(|c| c.url.as_str()).collect();
        changed_urls.dedup();
        let _ = writeln!(out);
        let _ = writeln!(out, "🔄 Pages with changes: {}", changed_urls.len());
    }
    if summary.regressed_pages > 0 {
        let _ = writeln!(out, "⚠️ Regressions: {}", summary.regressed_pages);
    }

    out.trim_end().to_string()
}

pub fn format_change(change: &ChangeRecord) -> String {
    let sign = if change.delta > 0 { "➕" } else { "➖" };
    format!(
        "{sign} {} {}: {:+}",
        change.url, change.field, change.delta
    )
}

/// Renders the change feed into successive payloads, each at most
/// `limit` characters. An empty change list produces no payloads.
pub fn render_changes(changes: &[ChangeRecord], limit: usize) -> Result<Vec<String>, RenderError> {
    let lines: Vec<String> = changes.iter().map(format_change).collect();
    chunk_lines(&lines, limit)
}

/// Packs lines greedily into newline-joined chunks of at most `limit`
/// characters. Lines are never split or reordered; a line longer than
/// `limit` on its own is an input-contract violation.
pub fn chunk_lines(lines: &[String], limit: usize) -> Result<Vec<String>, RenderError> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for line in lines {
        let line_chars = line.chars().count();
        if line_chars > limit {
            return Err(RenderError::RecordTooLong {
                len: line_chars,
                limit,
            });
        }

        if !current.is_empty() && current_chars + 1 + line_chars > limit {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_chars += 1;
        }
        current.push_str(line);
        current_chars += line_chars;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}

fn pct(n: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        n as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::SiteBreakdown;
    use chrono::TimeZone;

    fn lines_of(len: usize, count: usize) -> Vec<String> {
        (0..count).map(|_| "x".repeat(len)).collect()
    }

    #[test]
    fn three_20_char_lines_at_limit_50_make_two_chunks() {
        let chunks = chunk_lines(&lines_of(20, 3), 50).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 41);
        assert_eq!(chunks[1].chars().count(), 20);
    }

    #[test]
    fn chunks_respect_the_limit_and_preserve_every_line() {
        let lines: Vec<String> = (0..40).map(|i| format!("line-{i:03}")).collect();
        let chunks = chunk_lines(&lines, 30).unwrap();

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30);
        }
        let rejoined: Vec<String> = chunks
            .iter()
            .flat_map(|c| c.lines().map(str::to_string))
            .collect();
        assert_eq!(rejoined, lines);
    }

    #[test]
    fn exact_fit_stays_in_one_chunk() {
        // 25 + newline + 24 is exactly 50
        let lines = vec!["x".repeat(25), "y".repeat(24)];
        let chunks = chunk_lines(&lines, 50).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), 50);
    }

    #[test]
    fn empty_change_list_produces_no_chunks() {
        assert_eq!(render_changes(&[], MESSAGE_LIMIT).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn oversized_record_is_an_error_not_a_truncation() {
        let lines = vec!["x".repeat(51)];
        assert_eq!(
            chunk_lines(&lines, 50),
            Err(RenderError::RecordTooLong { len: 51, limit: 50 })
        );
    }

    fn summary_with_sites(site_count: usize) -> RunSummary {
        RunSummary {
            timestamp: chrono::Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap(),
            total_sites: site_count,
            total_pages: site_count * 2,
            successful_pages: site_count * 2,
            error_pages: 0,
            baseline_pages: 0,
            regressed_pages: 0,
            pages_with_title: site_count,
            pages_with_description: site_count,
            sites: (0..site_count)
                .map(|i| SiteBreakdown {
                    key: format!("site-{i}"),
                    name: format!("Site {i}"),
                    pages: 2,
                    successful: 2,
                })
                .collect(),
            pages: Vec::new(),
            changes: Vec::new(),
        }
    }

    #[test]
    fn summary_caps_site_listing() {
        let text = render_summary(&summary_with_sites(8));
        assert!(text.contains("Site 4"));
        assert!(!text.contains("Site 5"));
        assert!(text.contains("... and 3 more sites"));
    }

    #[test]
    fn summary_is_deterministic() {
        let summary = summary_with_sites(3);
        assert_eq!(render_summary(&summary), render_summary(&summary));
    }

    #[test]
    fn change_lines_carry_signed_deltas() {
        let up = ChangeRecord {
            url: "https://a.example/".to_string(),
            field: "h2_total",
            previous: 3,
            current: 5,
            delta: 2,
        };
        let down = ChangeRecord {
            url: "https://a.example/".to_string(),
            field: "h1_non_empty",
            previous: 2,
            current: 1,
            delta: -1,
        };
        assert_eq!(format_change(&up), "➕ https://a.example/ h2_total: +2");
        assert_eq!(format_change(&down), "➖ https://a.example/ h1_non_empty: -1");
    }
}
