use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::compare::PageComparison;

#[derive(Debug, Clone, Serialize)]
pub struct SiteBreakdown {
    pub key: String,
    pub name: String,
    pub pages: usize,
    pub successful: usize,
}

/// One non-zero field movement on one URL. The flattened list of these,
/// in run order, feeds the chunked change report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub url: String,
    pub field: &'static str,
    pub previous: i64,
    pub current: i64,
    pub delta: i64,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub total_sites: usize,
    pub total_pages: usize,
    /// Pages whose fetch and comparison completed, whatever the verdict.
    pub successful_pages: usize,
    pub error_pages: usize,
    pub baseline_pages: usize,
    pub regressed_pages: usize,
    pub pages_with_title: usize,
    pub pages_with_description: usize,
    pub sites: Vec<SiteBreakdown>,
    pub pages: Vec<PageComparison>,
    pub changes: Vec<ChangeRecord>,
}

impl RunSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            self.successful_pages as f64 / self.total_pages as f64 * 100.0
        }
    }
}
