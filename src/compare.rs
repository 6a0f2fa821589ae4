//! Field-by-field comparison of the current counts for a URL against its
//! stored baseline. A page regresses when any field's count drops; an
//! improvement in one field never offsets a drop in another.

use serde::Serialize;

use crate::schema::{self, PageCounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// First run for this URL, nothing to compare against.
    Baseline,
    Success,
    Regression,
    /// Fetch failed, no current counts for this run.
    Error,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Baseline => "baseline",
            PageStatus::Success => "success",
            PageStatus::Regression => "regression",
            PageStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDelta {
    pub field: &'static str,
    pub previous: Option<i64>,
    pub current: Option<i64>,
    /// `current - previous`; `None` when either side failed to parse.
    pub delta: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageComparison {
    pub url: String,
    pub status: PageStatus,
    pub deltas: Vec<FieldDelta>,
    pub errors: Vec<String>,
}

impl PageComparison {
    pub fn fetch_failed(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            status: PageStatus::Error,
            deltas: Vec::new(),
            errors: vec![error],
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.status != PageStatus::Error
    }

    /// Current value of one field, when it was parseable this run.
    pub fn current_count(&self, field: &str) -> Option<i64> {
        self.deltas
            .iter()
            .find(|d| d.field == field)
            .and_then(|d| d.current)
    }
}

/// Compares current counts against the previous snapshot entry for a
/// URL. Deltas come out in schema order; a field that fails to parse on
/// either side is reported with `delta = None`, recorded in `errors`,
/// and excluded from the regression decision.
pub fn compare(url: &str, previous: Option<&PageCounts>, current: &PageCounts) -> PageComparison {
    let mut deltas = Vec::with_capacity(schema::FIELDS.len());
    let mut errors = Vec::new();

    let Some(previous) = previous else {
        for field in schema::fields() {
            let cur = schema::count_of(current, field);
            if cur.is_none() {
                errors.push(format!("could not parse current value for {field}"));
            }
            deltas.push(FieldDelta {
                field,
                previous: None,
                current: cur,
                delta: cur,
            });
        }
        return PageComparison {
            url: url.to_string(),
            status: PageStatus::Baseline,
            deltas,
            errors,
        };
    };

    let mut regressed = false;
    for field in schema::fields() {
        let prev = schema::count_of(previous, field);
        let cur = schema::count_of(current, field);

        if prev.is_none() {
            errors.push(format!("could not parse previous value for {field}"));
        }
        if cur.is_none() {
            errors.push(format!("could not parse current value for {field}"));
        }

        let delta = match (prev, cur) {
            (Some(p), Some(c)) => Some(c - p),
            _ => None,
        };
        if matches!(delta, Some(d) if d < 0) {
            regressed = true;
        }

        deltas.push(FieldDelta {
            field,
            previous: prev,
            current: cur,
            delta,
        });
    }

    let status = if regressed {
        PageStatus::Regression
    } else {
        PageStatus::Success
    };

    PageComparison {
        url: url.to_string(),
        status,
        deltas,
        errors,
    }
}
