// src/db/filters.rs

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::db::{
    pagination::PageRequest,
    query::{CmpOp, Param, Predicate},
};

/// Sentinel meaning "every warehouse".
pub const ALL_WAREHOUSES: &str = "ALL";

// ---
// Raw query string
// ---

/// Everything is a string on purpose: a malformed value must degrade to "no filter",
/// never turn into a 400 from the extractor.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReportParams {
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Rows per page (default depends on the report, max 500)
    pub page_size: Option<String>,
    /// Case-insensitive substring match
    pub search: Option<String>,
    /// Inclusive lower date bound (YYYY-MM-DD or RFC 3339)
    pub from: Option<String>,
    /// Inclusive upper date bound (YYYY-MM-DD or RFC 3339)
    pub to: Option<String>,
    /// Calendar month, YYYY-MM
    pub month: Option<String>,
    /// Warehouse code, or ALL
    pub warehouse: Option<String>,
    /// Critical stock threshold in cartons (default 20)
    pub threshold: Option<String>,
}

impl ReportParams {
    pub fn page_request(&self, default_page_size: i64) -> PageRequest {
        PageRequest::from_raw(self.page.as_deref(), self.page_size.as_deref(), default_page_size)
    }

    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

// ---
// Filter spec -> FilterSet
// ---

/// Which columns of a report the user-facing filters apply to.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterSpec {
    pub date_column: Option<&'static str>,
    pub search_columns: &'static [&'static str],
    pub warehouse_column: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    /// Every parameter the predicates will bind, by name.
    pub fn named_params(&self) -> Vec<&Param> {
        self.predicates
            .iter()
            .flat_map(|p| match p {
                Predicate::Compare { param, .. } | Predicate::MatchesAny { param, .. } => vec![param],
                Predicate::OneOf { params, .. } => params.iter().collect(),
                Predicate::Range { lower, upper, .. } => lower
                    .iter()
                    .chain(upper.iter())
                    .map(|b| &b.param)
                    .collect(),
                Predicate::NotNull { .. } | Predicate::Exists { .. } => vec![],
            })
            .collect()
    }
}

#[cfg(test)]
impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl FilterSpec {
    /// `tz` is the report time zone; RFC 3339 bounds are converted into it.
    pub fn build(&self, params: &ReportParams, tz: Tz) -> FilterSet {
        let mut set = FilterSet::default();

        if let Some(column) = self.date_column {
            if let Some((start, end)) = params.month.as_deref().and_then(parse_month) {
                set.push(Predicate::half_open(column, "month", start, end));
            }
            if let Some(from) = params.from.as_deref().and_then(|raw| parse_date_input(raw, tz)) {
                set.push(Predicate::compare(column, CmpOp::Ge, "fromDate", from));
            }
            if let Some(to) = params.to.as_deref().and_then(|raw| parse_date_input(raw, tz)) {
                set.push(Predicate::compare(column, CmpOp::Le, "toDate", to));
            }
        }

        if !self.search_columns.is_empty() {
            if let Some(pattern) = params.search_term().map(like_pattern) {
                set.push(Predicate::matches_any(self.search_columns, "searchTerm", pattern));
            }
        }

        if let Some(column) = self.warehouse_column {
            if let Some(code) = warehouse_code(params.warehouse.as_deref()) {
                set.push(Predicate::eq(column, "warehouse", code));
            }
        }

        set
    }
}

// ---
// Normalizers. All of them return None instead of failing.
// ---

/// Accepts `YYYY-MM-DD` (midnight), `YYYY-MM-DDTHH:MM[:SS]` and RFC 3339. Inputs without
/// an offset are wall-clock time in `tz`; RFC 3339 instants are shifted into `tz`.
pub fn parse_date_input(raw: &str, tz: Tz) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&tz).naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// `YYYY-MM` -> `[first of month, first of next month)`. A full `YYYY-MM-DD` date selects
/// the month it falls in.
pub fn parse_month(raw: &str) -> Option<(NaiveDate, NaiveDate)> {
    let raw = raw.trim();
    let (year, month): (i32, u32) = match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => (date.year(), date.month()),
        Err(_) => {
            let (year, month) = raw.split_once('-')?;
            (year.parse().ok()?, month.parse().ok()?)
        }
    };
    if !(1..=12).contains(&month) {
        return None;
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, end))
}

/// Escapes LIKE metacharacters so the term matches literally, then wraps it in `%`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// `None` for blank and for the ALL sentinel.
pub fn warehouse_code(raw: Option<&str>) -> Option<String> {
    let code = raw?.trim();
    if code.is_empty() || code.eq_ignore_ascii_case(ALL_WAREHOUSES) {
        None
    } else {
        Some(code.to_string())
    }
}
