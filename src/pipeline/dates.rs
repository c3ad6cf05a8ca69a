//! Lab date resolution.
//!
//! Every report gets exactly one calendar date, resolved through an ordered
//! fallback chain: labeled date in the text, then any bare date in the text,
//! then a date inferred from the original filename, then the upload date.

use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

/// Accepted date formats, tried in this order. First valid parse wins.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Normalize a candidate date string to a calendar date.
///
/// Invalid calendar dates (month 13, day 32) fail the parse and return
/// `None` so the caller can try the next candidate.
pub fn parse_date_string(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Date patterns scanned over report text, in priority order: labeled dates
/// first (textual, then year-first numeric, then day-first numeric), bare
/// dates after. For each pattern only the first occurrence is considered.
static TEXT_DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    const LABELS: &str =
        "report date|collection date|collected|sample date|date of service|order date|specimen date|date";
    vec![
        Regex::new(&format!(
            r"(?i)(?:report generated|{LABELS})\s*[:\-]?\s*([A-Za-z]{{3,9}}\s+\d{{1,2}},\s+\d{{4}})"
        ))
        .unwrap(),
        Regex::new(&format!(
            r"(?i)(?:{LABELS})\s*[:\-]?\s*(\d{{4}}[/\-]\d{{1,2}}[/\-]\d{{1,2}})"
        ))
        .unwrap(),
        Regex::new(&format!(
            r"(?i)(?:{LABELS})\s*[:\-]?\s*(\d{{1,2}}[/\-]\d{{1,2}}[/\-]\d{{4}})"
        ))
        .unwrap(),
        Regex::new(r"\b\d{4}[/\-]\d{1,2}[/\-]\d{1,2}\b").unwrap(),
        Regex::new(r"\b\d{1,2}[/\-]\d{1,2}[/\-]\d{4}\b").unwrap(),
        Regex::new(r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\s+\d{1,2},\s+\d{4}\b")
            .unwrap(),
    ]
});

/// Find a report date in the text, labeled dates taking priority.
pub fn extract_lab_date(text: &str) -> Option<NaiveDate> {
    for pattern in TEXT_DATE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let candidate = caps
                .get(1)
                .unwrap_or_else(|| caps.get(0).expect("match has group 0"))
                .as_str();
            if let Some(date) = parse_date_string(candidate) {
                return Some(date);
            }
        }
    }
    None
}

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
// Filename digit groups are delimited by non-digits rather than `\b`:
// underscores are word characters, so `\b` would miss `report_20240305`.
static YMD_GROUPS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])(\d{4})[._ \-]?(\d{2})[._ \-]?(\d{2})(?:[^0-9]|$)").unwrap()
});
static SEPARATED_PAIRS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])(\d{2})[._ \-](\d{2})[._ \-](\d{2})(?:[^0-9]|$)").unwrap()
});
static COMPACT_PAIRS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])(\d{2})(\d{2})(\d{2})(?:[^0-9]|$)").unwrap()
});
static SIX_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{6}").unwrap());

/// Resolve a 2-digit triple as a date, DD-MM-YY preferred, YY-MM-DD second.
/// 2-digit years are anchored to 2000.
fn date_from_pairs(a: u32, b: u32, c: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2000 + c as i32, b, a)
        .or_else(|| NaiveDate::from_ymd_opt(2000 + a as i32, b, c))
}

/// Infer a date from the original filename when the text has none.
///
/// Tries, in order: an explicit year-month-day group (separators `.`,
/// `_`, `-`, space, or none), a separated 2-2-2 group, a bare 6-digit
/// run, and finally any 6-digit chunk anywhere in the name.
pub fn extract_date_from_filename(filename: &str) -> Option<NaiveDate> {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let name = WHITESPACE.replace_all(&stem, " ");

    if let Some(caps) = YMD_GROUPS.captures(&name) {
        let (y, m, d) = captured_triple(&caps);
        if let Some(date) = NaiveDate::from_ymd_opt(y as i32, m, d) {
            return Some(date);
        }
    }

    if let Some(caps) = SEPARATED_PAIRS.captures(&name) {
        let (a, b, c) = captured_triple(&caps);
        if let Some(date) = date_from_pairs(a, b, c) {
            return Some(date);
        }
    }

    if let Some(caps) = COMPACT_PAIRS.captures(&name) {
        let (a, b, c) = captured_triple(&caps);
        if let Some(date) = date_from_pairs(a, b, c) {
            return Some(date);
        }
    }

    for chunk in SIX_DIGITS.find_iter(&name) {
        let digits = chunk.as_str();
        let a = digits[0..2].parse().unwrap_or(0);
        let b = digits[2..4].parse().unwrap_or(0);
        let c = digits[4..6].parse().unwrap_or(0);
        if let Some(date) = date_from_pairs(a, b, c) {
            return Some(date);
        }
    }

    None
}

fn captured_triple(caps: &regex::Captures<'_>) -> (u32, u32, u32) {
    let group = |i: usize| caps[i].parse().unwrap_or(0);
    (group(1), group(2), group(3))
}

/// Full fallback chain: text, then filename, then the upload date.
pub fn resolve_lab_date(
    text: &str,
    original_filename: &str,
    uploaded_at: DateTime<Utc>,
) -> NaiveDate {
    extract_lab_date(text)
        .or_else(|| extract_date_from_filename(original_filename))
        .unwrap_or_else(|| uploaded_at.date_naive())
}
