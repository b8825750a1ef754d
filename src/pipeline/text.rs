//! Text primitives shared by every stage
//!
//! Offsets are byte offsets into the normalized text; windows are measured
//! in characters and always land on char boundaries.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::{Captures, Regex};

/// `d/m/yy` or `d/m/yyyy`.
pub static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b").expect("Invalid date regex pattern")
});

/// `h:mm` or `h:mm:ss`.
pub static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\b").expect("Invalid time regex pattern")
});

// ---------------------------------------------------------------------------
// Dates and times
// ---------------------------------------------------------------------------

/// Build a date from day/month/year strings. Two-digit years are 20xx.
pub fn date_from_parts(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let d: u32 = day.parse().ok()?;
    let m: u32 = month.parse().ok()?;
    let mut y: i32 = year.parse().ok()?;
    match year.len() {
        2 => y += 2000,
        4 => {}
        _ => return None,
    }
    NaiveDate::from_ymd_opt(y, m, d)
}

pub fn time_from_parts(hour: &str, minute: &str, second: Option<&str>) -> Option<NaiveTime> {
    let h: u32 = hour.parse().ok()?;
    let m: u32 = minute.parse().ok()?;
    let s: u32 = match second {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    NaiveTime::from_hms_opt(h, m, s)
}

/// Date from three consecutive capture groups starting at `first`.
pub fn captured_date(caps: &Captures, first: usize) -> Option<NaiveDate> {
    date_from_parts(
        caps.get(first)?.as_str(),
        caps.get(first + 1)?.as_str(),
        caps.get(first + 2)?.as_str(),
    )
}

/// Parse a whole `d/m/y` string.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(s.trim())?;
    captured_date(&caps, 1)
}

pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let caps = TIME_RE.captures(s.trim())?;
    time_from_parts(&caps[1], &caps[2], caps.get(3).map(|m| m.as_str()))
}

/// First valid calendar date in `text`; invalid ones (31/02) are skipped.
pub fn first_date(text: &str) -> Option<NaiveDate> {
    DATE_RE
        .captures_iter(text)
        .find_map(|caps| captured_date(&caps, 1))
}

/// Last valid calendar date in `text`.
pub fn last_date(text: &str) -> Option<NaiveDate> {
    DATE_RE
        .captures_iter(text)
        .filter_map(|caps| captured_date(&caps, 1))
        .last()
}

pub fn first_time(text: &str) -> Option<NaiveTime> {
    TIME_RE
        .captures_iter(text)
        .find_map(|caps| time_from_parts(&caps[1], &caps[2], caps.get(3).map(|m| m.as_str())))
}

// ---------------------------------------------------------------------------
// Date index
// ---------------------------------------------------------------------------

/// Any `d/m/y` spelling: `/`, `-`, `.` or blank separators, two- or
/// four-digit year.
static LOOSE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s*[-./\s]\s*(\d{1,2})\s*[-./\s]\s*(\d{4}|\d{2})\b")
        .expect("Invalid loose date regex pattern")
});

/// `visita` followed by a `d/m/yyyy` date.
static VISIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)visita[\s_]+(\d{1,2})\s*[/\s]\s*(\d{1,2})\s*[/\s]\s*(\d{4})\b")
        .expect("Invalid visit regex pattern")
});

/// One written date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateOccurrence {
    pub start: usize,
    pub end: usize,
    /// Written `d/m/yyyy` with `/` or blank separators.
    pub strict: bool,
}

/// Every date written in a text, grouped by calendar day.
///
/// Built in one pass so per-day lookups never rescan the text. Candidates
/// may overlap ("cama 12 02/03/2024" yields both `12 02/03` and
/// `02/03/2024`); each start position is tried once.
#[derive(Debug, Default)]
pub struct DateIndex {
    dates: BTreeMap<NaiveDate, Vec<DateOccurrence>>,
    visits: BTreeMap<NaiveDate, Vec<(usize, usize)>>,
    visit_starts: Vec<usize>,
}

impl DateIndex {
    pub fn build(text: &str) -> Self {
        let mut index = Self::default();

        let mut at = 0;
        while let Some(caps) = LOOSE_DATE_RE.captures_at(text, at) {
            let (Some(whole), Some(day), Some(month), Some(year)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
            else {
                break;
            };
            if let Some(date) = date_from_parts(day.as_str(), month.as_str(), year.as_str()) {
                let plain = |from: usize, to: usize| {
                    text[from..to].chars().all(|c| c == '/' || c.is_whitespace())
                };
                let strict = year.len() == 4
                    && plain(day.end(), month.start())
                    && plain(month.end(), year.start());
                index.dates.entry(date).or_default().push(DateOccurrence {
                    start: whole.start(),
                    end: whole.end(),
                    strict,
                });
            }
            at = next_boundary(text, whole.start());
        }

        for caps in VISIT_RE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            index.visit_starts.push(whole.start());
            if let Some(date) = captured_date(&caps, 1) {
                index
                    .visits
                    .entry(date)
                    .or_default()
                    .push((whole.start(), whole.end()));
            }
        }

        index
    }

    /// Occurrences of `date` in text order.
    pub fn occurrences(&self, date: NaiveDate) -> &[DateOccurrence] {
        self.dates.get(&date).map(Vec::as_slice).unwrap_or_default()
    }

    /// `visita <date>` anchors for `date`, as `(start, end)` spans.
    pub fn visits(&self, date: NaiveDate) -> &[(usize, usize)] {
        self.visits.get(&date).map(Vec::as_slice).unwrap_or_default()
    }

    /// Start of the first visit anchor, of any date, after `offset`.
    pub fn next_visit_after(&self, offset: usize) -> Option<usize> {
        let i = self.visit_starts.partition_point(|&s| s <= offset);
        self.visit_starts.get(i).copied()
    }
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// Expand `[start, end)` by `before` characters left and `after` characters
/// right, clamped to the text.
pub fn expand(text: &str, start: usize, end: usize, before: usize, after: usize) -> (usize, usize) {
    let start = floor_boundary(text, start);
    let end = floor_boundary(text, end.max(start));
    let from = text[..start]
        .char_indices()
        .rev()
        .take(before)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(after)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    (from, to)
}

/// Slice produced by [`expand`].
pub fn window(text: &str, start: usize, end: usize, before: usize, after: usize) -> &str {
    let (from, to) = expand(text, start, end, before, after);
    &text[from..to]
}

/// Smallest char boundary after `idx`.
fn next_boundary(text: &str, idx: usize) -> usize {
    let mut i = idx + 1;
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Largest char boundary not after `idx`.
pub fn floor_boundary(text: &str, idx: usize) -> usize {
    let mut i = idx.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Truncate to `max` characters, appending an ellipsis when cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &s[..i]),
        None => s.to_string(),
    }
}

/// Lines with the byte offset each one starts at.
pub fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split('\n').scan(0usize, |offset, line| {
        let start = *offset;
        *offset += line.len() + 1;
        Some((start, line))
    })
}

// ---------------------------------------------------------------------------
// Free-text captures
// ---------------------------------------------------------------------------

fn starts_with_ci(s: &str, prefix: &str) -> bool {
    let mut chars = s.chars().flat_map(char::to_lowercase);
    prefix.chars().all(|p| chars.next() == Some(p))
}

/// Cut a greedy capture at the first trailing label word found after
/// `min_chars` characters, then strip separators.
///
/// `labels` must be lower-case.
pub fn trim_trailing_labels(raw: &str, labels: &[&str], min_chars: usize) -> String {
    let mut cut = raw.len();
    let mut prev: Option<char> = None;
    for (n, (i, c)) in raw.char_indices().enumerate() {
        let at_word_start = prev.map_or(true, |p| !p.is_alphanumeric());
        if n > min_chars && at_word_start && labels.iter().any(|l| starts_with_ci(&raw[i..], l)) {
            cut = i;
            break;
        }
        prev = Some(c);
    }
    raw[..cut]
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '-' | ':' | ';' | '('))
        .trim()
        .to_string()
}

/// Collapse internal whitespace.
pub fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
