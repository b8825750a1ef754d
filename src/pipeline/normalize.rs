//! Text normalization
//!
//! Extracted hospitalization records arrive with form feeds, mixed line
//! endings, ragged spacing and repeated print furniture on every page. The
//! normalized text is what every later stage scans.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PAGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^p[aá]gina\s+(\d+)(?:\s+de\s+\d+)?$").expect("Invalid page regex pattern")
});

static PRINT_DATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^fecha\s+(?:de\s+)?impresi[oó]n\s*:").expect("Invalid print-date regex pattern")
});

/// Page footer/header removed during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMarker {
    /// Offset in the normalized text where the page's content begins.
    pub offset: usize,
    pub number: u32,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedText {
    pub text: String,
    pub pages: Vec<PageMarker>,
}

impl NormalizedText {
    /// Page number in effect at `offset`, if the document carried page markers.
    pub fn page_at(&self, offset: usize) -> Option<u32> {
        let idx = self.pages.partition_point(|p| p.offset <= offset);
        idx.checked_sub(1).map(|i| self.pages[i].number)
    }
}

/// Normalize raw extracted text.
///
/// Form feeds become spaces, line endings are unified to `\n`, control
/// characters are dropped, runs of blanks collapse to one space, lines are
/// trimmed, and page furniture lines are removed (page numbers are kept as
/// [`PageMarker`]s).
pub fn normalize(raw: &str) -> NormalizedText {
    let unified = raw.replace('\u{c}', " ").replace("\r\n", "\n").replace('\r', "\n");

    let mut text = String::with_capacity(unified.len());
    let mut pages = Vec::new();
    let mut first = true;

    for line in unified.split('\n') {
        let clean = clean_line(line);

        if let Some(caps) = PAGE_LINE.captures(&clean) {
            if let Ok(number) = caps[1].parse() {
                let offset = if first { 0 } else { text.len() + 1 };
                pages.push(PageMarker { offset, number });
            }
            continue;
        }
        if PRINT_DATE_LINE.is_match(&clean) {
            continue;
        }

        if !first {
            text.push('\n');
        }
        text.push_str(&clean);
        first = false;
    }

    NormalizedText { text, pages }
}

fn clean_line(line: &str) -> String {
    line.split(|c: char| c == ' ' || c == '\t')
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse every whitespace run (newlines included) into one space.
pub fn flatten(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
