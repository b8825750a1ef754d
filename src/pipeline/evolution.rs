//! Daily evolution-note coverage
//!
//! Every day of the stay after admission needs a daily medical note. Notes
//! are located by independent strategies tried in order; the first that
//! finds evidence for a day wins.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::NaiveDate;

use crate::config::ScanWindows;
use crate::models::enums::FindingCategory;
use crate::models::Finding;

use super::matcher::{rule, Rule};
use super::text::{expand, DateIndex};

static NOTE_LABELS: LazyLock<Vec<Rule<()>>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)evoluci[oó]n[\s_]+m[eé]dica[\s_]+diaria", ()),
        rule(r"(?i)\bevol\.?[\s_]+m[eé]dica[\s_]+diaria", ()),
        rule(r"(?i)evoluci[oó]n[\s_]+diaria", ()),
        rule(r"(?i)daily\s+progress\s+note", ()),
    ]
});

static UNIT_NOTE_LABELS: LazyLock<Vec<Rule<()>>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)\b(?:UCI|UTI)\s*-?\s*hoja\s+(?:de\s+)?evoluci[oó]n", ()),
        rule(r"(?i)hoja\s+(?:de\s+)?evoluci[oó]n\s*-?\s*(?:UCI|UTI)\b", ()),
        rule(r"(?i)evoluci[oó]n\s+(?:de\s+)?(?:UCI|UTI|terapia\s+intensiva)", ()),
    ]
});

const NOTE_NAME: &str = "Evolución médica diaria";
const UNIT_NOTE_NAME: &str = "Hoja de evolución UCI / Evolución médica diaria";

/// Coverage verdict for one day.
#[derive(Debug, Clone)]
pub struct DayCoverage {
    pub date: NaiveDate,
    pub covered: bool,
    /// Name of the strategy that found the note.
    pub strategy: Option<&'static str>,
    /// Where the evidence for the note starts.
    pub evidence_offset: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct EvolutionCoverage {
    pub days: Vec<DayCoverage>,
    pub covered: BTreeSet<NaiveDate>,
    pub findings: Vec<Finding>,
}

/// Label and date occurrences of the whole document, computed once.
struct NoteIndex<'a> {
    text: &'a str,
    labels: Vec<(usize, usize)>,
    dates: &'a DateIndex,
    windows: &'a ScanWindows,
}

impl NoteIndex<'_> {
    /// First label lying entirely inside `[from, to)`.
    fn label_within(&self, from: usize, to: usize) -> Option<usize> {
        let first = self.labels.partition_point(|(s, _)| *s < from);
        self.labels[first..]
            .iter()
            .take_while(|(s, _)| *s < to)
            .find(|(_, e)| *e <= to)
            .map(|(s, _)| *s)
    }
}

type Strategy = fn(&NoteIndex, NaiveDate) -> Option<usize>;

/// Tried in order, first hit wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("visit_anchor", visit_anchor),
    ("date_near_label", date_near_label),
    ("label_near_date", label_near_date),
];

/// `visita <date>` followed by a note label.
fn visit_anchor(idx: &NoteIndex, day: NaiveDate) -> Option<usize> {
    idx.dates.visits(day).iter().find_map(|&(start, end)| {
        let (_, to) = expand(idx.text, start, end, 0, idx.windows.visit_note_after);
        idx.label_within(start, to).map(|_| start)
    })
}

/// The date, written d/m/yyyy, with a note label around it.
fn date_near_label(idx: &NoteIndex, day: NaiveDate) -> Option<usize> {
    idx.dates
        .occurrences(day)
        .iter()
        .filter(|o| o.strict)
        .find_map(|o| {
            let (from, to) = expand(
                idx.text,
                o.start,
                o.end,
                idx.windows.date_note_before,
                idx.windows.date_note_after,
            );
            idx.label_within(from, to).map(|label| label.min(o.start))
        })
}

/// A note label with the date around it, in any common spelling.
fn label_near_date(idx: &NoteIndex, day: NaiveDate) -> Option<usize> {
    let occurrences = idx.dates.occurrences(day);
    if occurrences.is_empty() {
        return None;
    }
    idx.labels.iter().find_map(|&(start, end)| {
        let (from, to) = expand(
            idx.text,
            start,
            end,
            idx.windows.label_date_before,
            idx.windows.label_date_after,
        );
        occurrences
            .iter()
            .find(|o| o.start >= from && o.end <= to)
            .map(|o| o.start.min(start))
    })
}

/// Check note coverage for every day in `days`.
///
/// `days` must be the ordered stay range; its first element is the admission
/// day (exempt) and its last is the discharge day, or today for ongoing
/// stays (a gap there is only a warning).
pub fn analyze_coverage(
    text: &str,
    dates: &DateIndex,
    days: &[NaiveDate],
    in_critical_care_unit: bool,
    windows: &ScanWindows,
) -> EvolutionCoverage {
    let mut labels: Vec<(usize, usize)> = NOTE_LABELS
        .iter()
        .chain(if in_critical_care_unit { UNIT_NOTE_LABELS.iter() } else { [].iter() })
        .flat_map(|r| r.regex.find_iter(text).map(|m| (m.start(), m.end())))
        .collect();
    labels.sort_unstable();
    labels.dedup();

    let idx = NoteIndex {
        text,
        labels,
        dates,
        windows,
    };
    let note_name = if in_critical_care_unit { UNIT_NOTE_NAME } else { NOTE_NAME };

    let mut coverage = EvolutionCoverage::default();
    let (first, last) = match (days.first(), days.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return coverage,
    };

    for &day in days {
        let hit = STRATEGIES
            .iter()
            .find_map(|(name, strategy)| strategy(&idx, day).map(|at| (*name, at)));

        match hit {
            Some((name, at)) => {
                coverage.covered.insert(day);
                coverage.days.push(DayCoverage {
                    date: day,
                    covered: true,
                    strategy: Some(name),
                    evidence_offset: Some(at),
                });
            }
            None => {
                coverage.days.push(DayCoverage {
                    date: day,
                    covered: false,
                    strategy: None,
                    evidence_offset: None,
                });
                if let Some(f) = gap_finding(day, first, last, note_name) {
                    coverage.findings.push(f);
                }
            }
        }
    }

    tracing::debug!(
        days = days.len(),
        covered = coverage.covered.len(),
        gaps = coverage.findings.len(),
        "Evolution coverage analyzed"
    );

    coverage
}

fn gap_finding(day: NaiveDate, first: NaiveDate, last: NaiveDate, note_name: &str) -> Option<Finding> {
    let shown = day.format("%d/%m/%Y");
    let source = format!("Evolución {}", shown);
    if day == first {
        None
    } else if day == last {
        Some(
            Finding::warning(
                FindingCategory::DischargeDayNote,
                format!("Día de alta sin evolución ({})", shown),
                source,
            )
            .with_date(Some(day)),
        )
    } else {
        Some(
            Finding::critical(
                FindingCategory::MissingDailyNote,
                format!("Falta '{}' del día {}", note_name, shown),
                source,
            )
            .with_date(Some(day)),
        )
    }
}
