use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::StudyCategory;

// ---------------------------------------------------------------------------
// StayWindow
// ---------------------------------------------------------------------------

/// Admission/discharge bounds of one hospitalization.
///
/// A window without discharge is an ongoing stay; its end is the `today`
/// handed to whichever method needs it, never the wall clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayWindow {
    pub admission: NaiveDateTime,
    pub discharge: Option<NaiveDateTime>,
    pub ongoing: bool,
}

impl StayWindow {
    pub fn completed(admission: NaiveDateTime, discharge: NaiveDateTime) -> Self {
        Self {
            admission,
            discharge: Some(discharge),
            ongoing: false,
        }
    }

    pub fn ongoing(admission: NaiveDateTime) -> Self {
        Self {
            admission,
            discharge: None,
            ongoing: true,
        }
    }

    pub fn admission_date(&self) -> NaiveDate {
        self.admission.date()
    }

    pub fn discharge_date(&self) -> Option<NaiveDate> {
        self.discharge.map(|d| d.date())
    }

    /// Last calendar day of the stay. Ongoing stays never end before admission.
    pub fn effective_end(&self, today: NaiveDate) -> NaiveDate {
        match self.discharge_date() {
            Some(d) => d,
            None => today.max(self.admission_date()),
        }
    }

    /// Billable hospitalization days.
    ///
    /// Completed stays count admission through the day before discharge
    /// (same-day stays are 0). Ongoing stays count through today, minimum 1.
    pub fn hospitalization_days(&self, today: NaiveDate) -> i64 {
        match self.discharge_date() {
            Some(d) => (d - self.admission_date()).num_days().max(0),
            None => ((today - self.admission_date()).num_days() + 1).max(1),
        }
    }

    /// Whether `date` falls inside `[admission_date, effective_end]`.
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        date >= self.admission_date() && date <= self.effective_end(today)
    }
}

/// Inclusive calendar-day range.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        days.push(day);
        day += Duration::days(1);
    }
    days
}

// ---------------------------------------------------------------------------
// DayRecord
// ---------------------------------------------------------------------------

/// Study attached to a day of the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyRef {
    pub category: StudyCategory,
    pub kind: String,
}

/// One calendar day of the stay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub has_evolution_note: bool,
    pub has_surgical_episode: bool,
    pub studies: Vec<StudyRef>,
}
