//! Stay window resolution
//!
//! Admission and discharge are found through label-anchored patterns over a
//! whitespace-flattened copy of the text, so labels split across lines by
//! the extractor still match.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::AuditError;
use crate::models::enums::FindingCategory;
use crate::models::{days_between, Finding, StayWindow};

use super::matcher::{rule, Rule};
use super::normalize::flatten;
use super::text::{captured_date, time_from_parts};

const DATE: &str = r"(\d{1,2})/(\d{1,2})/(\d{2,4})\b";
const TIME: &str = r"(\d{1,2}):(\d{2})(?::(\d{2}))?\b";

fn label_rules(labelled: &str, bare: &str) -> Vec<Rule<bool>> {
    // meta: whether the pattern captures a time
    vec![
        rule(&format!(r"(?i)(?:{labelled})\s*[:\-]?\s*{DATE}\s+(?:a\s+las\s+)?{TIME}"), true),
        rule(&format!(r"(?i)(?:{labelled})\s*[:\-]?\s*{DATE}"), false),
        rule(&format!(r"(?i)\b(?:{bare})\s*:\s*{DATE}\s+(?:a\s+las\s+)?{TIME}"), true),
        rule(&format!(r"(?i)\b(?:{bare})\s*:\s*{DATE}"), false),
    ]
}

static ADMISSION_RULES: LazyLock<Vec<Rule<bool>>> = LazyLock::new(|| {
    label_rules(
        r"fecha\s+(?:de\s+)?ingreso|admission\s+date|date\s+of\s+admission",
        "ingreso",
    )
});

static DISCHARGE_RULES: LazyLock<Vec<Rule<bool>>> = LazyLock::new(|| {
    label_rules(
        r"fecha\s+(?:de\s+)?(?:alta|egreso)|discharge\s+date|date\s+of\s+discharge",
        "alta|egreso",
    )
});

/// First valid timestamp found by the ordered rules.
fn find_timestamp(rules: &[Rule<bool>], flat: &str) -> Option<NaiveDateTime> {
    rules.iter().find_map(|r| {
        r.regex.captures_iter(flat).find_map(|caps| {
            let date = captured_date(&caps, 1)?;
            let time = if r.meta {
                time_from_parts(&caps[4], &caps[5], caps.get(6).map(|m| m.as_str()))?
            } else {
                NaiveTime::MIN
            };
            Some(date.and_time(time))
        })
    })
}

pub fn find_admission(text: &str) -> Option<NaiveDateTime> {
    find_timestamp(&ADMISSION_RULES, &flatten(text))
}

pub fn find_discharge(text: &str) -> Option<NaiveDateTime> {
    find_timestamp(&DISCHARGE_RULES, &flatten(text))
}

/// Window plus any inconsistency noticed while resolving it.
#[derive(Debug, Clone)]
pub struct TemporalResolution {
    pub window: StayWindow,
    pub findings: Vec<Finding>,
}

/// Resolve the stay window from the normalized text.
///
/// A missing admission date is fatal. A missing discharge makes the stay
/// ongoing. The result goes through [`reconcile_window`].
pub fn resolve_stay_window(text: &str) -> Result<TemporalResolution, AuditError> {
    let flat = flatten(text);
    let admission = find_timestamp(&ADMISSION_RULES, &flat).ok_or_else(|| {
        tracing::warn!("No admission date label found");
        AuditError::MissingAdmissionDate
    })?;

    let window = match find_timestamp(&DISCHARGE_RULES, &flat) {
        None => StayWindow::ongoing(admission),
        Some(discharge) => StayWindow::completed(admission, discharge),
    };
    let resolution = reconcile_window(window);

    tracing::debug!(
        admission = %resolution.window.admission,
        ongoing = resolution.window.ongoing,
        "Resolved stay window"
    );

    Ok(resolution)
}

fn window_warning(message: String) -> Finding {
    Finding::warning(FindingCategory::StayWindow, message, "Internación")
}

/// Make a window internally consistent, reporting every correction.
///
/// A window with a discharge is completed and one without is ongoing,
/// whatever its flag says. A discharge earlier than admission is clamped to
/// admission.
pub fn reconcile_window(window: StayWindow) -> TemporalResolution {
    let admission = window.admission;
    let mut findings = Vec::new();

    let window = match window.discharge {
        None => {
            if !window.ongoing {
                findings.push(window_warning(
                    "Internación marcada como finalizada sin fecha de alta; se audita como en curso"
                        .to_string(),
                ));
            }
            StayWindow::ongoing(admission)
        }
        Some(discharge) if discharge < admission => {
            findings.push(
                window_warning(format!(
                    "Fecha de alta ({}) anterior a la fecha de ingreso ({}); se toma el alta el mismo día del ingreso",
                    discharge.format("%d/%m/%Y %H:%M"),
                    admission.format("%d/%m/%Y %H:%M"),
                ))
                .with_date(Some(discharge.date())),
            );
            StayWindow::completed(admission, admission)
        }
        Some(discharge) => {
            if window.ongoing {
                findings.push(
                    window_warning(format!(
                        "Internación marcada en curso con fecha de alta ({}); se audita como finalizada",
                        discharge.format("%d/%m/%Y %H:%M"),
                    ))
                    .with_date(Some(discharge.date())),
                );
            }
            StayWindow::completed(admission, discharge)
        }
    };

    if !findings.is_empty() {
        tracing::warn!(corrections = findings.len(), "Stay window reconciled");
    }
    TemporalResolution { window, findings }
}

/// Calendar days of the stay.
#[derive(Debug, Clone)]
pub struct DayRange {
    pub days: Vec<NaiveDate>,
    pub end: NaiveDate,
    /// Set when the stay is longer than is plausible.
    pub span_warning: Option<Finding>,
}

pub fn day_range(window: &StayWindow, today: NaiveDate, max_stay_days: u32) -> DayRange {
    let start = window.admission_date();
    let end = window.effective_end(today);

    let span = (end - start).num_days() + 1;
    let span_warning = (span > i64::from(max_stay_days)).then(|| {
        tracing::warn!(span, max_stay_days, "Implausibly long stay");
        window_warning(format!(
            "Internación de {} días (más de {}); verificar las fechas de ingreso y egreso",
            span, max_stay_days
        ))
        .with_date(Some(end))
    });

    DayRange {
        days: days_between(start, end),
        end,
        span_warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(d: u32, m: u32, y: i32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn day(d: u32, m: u32, y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn admission_with_time() {
        let r = resolve_stay_window("Fecha Ingreso: 01/03/2024 08:00\nPaciente: PEREZ").unwrap();
        assert_eq!(r.window.admission, dt(1, 3, 2024, 8, 0));
        assert!(r.window.ongoing);
        assert!(r.window.discharge.is_none());
        assert!(r.findings.is_empty());
    }

    #[test]
    fn label_split_across_lines() {
        let admission = find_admission("Fecha de\ningreso:\n05/03/24\n14:30");
        assert_eq!(admission, Some(dt(5, 3, 2024, 14, 30)));
    }

    #[test]
    fn admission_date_only_defaults_to_midnight() {
        assert_eq!(find_admission("FECHA DE INGRESO 07/04/2024"), Some(dt(7, 4, 2024, 0, 0)));
    }

    #[test]
    fn english_labels_accepted() {
        let text = "Admission date: 01/03/2024 10:15\nDischarge date: 04/03/2024 12:00";
        let r = resolve_stay_window(text).unwrap();
        assert_eq!(r.window.discharge, Some(dt(4, 3, 2024, 12, 0)));
        assert!(!r.window.ongoing);
    }

    #[test]
    fn bare_label_requires_colon() {
        // "alta" inside a procedure name must not be read as the discharge label
        let text = "Fecha Ingreso: 01/03/2024 08:00\nendoscopía digestiva alta 03/03/2024";
        assert_eq!(find_discharge(text), None);
        let text = "Ingreso: 01/03/2024 08:00\nAlta: 06/03/2024 11:00";
        assert_eq!(find_admission(text), Some(dt(1, 3, 2024, 8, 0)));
        assert_eq!(find_discharge(text), Some(dt(6, 3, 2024, 11, 0)));
    }

    #[test]
    fn invalid_date_falls_through_to_next_match() {
        let text = "Fecha de ingreso: 31/02/2024 08:00 ... Fecha de ingreso: 01/03/2024 09:00";
        assert_eq!(find_admission(text), Some(dt(1, 3, 2024, 9, 0)));
    }

    #[test]
    fn missing_admission_is_fatal() {
        let err = resolve_stay_window("Evolución médica diaria sin encabezado").unwrap_err();
        assert!(matches!(err, AuditError::MissingAdmissionDate));
    }

    #[test]
    fn reversed_dates_clamped_with_warning() {
        let text = "Fecha Ingreso: 05/03/2024 08:00\nFecha de Alta: 01/03/2024 10:00";
        let r = resolve_stay_window(text).unwrap();
        assert_eq!(r.window.discharge, Some(r.window.admission));
        assert_eq!(r.findings.len(), 1);
        assert_eq!(r.findings[0].category, FindingCategory::StayWindow);
        assert_eq!(r.window.hospitalization_days(day(30, 3, 2024)), 0);
    }

    #[test]
    fn completed_range_includes_discharge_day() {
        let w = StayWindow::completed(dt(1, 3, 2024, 8, 0), dt(4, 3, 2024, 9, 0));
        let r = day_range(&w, day(20, 3, 2024), 366);
        assert_eq!(r.days.len(), 4);
        assert_eq!(r.end, day(4, 3, 2024));
        assert!(r.span_warning.is_none());
    }

    #[test]
    fn long_ongoing_range_reaches_today_with_warning() {
        let w = StayWindow::ongoing(dt(1, 1, 2024, 8, 0));
        let r = day_range(&w, day(31, 12, 2024), 30);
        assert_eq!(r.days.len() as i64, w.hospitalization_days(day(31, 12, 2024)));
        assert_eq!(r.end, day(31, 12, 2024));
        assert_eq!(r.days.last(), Some(&day(31, 12, 2024)));
        let f = r.span_warning.unwrap();
        assert_eq!(f.category, FindingCategory::StayWindow);
        assert!(f.message.contains("366 días"), "{}", f.message);
    }

    #[test]
    fn mistyped_discharge_year_is_flagged() {
        let w = StayWindow::completed(dt(1, 3, 2024, 8, 0), dt(1, 3, 2054, 10, 0));
        let r = day_range(&w, day(1, 4, 2024), 366);
        assert_eq!(r.end, day(1, 3, 2054));
        assert!(r.span_warning.is_some());
    }

    #[test]
    fn reversed_caller_window_is_clamped() {
        let r = reconcile_window(StayWindow::completed(dt(5, 3, 2024, 8, 0), dt(1, 3, 2024, 10, 0)));
        assert_eq!(r.window.discharge, Some(dt(5, 3, 2024, 8, 0)));
        assert!(!r.window.ongoing);
        assert_eq!(r.findings.len(), 1);
    }

    #[test]
    fn discharge_wins_over_ongoing_flag() {
        let r = reconcile_window(StayWindow {
            admission: dt(1, 3, 2024, 8, 0),
            discharge: Some(dt(4, 3, 2024, 10, 0)),
            ongoing: true,
        });
        assert!(!r.window.ongoing);
        assert_eq!(r.window.discharge, Some(dt(4, 3, 2024, 10, 0)));
        assert_eq!(r.findings.len(), 1);
        assert_eq!(r.findings[0].category, FindingCategory::StayWindow);

        let r = reconcile_window(StayWindow {
            admission: dt(1, 3, 2024, 8, 0),
            discharge: None,
            ongoing: false,
        });
        assert!(r.window.ongoing);
        assert_eq!(r.findings.len(), 1);
    }

    #[test]
    fn consistent_window_passes_unchanged() {
        let w = StayWindow::completed(dt(1, 3, 2024, 8, 0), dt(4, 3, 2024, 10, 0));
        let r = reconcile_window(w.clone());
        assert_eq!(r.window, w);
        assert!(r.findings.is_empty());
    }
}
