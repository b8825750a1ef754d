//! Ambulatory-type practices performed during the stay

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::NaiveDate;

use crate::config::ScanWindows;
use crate::models::enums::FindingCategory;
use crate::models::{AmbulatoryPractice, Finding, StayWindow};
use crate::pipeline::matcher::{rule, scan, Rule};
use crate::pipeline::text::{first_date, first_time, window};

struct AmbulatoryKind {
    name: &'static str,
    requires_authorization: bool,
}

const fn kind(name: &'static str, requires_authorization: bool) -> AmbulatoryKind {
    AmbulatoryKind {
        name,
        requires_authorization,
    }
}

static PRACTICE_RULES: LazyLock<Vec<Rule<AmbulatoryKind>>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)\bcuraci[oó]n\b", kind("Curación", false)),
        rule(r"(?i)\bextracci[oó]n\s+de\s+puntos\b", kind("Extracción de puntos", false)),
        rule(r"(?i)\bretiro\s+de\s+drenaje\b", kind("Retiro de drenaje", false)),
        rule(r"(?i)\bcambio\s+de\s+sonda\b", kind("Cambio de sonda", false)),
        rule(r"(?i)\binfiltraci[oó]n\b", kind("Infiltración", true)),
        rule(r"(?i)\bbloqueo\s+nervioso\b", kind("Bloqueo nervioso", true)),
    ]
});

/// Output of [`detect_ambulatory_practices`].
#[derive(Debug, Clone, Default)]
pub struct AmbulatoryDetection {
    pub practices: Vec<AmbulatoryPractice>,
    pub findings: Vec<Finding>,
}

/// Practices whose nearest date falls inside the stay. Mentions without a
/// date, or dated outside the stay, are dropped.
pub fn detect_ambulatory_practices(
    text: &str,
    stay: &StayWindow,
    today: NaiveDate,
    windows: &ScanWindows,
) -> AmbulatoryDetection {
    let mut seen: BTreeSet<(&'static str, NaiveDate)> = BTreeSet::new();
    let mut detection = AmbulatoryDetection::default();

    for hit in scan(&PRACTICE_RULES, text) {
        let context = window(text, hit.start, hit.end, windows.practice_context, windows.practice_context);
        let Some(date) = first_date(context).filter(|d| stay.contains(*d, today)) else {
            continue;
        };
        if !seen.insert((hit.meta.name, date)) {
            continue;
        }

        if hit.meta.requires_authorization {
            detection.findings.push(
                Finding::warning(
                    FindingCategory::AmbulatoryPractice,
                    format!(
                        "{} durante la internación ({}): requiere autorización",
                        hit.meta.name,
                        date.format("%d/%m/%Y")
                    ),
                    "Foja ambulatoria",
                )
                .with_date(Some(date)),
            );
        }
        detection.practices.push(AmbulatoryPractice {
            kind: hit.meta.name.to_string(),
            date,
            time: first_time(context),
            requires_authorization: hit.meta.requires_authorization,
        });
    }

    tracing::debug!(count = detection.practices.len(), "Ambulatory practices detected");
    detection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stay() -> StayWindow {
        let at = |d| {
            NaiveDate::from_ymd_opt(2024, 3, d)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        };
        StayWindow::completed(at(1), at(10))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    fn detect(text: &str) -> AmbulatoryDetection {
        detect_ambulatory_practices(text, &stay(), today(), &ScanWindows::default())
    }

    #[test]
    fn practice_inside_stay_is_kept() {
        let d = detect("05/03/2024 11:15 infiltración de rodilla derecha");
        assert_eq!(d.practices.len(), 1);
        assert_eq!(d.practices[0].kind, "Infiltración");
        assert_eq!(d.findings.len(), 1);
        assert!(!d.findings[0].is_critical());
    }

    #[test]
    fn practice_outside_stay_is_dropped() {
        assert!(detect("Antecedente: curación de herida el 20/02/2024").practices.is_empty());
        assert!(detect("curación de herida, sin fecha").practices.is_empty());
    }

    #[test]
    fn no_authorization_no_finding() {
        let d = detect("06/03/2024 curación diaria de sitio quirúrgico");
        assert_eq!(d.practices.len(), 1);
        assert!(d.findings.is_empty());
    }

    #[test]
    fn same_kind_same_day_once() {
        let d = detect("07/03/2024 curación. Se repite curación por la tarde.");
        assert_eq!(d.practices.len(), 1);
    }
}
