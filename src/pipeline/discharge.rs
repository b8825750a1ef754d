//! Discharge documentation checks
//!
//! A completed stay must close with a discharge record and an epicrisis,
//! both expected near the end of the document.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ScanWindows;
use crate::models::enums::FindingCategory;
use crate::models::{Finding, StayWindow};

static DISCHARGE_RECORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)alta\s+m[eé]dica|registro\s+de\s+alta|egreso\s+(?:sanatorial|hospitalario)|\begreso\b|\bdischarge\b")
        .expect("Invalid discharge regex pattern")
});

static EPICRISIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)epicrisis").expect("Invalid epicrisis regex pattern"));

/// Last `n` lines of `text`.
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

/// Findings for a missing discharge record or epicrisis. Ongoing stays
/// have neither yet and are skipped.
pub fn check_discharge_documentation(
    text: &str,
    window: &StayWindow,
    windows: &ScanWindows,
) -> Vec<Finding> {
    if window.ongoing {
        return Vec::new();
    }
    let date = window.discharge_date();
    let mut findings = Vec::new();

    if !DISCHARGE_RECORD_RE.is_match(&tail_lines(text, windows.discharge_tail_lines)) {
        findings.push(
            Finding::critical(
                FindingCategory::MissingDischargeRecord,
                "Falta registro de alta médica",
                "Alta",
            )
            .with_date(date),
        );
    }
    if !EPICRISIS_RE.is_match(&tail_lines(text, windows.epicrisis_tail_lines)) {
        findings.push(
            Finding::warning(
                FindingCategory::MissingEpicrisis,
                "Falta epicrisis al alta",
                "Alta",
            )
            .with_date(date),
        );
    }
    findings
}
