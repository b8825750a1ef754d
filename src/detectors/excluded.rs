//! Practices billed outside the per-diem module
//!
//! Every occurrence is surfaced whether or not it needs prior authorization;
//! the table decides the severity.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::config::ScanWindows;
use crate::models::enums::{DocumentLocation, FindingCategory, PracticeCategory};
use crate::models::{ExcludedPractice, Finding};
use crate::pipeline::matcher::{rule, scan, Rule};
use crate::pipeline::text::{first_date, window};

struct PracticeSpec {
    category: PracticeCategory,
    name: &'static str,
    code: Option<&'static str>,
    requires_authorization: bool,
    separate_billing: bool,
}

const fn practice(
    category: PracticeCategory,
    name: &'static str,
    code: Option<&'static str>,
    requires_authorization: bool,
) -> PracticeSpec {
    PracticeSpec {
        category,
        name,
        code,
        requires_authorization,
        separate_billing: true,
    }
}

static PRACTICE_RULES: LazyLock<Vec<Rule<PracticeSpec>>> = LazyLock::new(|| {
    use PracticeCategory::*;
    vec![
        rule(r"(?i)\bpunci[oó]n\s+lumbar\b", practice(Puncture, "Punción lumbar", Some("34.01.01"), true)),
        rule(
            r"(?i)\bpunci[oó]n\s+pleural\b|\btoracocentesis\b",
            practice(Puncture, "Punción pleural / Toracocentesis", Some("34.02.01"), true),
        ),
        rule(
            r"(?i)\bpunci[oó]n\s+asc[ií]tica\b|\bparacentesis\b",
            practice(Puncture, "Punción ascítica / Paracentesis", Some("34.03.01"), true),
        ),
        rule(r"(?i)\bpunci[oó]n\s+articular\b", practice(Puncture, "Punción articular", None, true)),
        rule(
            r"(?i)\bcat[eé]ter\s+venoso\s+central\b|\bCVC\b",
            practice(Catheter, "Catéter venoso central", Some("35.01.01"), false),
        ),
        rule(r"(?i)\bcat[eé]ter\s+arterial\b", practice(Catheter, "Catéter arterial", None, false)),
        rule(
            r"(?i)\bPICC\b|\bcat[eé]ter\s+central\s+de\s+inserci[oó]n\s+perif[eé]rica\b",
            practice(Catheter, "PICC", None, true),
        ),
        rule(r"(?i)\bcat[eé]ter\s+(?:de\s+)?swan[-\s]?ganz\b", practice(Catheter, "Catéter Swan-Ganz", None, true)),
        rule(r"(?i)\bcat[eé]ter\s+epidural\b", practice(Catheter, "Catéter epidural", None, false)),
        rule(
            r"(?i)\bdrenaje\s+tor[aá]cico\b|\btubo\s+de\s+t[oó]rax\b",
            practice(SpecialProcedure, "Drenaje torácico", None, false),
        ),
        rule(r"(?i)\btraqueostom[ií]a\b", practice(SpecialProcedure, "Traqueostomía", None, true)),
        rule(r"(?i)\bgastrostom[ií]a\b", practice(SpecialProcedure, "Gastrostomía", None, true)),
    ]
});

static AMBULATORY_SHEET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:foja|hoja)\s+ambulatoria\b").expect("Invalid ambulatory-sheet regex pattern")
});

static INTERCONSULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\binterconsulta").expect("Invalid interconsult regex pattern"));

/// Output of [`detect_excluded_practices`].
#[derive(Debug, Clone, Default)]
pub struct ExcludedDetection {
    pub practices: Vec<ExcludedPractice>,
    pub findings: Vec<Finding>,
}

/// Every distinct (practice, date, location), in order of first mention.
pub fn detect_excluded_practices(text: &str, windows: &ScanWindows) -> ExcludedDetection {
    let mut practices: Vec<ExcludedPractice> = Vec::new();
    let mut index: BTreeMap<(&'static str, Option<NaiveDate>, DocumentLocation), usize> = BTreeMap::new();

    for hit in scan(&PRACTICE_RULES, text) {
        let context = window(text, hit.start, hit.end, windows.practice_context, windows.practice_context);
        let location = if AMBULATORY_SHEET_RE.is_match(context) {
            DocumentLocation::AmbulatorySheet
        } else if INTERCONSULT_RE.is_match(context) {
            DocumentLocation::Interconsultation
        } else {
            DocumentLocation::EvolutionNote
        };
        let date = first_date(context);
        let spec = hit.meta;

        match index.get(&(spec.name, date, location)) {
            Some(&i) => practices[i].occurrences += 1,
            None => {
                index.insert((spec.name, date, location), practices.len());
                practices.push(ExcludedPractice {
                    category: spec.category,
                    name: spec.name.to_string(),
                    code: spec.code.map(str::to_string),
                    requires_authorization: spec.requires_authorization,
                    separate_billing: spec.separate_billing,
                    location,
                    date,
                    occurrences: 1,
                    matched_text: hit.text.to_string(),
                });
            }
        }
    }

    let findings = practices.iter().map(practice_finding).collect();
    tracing::debug!(count = practices.len(), "Excluded practices detected");
    ExcludedDetection { practices, findings }
}

fn practice_finding(p: &ExcludedPractice) -> Finding {
    let mut message = format!("{} en {}", p.name, p.location.label());
    if let Some(date) = p.date {
        message.push_str(&format!(" ({})", date.format("%d/%m/%Y")));
    }
    match (p.requires_authorization, p.separate_billing) {
        (true, true) => message.push_str(": requiere autorización previa y se factura por separado del módulo"),
        (true, false) => message.push_str(": requiere autorización previa"),
        (false, true) => message.push_str(": se factura por separado del módulo"),
        (false, false) => {}
    }
    if let Some(code) = &p.code {
        message.push_str(&format!(" (Código: {code})"));
    }
    if p.occurrences > 1 {
        message.push_str(&format!(" [{} menciones]", p.occurrences));
    }

    let source = format!("Práctica excluida: {}", p.name);
    let finding = if p.requires_authorization {
        Finding::critical(FindingCategory::ExcludedPractice, message, source)
    } else {
        Finding::warning(FindingCategory::ExcludedPractice, message, source)
    };
    finding.with_date(p.date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> ExcludedDetection {
        detect_excluded_practices(text, &ScanWindows::default())
    }

    #[test]
    fn authorization_required_is_critical() {
        let d = detect("Evolución 05/03/2024: se realiza punción lumbar sin complicaciones");
        assert_eq!(d.practices.len(), 1);
        let p = &d.practices[0];
        assert_eq!(p.code.as_deref(), Some("34.01.01"));
        assert_eq!(p.location, DocumentLocation::EvolutionNote);
        assert!(d.findings[0].is_critical());
        assert!(d.findings[0].message.contains("requiere autorización previa"));
    }

    #[test]
    fn billing_only_is_warning() {
        let d = detect("06/03/2024 se coloca catéter venoso central yugular derecho");
        assert_eq!(d.practices[0].category, PracticeCategory::Catheter);
        assert!(!d.findings[0].is_critical());
    }

    #[test]
    fn location_from_context() {
        let d = detect("Hoja ambulatoria 07/03/2024 paracentesis evacuadora");
        assert_eq!(d.practices[0].location, DocumentLocation::AmbulatorySheet);
        let d = detect("Interconsulta a clínica 07/03/2024: sugiere toracocentesis");
        assert_eq!(d.practices[0].location, DocumentLocation::Interconsultation);
    }

    #[test]
    fn repeated_mentions_are_counted_once() {
        let d = detect("08/03/2024 traqueostomía. Control de traqueostomía sin sangrado.");
        assert_eq!(d.practices.len(), 1);
        assert_eq!(d.practices[0].occurrences, 2);
        assert!(d.findings[0].message.contains("[2 menciones]"));
    }

    #[test]
    fn nothing_found_is_empty() {
        let d = detect("Paciente estable, sin procedimientos.");
        assert!(d.practices.is_empty());
        assert!(d.findings.is_empty());
    }
}
