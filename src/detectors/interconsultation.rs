//! Interconsultations
//!
//! A request line names a specialty; the lines that follow carry the
//! consultant's answer.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ScanWindows;
use crate::models::enums::FindingCategory;
use crate::models::{normalize_person, Finding, Interconsultation};
use crate::pipeline::clinicians::CREDENTIAL_RE;
use crate::pipeline::matcher::{rule, Rule};
use crate::pipeline::text::{first_date, first_time, squash, trim_trailing_labels};

/// Request phrasings; group 1 is the raw specialty text.
static REQUEST_RULES: LazyLock<Vec<Rule<()>>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)\binterconsulta\s+(?:a|con)\s+([\p{L} ]+)", ()),
        rule(r"(?i)\bconsulta\s+(?:a|con)\s+([\p{L} ]+)", ()),
        rule(r"(?i)\bevaluaci[oó]n\s+por\s+([\p{L} ]+)", ()),
        rule(r"(?i)\bvaloraci[oó]n\s+por\s+([\p{L} ]+)", ()),
    ]
});

/// Canonical specialty names first, abbreviations after.
static SPECIALTY_RULES: LazyLock<Vec<Rule<&'static str>>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)\bneurocirug[ií]a\b", "Neurocirugía"),
        rule(r"(?i)\bcirug[ií]a\s+general\b", "Cirugía General"),
        rule(r"(?i)\bcirug[ií]a\s+cardiovascular\b", "Cirugía Cardiovascular"),
        rule(r"(?i)\bcirug[ií]a\s+tor[aá]cica\b", "Cirugía Torácica"),
        rule(r"(?i)\bcardiolog[ií]a\b", "Cardiología"),
        rule(r"(?i)\bneurolog[ií]a\b", "Neurología"),
        rule(r"(?i)\btraumatolog[ií]a\b", "Traumatología"),
        rule(r"(?i)\binfectolog[ií]a\b", "Infectología"),
        rule(r"(?i)\bnefrolog[ií]a\b", "Nefrología"),
        rule(r"(?i)\bgastroenterolog[ií]a\b", "Gastroenterología"),
        rule(r"(?i)\bhematolog[ií]a\b", "Hematología"),
        rule(r"(?i)\boncolog[ií]a\b", "Oncología"),
        rule(r"(?i)\bneumo(?:no)?log[ií]a\b", "Neumonología"),
        rule(r"(?i)\bendocrinolog[ií]a\b", "Endocrinología"),
        rule(r"(?i)\breumatolog[ií]a\b", "Reumatología"),
        rule(r"(?i)\bdermatolog[ií]a\b", "Dermatología"),
        rule(r"(?i)\boftalmolog[ií]a\b", "Oftalmología"),
        rule(r"(?i)\botorrinolaringolog[ií]a\b", "Otorrinolaringología"),
        rule(r"(?i)\burolog[ií]a\b", "Urología"),
        rule(r"(?i)\bginecolog[ií]a\b", "Ginecología"),
        rule(r"(?i)\bpediatr[ií]a\b", "Pediatría"),
        rule(r"(?i)\bpsiquiatr[ií]a\b", "Psiquiatría"),
        rule(r"(?i)\banestesiolog[ií]a\b", "Anestesiología"),
        rule(r"(?i)\bradiolog[ií]a\b", "Radiología"),
        rule(r"(?i)\bcl[ií]nica\s+m[eé]dica\b", "Clínica Médica"),
        rule(r"(?i)\bmedicina\s+interna\b", "Medicina Interna"),
        rule(r"(?i)\bterapia\s+intensiva\b", "Terapia Intensiva"),
        rule(r"(?i)\bcuidados\s+paliativos\b", "Cuidados Paliativos"),
        rule(r"(?i)\bnutrici[oó]n\b", "Nutrición"),
        rule(r"(?i)\bhemato\b", "Hematología"),
        rule(r"(?i)\bgastro\b", "Gastroenterología"),
        rule(r"(?i)\bcardio\b", "Cardiología"),
        rule(r"(?i)\bneuro\b", "Neurología"),
        rule(r"(?i)\btraumato\b", "Traumatología"),
        rule(r"(?i)\binfecto\b", "Infectología"),
        rule(r"(?i)\bnefro\b", "Nefrología"),
        rule(r"(?i)\bonco\b", "Oncología"),
        rule(r"(?i)\bneumo\b", "Neumonología"),
        rule(r"(?i)\bendocrino\b", "Endocrinología"),
        rule(r"(?i)\bcir\s*gen\b", "Cirugía General"),
        rule(r"(?i)\b(?:uti|uci)\b", "Terapia Intensiva"),
        rule(r"(?i)\borl\b", "Otorrinolaringología"),
    ]
});

static CONSULTANT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:consultor|m[eé]dico)\s*:?\s*(?:dra?\.?\s+)?((?-i:[A-ZÁÉÍÓÚÑ][A-ZÁÉÍÓÚÑ ,]{4,40}))")
        .expect("Invalid consultant regex pattern")
});

static REASON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmotivo(?:\s+de\s+(?:la\s+)?(?:inter)?consulta)?\s*[:\-]?\s*([^\n]{10,200})")
        .expect("Invalid reason regex pattern")
});

static DIAGNOSIS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bdiagn[oó]stico\s*[:\-]?\s*([^\n]{10,200})").expect("Invalid diagnosis regex pattern")
});

const CONSULTANT_LABELS: &[&str] = &["mp ", "mp:", "mn ", "mn:", "matr", "fecha", "hora ", "hora:", "motivo", "diagn"];

/// Resolve free text to a canonical specialty.
pub fn resolve_specialty(raw: &str) -> Option<&'static str> {
    SPECIALTY_RULES
        .iter()
        .find(|r| r.regex.is_match(raw))
        .map(|r| r.meta)
}

/// Every interconsultation request with a recognizable specialty.
pub fn detect_interconsultations(text: &str, windows: &ScanWindows) -> Vec<Interconsultation> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut found = Vec::new();
    let mut seen = BTreeSet::new();

    for (i, line) in lines.iter().enumerate() {
        let specialty = REQUEST_RULES.iter().find_map(|r| {
            r.regex
                .captures(line)
                .and_then(|caps| resolve_specialty(&caps[1]))
        });
        let Some(specialty) = specialty else {
            continue;
        };

        let end = (i + windows.interconsult_block_lines).min(lines.len());
        let block = lines[i..end].join("\n");
        let consult = read_consultation(specialty, &block, i + 1);

        let key = (
            consult.specialty.clone(),
            consult.date,
            consult.consultant.as_deref().map(normalize_person),
        );
        if seen.insert(key) {
            found.push(consult);
        }
    }

    tracing::debug!(count = found.len(), "Interconsultations detected");
    found
}

fn read_consultation(specialty: &str, block: &str, line: usize) -> Interconsultation {
    let date = first_date(block);
    let consultant = CONSULTANT_RE
        .captures(block)
        .map(|c| trim_trailing_labels(&c[1], CONSULTANT_LABELS, 3))
        .filter(|name| !name.is_empty());
    let credential = CREDENTIAL_RE.captures(block).map(|c| c[1].to_string());
    let reason = REASON_RE.captures(block).map(|c| squash(&c[1]));
    let diagnosis = DIAGNOSIS_RE.captures(block).map(|c| squash(&c[1]));

    let source = format!("Interconsulta {specialty}");
    let mut findings = Vec::new();
    if consultant.is_none() {
        findings.push(Finding::critical(
            FindingCategory::Interconsultation,
            format!("Interconsulta a {specialty}: falta nombre del médico consultor"),
            source.clone(),
        ));
    }
    if credential.is_none() {
        findings.push(Finding::critical(
            FindingCategory::Interconsultation,
            format!("Interconsulta a {specialty}: falta matrícula del médico consultor"),
            source.clone(),
        ));
    }
    if reason.is_none() {
        findings.push(Finding::warning(
            FindingCategory::Interconsultation,
            format!("Interconsulta a {specialty}: falta motivo de interconsulta"),
            source,
        ));
    }
    let findings = findings.into_iter().map(|f| f.with_date(date)).collect();

    Interconsultation {
        specialty: specialty.to_string(),
        date,
        time: first_time(block),
        consultant,
        credential,
        reason,
        diagnosis,
        line,
        findings,
    }
}
