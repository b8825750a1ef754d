//! Credentialed clinicians named in the record
//!
//! A professional registration number (MP/MN/matrícula) is paired with the
//! closest upper-case name on nearby lines. Surrounding lines hint at
//! whether the clinician belongs to the surgical team or the residents.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::enums::ClinicianRole;
use crate::models::{normalize_person, Clinician};

/// Professional registration number; group 1 is the number.
pub static CREDENTIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:m\.?p\.?|m\.?n\.?|matr[ií]cula)\s*(?:n[°º]|nro\.?)?\s*[:\-]?\s*(\d{3,6})\b")
        .expect("Invalid credential regex pattern")
});

static UPPER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-ZÁÉÍÓÚÑ]{2,}(?:,?\s+[A-ZÁÉÍÓÚÑ]{2,}){1,3})\b")
        .expect("Invalid name regex pattern")
});

static SURGEON_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cirujan|cirug[ií]a|quir[uú]rg|operaci[oó]n").expect("Invalid surgeon regex pattern")
});

static RESIDENT_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)residente|evoluci[oó]n").expect("Invalid resident regex pattern")
});

/// Upper-case runs that are headings, not people.
const NOT_A_NAME: &[&str] = &[
    "EVOLUCI", "HISTORIA", "FOJA", "HOJA", "PROTOCOLO", "MATR", "FECHA", "HORA", "DIAGN", "UCI",
    "UTI", "MEDICO", "MÉDICO", "SERVICIO", "FIRMA", "SELLO", "INTERCONSULTA", "ALTA", "CLINICA",
    "CLÍNICA", "QUIR", "EPICRISIS", "INGRESO", "PACIENTE",
];

const NAME_RADIUS: usize = 3;
const CONTEXT_RADIUS: usize = 5;

/// Every distinct (name, credential) pair found in the text.
pub fn extract_clinicians(text: &str) -> Vec<Clinician> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut clinicians = Vec::new();
    let mut seen = BTreeSet::new();

    for (i, line) in lines.iter().enumerate() {
        for caps in CREDENTIAL_RE.captures_iter(line) {
            let credential = caps[1].to_string();
            let before = caps.get(0).map_or(0, |m| m.start());
            let Some(name) = nearest_name(&lines, i, &line[..before]) else {
                continue;
            };
            if !seen.insert((normalize_person(&name), credential.clone())) {
                continue;
            }
            let from = i.saturating_sub(CONTEXT_RADIUS);
            let to = (i + CONTEXT_RADIUS + 1).min(lines.len());
            let context = lines[from..to].join("\n");
            let role = if SURGEON_CONTEXT_RE.is_match(&context) {
                ClinicianRole::Surgeon
            } else if RESIDENT_CONTEXT_RE.is_match(&context) {
                ClinicianRole::Resident
            } else {
                ClinicianRole::Other
            };
            clinicians.push(Clinician {
                name,
                credential,
                role,
            });
        }
    }

    tracing::debug!(count = clinicians.len(), "Clinicians extracted");
    clinicians
}

/// Name before the credential on its own line, else on the closest line
/// within the radius, preferring lines above.
fn nearest_name(lines: &[&str], at: usize, same_line: &str) -> Option<String> {
    if let Some(name) = name_in(same_line) {
        return Some(name);
    }
    let mut order = Vec::new();
    for d in 1..=NAME_RADIUS {
        if let Some(up) = at.checked_sub(d) {
            order.push(up);
        }
        if at + d < lines.len() {
            order.push(at + d);
        }
    }
    order.into_iter().find_map(|i| name_in(lines[i]))
}

fn name_in(line: &str) -> Option<String> {
    UPPER_NAME_RE
        .find_iter(line)
        .map(|m| m.as_str())
        .find(|candidate| !NOT_A_NAME.iter().any(|w| candidate.contains(w)))
        .map(|s| s.to_string())
}
