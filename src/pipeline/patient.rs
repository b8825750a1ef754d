//! Patient identity and placement
//!
//! Demographics come from the admission header, so only the leading lines
//! are scanned for them. The ward is also looked up in the full text since
//! bed moves are often recorded later.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ScanWindows;
use crate::models::enums::{FindingCategory, Sex};
use crate::models::{Finding, PatientContext};

use super::matcher::{rule, Rule};
use super::text::{parse_date, squash, trim_trailing_labels, window};

const SOURCE: &str = "Admisión";

/// Words that end a greedy name capture.
const NAME_STOP_WORDS: &[&str] = &[
    "dni", "d.n.i", "documento", "doc.", "sexo", "edad", "fecha", "f. nac", "hc", "h.c",
    "historia", "obra social", "habitaci", "hab ", "hab.", "cama", "box", "sala", "n°", "nro",
    "afiliado", "tel", "domicilio", "ingreso",
];

const PAYER_STOP_WORDS: &[&str] = &[
    "afiliado", "plan", "n°", "nro", "dni", "documento", "sexo", "edad", "habitaci", "cama",
    "fecha", "credencial",
];

const WARD_STOP_WORDS: &[&str] = &["cama", "fecha", "ingreso", "médico", "medico", "obra", "dni"];

static NAME_RULES: LazyLock<Vec<Rule<()>>> = LazyLock::new(|| {
    let name = r"(\p{L}[\p{L} ,.'\-]{2,80})";
    vec![
        rule(&format!(r"(?im)\bapellidos?\s+y\s+nombres?\s*[:\-]?\s*{name}"), ()),
        rule(&format!(r"(?im)\bnombres?(?:\s+y\s+apellidos?)?\s*[:\-]\s*{name}"), ()),
        rule(&format!(r"(?im)\bpaciente\s*[:\-]\s*{name}"), ()),
    ]
});

static DOCUMENT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:dni|d\.n\.i\.?|documento|doc\.)\s*(?:n[°º]|nro\.?)?\s*[:\-]?\s*(\d{1,2}\.?\d{3}\.?\d{3})\b",
    )
    .expect("Invalid document id regex pattern")
});

static BIRTH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:fecha\s+(?:de\s+)?nac(?:imiento|\.)?|f\.\s*nac\.?)\s*[:\-]?\s*(\d{1,2}/\d{1,2}/\d{2,4})",
    )
    .expect("Invalid birth date regex pattern")
});

static SEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bsexo\s*[:\-]?\s*(femenino|masculino|mujer|hombre|f|m)\b")
        .expect("Invalid sex regex pattern")
});

static PAYER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)\b(?:obra\s+social|prepaga|cobertura|financiador)\s*[:\-]\s*([^\n]{2,60})")
        .expect("Invalid payer regex pattern")
});

static BOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bbox\s*[:\-]?\s*([\p{L}\p{N}]{1,6})\b").expect("Invalid box regex pattern")
});

static WARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)\b(?:habitaci[oó]n|hab\.|hab\b|sala|unidad)\s*[:\-]?\s*([\p{L}\p{N}][\p{L}\p{N} \-]{0,30})",
    )
    .expect("Invalid ward regex pattern")
});

/// Critical-care unit vocabulary.
pub static CRITICAL_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bUCI\b|\bUTI\b|unidad\s+de\s+(?:cuidados|terapia)\s+intensiv[ao]s?|cuidados\s+intensivos|terapia\s+intensiva",
    )
    .expect("Invalid critical unit regex pattern")
});

static LOCATION_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)habitaci[oó]n|sector|servicio|internad[oa]|ubicaci[oó]n|ubicad[oa]|paciente|ingreso")
        .expect("Invalid location regex pattern")
});

#[derive(Debug, Clone, Default)]
pub struct PatientExtraction {
    pub context: PatientContext,
    pub findings: Vec<Finding>,
}

/// Extract demographics and placement, flagging every absent field.
pub fn extract_patient(text: &str, windows: &ScanWindows) -> PatientExtraction {
    let leading = text
        .split('\n')
        .take(windows.leading_lines)
        .collect::<Vec<_>>()
        .join("\n");

    let name = extract_name(&leading);
    let document_id = extract_document_id(&leading);
    let birth_date = BIRTH_DATE_RE
        .captures_iter(&leading)
        .find_map(|c| parse_date(&c[1]));
    let sex = extract_sex(&leading);
    let payer = extract_payer(&leading);
    let ward = extract_ward(&leading, text);
    let in_critical_care_unit = in_critical_care_unit(text, ward.as_deref(), windows);

    let mut findings = Vec::new();
    let mut missing = |absent: bool, finding: Finding| {
        if absent {
            findings.push(finding);
        }
    };
    let cat = FindingCategory::MissingAdmissionField;
    missing(name.is_none(), Finding::critical(cat, "Nombre del paciente no encontrado", SOURCE));
    missing(document_id.is_none(), Finding::critical(cat, "DNI del paciente no encontrado", SOURCE));
    missing(birth_date.is_none(), Finding::critical(cat, "Fecha de nacimiento no encontrada", SOURCE));
    missing(sex.is_none(), Finding::critical(cat, "Sexo del paciente no especificado", SOURCE));
    missing(payer.is_none(), Finding::critical(cat, "Obra social no informada", SOURCE));
    missing(ward.is_none(), Finding::warning(cat, "Habitación o ubicación del paciente no informada", SOURCE));

    tracing::debug!(
        missing = findings.len(),
        critical_care = in_critical_care_unit,
        "Patient context extracted"
    );

    PatientExtraction {
        context: PatientContext {
            name,
            document_id,
            birth_date,
            sex,
            payer,
            ward,
            in_critical_care_unit,
        },
        findings,
    }
}

fn extract_name(leading: &str) -> Option<String> {
    NAME_RULES.iter().find_map(|r| {
        r.regex.captures_iter(leading).find_map(|caps| {
            let name = trim_trailing_labels(&caps[1], NAME_STOP_WORDS, 3);
            let name = squash(name.trim_end_matches(|c: char| !c.is_alphabetic()));
            (name.chars().count() > 3).then_some(name)
        })
    })
}

fn extract_document_id(leading: &str) -> Option<String> {
    DOCUMENT_ID_RE.captures_iter(leading).find_map(|caps| {
        let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
        (7..=8).contains(&digits.len()).then_some(digits)
    })
}

fn extract_sex(leading: &str) -> Option<Sex> {
    let caps = SEX_RE.captures(leading)?;
    match caps[1].to_lowercase().as_str() {
        "femenino" | "mujer" | "f" => Some(Sex::Female),
        "masculino" | "hombre" | "m" => Some(Sex::Male),
        _ => None,
    }
}

fn extract_payer(leading: &str) -> Option<String> {
    PAYER_RE.captures_iter(leading).find_map(|caps| {
        let payer = trim_trailing_labels(&caps[1], PAYER_STOP_WORDS, 1);
        (!payer.is_empty()).then_some(payer)
    })
}

/// A `box` anywhere wins, then labelled wards in the header, then anywhere.
fn extract_ward(leading: &str, full: &str) -> Option<String> {
    if let Some(caps) = BOX_RE.captures(full) {
        return Some(format!("BOX {}", caps[1].to_uppercase()));
    }
    let labelled = |text: &str| {
        WARD_RE.captures_iter(text).find_map(|caps| {
            let ward = trim_trailing_labels(&caps[1], WARD_STOP_WORDS, 0);
            (!ward.is_empty()).then_some(ward)
        })
    };
    labelled(leading).or_else(|| labelled(full))
}

/// Whether the patient is placed in a critical-care unit.
///
/// The ward naming a unit is decisive. Otherwise a unit mention anywhere
/// counts only when placement vocabulary surrounds it.
pub fn in_critical_care_unit(text: &str, ward: Option<&str>, windows: &ScanWindows) -> bool {
    if ward.is_some_and(|w| CRITICAL_UNIT_RE.is_match(w)) {
        return true;
    }
    CRITICAL_UNIT_RE.find_iter(text).any(|m| {
        let ctx = window(
            text,
            m.start(),
            m.end(),
            windows.unit_context_before,
            windows.unit_context_after,
        );
        LOCATION_CONTEXT_RE.is_match(ctx)
    })
}
