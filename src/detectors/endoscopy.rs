//! Endoscopic procedure records
//!
//! A procedure name alone is not enough: the surrounding block must read
//! like a procedure record (operator, findings or biopsy vocabulary).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ScanWindows;
use crate::models::enums::FindingCategory;
use crate::models::{EndoscopicProcedure, Finding};
use crate::pipeline::clinicians::CREDENTIAL_RE;
use crate::pipeline::matcher::{rule, scan, Rule};
use crate::pipeline::text::{
    captured_date, expand, first_date, time_from_parts, trim_trailing_labels, truncate_chars,
};

static PROCEDURE_RULES: LazyLock<Vec<Rule<&'static str>>> = LazyLock::new(|| {
    vec![
        rule(
            r"(?i)\b(?:veda|videoendoscop[ií]a\s+digestiva\s+alta|endoscop[ií]a\s+(?:digestiva\s+)?alta)\b",
            "VEDA (Endoscopía Digestiva Alta)",
        ),
        rule(r"(?i)\b(?:video)?colonoscop[ií]a\b|\bVCC\b", "Colonoscopía"),
        rule(r"(?i)\b(?:fibro)?broncoscop[ií]a\b", "Broncoscopía"),
        rule(r"(?i)\brectosigmoidoscop[ií]a\b", "Rectosigmoidoscopía"),
        rule(r"(?i)\bgastroscop[ií]a\b", "Gastroscopía"),
        rule(r"(?i)\bcistoscop[ií]a\b", "Cistoscopía"),
    ]
});

static RECORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:foja|hoja|informe)[^\n]{0,80}(?:endoscop|procedimiento)|\bendoscopista\b|\bhallazgos?\b|\bbiopsias?\b")
        .expect("Invalid endoscopy record regex pattern")
});

static LABELLED_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:fecha|realizad[oa])\s*:?\s*(\d{1,2})/(\d{1,2})/(\d{2,4})\b")
        .expect("Invalid endoscopy date regex pattern")
});

static START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)hora\s+(?:de\s+)?inicio\s*:?\s*(\d{1,2}):(\d{2})").expect("Invalid start-time regex pattern")
});

static END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)hora\s+(?:de\s+)?(?:fin|finalizaci[oó]n|t[eé]rmino)\s*:?\s*(\d{1,2}):(\d{2})")
        .expect("Invalid end-time regex pattern")
});

static ENDOSCOPIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:endoscopista|m[eé]dico|realiz[oó])\s*:?\s*(?:dra?\.?\s*)?((?-i:[A-ZÁÉÍÓÚÑ]\p{L}+(?:[ ,]+[A-ZÁÉÍÓÚÑ]\p{L}+){1,3}))",
    )
    .expect("Invalid endoscopist regex pattern")
});

static ANESTHETIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)anestesi(?:sta|[oó]log[oa])\s*:?\s*(?:dra?\.?\s*)?((?-i:[A-ZÁÉÍÓÚÑ]\p{L}+(?:[ ,]+[A-ZÁÉÍÓÚÑ]\p{L}+){1,3}))",
    )
    .expect("Invalid anesthetist regex pattern")
});

static REPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bhallazgos?\s*:?\s*([^\n]{10,500})").expect("Invalid findings regex pattern")
});

static BIOPSY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)biopsia|muestra\s+histol[oó]gica|toma\s+de\s+muestra").expect("Invalid biopsy regex pattern")
});

const NAME_LABELS: &[&str] = &["mp", "mn", "matr", "hora ", "hora:", "fecha", "anestesi", "hallazgo", "biopsia"];

const REPORT_MAX_CHARS: usize = 197;

/// Corroborated endoscopic procedures, one per (procedure, date).
pub fn detect_endoscopies(text: &str, windows: &ScanWindows) -> Vec<EndoscopicProcedure> {
    let mut found = Vec::new();
    let mut seen = BTreeSet::new();
    // End of the last accepted record per procedure; later mentions inside
    // it belong to the same record.
    let mut record_end: BTreeMap<&str, usize> = BTreeMap::new();

    for hit in scan(&PROCEDURE_RULES, text) {
        if record_end.get(hit.meta).is_some_and(|&end| hit.start < end) {
            continue;
        }
        let (from, to) = expand(text, hit.start, hit.end, windows.endoscopy_before, windows.endoscopy_after);
        let block = &text[from..to];
        if !RECORD_RE.is_match(block) {
            continue;
        }
        record_end.insert(*hit.meta, to);
        let procedure = read_procedure(hit.meta, block);
        if seen.insert((procedure.procedure.clone(), procedure.date)) {
            found.push(procedure);
        }
    }

    tracing::debug!(count = found.len(), "Endoscopic procedures detected");
    found
}

fn person(re: &Regex, block: &str) -> Option<String> {
    re.captures(block)
        .map(|c| trim_trailing_labels(&c[1], NAME_LABELS, 3))
        .filter(|name| !name.is_empty())
}

fn read_procedure(name: &str, block: &str) -> EndoscopicProcedure {
    let date = LABELLED_DATE_RE
        .captures(block)
        .and_then(|c| captured_date(&c, 1))
        .or_else(|| first_date(block));
    let time = |re: &Regex| re.captures(block).and_then(|c| time_from_parts(&c[1], &c[2], None));
    let start_time = time(&START_RE);
    let end_time = time(&END_RE);
    let endoscopist = person(&ENDOSCOPIST_RE, block);
    let credential = CREDENTIAL_RE.captures(block).map(|c| c[1].to_string());

    let source = format!("Endoscopía: {name}");
    let mut findings = Vec::new();
    let mut flag = |critical: bool, what: &str| {
        let message = format!("{name}: {what}");
        findings.push(if critical {
            Finding::critical(FindingCategory::EndoscopyRecord, message, source.clone())
        } else {
            Finding::warning(FindingCategory::EndoscopyRecord, message, source.clone())
        });
    };
    if endoscopist.is_none() {
        flag(true, "falta nombre del endoscopista");
    }
    if date.is_none() {
        flag(true, "falta fecha del procedimiento");
    }
    if credential.is_none() {
        flag(false, "falta matrícula del endoscopista");
    }
    if start_time.is_none() {
        flag(false, "falta hora de inicio");
    }
    if end_time.is_none() {
        flag(false, "falta hora de finalización");
    }

    EndoscopicProcedure {
        procedure: name.to_string(),
        date,
        start_time,
        end_time,
        endoscopist,
        credential,
        anesthetist: person(&ANESTHETIST_RE, block),
        report: REPORT_RE
            .captures(block)
            .map(|c| truncate_chars(c[1].trim(), REPORT_MAX_CHARS)),
        biopsy_taken: BIOPSY_RE.is_match(block),
        findings: findings.into_iter().map(|f| f.with_date(date)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    const RECORD: &str = "FOJA DE ENDOSCOPÍA\n\
        Procedimiento: VEDA\n\
        Fecha: 05/03/2024\n\
        Hora inicio: 10:00 Hora fin: 10:30\n\
        Endoscopista: Dr. Ramírez Luis MP 4455\n\
        Anestesista: Dra. Gómez Ana\n\
        Hallazgos: gastritis erosiva antral leve, sin sangrado activo\n\
        Se toman biopsias.";

    fn detect(text: &str) -> Vec<EndoscopicProcedure> {
        detect_endoscopies(text, &ScanWindows::default())
    }

    #[test]
    fn full_record_is_read() {
        let found = detect(RECORD);
        assert_eq!(found.len(), 1);
        let p = &found[0];
        assert_eq!(p.procedure, "VEDA (Endoscopía Digestiva Alta)");
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(p.start_time, NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(p.end_time, NaiveTime::from_hms_opt(10, 30, 0));
        assert_eq!(p.endoscopist.as_deref(), Some("Ramírez Luis"));
        assert_eq!(p.credential.as_deref(), Some("4455"));
        assert_eq!(p.anesthetist.as_deref(), Some("Gómez Ana"));
        assert!(p.report.as_deref().unwrap().starts_with("gastritis erosiva"));
        assert!(p.biopsy_taken);
        assert!(p.findings.is_empty(), "{:?}", p.findings);
    }

    #[test]
    fn passing_mention_is_not_a_record() {
        assert!(detect("Antecedente de VEDA hace dos años, sin particularidades.").is_empty());
    }

    #[test]
    fn incomplete_record_is_flagged() {
        let found = detect("Informe de procedimiento: colonoscopía. Hallazgos: pólipo sésil de 5 mm en sigma");
        assert_eq!(found.len(), 1);
        let f = &found[0].findings;
        assert_eq!(f.iter().filter(|x| x.is_critical()).count(), 2);
        assert_eq!(f.iter().filter(|x| !x.is_critical()).count(), 3);
        assert!(!found[0].biopsy_taken);
    }

    #[test]
    fn separate_records_on_different_days() {
        let filler = "x".repeat(2100);
        let second = RECORD.replace("05/03/2024", "07/03/2024");
        let found = detect(&format!("{RECORD}\n{filler}\n{second}"));
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].date, NaiveDate::from_ymd_opt(2024, 3, 7));
    }

    #[test]
    fn repeated_mentions_in_one_record_are_one_procedure() {
        let text = format!("{RECORD}\nSe completa VEDA sin complicaciones.");
        assert_eq!(detect(&text).len(), 1);
    }
}
