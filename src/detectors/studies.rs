//! Ancillary studies
//!
//! Imaging, laboratory and procedure mentions are read line by line. Each
//! line yields at most one study per category. Studies the patient brought
//! from outside are kept apart so they never reach billing counts.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::enums::{FindingCategory, StudyCategory};
use crate::models::{AncillaryStudy, Finding, StudyCounts};
use crate::pipeline::matcher::{any_match, first_rule, rule, Rule};
use crate::pipeline::normalize::NormalizedText;
use crate::pipeline::text::{first_date, first_time, lines_with_offsets, truncate_chars};

/// Vocabulary entry: display name and whether a body zone qualifies it.
struct StudyKind {
    name: &'static str,
    zoned: bool,
}

const fn zoned(name: &'static str) -> StudyKind {
    StudyKind { name, zoned: true }
}

const fn plain(name: &'static str) -> StudyKind {
    StudyKind { name, zoned: false }
}

static IMAGING_RULES: LazyLock<Vec<Rule<StudyKind>>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)\bangio[-\s]?(?:tac|tc|rmn?)\b", zoned("Angiografía")),
        rule(r"(?i)\b(?:tac|tc|tomograf[ií]a)\b", zoned("TAC")),
        rule(r"(?i)\b(?:rmn?|resonancia)\b", zoned("Resonancia magnética")),
        rule(r"(?i)\b(?:rx|radiograf[ií]a)\b", zoned("Radiografía")),
        rule(
            r"(?i)\b(?:ecograf[ií]a|ultrasonido|eco\s+(?:de\b|abdominal|renal|doppler|tiroidea|obst[eé]trica))",
            zoned("Ecografía"),
        ),
        rule(r"(?i)\bdoppler\b", zoned("Doppler")),
    ]
});

static LAB_RULES: LazyLock<Vec<Rule<StudyKind>>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)\bhemograma\b", plain("Hemograma")),
        rule(r"(?i)\bpcr\b", plain("PCR")),
        rule(r"(?i)\bvsg\b", plain("VSG")),
        rule(r"(?i)\bglucemia\b", plain("Glucemia")),
        rule(r"(?i)\bcreatinin(?:a|emia)?\b", plain("Creatinina")),
        rule(r"(?i)\burea\b", plain("Urea")),
        rule(r"(?i)\b(?:ionograma|natremia|kalemia)\b", plain("Ionograma")),
        rule(r"(?i)\b(?:hepatograma|tgo|tgp|bilirrubina)\b", plain("Perfil hepático")),
        rule(r"(?i)\b(?:orina\s+completa|sumario\s+de\s+orina|urin[aá]lisis)\b", plain("Orina completa")),
        rule(r"(?i)\b(?:gasometr[ií]a|estado\s+[aá]cido[-\s]base)\b", plain("Gasometría")),
        rule(r"(?i)\b(?:hemocultivos?|urocultivo|cultivos?)\b", plain("Cultivos")),
    ]
});

static PROCEDURE_RULES: LazyLock<Vec<Rule<StudyKind>>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)\bendoscop[ií]a\s+(?:digestiva\s+)?alta\b", plain("Endoscopía alta")),
        rule(r"(?i)\b(?:video)?colonoscop[ií]a\b", plain("Colonoscopía")),
        rule(r"(?i)\b(?:fibro)?broncoscop[ií]a\b", plain("Broncoscopía")),
        rule(r"(?i)\beco[-\s]?cardiograma\b", plain("Ecocardiograma")),
        rule(r"(?i)\b(?:ecg|electrocardiograma)\b", plain("Electrocardiograma")),
        rule(r"(?i)\b(?:eeg|electroencefalograma)\b", plain("Electroencefalograma")),
        rule(r"(?i)\bespirometr[ií]a\b", plain("Espirometría")),
        rule(r"(?i)\b(?:paracentesis|toracocentesis|punci[oó]n\s+lumbar)\b", plain("Punción diagnóstica")),
    ]
});

static KINESIOLOGY_RULES: LazyLock<Vec<Rule<()>>> = LazyLock::new(|| {
    vec![rule(r"(?i)\b(?:ktr|kine|kinesio|kinesiolog[ií]a|kinesioterapia)\b", ())]
});

static EXTERNAL_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)estudios\s+entregados\s+por\s+el\s+paciente|ex[aá]menes\s+complementarios")
        .expect("Invalid external-section regex pattern")
});

/// Line openings that start a new clinical section.
static SECTION_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:evoluci[oó]n|visita|alta\s+m[eé]dica|epicrisis|foja|hoja|protocolo|interconsulta)")
        .expect("Invalid section-header regex pattern")
});

static ZONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bde\s+(t[oó]rax|abdomen|pelvis|columna|cerebro|cr[aá]neo|cuello|rodilla|hombro|renal|tiroides|miembros?\s+inferiores)\b",
    )
    .expect("Invalid zone regex pattern")
});

static REPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:informe|impresi[oó]n|conclusi[oó]n|resultado)").expect("Invalid report regex pattern")
});

static RESULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:resultado|impresi[oó]n|conclusi[oó]n|informe)\s*[:\-]\s*(.{10,})")
        .expect("Invalid result regex pattern")
});

static SERVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bservicio\s*:?\s*([\p{L}\d ]+)$").expect("Invalid service regex pattern")
});

const RESULT_MAX_CHARS: usize = 200;

/// Output of [`detect_studies`].
#[derive(Debug, Clone, Default)]
pub struct StudyDetection {
    /// Studies performed during the stay, deduplicated.
    pub studies: Vec<AncillaryStudy>,
    /// Studies inside sections of results brought by the patient.
    pub external: Vec<AncillaryStudy>,
    pub counts: StudyCounts,
    pub findings: Vec<Finding>,
}

/// Scan the normalized document for ancillary studies.
pub fn detect_studies(doc: &NormalizedText) -> StudyDetection {
    let mut studies = Vec::new();
    let mut external = Vec::new();
    let mut kinesiology_pages: BTreeSet<Option<u32>> = BTreeSet::new();

    // Page the current external section started on, while inside one.
    let mut external_section: Option<Option<u32>> = None;

    for (offset, line) in lines_with_offsets(&doc.text) {
        let page = doc.page_at(offset);

        if let Some(started) = external_section {
            if started != page || SECTION_HEADER_RE.is_match(line) {
                external_section = None;
            }
        }
        if EXTERNAL_SECTION_RE.is_match(line) {
            external_section = Some(page);
            continue;
        }
        if line.is_empty() {
            continue;
        }

        let inside_external = external_section.is_some();
        if !inside_external && any_match(&KINESIOLOGY_RULES, line) {
            kinesiology_pages.insert(page);
        }

        let tables: [(StudyCategory, &[Rule<StudyKind>]); 3] = [
            (StudyCategory::Imaging, IMAGING_RULES.as_slice()),
            (StudyCategory::Lab, LAB_RULES.as_slice()),
            (StudyCategory::Procedure, PROCEDURE_RULES.as_slice()),
        ];
        for (category, rules) in tables {
            let Some(matched) = first_rule(rules, line) else {
                continue;
            };
            let study = read_study(category, &matched.meta, line, page);
            if inside_external {
                external.push(study);
            } else {
                studies.push(study);
            }
        }
    }

    let studies = dedup(studies);
    let external = dedup(external);
    let findings = studies.iter().flat_map(study_findings).collect();

    let count = |c: StudyCategory| studies.iter().filter(|s| s.category == c).count();
    let counts = StudyCounts {
        total: studies.len(),
        imaging: count(StudyCategory::Imaging),
        lab: count(StudyCategory::Lab),
        procedure: count(StudyCategory::Procedure),
        kinesiology_sessions: kinesiology_pages.len(),
    };

    tracing::debug!(
        studies = counts.total,
        external = external.len(),
        kinesiology = counts.kinesiology_sessions,
        "Ancillary studies detected"
    );

    StudyDetection {
        studies,
        external,
        counts,
        findings,
    }
}

fn read_study(category: StudyCategory, kind: &StudyKind, line: &str, page: Option<u32>) -> AncillaryStudy {
    let name = match ZONE_RE.captures(line) {
        Some(caps) if kind.zoned => format!("{} de {}", kind.name, caps[1].to_lowercase()),
        _ => kind.name.to_string(),
    };
    AncillaryStudy {
        category,
        kind: name,
        date: first_date(line),
        time: first_time(line),
        location: SERVICE_RE.captures(line).map(|c| c[1].trim().to_string()),
        result: RESULT_RE
            .captures(line)
            .map(|c| truncate_chars(c[1].trim(), RESULT_MAX_CHARS)),
        report_present: REPORT_RE.is_match(line),
        page,
    }
}

/// First occurrence wins.
fn dedup(studies: Vec<AncillaryStudy>) -> Vec<AncillaryStudy> {
    let mut seen = BTreeSet::new();
    studies
        .into_iter()
        .filter(|s| seen.insert(s.dedup_key()))
        .collect()
}

fn study_findings(study: &AncillaryStudy) -> Vec<Finding> {
    let page = study.page.map(|p| format!(" (Hoja {p})")).unwrap_or_default();
    let mut findings = Vec::new();

    if !study.report_present {
        let category = match study.category {
            StudyCategory::Imaging => FindingCategory::ImagingWithoutReport,
            StudyCategory::Lab => FindingCategory::LabWithoutReport,
            StudyCategory::Procedure => FindingCategory::ProcedureWithoutReport,
        };
        let date = study
            .date
            .map(|d| format!(" ({})", d.format("%d/%m/%Y")))
            .unwrap_or_default();
        findings.push(
            Finding::warning(
                category,
                format!("Estudio sin informe: {}{}{}", study.kind, date, page),
                study.category.label(),
            )
            .with_date(study.date),
        );
    }
    if study.date.is_none() {
        findings.push(Finding::warning(
            FindingCategory::StudyWithoutDate,
            format!("Estudio sin fecha: {}{}", study.kind, page),
            study.category.label(),
        ));
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize;
    use chrono::NaiveDate;

    fn detect(raw: &str) -> StudyDetection {
        detect_studies(&normalize(raw))
    }

    #[test]
    fn zoned_study_with_report() {
        let d = detect("TAC de tórax 02/03/2024 informe: sin lesiones pleurales");
        assert_eq!(d.studies.len(), 1);
        let s = &d.studies[0];
        assert_eq!(s.kind, "TAC de tórax");
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2024, 3, 2));
        assert!(s.report_present);
        assert_eq!(s.result.as_deref(), Some("sin lesiones pleurales"));
        assert!(d.findings.is_empty());
    }

    #[test]
    fn missing_report_and_date_are_warnings() {
        let d = detect("Hemograma 03/03/2024\nRadiografía simple, informe: normal sin hallazgos");
        assert_eq!(d.counts.lab, 1);
        assert_eq!(d.counts.imaging, 1);
        let categories: Vec<_> = d.findings.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![FindingCategory::LabWithoutReport, FindingCategory::StudyWithoutDate]
        );
        assert!(d.findings.iter().all(|f| !f.is_critical()));
        assert!(d.findings[0].message.contains("Hemograma (03/03/2024)"));
    }

    #[test]
    fn repeated_mentions_are_one_study() {
        let line = "Hemograma 02/03/2024 resultado: hemoglobina 12 g/dl";
        let d = detect(&format!("{line}\n{line}"));
        assert_eq!(d.studies.len(), 1);
        assert_eq!(d.counts.total, 1);
    }

    #[test]
    fn patient_supplied_studies_are_kept_apart() {
        let d = detect(
            "Estudios entregados por el paciente:\n\
             TAC de cerebro 01/01/2024 informe: normal sin lesiones\n\
             Evolución médica diaria\n\
             RX de tórax 02/03/2024 informe: sin consolidación",
        );
        assert_eq!(d.studies.len(), 1);
        assert_eq!(d.studies[0].kind, "Radiografía de tórax");
        assert_eq!(d.external.len(), 1);
        assert_eq!(d.external[0].kind, "TAC de cerebro");
        assert_eq!(d.counts.imaging, 1);
    }

    #[test]
    fn page_change_ends_external_section() {
        let d = detect(
            "Página 1\nExámenes complementarios\nRX de tórax 01/02/2024 informe: normal total\n\
             Página 2\nRX de tórax 03/03/2024 informe: normal total",
        );
        assert_eq!(d.external.len(), 1);
        assert_eq!(d.studies.len(), 1);
        assert_eq!(d.studies[0].page, Some(2));
    }

    #[test]
    fn kinesiology_counted_per_page() {
        let d = detect("Página 1\nKinesioterapia respiratoria\nPágina 2\nKTR motora\nKinesio otra vez");
        assert_eq!(d.counts.kinesiology_sessions, 2);
        assert!(d.studies.is_empty());
    }

    #[test]
    fn one_line_can_carry_several_categories() {
        let d = detect("02/03/2024 ECG y hemograma, resultado: sin alteraciones agudas");
        assert_eq!(d.counts.lab, 1);
        assert_eq!(d.counts.procedure, 1);
    }
}
