//! Audit engine
//!
//! Runs every stage over one document and assembles the [`AuditResult`].
//! The engine holds only configuration and compiled criteria; each call is
//! an independent pure transformation of its input and `today`.

use base64::Engine as _;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::communication::{synthesize_communications, ResponsibleParties};
use crate::config::AuditConfig;
use crate::detectors::{
    detect_ambulatory_practices, detect_endoscopies, detect_excluded_practices,
    detect_interconsultations, detect_studies,
};
use crate::error::AuditError;
use crate::models::enums::AuditStatus;
use crate::models::{AuditInput, AuditResult, Finding, FindingCounts, StayWindow};

use super::clinicians::extract_clinicians;
use super::critical_care::CareLevelClassifier;
use super::discharge::check_discharge_documentation;
use super::evolution::analyze_coverage;
use super::normalize::{normalize, NormalizedText};
use super::patient::extract_patient;
use super::surgery::extract_surgical_episodes;
use super::temporal::{day_range, reconcile_window, resolve_stay_window};
use super::text::DateIndex;
use super::timeline::build_timeline;

pub struct AuditEngine {
    config: AuditConfig,
    classifier: CareLevelClassifier,
}

impl AuditEngine {
    /// Validate the configuration and compile its criteria.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        config.validate()?;
        let classifier = CareLevelClassifier::new(&config.critical_care)?;
        Ok(Self { config, classifier })
    }

    /// Audit a document, resolving the stay window from its text.
    pub fn audit(&self, input: &AuditInput, today: NaiveDate) -> Result<AuditResult, AuditError> {
        let doc = normalize(&input.text);
        let temporal = resolve_stay_window(&doc.text)?;
        self.run(input, doc, temporal.window, temporal.findings, today)
    }

    /// Audit a document against a window the caller already knows.
    ///
    /// The window is reconciled the same way as one read from the text.
    pub fn audit_with_window(
        &self,
        input: &AuditInput,
        window: StayWindow,
        today: NaiveDate,
    ) -> Result<AuditResult, AuditError> {
        let doc = normalize(&input.text);
        let resolution = reconcile_window(window);
        self.run(input, doc, resolution.window, resolution.findings, today)
    }

    fn run(
        &self,
        input: &AuditInput,
        doc: NormalizedText,
        window: StayWindow,
        window_findings: Vec<Finding>,
        today: NaiveDate,
    ) -> Result<AuditResult, AuditError> {
        let windows = &self.config.windows;
        let text = doc.text.as_str();

        let patient = extract_patient(text, windows);
        let in_unit = patient.context.in_critical_care_unit;
        let range = day_range(&window, today, self.config.max_stay_days);
        let dates = DateIndex::build(text);

        let coverage = analyze_coverage(text, &dates, &range.days, in_unit, windows);
        let surgery = extract_surgical_episodes(text, windows);
        let care_levels = in_unit
            .then(|| self.classifier.classify_days(text, &dates, &coverage, windows.care_block));
        let studies = detect_studies(&doc);
        let interconsultations = detect_interconsultations(text, windows);
        let excluded = detect_excluded_practices(text, windows);
        let endoscopies = detect_endoscopies(text, windows);
        let ambulatory = detect_ambulatory_practices(text, &window, today, windows);
        let clinicians = extract_clinicians(text);
        let discharge = check_discharge_documentation(text, &window, windows);

        let findings: Vec<Finding> = window_findings
            .into_iter()
            .chain(range.span_warning)
            .chain(patient.findings)
            .chain(coverage.findings.iter().cloned())
            .chain(discharge)
            .chain(surgery.episodes.iter().flat_map(|e| e.findings.iter().cloned()))
            .chain(surgery.findings)
            .chain(studies.findings)
            .chain(interconsultations.iter().flat_map(|i| i.findings.iter().cloned()))
            .chain(excluded.findings)
            .chain(endoscopies.iter().flat_map(|e| e.findings.iter().cloned()))
            .chain(ambulatory.findings)
            .collect();
        let finding_counts = FindingCounts::tally(&findings);
        let status = if finding_counts.critical > 0 {
            AuditStatus::PendingCorrection
        } else {
            AuditStatus::Approved
        };

        let timeline = build_timeline(&range.days, &coverage, &surgery.episodes, &studies.studies);
        let parties =
            ResponsibleParties::collect(&surgery.episodes, &clinicians, &endoscopies, &interconsultations);
        let communications =
            synthesize_communications(&findings, &parties, &patient.context, &input.filename);

        let content_hash = content_hash(&input.text);
        let document_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, content_hash.as_bytes());

        tracing::info!(
            filename = %input.filename,
            document_id = %document_id,
            days = timeline.len(),
            episodes = surgery.episodes.len(),
            findings = finding_counts.total,
            critical = finding_counts.critical,
            communications = communications.len(),
            status = status.as_str(),
            "Audit complete"
        );

        Ok(AuditResult {
            filename: input.filename.clone(),
            document_id,
            content_hash,
            effective_end_date: range.end,
            hospitalization_days: window.hospitalization_days(today),
            window,
            patient: patient.context,
            timeline,
            surgical_episodes: surgery.episodes,
            studies: studies.studies,
            external_studies: studies.external,
            study_counts: studies.counts,
            care_levels,
            interconsultations,
            excluded_practices: excluded.practices,
            endoscopies,
            ambulatory_practices: ambulatory.practices,
            clinicians,
            findings,
            finding_counts,
            communications,
            status,
        })
    }
}

/// Base64 SHA-256 of the raw input text.
pub fn content_hash(text: &str) -> String {
    let hash = Sha256::digest(text.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{CareLevel, FindingCategory};

    const COMPLETED: &str = "HISTORIA CLÍNICA\n\
        Paciente: GARCIA MARIA\n\
        DNI: 30123456\n\
        Fecha de nacimiento: 10/05/1970\n\
        Sexo: Femenino\n\
        Obra Social: OSDE\n\
        Habitación: 204\n\
        Fecha Ingreso: 01/03/2024 08:00\n\
        Fecha Egreso: 03/03/2024 11:00\n\
        Visita 02/03/2024\n\
        Evolución médica diaria: paciente estable, afebril.\n\
        Visita 03/03/2024\n\
        Evolución médica diaria: buena evolución, se otorga alta médica.\n\
        Epicrisis: internación sin complicaciones.";

    fn engine() -> AuditEngine {
        AuditEngine::new(AuditConfig::default()).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    #[test]
    fn complete_record_is_approved() {
        let result = engine()
            .audit(&AuditInput::new(COMPLETED, "garcia.pdf"), today())
            .unwrap();
        assert_eq!(result.hospitalization_days, 2);
        assert_eq!(result.timeline.len(), 3);
        assert!(result.timeline[1].has_evolution_note);
        assert!(result.timeline[2].has_evolution_note);
        assert_eq!(result.patient.document_id.as_deref(), Some("30123456"));
        assert!(result.care_levels.is_none());
        assert_eq!(result.finding_counts.critical, 0, "{:?}", result.findings);
        assert!(result.is_approved());
    }

    #[test]
    fn missing_admission_is_fatal() {
        let err = engine()
            .audit(&AuditInput::new("Evolución médica diaria sin fechas", "x.pdf"), today())
            .unwrap_err();
        assert!(matches!(err, AuditError::MissingAdmissionDate));
    }

    #[test]
    fn missing_note_makes_record_pending() {
        let text = COMPLETED.replace(
            "Visita 02/03/2024\nEvolución médica diaria: paciente estable, afebril.\n",
            "",
        );
        let result = engine().audit(&AuditInput::new(text, "garcia.pdf"), today()).unwrap();
        assert_eq!(result.status, AuditStatus::PendingCorrection);
        assert!(result.findings.iter().any(|f| {
            f.category == FindingCategory::MissingDailyNote
                && f.date == NaiveDate::from_ymd_opt(2024, 3, 2)
        }));
        assert!(result
            .communications
            .iter()
            .any(|c| c.findings.iter().any(|f| f.category == FindingCategory::MissingDailyNote)));
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let input = AuditInput::new(COMPLETED, "garcia.pdf");
        let a = serde_json::to_string(&engine().audit(&input, today()).unwrap()).unwrap();
        let b = serde_json::to_string(&engine().audit(&input, today()).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn document_id_follows_content() {
        let a = engine().audit(&AuditInput::new(COMPLETED, "a.pdf"), today()).unwrap();
        let b = engine().audit(&AuditInput::new(COMPLETED, "b.pdf"), today()).unwrap();
        let c = engine()
            .audit(&AuditInput::new(format!("{COMPLETED}\n"), "a.pdf"), today())
            .unwrap();
        assert_eq!(a.document_id, b.document_id);
        assert_ne!(a.document_id, c.document_id);
        assert_eq!(a.content_hash, content_hash(COMPLETED));
    }

    #[test]
    fn caller_window_overrides_text() {
        let admission = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let result = engine()
            .audit_with_window(
                &AuditInput::new("Sin rótulos de fecha", "x.pdf"),
                StayWindow::ongoing(admission),
                NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            )
            .unwrap();
        assert!(result.window.ongoing);
        assert_eq!(result.hospitalization_days, 4);
        assert_eq!(result.timeline.len(), 4);
        assert_eq!(result.effective_end_date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert!(result
            .findings
            .iter()
            .all(|f| f.category != FindingCategory::MissingDischargeRecord));
    }

    #[test]
    fn caller_window_is_reconciled() {
        let at = |day: u32| {
            NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        };
        let input = AuditInput::new("Sin rótulos de fecha", "x.pdf");

        let result = engine()
            .audit_with_window(&input, StayWindow::completed(at(5), at(1)), today())
            .unwrap();
        assert_eq!(result.window.discharge, Some(at(5)));
        assert_eq!(result.hospitalization_days, 0);
        assert_eq!(result.timeline.len(), 1);
        assert!(result
            .findings
            .iter()
            .any(|f| f.category == FindingCategory::StayWindow));

        let flagged = StayWindow {
            admission: at(1),
            discharge: Some(at(3)),
            ongoing: true,
        };
        let result = engine().audit_with_window(&input, flagged, today()).unwrap();
        assert!(!result.window.ongoing);
        assert_eq!(result.timeline.len(), 3);
        assert!(result
            .findings
            .iter()
            .any(|f| f.category == FindingCategory::StayWindow));
    }

    #[test]
    fn long_ongoing_stay_runs_through_today() {
        let text = "Fecha Ingreso: 01/03/2024 08:00\nVisita 02/03/2024\nEvolución médica diaria: estable.";
        let now = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(499);
        let result = engine().audit(&AuditInput::new(text, "larga.pdf"), now).unwrap();
        assert_eq!(result.hospitalization_days, 500);
        assert_eq!(result.timeline.len(), 500);
        assert_eq!(result.timeline.last().map(|d| d.date), Some(now));
        assert_eq!(result.effective_end_date, now);
        assert!(result
            .findings
            .iter()
            .any(|f| f.category == FindingCategory::StayWindow && f.message.contains("500 días")));
    }

    #[test]
    fn mistyped_discharge_year_is_audited_and_flagged() {
        let text = COMPLETED.replace("Fecha Egreso: 03/03/2024", "Fecha Egreso: 03/03/2054");
        let result = engine().audit(&AuditInput::new(text, "garcia.pdf"), today()).unwrap();
        assert_eq!(result.timeline.len() as i64, result.hospitalization_days + 1);
        assert!(result.timeline.len() > 10_000);
        assert!(result
            .findings
            .iter()
            .any(|f| f.category == FindingCategory::StayWindow));
    }

    #[test]
    fn unit_patient_gets_care_levels() {
        let text = "Paciente: LOPEZ JUAN\n\
            Habitación: UTI cama 3\n\
            Fecha Ingreso: 01/03/2024 08:00\n\
            Fecha Egreso: 02/03/2024 10:00\n\
            Visita 02/03/2024\n\
            Evolución médica diaria: en ventilación mecánica invasiva, alta médica.";
        let result = engine().audit(&AuditInput::new(text, "lopez.pdf"), today()).unwrap();
        assert!(result.patient.in_critical_care_unit);
        let care = result.care_levels.expect("care levels for unit patient");
        assert_eq!(care.days.len(), 1);
        assert_eq!(care.days[0].level, CareLevel::Intensive);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = AuditConfig::default();
        config.max_stay_days = 0;
        assert!(matches!(AuditEngine::new(config), Err(AuditError::Config(_))));
    }

    mod proptest_tests {
        use super::*;
        use chrono::Duration;
        use proptest::prelude::*;

        fn document(admission: NaiveDate, discharge: Option<NaiveDate>) -> String {
            let mut text = format!("Fecha Ingreso: {} 08:00\n", admission.format("%d/%m/%Y"));
            if let Some(d) = discharge {
                text.push_str(&format!("Fecha Egreso: {} 10:00\n", d.format("%d/%m/%Y")));
            }
            text
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// Timeline covers admission through discharge, or through today.
            #[test]
            fn timeline_matches_day_count(
                start in 0i64..3000,
                length in 0i64..40,
                ongoing in any::<bool>(),
            ) {
                let admission = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap() + Duration::days(start);
                let end = admission + Duration::days(length);
                let (discharge, today) = if ongoing { (None, end) } else { (Some(end), end + Duration::days(5)) };
                let result = engine()
                    .audit(&AuditInput::new(document(admission, discharge), "p.pdf"), today)
                    .unwrap();

                let expected = if ongoing {
                    result.hospitalization_days
                } else {
                    result.hospitalization_days + 1
                };
                prop_assert_eq!(result.timeline.len() as i64, expected);
                prop_assert_eq!(result.timeline.first().map(|d| d.date), Some(admission));
                prop_assert_eq!(result.timeline.last().map(|d| d.date), Some(end));
                prop_assert_eq!(result.window.discharge.is_none(), ongoing);
            }

            /// Same text and date, same serialized result.
            #[test]
            fn audit_is_idempotent(start in 0i64..3000, length in 0i64..15) {
                let admission = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap() + Duration::days(start);
                let discharge = admission + Duration::days(length);
                let input = AuditInput::new(document(admission, Some(discharge)), "p.pdf");
                let today = discharge + Duration::days(1);
                let a = serde_json::to_string(&engine().audit(&input, today).unwrap()).unwrap();
                let b = serde_json::to_string(&engine().audit(&input, today).unwrap()).unwrap();
                prop_assert_eq!(a, b);
            }
        }
    }
}
