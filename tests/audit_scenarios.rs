//! End-to-end audits over realistic hospitalization records.

use chrono::NaiveDate;

use hospaudit_lib::config::AuditConfig;
use hospaudit_lib::models::enums::{AuditStatus, CareLevel, FindingCategory, Sector, Urgency};
use hospaudit_lib::models::{AuditInput, AuditResult};
use hospaudit_lib::pipeline::AuditEngine;

const HEADER: &str = "HISTORIA CLÍNICA\n\
    Paciente: PEREZ, JUAN CARLOS DNI: 28.456.789\n\
    Fecha de nacimiento: 12/05/1975 Sexo: M\n\
    Obra Social: OSDE 310\n\
    Habitación: 214\n";

const SHEET: &str = "FOJA QUIRÚRGICA\n\
    Fecha: 02/03/2024\n\
    Cirujano: PEREZ JUAN\n\
    Primer ayudante: LOPEZ MARIA\n\
    Instrumentador: DIAZ PABLO\n\
    Anestesista: GOMEZ ANA\n\
    Hora de comienzo: 10:30\n\
    Hora de finalización: 12:15\n\
    Bisturí armónico: NO\n\
    Procedimiento: colecistectomía laparoscópica";

fn date(day: u32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn audit(text: &str, today: NaiveDate) -> AuditResult {
    AuditEngine::new(AuditConfig::default())
        .unwrap()
        .audit(&AuditInput::new(text, "historia.pdf"), today)
        .unwrap()
}

fn filler() -> String {
    "Paciente en sala, sin novedades relevantes. ".repeat(20)
}

#[test]
fn ongoing_stay_reaches_today() {
    let text = format!(
        "{HEADER}Fecha Ingreso: 01/03/2024 08:00\n\
         Visita 02/03/2024\n\
         Evolución médica diaria: paciente estable, tolera dieta."
    );
    let result = audit(&text, date(4, 3));

    assert!(result.window.ongoing);
    assert!(result.window.discharge.is_none());
    assert_eq!(result.hospitalization_days, 4);
    assert_eq!(result.timeline.len(), 4);
    assert_eq!(result.timeline.last().map(|d| d.date), Some(date(4, 3)));
    assert!(result.timeline[1].has_evolution_note);
    assert!(!result.timeline[2].has_evolution_note);

    let gaps: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.category == FindingCategory::MissingDailyNote)
        .collect();
    assert!(gaps.iter().any(|f| f.date == Some(date(3, 3)) && f.is_critical()));
    assert!(gaps.iter().all(|f| f.date != Some(date(2, 3))));
    assert!(gaps
        .iter()
        .filter(|f| f.date == Some(date(4, 3)))
        .all(|f| !f.is_critical()));

    // Ongoing stays have no discharge yet.
    assert!(result
        .findings
        .iter()
        .all(|f| f.category != FindingCategory::MissingDischargeRecord));
    assert_eq!(result.status, AuditStatus::PendingCorrection);
}

#[test]
fn repeated_surgical_sheet_is_one_episode() {
    let text = format!(
        "{HEADER}Fecha Ingreso: 01/03/2024 08:00\nFecha Egreso: 03/03/2024 10:00\n\
         {SHEET}\n{}\n{SHEET}\nAlta médica.",
        filler()
    );
    let result = audit(&text, date(1, 4));

    assert_eq!(result.surgical_episodes.len(), 1);
    let episode = &result.surgical_episodes[0];
    assert_eq!(episode.date, Some(date(2, 3)));
    assert_eq!(episode.team.len(), 4);
    assert!(result.timeline.iter().any(|d| d.date == date(2, 3) && d.has_surgical_episode));
}

#[test]
fn energy_device_reaches_surgery_as_critical() {
    let sheet = SHEET.replace("Bisturí armónico: NO", "Bisturí armónico: SI");
    let text = format!(
        "{HEADER}Fecha Ingreso: 01/03/2024 08:00\nFecha Egreso: 03/03/2024 10:00\n{sheet}\nAlta médica."
    );
    let result = audit(&text, date(1, 4));

    let communication = result
        .communications
        .iter()
        .find(|c| {
            c.findings
                .iter()
                .any(|f| f.category == FindingCategory::EnergyDeviceAuthorization)
        })
        .expect("energy device communication");
    assert_eq!(communication.sector, Sector::Surgery);
    assert_eq!(communication.urgency, Urgency::Critical);
    assert!(communication.responsible.contains("PEREZ JUAN"));
    assert!(communication.body.contains("Archivo: historia.pdf"));
}

#[test]
fn invasive_ventilation_in_unit_is_intensive() {
    let text = "Paciente: GOMEZ ANA\n\
        Habitación: UTI cama 4\n\
        Fecha Ingreso: 01/03/2024 08:00\n\
        Fecha Egreso: 03/03/2024 10:00\n\
        Visita 02/03/2024\n\
        Evolución médica diaria: paciente en ventilación mecánica invasiva, sedoanalgesia.\n\
        Visita 03/03/2024\n\
        Evolución médica diaria: extubada, lúcida, pase a sala. Alta médica.";
    let result = audit(text, date(1, 4));

    assert!(result.patient.in_critical_care_unit);
    let care = result.care_levels.expect("care levels for unit patient");
    let day = care
        .days
        .iter()
        .find(|d| d.date == date(2, 3))
        .expect("classification for 02/03");
    assert_eq!(day.level, CareLevel::Intensive);
    assert!(day.justification.contains("ventilación mecánica invasiva"));
    assert!(care.intensive_days >= 1);
}

#[test]
fn patient_supplied_studies_are_not_counted() {
    let text = format!(
        "{HEADER}Fecha Ingreso: 01/03/2024 08:00\nFecha Egreso: 02/03/2024 10:00\n\
         Estudios entregados por el paciente:\n\
         TAC de cerebro 01/01/2024 informe: normal sin lesiones\n\
         Evolución médica diaria\n\
         RX de tórax 02/03/2024 informe: sin consolidación\n\
         Alta médica."
    );
    let result = audit(&text, date(1, 4));

    assert_eq!(result.study_counts.imaging, 1);
    assert_eq!(result.external_studies.len(), 1);
    assert_eq!(result.external_studies[0].kind, "TAC de cerebro");
    assert!(result.studies.iter().all(|s| s.kind != "TAC de cerebro"));
}

#[test]
fn every_finding_is_addressed_once() {
    let text = format!(
        "Fecha Ingreso: 01/03/2024 08:00\nFecha Egreso: 05/03/2024 10:00\n\
         Hemograma 02/03/2024\n\
         Se realiza punción lumbar 03/03/2024\n\
         Se solicita interconsulta a cardiología 03/03/2024\n{}",
        filler()
    );
    let result = audit(&text, date(1, 4));

    let addressed: usize = result.communications.iter().map(|c| c.findings.len()).sum();
    assert_eq!(addressed, result.findings.len());
    assert_eq!(result.finding_counts.total, result.findings.len());
    assert_eq!(
        result.finding_counts.critical + result.finding_counts.warning,
        result.finding_counts.total
    );

    let sectors: Vec<Sector> = result.communications.iter().map(|c| c.sector).collect();
    assert!(sectors.contains(&Sector::Admission));
    assert!(sectors.contains(&Sector::Residents));
    assert!(sectors.contains(&Sector::Billing));
    assert!(sectors.contains(&Sector::Consultations));
}

#[test]
fn result_serializes_with_stable_enum_names() {
    let text = format!("{HEADER}Fecha Ingreso: 01/03/2024 08:00\nFecha Egreso: 01/03/2024 18:00\nAlta médica. Epicrisis adjunta.");
    let result = audit(&text, date(1, 4));
    assert_eq!(result.hospitalization_days, 0);
    assert_eq!(result.timeline.len(), 1);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "approved");
    assert_eq!(json["filename"], "historia.pdf");
    assert_eq!(json["timeline"].as_array().map(Vec::len), Some(1));
}
