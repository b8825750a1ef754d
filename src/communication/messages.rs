use crate::models::enums::{Sector, Severity, Urgency};
use crate::models::{Finding, PatientContext};

/// Closing instruction shared by every message.
pub const CLOSING_ACTION: &str =
    "Completar correcciones antes del envío a la Obra Social para evitar débitos.";

/// Builders for the text addressed to each sector.
/// Plain text only: bodies are relayed by whatever channel the sink uses.
pub struct MessageTemplates;

impl MessageTemplates {
    /// Responsible party from recovered names, or the role-generic label.
    pub fn responsible(names: &[String], fallback: &str) -> String {
        if names.is_empty() {
            fallback.to_string()
        } else {
            names
                .iter()
                .map(|n| format!("Dr/a {}", n))
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    /// One numbered observation line.
    pub fn finding_line(index: usize, finding: &Finding) -> String {
        let tag = match finding.severity {
            Severity::Critical => "CRÍTICO",
            Severity::Warning => "ADVERTENCIA",
        };
        format!("{}. [{}] {}", index, tag, finding.message)
    }

    /// Full message body.
    #[allow(clippy::too_many_arguments)]
    pub fn body(
        sector: Sector,
        responsible: &str,
        urgency: Urgency,
        reason: &str,
        action: &str,
        patient: &PatientContext,
        filename: &str,
        findings: &[Finding],
    ) -> String {
        let mut lines = vec![
            "NOTIFICACIÓN DE AUDITORÍA DE HISTORIA CLÍNICA".to_string(),
            String::new(),
            format!("Sector: {}", sector.label()),
            format!("Responsable: {}", responsible),
            format!("Urgencia: {}", urgency.label()),
            format!("Motivo: {}", reason),
            String::new(),
            format!("Paciente: {}", patient.display_name()),
            format!("DNI: {}", patient.document_id.as_deref().unwrap_or("No informado")),
            format!("Obra Social: {}", patient.payer.as_deref().unwrap_or("No informada")),
            format!("Archivo: {}", filename),
            String::new(),
            "Observaciones:".to_string(),
        ];
        lines.extend(
            findings
                .iter()
                .enumerate()
                .map(|(i, f)| Self::finding_line(i + 1, f)),
        );
        lines.push(String::new());
        lines.push(format!("Acción requerida: {}", action));
        lines.push(CLOSING_ACTION.to_string());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::FindingCategory;

    #[test]
    fn responsible_falls_back_to_role() {
        assert_eq!(MessageTemplates::responsible(&[], "Equipo de Residentes"), "Equipo de Residentes");
        let names = vec!["PEREZ JUAN".to_string(), "GOMEZ ANA".to_string()];
        assert_eq!(
            MessageTemplates::responsible(&names, "x"),
            "Dr/a PEREZ JUAN, Dr/a GOMEZ ANA"
        );
    }

    #[test]
    fn body_lists_patient_and_numbered_findings() {
        let patient = PatientContext {
            name: Some("GARCIA MARIA".into()),
            document_id: Some("30123456".into()),
            ..Default::default()
        };
        let findings = vec![
            Finding::critical(FindingCategory::MissingDailyNote, "Falta evolución del 03/03/2024", "Evolución"),
            Finding::warning(FindingCategory::DischargeDayNote, "Día de alta sin evolución", "Evolución"),
        ];
        let body = MessageTemplates::body(
            Sector::Residents,
            "Equipo de Residentes",
            Urgency::Critical,
            "Faltan evoluciones médicas diarias",
            "Completar las evoluciones faltantes.",
            &patient,
            "hc_garcia.pdf",
            &findings,
        );
        assert!(body.contains("Sector: Residentes"));
        assert!(body.contains("Urgencia: CRÍTICA"));
        assert!(body.contains("Paciente: GARCIA MARIA"));
        assert!(body.contains("DNI: 30123456"));
        assert!(body.contains("Obra Social: No informada"));
        assert!(body.contains("1. [CRÍTICO] Falta evolución del 03/03/2024"));
        assert!(body.contains("2. [ADVERTENCIA] Día de alta sin evolución"));
        assert!(body.ends_with(CLOSING_ACTION));
    }
}
