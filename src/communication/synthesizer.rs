//! Finding aggregation into addressed communications
//!
//! Findings are bucketed by category; each non-empty bucket becomes one
//! message for the sector that owns that category. Buckets are emitted in
//! category order so the output is stable.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::enums::{ClinicianRole, FindingCategory, Sector, TeamRole, Urgency};
use crate::models::{
    normalize_person, Clinician, Communication, EndoscopicProcedure, Finding, Interconsultation,
    PatientContext, SurgicalEpisode,
};

use super::messages::MessageTemplates;

/// Whose names can stand in for a generic responsible label.
#[derive(Debug, Clone, Copy)]
enum Party {
    Surgeons,
    Residents,
    Endoscopists,
    Consultants,
    Nobody,
}

/// Where a category's findings go and how they are framed.
struct Route {
    sector: Sector,
    reason: &'static str,
    urgency: Urgency,
    party: Party,
    fallback: &'static str,
    action: &'static str,
}

fn route(category: FindingCategory) -> Route {
    use FindingCategory as C;
    const fn r(
        sector: Sector,
        reason: &'static str,
        urgency: Urgency,
        party: Party,
        fallback: &'static str,
        action: &'static str,
    ) -> Route {
        Route {
            sector,
            reason,
            urgency,
            party,
            fallback,
            action,
        }
    }
    match category {
        C::MissingAdmissionField => r(
            Sector::Admission,
            "Datos de admisión incompletos",
            Urgency::High,
            Party::Nobody,
            "Personal de Admisión",
            "Completar los datos filiatorios y de cobertura del paciente.",
        ),
        C::StayWindow => r(
            Sector::Admission,
            "Fechas de internación inconsistentes",
            Urgency::High,
            Party::Nobody,
            "Personal de Admisión",
            "Verificar las fechas de ingreso y egreso registradas.",
        ),
        C::MissingDailyNote => r(
            Sector::Residents,
            "Faltan evoluciones médicas diarias",
            Urgency::Critical,
            Party::Residents,
            "Equipo de Residentes",
            "Completar las evoluciones de los días indicados.",
        ),
        C::DischargeDayNote => r(
            Sector::Residents,
            "Advertencias sobre evoluciones médicas",
            Urgency::Medium,
            Party::Residents,
            "Equipo de Residentes",
            "Revisar la evolución del día de egreso.",
        ),
        C::MissingDischargeRecord => r(
            Sector::Surgery,
            "Falta registro de alta médica",
            Urgency::Critical,
            Party::Surgeons,
            "Cirujano Responsable",
            "Registrar el alta médica en la historia clínica.",
        ),
        C::MissingEpicrisis => r(
            Sector::Surgery,
            "Epicrisis no detectada",
            Urgency::Medium,
            Party::Surgeons,
            "Cirujano Responsable",
            "Verificar y adjuntar la epicrisis.",
        ),
        C::SurgicalRecord => r(
            Sector::Surgery,
            "Problemas en foja quirúrgica",
            Urgency::High,
            Party::Surgeons,
            "Cirujano Responsable",
            "Completar los datos faltantes de la foja quirúrgica.",
        ),
        C::TeamRoleCollision => r(
            Sector::Surgery,
            "Equipo quirúrgico inconsistente",
            Urgency::High,
            Party::Surgeons,
            "Cirujano Responsable",
            "Corregir la asignación de roles del equipo quirúrgico.",
        ),
        C::EnergyDeviceAuthorization => r(
            Sector::Surgery,
            "Uso de bisturí armónico: requiere autorización especial",
            Urgency::Critical,
            Party::Surgeons,
            "Cirujano Responsable",
            "Verificar la autorización de la Obra Social previa a la facturación.",
        ),
        C::SurgicalDataWithoutRecord => r(
            Sector::Surgery,
            "Datos quirúrgicos sin foja quirúrgica",
            Urgency::High,
            Party::Surgeons,
            "Cirujano Responsable",
            "Adjuntar la foja quirúrgica correspondiente.",
        ),
        C::ImagingWithoutReport => r(
            Sector::Imaging,
            "Estudios de imágenes sin informe",
            Urgency::High,
            Party::Nobody,
            "Jefe/a de Servicio",
            "Adjuntar los informes de imágenes.",
        ),
        C::LabWithoutReport => r(
            Sector::Laboratory,
            "Estudios de laboratorio sin resultado",
            Urgency::Medium,
            Party::Nobody,
            "Jefe/a de Laboratorio",
            "Adjuntar el reporte de resultados.",
        ),
        C::ProcedureWithoutReport => r(
            Sector::Procedures,
            "Procedimientos sin informe",
            Urgency::High,
            Party::Nobody,
            "Responsable de Procedimientos",
            "Cargar informes y conclusiones de los procedimientos.",
        ),
        C::StudyWithoutDate => r(
            Sector::MedicalRecords,
            "Normalización de estudios",
            Urgency::Medium,
            Party::Nobody,
            "Equipo de Coordinación",
            "Registrar la fecha de realización de cada estudio.",
        ),
        C::Interconsultation => r(
            Sector::Consultations,
            "Interconsultas incompletas",
            Urgency::High,
            Party::Consultants,
            "Médicos Interconsultores",
            "Completar consultor, matrícula y motivo de cada interconsulta.",
        ),
        C::ExcludedPractice => r(
            Sector::Billing,
            "Prácticas excluidas del módulo de internación",
            Urgency::High,
            Party::Nobody,
            "Responsable de Autorizaciones",
            "Gestionar autorización previa y facturación por separado.",
        ),
        C::EndoscopyRecord => r(
            Sector::Procedures,
            "Fojas de endoscopía incompletas",
            Urgency::High,
            Party::Endoscopists,
            "Responsable de Procedimientos",
            "Completar endoscopista, matrícula, fecha y horarios del procedimiento.",
        ),
        C::AmbulatoryPractice => r(
            Sector::Billing,
            "Prácticas ambulatorias durante la internación",
            Urgency::Medium,
            Party::Nobody,
            "Responsable de Autorizaciones",
            "Verificar la autorización de las prácticas realizadas.",
        ),
    }
}

/// Named individuals recovered from the document, by party.
#[derive(Debug, Clone, Default)]
pub struct ResponsibleParties {
    pub surgeons: Vec<String>,
    pub residents: Vec<String>,
    pub endoscopists: Vec<String>,
    pub consultants: Vec<String>,
}

impl ResponsibleParties {
    /// Collect names in order of appearance, each person once.
    pub fn collect(
        episodes: &[SurgicalEpisode],
        clinicians: &[Clinician],
        endoscopies: &[EndoscopicProcedure],
        interconsultations: &[Interconsultation],
    ) -> Self {
        let surgeons = episodes
            .iter()
            .flat_map(|e| e.members(TeamRole::Surgeon))
            .map(|m| m.name.clone())
            .chain(
                clinicians
                    .iter()
                    .filter(|c| c.role == ClinicianRole::Surgeon)
                    .map(|c| c.name.clone()),
            );
        let residents = clinicians
            .iter()
            .filter(|c| c.role == ClinicianRole::Resident)
            .map(|c| c.name.clone());
        let endoscopists = endoscopies.iter().filter_map(|e| e.endoscopist.clone());
        let consultants = interconsultations.iter().filter_map(|i| i.consultant.clone());

        Self {
            surgeons: distinct(surgeons),
            residents: distinct(residents),
            endoscopists: distinct(endoscopists),
            consultants: distinct(consultants),
        }
    }

    fn names(&self, party: Party) -> &[String] {
        match party {
            Party::Surgeons => &self.surgeons,
            Party::Residents => &self.residents,
            Party::Endoscopists => &self.endoscopists,
            Party::Consultants => &self.consultants,
            Party::Nobody => &[],
        }
    }
}

fn distinct(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names.filter(|n| seen.insert(normalize_person(n))).collect()
}

/// One communication per non-empty finding category, in category order.
pub fn synthesize_communications(
    findings: &[Finding],
    parties: &ResponsibleParties,
    patient: &PatientContext,
    filename: &str,
) -> Vec<Communication> {
    let mut buckets: BTreeMap<FindingCategory, Vec<Finding>> = BTreeMap::new();
    for finding in findings {
        buckets.entry(finding.category).or_default().push(finding.clone());
    }

    let communications: Vec<Communication> = buckets
        .into_iter()
        .map(|(category, findings)| {
            let route = route(category);
            let responsible = MessageTemplates::responsible(parties.names(route.party), route.fallback);
            let body = MessageTemplates::body(
                route.sector,
                &responsible,
                route.urgency,
                route.reason,
                route.action,
                patient,
                filename,
                &findings,
            );
            Communication {
                sector: route.sector,
                responsible,
                reason: route.reason.to_string(),
                urgency: route.urgency,
                findings,
                body,
            }
        })
        .collect();

    tracing::debug!(count = communications.len(), "Communications synthesized");
    communications
}
