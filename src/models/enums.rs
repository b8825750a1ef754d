use serde::{Deserialize, Serialize};

use crate::error::AuditError;

macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = AuditError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(AuditError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Severity {
    Critical => "critical",
    Warning => "warning",
});

// Declaration order is the order communications are emitted in.
str_enum!(FindingCategory {
    MissingAdmissionField => "missing_admission_field",
    StayWindow => "stay_window",
    MissingDailyNote => "missing_daily_note",
    DischargeDayNote => "discharge_day_note",
    MissingDischargeRecord => "missing_discharge_record",
    MissingEpicrisis => "missing_epicrisis",
    SurgicalRecord => "surgical_record",
    TeamRoleCollision => "team_role_collision",
    EnergyDeviceAuthorization => "energy_device_authorization",
    SurgicalDataWithoutRecord => "surgical_data_without_record",
    ImagingWithoutReport => "imaging_without_report",
    LabWithoutReport => "lab_without_report",
    ProcedureWithoutReport => "procedure_without_report",
    StudyWithoutDate => "study_without_date",
    Interconsultation => "interconsultation",
    ExcludedPractice => "excluded_practice",
    EndoscopyRecord => "endoscopy_record",
    AmbulatoryPractice => "ambulatory_practice",
});

str_enum!(Sector {
    Admission => "admission",
    Residents => "residents",
    Surgery => "surgery",
    Imaging => "imaging",
    Laboratory => "laboratory",
    Procedures => "procedures",
    Consultations => "consultations",
    Billing => "billing",
    MedicalRecords => "medical_records",
});

impl Sector {
    /// Name of the hospital sector as staff know it.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Admission => "Admisión",
            Self::Residents => "Residentes",
            Self::Surgery => "Cirugía",
            Self::Imaging => "Diagnóstico por Imágenes",
            Self::Laboratory => "Laboratorio",
            Self::Procedures => "Endoscopía / Procedimientos",
            Self::Consultations => "Servicios Interconsultores",
            Self::Billing => "Facturación y Autorizaciones",
            Self::MedicalRecords => "Coordinación de Historias Clínicas",
        }
    }
}

str_enum!(Urgency {
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

impl Urgency {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Medium => "MEDIA",
            Self::High => "ALTA",
            Self::Critical => "CRÍTICA",
        }
    }
}

str_enum!(CareLevel {
    Intensive => "intensive",
    Intermediate => "intermediate",
    General => "general",
});

impl CareLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Intensive => "cuidados intensivos",
            Self::Intermediate => "cuidados intermedios",
            Self::General => "internación general",
        }
    }
}

str_enum!(CriterionTier {
    Major => "major",
    Minor => "minor",
});

str_enum!(TeamRole {
    Surgeon => "surgeon",
    Anesthetist => "anesthetist",
    Endoscopist => "endoscopist",
    InstrumentTech => "instrument_tech",
    FirstAssistant => "first_assistant",
    ResidentAssistant => "resident_assistant",
    Assistant => "assistant",
});

impl TeamRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Surgeon => "cirujano",
            Self::Anesthetist => "anestesista",
            Self::Endoscopist => "endoscopista",
            Self::InstrumentTech => "instrumentador",
            Self::FirstAssistant => "primer ayudante",
            Self::ResidentAssistant => "ayudante residente",
            Self::Assistant => "ayudante",
        }
    }

    /// Roles that must be held by distinct people within one episode.
    pub fn is_exclusive(&self) -> bool {
        matches!(
            self,
            Self::Surgeon | Self::FirstAssistant | Self::InstrumentTech | Self::Anesthetist
        )
    }
}

str_enum!(EnergyDeviceUse {
    Used => "used",
    NotUsed => "not_used",
    Unknown => "unknown",
});

str_enum!(StudyCategory {
    Imaging => "imaging",
    Lab => "lab",
    Procedure => "procedure",
});

impl StudyCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Imaging => "Imágenes",
            Self::Lab => "Laboratorio",
            Self::Procedure => "Procedimiento",
        }
    }
}

str_enum!(PracticeCategory {
    Puncture => "puncture",
    Catheter => "catheter",
    SpecialProcedure => "special_procedure",
});

str_enum!(DocumentLocation {
    EvolutionNote => "evolution_note",
    AmbulatorySheet => "ambulatory_sheet",
    Interconsultation => "interconsultation",
});

impl DocumentLocation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EvolutionNote => "evolución",
            Self::AmbulatorySheet => "foja ambulatoria",
            Self::Interconsultation => "interconsulta",
        }
    }
}

str_enum!(ClinicianRole {
    Surgeon => "surgeon",
    Resident => "resident",
    Other => "other",
});

str_enum!(Sex {
    Female => "female",
    Male => "male",
});

impl Sex {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Female => "Femenino",
            Self::Male => "Masculino",
        }
    }
}

str_enum!(AuditStatus {
    PendingCorrection => "pending_correction",
    Approved => "approved",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn from_str_accepts_canonical_names() {
        assert_eq!(Severity::from_str("critical").unwrap(), Severity::Critical);
        assert_eq!(TeamRole::from_str("instrument_tech").unwrap(), TeamRole::InstrumentTech);
        assert_eq!(CareLevel::from_str("general").unwrap(), CareLevel::General);
    }

    #[test]
    fn from_str_rejects_unknown_value() {
        let err = Urgency::from_str("urgent").unwrap_err();
        assert!(err.to_string().contains("Urgency"), "got: {err}");
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&FindingCategory::MissingDailyNote).unwrap();
        assert_eq!(json, "\"missing_daily_note\"");
        let back: EnergyDeviceUse = serde_json::from_str("\"not_used\"").unwrap();
        assert_eq!(back, EnergyDeviceUse::NotUsed);
    }

    #[test]
    fn exclusive_roles() {
        assert!(TeamRole::Surgeon.is_exclusive());
        assert!(TeamRole::Anesthetist.is_exclusive());
        assert!(!TeamRole::Assistant.is_exclusive());
        assert!(!TeamRole::Endoscopist.is_exclusive());
    }

    #[test]
    fn category_order_starts_with_admission() {
        assert!(FindingCategory::MissingAdmissionField < FindingCategory::MissingDailyNote);
        assert!(FindingCategory::MissingDailyNote < FindingCategory::AmbulatoryPractice);
    }
}
