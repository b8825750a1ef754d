use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::{ClinicianRole, DocumentLocation, PracticeCategory};
use super::finding::Finding;

// ---------------------------------------------------------------------------
// Interconsultation
// ---------------------------------------------------------------------------

/// Specialist consultation requested during the stay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interconsultation {
    pub specialty: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub consultant: Option<String>,
    pub credential: Option<String>,
    pub reason: Option<String>,
    pub diagnosis: Option<String>,
    /// 1-based line of the request in the normalized text.
    pub line: usize,
    pub findings: Vec<Finding>,
}

// ---------------------------------------------------------------------------
// ExcludedPractice
// ---------------------------------------------------------------------------

/// Practice billed outside the per-diem module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedPractice {
    pub category: PracticeCategory,
    pub name: String,
    /// Nomenclature code, when the practice has one.
    pub code: Option<String>,
    pub requires_authorization: bool,
    pub separate_billing: bool,
    pub location: DocumentLocation,
    pub date: Option<NaiveDate>,
    pub occurrences: usize,
    pub matched_text: String,
}

// ---------------------------------------------------------------------------
// EndoscopicProcedure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndoscopicProcedure {
    pub procedure: String,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub endoscopist: Option<String>,
    pub credential: Option<String>,
    pub anesthetist: Option<String>,
    /// Reported findings, truncated.
    pub report: Option<String>,
    pub biopsy_taken: bool,
    pub findings: Vec<Finding>,
}

// ---------------------------------------------------------------------------
// AmbulatoryPractice
// ---------------------------------------------------------------------------

/// Outpatient-type practice documented while the patient was admitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbulatoryPractice {
    pub kind: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub requires_authorization: bool,
}

// ---------------------------------------------------------------------------
// Clinician
// ---------------------------------------------------------------------------

/// Credentialed professional named in the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinician {
    pub name: String,
    pub credential: String,
    pub role: ClinicianRole,
}
