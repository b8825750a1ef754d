use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::care::CareLevelSummary;
use super::enums::AuditStatus;
use super::events::{
    AmbulatoryPractice, Clinician, EndoscopicProcedure, ExcludedPractice, Interconsultation,
};
use super::finding::{Communication, Finding};
use super::patient::PatientContext;
use super::stay::{DayRecord, StayWindow};
use super::study::{AncillaryStudy, StudyCounts};
use super::surgery::SurgicalEpisode;

/// One document to audit: extracted text plus the name it was uploaded as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditInput {
    pub text: String,
    pub filename: String,
}

impl AuditInput {
    pub fn new(text: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filename: filename.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingCounts {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
}

impl FindingCounts {
    pub fn tally(findings: &[Finding]) -> Self {
        let critical = findings.iter().filter(|f| f.is_critical()).count();
        Self {
            total: findings.len(),
            critical,
            warning: findings.len() - critical,
        }
    }
}

/// Complete outcome of auditing one hospitalization record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub filename: String,
    /// Stable identifier derived from the document content.
    pub document_id: Uuid,
    /// Base64 SHA-256 of the input text.
    pub content_hash: String,
    pub window: StayWindow,
    pub effective_end_date: NaiveDate,
    pub patient: PatientContext,
    pub hospitalization_days: i64,
    pub timeline: Vec<DayRecord>,
    pub surgical_episodes: Vec<SurgicalEpisode>,
    pub studies: Vec<AncillaryStudy>,
    /// Studies the patient brought from outside; not billable.
    pub external_studies: Vec<AncillaryStudy>,
    pub study_counts: StudyCounts,
    pub care_levels: Option<CareLevelSummary>,
    pub interconsultations: Vec<Interconsultation>,
    pub excluded_practices: Vec<ExcludedPractice>,
    pub endoscopies: Vec<EndoscopicProcedure>,
    pub ambulatory_practices: Vec<AmbulatoryPractice>,
    pub clinicians: Vec<Clinician>,
    pub findings: Vec<Finding>,
    pub finding_counts: FindingCounts,
    pub communications: Vec<Communication>,
    pub status: AuditStatus,
}

impl AuditResult {
    pub fn is_approved(&self) -> bool {
        self.status == AuditStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::FindingCategory;

    #[test]
    fn tally_splits_by_severity() {
        let findings = vec![
            Finding::critical(FindingCategory::MissingDailyNote, "a", "x"),
            Finding::warning(FindingCategory::MissingEpicrisis, "b", "y"),
            Finding::critical(FindingCategory::MissingDischargeRecord, "c", "z"),
        ];
        let counts = FindingCounts::tally(&findings);
        assert_eq!(counts, FindingCounts { total: 3, critical: 2, warning: 1 });
    }

    #[test]
    fn tally_empty() {
        assert_eq!(FindingCounts::tally(&[]), FindingCounts::default());
    }
}
