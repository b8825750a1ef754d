use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::StudyCategory;

/// Imaging, laboratory or procedure mention recovered from one line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AncillaryStudy {
    pub category: StudyCategory,
    pub kind: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    /// Performing service, when stated.
    pub location: Option<String>,
    pub result: Option<String>,
    pub report_present: bool,
    pub page: Option<u32>,
}

impl AncillaryStudy {
    /// Identity used for deduplication: category, upper-cased kind and date.
    pub fn dedup_key(&self) -> (StudyCategory, String, Option<NaiveDate>) {
        (self.category, self.kind.to_uppercase(), self.date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyCounts {
    pub total: usize,
    pub imaging: usize,
    pub lab: usize,
    pub procedure: usize,
    /// Distinct pages carrying a kinesiology session.
    pub kinesiology_sessions: usize,
}
