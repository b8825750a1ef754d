use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{CareLevel, CriterionTier};

/// One severity criterion evaluated against a day's note block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub tier: CriterionTier,
    pub name: String,
    pub present: bool,
    /// Matched text when present.
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareLevelClassification {
    pub date: NaiveDate,
    pub level: CareLevel,
    pub major_criteria: Vec<Criterion>,
    pub minor_criteria: Vec<Criterion>,
    pub justification: String,
}

impl CareLevelClassification {
    pub fn present_major(&self) -> impl Iterator<Item = &Criterion> {
        self.major_criteria.iter().filter(|c| c.present)
    }

    pub fn present_minor(&self) -> impl Iterator<Item = &Criterion> {
        self.minor_criteria.iter().filter(|c| c.present)
    }
}

/// Per-day classifications plus day counts per level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CareLevelSummary {
    pub days: Vec<CareLevelClassification>,
    pub intensive_days: usize,
    pub intermediate_days: usize,
    pub general_days: usize,
}

impl CareLevelSummary {
    pub fn from_days(days: Vec<CareLevelClassification>) -> Self {
        let count = |level: CareLevel| days.iter().filter(|d| d.level == level).count();
        Self {
            intensive_days: count(CareLevel::Intensive),
            intermediate_days: count(CareLevel::Intermediate),
            general_days: count(CareLevel::General),
            days,
        }
    }
}
