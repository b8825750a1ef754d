use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{FindingCategory, Sector, Severity, Urgency};

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

/// A documentation gap or inconsistency. Findings are data: they never abort
/// an audit and are never dropped between detection and synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: FindingCategory,
    pub message: String,
    /// Entity the finding refers to ("Paciente", "Foja quirúrgica #2", ...).
    pub source_entity: String,
    pub date: Option<NaiveDate>,
}

impl Finding {
    pub fn critical(
        category: FindingCategory,
        message: impl Into<String>,
        source_entity: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Critical,
            category,
            message: message.into(),
            source_entity: source_entity.into(),
            date: None,
        }
    }

    pub fn warning(
        category: FindingCategory,
        message: impl Into<String>,
        source_entity: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            message: message.into(),
            source_entity: source_entity.into(),
            date: None,
        }
    }

    pub fn with_date(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

// ---------------------------------------------------------------------------
// Communication
// ---------------------------------------------------------------------------

/// Findings addressed to the sector responsible for correcting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Communication {
    pub sector: Sector,
    pub responsible: String,
    pub reason: String,
    pub urgency: Urgency,
    pub findings: Vec<Finding>,
    /// Ready-to-send message text.
    pub body: String,
}
