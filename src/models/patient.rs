use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::Sex;

/// Demographic and placement context recovered from the admission header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientContext {
    pub name: Option<String>,
    /// National identity document (DNI).
    pub document_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<Sex>,
    /// Health insurer (obra social / prepaga).
    pub payer: Option<String>,
    pub ward: Option<String>,
    pub in_critical_care_unit: bool,
}

impl PatientContext {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("No identificado")
    }
}
