use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AuditError;

/// Application-level constants
pub const APP_NAME: &str = "HospAudit";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "hospaudit=info,hospaudit_lib=info"
}

/// Per-user configuration file: `<config dir>/hospaudit/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hospaudit").join("config.json"))
}

// ---------------------------------------------------------------------------
// Scan windows
// ---------------------------------------------------------------------------

/// Context windows, in characters unless the name says lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanWindows {
    pub leading_lines: usize,
    pub unit_context_before: usize,
    pub unit_context_after: usize,
    pub visit_note_after: usize,
    pub date_note_before: usize,
    pub date_note_after: usize,
    pub label_date_before: usize,
    pub label_date_after: usize,
    pub surgery_anchor_gap: usize,
    pub surgery_lookback: usize,
    pub surgery_validation: usize,
    pub surgery_extent: usize,
    pub surgery_short_extent: usize,
    pub care_block: usize,
    pub interconsult_block_lines: usize,
    pub practice_context: usize,
    pub endoscopy_before: usize,
    pub endoscopy_after: usize,
    pub discharge_tail_lines: usize,
    pub epicrisis_tail_lines: usize,
}

impl Default for ScanWindows {
    fn default() -> Self {
        Self {
            leading_lines: 120,
            unit_context_before: 100,
            unit_context_after: 200,
            visit_note_after: 2000,
            date_note_before: 1000,
            date_note_after: 2000,
            label_date_before: 1500,
            label_date_after: 500,
            surgery_anchor_gap: 200,
            surgery_lookback: 3000,
            surgery_validation: 4000,
            surgery_extent: 5000,
            surgery_short_extent: 3000,
            care_block: 2000,
            interconsult_block_lines: 50,
            practice_context: 500,
            endoscopy_before: 200,
            endoscopy_after: 2000,
            discharge_tail_lines: 500,
            epicrisis_tail_lines: 400,
        }
    }
}

// ---------------------------------------------------------------------------
// Critical-care criteria
// ---------------------------------------------------------------------------

/// A named severity criterion and the patterns that evidence it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionSpec {
    pub name: String,
    pub patterns: Vec<String>,
}

fn criterion(name: &str, patterns: &[&str]) -> CriterionSpec {
    CriterionSpec {
        name: name.to_string(),
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalCareConfig {
    pub major: Vec<CriterionSpec>,
    pub minor: Vec<CriterionSpec>,
    /// Minor criteria that alone make a day intensive.
    pub intensive_minor_threshold: usize,
    /// Minor criteria that make a day intermediate.
    pub intermediate_minor_threshold: usize,
}

impl Default for CriticalCareConfig {
    fn default() -> Self {
        Self {
            major: default_major_criteria(),
            minor: default_minor_criteria(),
            intensive_minor_threshold: 2,
            intermediate_minor_threshold: 1,
        }
    }
}

fn default_major_criteria() -> Vec<CriterionSpec> {
    vec![
        criterion(
            "ventilación mecánica invasiva",
            &[
                r"(?i)ventilaci[oó]n\s+mec[aá]nica\s+invasiva",
                r"\b(?:VMI|ARM|IOT)\b",
                r"(?i)\bintubad[oa]\b",
                r"(?i)intubaci[oó]n\s+orotraqueal",
                r"(?i)tubo\s+endotraqueal",
                r"(?i)asistencia\s+respiratoria\s+mec[aá]nica",
            ],
        ),
        criterion(
            "insuficiencia respiratoria grave",
            &[
                r"(?i)insuficiencia\s+respiratoria\s+(?:aguda\s+)?(?:grave|severa)",
                r"(?i)\bSDRA\b",
                r"(?i)distr[eé]s\s+respiratorio",
                r"(?i)pa/?fi\s*[<≤]\s*(?:200|150|100)",
            ],
        ),
        criterion(
            "asma o EPOC grave",
            &[
                r"(?i)(?:crisis\s+)?asm[aá]tic[ao]\s+(?:grave|severa)",
                r"(?i)status\s+asm[aá]tico",
                r"(?i)EPOC\s+reagudizad[oa]\s+(?:grave|severa)",
            ],
        ),
        criterion(
            "shock",
            &[
                r"(?i)\bshock\s+(?:s[eé]ptico|cardiog[eé]nico|hipovol[eé]mico|obstructivo|anafil[aá]ctico|distributivo)",
                r"(?i)choque\s+(?:s[eé]ptico|cardiog[eé]nico|hipovol[eé]mico|distributivo)",
                r"(?i)fallo\s+circulatorio",
                r"(?i)colapso\s+hemodin[aá]mico",
            ],
        ),
        criterion(
            "drogas vasoactivas",
            &[
                r"(?i)\b(?:nor)?adrenalina\b",
                r"(?i)\bnorepinefrina\b",
                r"(?i)\bdopamina\b",
                r"(?i)\bdobutamina\b",
                r"(?i)\bvasopresina\b",
                r"(?i)\bvasopresores?\b",
                r"(?i)\binotr[oó]picos?\b",
            ],
        ),
        criterion(
            "arritmias graves",
            &[
                r"(?i)fibrilaci[oó]n\s+ventricular",
                r"(?i)taquicardia\s+ventricular",
                r"(?i)bloqueo\s+(?:AV\s+)?completo",
                r"(?i)bloqueo\s+(?:AV\s+)?de\s+tercer\s+grado",
            ],
        ),
        criterion(
            "insuficiencia cardíaca aguda",
            &[
                r"(?i)edema\s+agudo\s+de\s+pulm[oó]n",
                r"(?i)insuficiencia\s+card[ií]aca\s+(?:aguda|descompensada)",
                r"(?i)s[ií]ndrome\s+coronario\s+agudo",
                r"(?i)infarto\s+agudo\s+de\s+miocardio",
            ],
        ),
        criterion(
            "deterioro grave de la conciencia",
            &[
                r"(?i)glasgow\s*[:=]?\s*(?:[3-8])(?:/15)?\b",
                r"(?i)glasgow\s*[<≤]\s*(?:8|9)\b",
                r"(?i)\bcoma\b",
            ],
        ),
        criterion(
            "status epiléptico",
            &[r"(?i)status\s+epil[eé]ptico", r"(?i)estado\s+de\s+mal\s+epil[eé]ptico"],
        ),
        criterion(
            "ACV grave",
            &[
                r"(?i)\bACV\s+(?:grave|extenso|hemorr[aá]gico)",
                r"(?i)hemorragia\s+(?:intracerebral|subaracnoidea)",
            ],
        ),
        criterion(
            "hipertensión intracraneal",
            &[r"(?i)hipertensi[oó]n\s+intracraneal", r"(?i)\bHTE?IC\b"],
        ),
        criterion(
            "diálisis de urgencia",
            &[
                r"(?i)di[aá]lisis\s+(?:de\s+)?urgencia",
                r"(?i)hemodi[aá]lisis",
                r"(?i)terapia\s+de\s+reemplazo\s+renal",
                r"\bTRR\b",
            ],
        ),
        criterion(
            "cetoacidosis diabética",
            &[r"(?i)cetoacidosis", r"\bCAD\b", r"(?i)coma\s+hiperosmolar"],
        ),
        criterion(
            "alteraciones electrolíticas graves",
            &[
                r"(?i)hiperkalemia\s+(?:grave|severa)",
                r"(?i)hiponatremia\s+(?:grave|severa)",
                r"(?i)hipercalcemia\s+(?:grave|severa)",
            ],
        ),
        criterion(
            "insuficiencia hepática",
            &[
                r"(?i)insuficiencia\s+hep[aá]tica\s+(?:aguda|fulminante)",
                r"(?i)encefalopat[ií]a\s+hep[aá]tica",
            ],
        ),
    ]
}

fn default_minor_criteria() -> Vec<CriterionSpec> {
    vec![
        criterion(
            "monitorización invasiva",
            &[
                r"(?i)cat[eé]ter\s+arterial",
                r"(?i)l[ií]nea\s+arterial",
                r"(?i)cat[eé]ter\s+venoso\s+central",
                r"\bCVC\b",
                r"(?i)swan[\s-]*ganz",
                r"(?i)presi[oó]n\s+venosa\s+central",
            ],
        ),
        criterion(
            "ventilación no invasiva",
            &[
                r"\bVMNI\b",
                r"(?i)ventilaci[oó]n\s+(?:mec[aá]nica\s+)?no\s+invasiva",
                r"\b(?:CPAP|BiPAP|BIPAP)\b",
                r"(?i)c[aá]nula\s+(?:nasal\s+)?de\s+alto\s+flujo",
            ],
        ),
        criterion(
            "postoperatorio de alto riesgo",
            &[
                r"(?i)(?:post|pos)\s*operatorio\s+(?:inmediato\s+)?de\s+(?:cirug[ií]a\s+)?(?:mayor|alto\s+riesgo)",
                r"(?i)(?:post|pos)\s*operatorio\s+de\s+cirug[ií]a\s+(?:card[ií]aca|tor[aá]cica|abdominal\s+mayor)",
            ],
        ),
        criterion(
            "politraumatismo",
            &[r"(?i)politraumatismo", r"(?i)politraumatizad[oa]", r"(?i)trauma\s+grave"],
        ),
        criterion(
            "quemaduras",
            &[r"(?i)quemadura", r"(?i)gran\s+quemad[oa]"],
        ),
        criterion(
            "intoxicación grave",
            &[
                r"(?i)intoxicaci[oó]n\s+(?:grave|severa|aguda)",
                r"(?i)sobredosis",
            ],
        ),
        criterion("sepsis sin shock", &[r"(?i)\bsepsis\b", r"(?i)\bs[eé]ptic[oa]\b"]),
    ]
}

// ---------------------------------------------------------------------------
// AuditConfig
// ---------------------------------------------------------------------------

/// Engine configuration. Every field has a default, so partial JSON files work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub windows: ScanWindows,
    pub critical_care: CriticalCareConfig,
    /// Stays longer than this many days are flagged as implausible.
    pub max_stay_days: u32,
}

impl AuditConfig {
    /// Load from `path`, or from the per-user file when it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AuditError> {
        let config = match path {
            Some(p) => Self::from_json_file(p)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(p) => Self::from_json_file(&p)?,
                None => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AuditError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded audit configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AuditError> {
        let w = &self.windows;
        if w.leading_lines == 0 || w.visit_note_after == 0 || w.care_block == 0 {
            return Err(AuditError::Config("scan windows must be non-zero".into()));
        }
        if w.surgery_short_extent > w.surgery_extent {
            return Err(AuditError::Config(
                "surgery_short_extent exceeds surgery_extent".into(),
            ));
        }
        let cc = &self.critical_care;
        if cc.intermediate_minor_threshold == 0
            || cc.intensive_minor_threshold <= cc.intermediate_minor_threshold
        {
            return Err(AuditError::Config(format!(
                "minor-criteria thresholds must satisfy 0 < intermediate ({}) < intensive ({})",
                cc.intermediate_minor_threshold, cc.intensive_minor_threshold
            )));
        }
        if self.max_stay_days == 0 {
            return Err(AuditError::Config("max_stay_days must be positive".into()));
        }
        Ok(())
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            windows: ScanWindows::default(),
            critical_care: CriticalCareConfig::default(),
            max_stay_days: 366,
        }
    }
}
