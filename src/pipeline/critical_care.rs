//! Critical-care level classification
//!
//! Each documented day of a patient in a critical-care unit is classified
//! from its own note block, using configurable major and minor criteria.

use chrono::NaiveDate;
use regex::Regex;

use crate::config::{CriticalCareConfig, CriterionSpec};
use crate::error::AuditError;
use crate::models::enums::{CareLevel, CriterionTier};
use crate::models::{CareLevelClassification, CareLevelSummary, Criterion};

use super::evolution::EvolutionCoverage;
use super::text::{expand, DateIndex};

struct CompiledCriterion {
    name: String,
    patterns: Vec<Regex>,
}

impl CompiledCriterion {
    fn compile(spec: &CriterionSpec) -> Result<Self, AuditError> {
        let patterns = spec
            .patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| AuditError::InvalidPattern {
                    name: spec.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: spec.name.clone(),
            patterns,
        })
    }

    fn evaluate(&self, tier: CriterionTier, block: &str) -> Criterion {
        let evidence = self
            .patterns
            .iter()
            .find_map(|re| re.find(block))
            .map(|m| m.as_str().to_string());
        Criterion {
            tier,
            name: self.name.clone(),
            present: evidence.is_some(),
            evidence,
        }
    }
}

/// Classifier built once per engine from the configured criteria.
pub struct CareLevelClassifier {
    major: Vec<CompiledCriterion>,
    minor: Vec<CompiledCriterion>,
    intensive_minor_threshold: usize,
    intermediate_minor_threshold: usize,
}

impl CareLevelClassifier {
    pub fn new(config: &CriticalCareConfig) -> Result<Self, AuditError> {
        let compile = |specs: &[CriterionSpec]| {
            specs
                .iter()
                .map(CompiledCriterion::compile)
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            major: compile(&config.major)?,
            minor: compile(&config.minor)?,
            intensive_minor_threshold: config.intensive_minor_threshold,
            intermediate_minor_threshold: config.intermediate_minor_threshold,
        })
    }

    /// Classify one day's note block. Pure function of the block text.
    ///
    /// Any major criterion makes the day intensive; otherwise the count of
    /// minor criteria decides between intensive, intermediate and general.
    pub fn classify_block(&self, date: NaiveDate, block: &str) -> CareLevelClassification {
        let major: Vec<Criterion> = self
            .major
            .iter()
            .map(|c| c.evaluate(CriterionTier::Major, block))
            .collect();
        let minor: Vec<Criterion> = self
            .minor
            .iter()
            .map(|c| c.evaluate(CriterionTier::Minor, block))
            .collect();

        fn present(list: &[Criterion]) -> Vec<&str> {
            list.iter()
                .filter(|c| c.present)
                .map(|c| c.name.as_str())
                .collect()
        }
        let major_hits = present(&major);
        let minor_hits = present(&minor);

        let (level, justification) = if !major_hits.is_empty() {
            (
                CareLevel::Intensive,
                format!(
                    "Cuidados intensivos: {} criterio(s) mayor(es): {}",
                    major_hits.len(),
                    major_hits.join(", ")
                ),
            )
        } else if minor_hits.len() >= self.intensive_minor_threshold {
            (
                CareLevel::Intensive,
                format!(
                    "Cuidados intensivos: {} criterios menores: {}",
                    minor_hits.len(),
                    minor_hits.join(", ")
                ),
            )
        } else if minor_hits.len() >= self.intermediate_minor_threshold {
            (
                CareLevel::Intermediate,
                format!(
                    "Cuidados intermedios: {} criterio(s) menor(es): {}",
                    minor_hits.len(),
                    minor_hits.join(", ")
                ),
            )
        } else {
            (
                CareLevel::General,
                "Internación general: sin criterios de cuidados críticos".to_string(),
            )
        };

        CareLevelClassification {
            date,
            level,
            major_criteria: major,
            minor_criteria: minor,
            justification,
        }
    }

    /// Classify every covered day that has its own `visita <date>` anchor.
    ///
    /// A day's block runs from its first visit anchor to the next visit
    /// anchor of any date, at most `block_chars` characters.
    pub fn classify_days(
        &self,
        text: &str,
        dates: &DateIndex,
        coverage: &EvolutionCoverage,
        block_chars: usize,
    ) -> CareLevelSummary {
        let mut days = Vec::new();
        for day in coverage.days.iter().filter(|d| d.covered) {
            let Some(&(at, _)) = dates.visits(day.date).first() else {
                continue;
            };
            let (_, limit) = expand(text, at, at, 0, block_chars);
            let to = dates.next_visit_after(at).map_or(limit, |next| next.min(limit));
            days.push(self.classify_block(day.date, &text[at..to]));
        }

        let summary = CareLevelSummary::from_days(days);
        tracing::debug!(
            intensive = summary.intensive_days,
            intermediate = summary.intermediate_days,
            general = summary.general_days,
            "Critical-care days classified"
        );
        summary
    }
}
