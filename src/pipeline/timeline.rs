//! Day-by-day timeline assembly

use chrono::NaiveDate;

use crate::models::{AncillaryStudy, DayRecord, StudyRef, SurgicalEpisode};

use super::evolution::EvolutionCoverage;

/// One record per day of the range, carrying what happened that day.
pub fn build_timeline(
    days: &[NaiveDate],
    coverage: &EvolutionCoverage,
    episodes: &[SurgicalEpisode],
    studies: &[AncillaryStudy],
) -> Vec<DayRecord> {
    days.iter()
        .map(|&date| DayRecord {
            date,
            has_evolution_note: coverage.covered.contains(&date),
            has_surgical_episode: episodes.iter().any(|e| e.date == Some(date)),
            studies: studies
                .iter()
                .filter(|s| s.date == Some(date))
                .map(|s| StudyRef {
                    category: s.category,
                    kind: s.kind.clone(),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{EnergyDeviceUse, StudyCategory};
    use crate::models::days_between;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn days_carry_their_events() {
        let mut coverage = EvolutionCoverage::default();
        coverage.covered.insert(d(2));
        let episode = SurgicalEpisode {
            date: Some(d(3)),
            start_time: None,
            end_time: None,
            team: vec![],
            energy_device: EnergyDeviceUse::Unknown,
            endoscopic: false,
            anchor_offset: 0,
            findings: vec![],
        };
        let study = AncillaryStudy {
            category: StudyCategory::Imaging,
            kind: "TAC de tórax".into(),
            date: Some(d(2)),
            time: None,
            location: None,
            result: None,
            report_present: true,
            page: None,
        };
        let days = days_between(d(1), d(3));
        let timeline = build_timeline(&days, &coverage, &[episode], &[study]);

        assert_eq!(timeline.len(), 3);
        assert!(!timeline[0].has_evolution_note);
        assert!(timeline[1].has_evolution_note);
        assert_eq!(timeline[1].studies.len(), 1);
        assert!(timeline[2].has_surgical_episode);
        assert!(!timeline[1].has_surgical_episode);
    }
}
