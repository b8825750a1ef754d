use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::{EnergyDeviceUse, TeamRole};
use super::finding::Finding;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub role: TeamRole,
    pub name: String,
}

/// One operative or endoscopic intervention recovered from a surgical sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurgicalEpisode {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub team: Vec<TeamMember>,
    pub energy_device: EnergyDeviceUse,
    pub endoscopic: bool,
    /// Byte offset of the sheet anchor in the normalized text.
    pub anchor_offset: usize,
    pub findings: Vec<Finding>,
}

impl SurgicalEpisode {
    /// Role/name pairs with names compared case-insensitively.
    pub fn team_key(&self) -> BTreeSet<(TeamRole, String)> {
        self.team
            .iter()
            .map(|m| (m.role, normalize_person(&m.name)))
            .collect()
    }

    pub fn members(&self, role: TeamRole) -> impl Iterator<Item = &TeamMember> {
        self.team.iter().filter(move |m| m.role == role)
    }

    pub fn has_role(&self, role: TeamRole) -> bool {
        self.members(role).next().is_some()
    }

    /// Human label used as the source of this episode's findings.
    pub fn label(&self, ordinal: usize) -> String {
        match self.date {
            Some(d) => format!("Foja quirúrgica #{} ({})", ordinal, d.format("%d/%m/%Y")),
            None => format!("Foja quirúrgica #{} (sin fecha)", ordinal),
        }
    }
}

/// Upper-case and collapse whitespace so the same person compares equal.
pub fn normalize_person(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: TeamRole, name: &str) -> TeamMember {
        TeamMember {
            role,
            name: name.into(),
        }
    }

    #[test]
    fn team_key_ignores_case_and_spacing() {
        let a = SurgicalEpisode {
            date: None,
            start_time: None,
            end_time: None,
            team: vec![member(TeamRole::Surgeon, "Juan  Perez")],
            energy_device: EnergyDeviceUse::Unknown,
            endoscopic: false,
            anchor_offset: 0,
            findings: vec![],
        };
        let mut b = a.clone();
        b.team = vec![member(TeamRole::Surgeon, "JUAN PEREZ")];
        assert_eq!(a.team_key(), b.team_key());
    }

    #[test]
    fn label_includes_date() {
        let ep = SurgicalEpisode {
            date: NaiveDate::from_ymd_opt(2024, 3, 2),
            start_time: None,
            end_time: None,
            team: vec![],
            energy_device: EnergyDeviceUse::Unknown,
            endoscopic: false,
            anchor_offset: 0,
            findings: vec![],
        };
        assert_eq!(ep.label(1), "Foja quirúrgica #1 (02/03/2024)");
    }
}
