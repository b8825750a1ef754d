//! Surgical episode extraction
//!
//! Surgical sheets are found by their headings, validated by the presence of
//! an operative team, and read within a bounded window. The same operation
//! is often reproduced on several pages; episodes sharing a date and an
//! identical team are merged through an explicit key.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use crate::config::ScanWindows;
use crate::models::enums::{EnergyDeviceUse, FindingCategory, TeamRole};
use crate::models::{normalize_person, Finding, SurgicalEpisode, TeamMember};

use super::matcher::{rule, scan, Rule};
use super::text::{captured_date, expand, first_date, squash, time_from_parts, trim_trailing_labels};

const DATE: &str = r"(\d{1,2})/(\d{1,2})/(\d{2,4})\b";
const TIME: &str = r"(\d{1,2}):(\d{2})\b";
const NAME: &str = r"([\p{L}*][\p{L}*,.\-() ]{2,60})";

static ANCHOR_RULES: LazyLock<Vec<Rule<()>>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)\b(?:foja|hoja|registro|parte)\s+quir[uú]rgic[oa]", ()),
        rule(r"(?i)\bprotocolo\s+(?:quir[uú]rgico|operatorio)", ()),
        rule(r"(?i)\boperative\s+(?:note|report)\b", ()),
    ]
});

static ROLE_RULES: LazyLock<Vec<Rule<TeamRole>>> = LazyLock::new(|| {
    let role = |label: &str, r: TeamRole| {
        rule(&format!(r"(?i)\b{label}\s*[:\-]?\s*(?:dra?\.?\s+)?{NAME}"), r)
    };
    vec![
        role(r"cirujan[oa](?:/a)?(?:\s+principal)?", TeamRole::Surgeon),
        role(r"anestesi(?:sta|[oó]log[oa])", TeamRole::Anesthetist),
        role(r"endoscopista", TeamRole::Endoscopist),
        role(r"instrumentador(?:a|/a)?(?:\s+quir[uú]rgic[oa])?", TeamRole::InstrumentTech),
        role(r"primer\s+ayudante", TeamRole::FirstAssistant),
        role(r"ayudante\s+(?:de\s+)?residen(?:cia|te)", TeamRole::ResidentAssistant),
        role(r"ayudante", TeamRole::Assistant),
    ]
});

/// Words that end a greedy team-member name.
const TEAM_STOP_WORDS: &[&str] = &[
    "cirujan", "anestesi", "endoscopista", "instrumentador", "ayudante", "primer ayudante",
    "fecha", "hora ", "hora:", "tipo ", "tipo:", "diagnostico", "diagnóstico", "procedimiento",
    "matricula", "matrícula", "mp ", "mp:", "mp.", "mn ", "mn:", "mn.", "especialidad",
    "comienzo", "inicio", "finalizaci", "técnica", "tecnica", "bisturí", "bisturi", "cirugía",
    "cirugia",
];

static ENDOSCOPIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)endoscop|colonoscop|gastroscop|broncoscop|rectosigmoidoscop|\bVEDA\b")
        .expect("Invalid endoscopic regex pattern")
});

static NO_ANESTHESIA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)sin\s+anestesi").expect("Invalid anesthesia regex pattern")
});

static START_TIME_RULES: LazyLock<Vec<Rule<()>>> = LazyLock::new(|| {
    vec![
        rule(&format!(r"(?i)hora\s+(?:de\s+)?(?:comienzo|inicio)\s*[:\-]?\s*{TIME}"), ()),
        rule(&format!(r"(?i)\b(?:comienzo|inicio)\s*[:\-]\s*{TIME}"), ()),
    ]
});

static END_TIME_RULES: LazyLock<Vec<Rule<()>>> = LazyLock::new(|| {
    vec![
        rule(
            &format!(r"(?i)hora\s+(?:de\s+)?(?:finalizaci[oó]n|fin|t[eé]rmino)\s*[:\-]?\s*{TIME}"),
            (),
        ),
        rule(&format!(r"(?i)\b(?:finalizaci[oó]n|t[eé]rmino)\s*[:\-]\s*{TIME}"), ()),
    ]
});

static SURGERY_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)fecha(?:\s+de\s+(?:la\s+)?(?:cirug[ií]a|intervenci[oó]n))?\s*[:\-]?\s*{DATE}"
    ))
    .expect("Invalid surgery date regex pattern")
});

static ENERGY_DEVICE_RULES: LazyLock<Vec<Rule<()>>> = LazyLock::new(|| {
    vec![
        rule(
            r"(?i)(?:uso\s+de\s+)?bistur[ií]\s+(?:arm[oó]nico|ultras[oó]nico)\s*\??\s*[:\-]?\s*(s[ií]|no)\b",
            (),
        ),
        rule(r"(?i)\barm[oó]nico\s*\??\s*[:\-]?\s*(s[ií]|no)\b", ()),
    ]
});

/// Antecedent timestamps in the text preceding a sheet; `(date, time)` groups.
static LOOKBACK_RULES: LazyLock<Vec<Rule<bool>>> = LazyLock::new(|| {
    // meta: whether the pattern has a time group
    vec![
        rule(&format!(r"(?i)visita\s+{DATE}\s+{TIME}"), true),
        rule(
            &format!(
                r"(?i)intervenci[oó]n\s+(?:planificada|programada)\s+para\s+(?:el\s+)?{DATE}\s+(?:a\s+las\s+)?{TIME}"
            ),
            true,
        ),
        rule(&format!(r"{DATE}\s+{TIME}"), true),
        rule(DATE, false),
    ]
});

/// Operative indicators used when no sheet heading exists.
static INDICATOR_RULES: LazyLock<Vec<Rule<()>>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)\bcirujan[oa]\s*:", ()),
        rule(r"(?i)\banestesi(?:sta|[oó]log[oa])\s*:", ()),
        rule(r"(?i)hora\s+(?:de\s+)?(?:comienzo|inicio)", ()),
        rule(r"(?i)bistur[ií]\s+arm[oó]nico", ()),
    ]
});

#[derive(Debug, Clone, Default)]
pub struct SurgeryExtraction {
    pub episodes: Vec<SurgicalEpisode>,
    /// Document-level findings; episode findings live on each episode.
    pub findings: Vec<Finding>,
}

/// Extract, merge and validate surgical episodes.
pub fn extract_surgical_episodes(text: &str, windows: &ScanWindows) -> SurgeryExtraction {
    let anchors = sheet_anchors(text, windows.surgery_anchor_gap);

    if anchors.is_empty() {
        let indicators = INDICATOR_RULES.iter().filter(|r| r.regex.is_match(text)).count();
        let mut findings = Vec::new();
        if indicators >= 2 {
            findings.push(Finding::warning(
                FindingCategory::SurgicalDataWithoutRecord,
                "Datos quirúrgicos (equipo u horarios) sin foja quirúrgica identificable",
                "Cirugía",
            ));
        }
        return SurgeryExtraction {
            episodes: Vec::new(),
            findings,
        };
    }

    let candidates: Vec<SurgicalEpisode> = anchors
        .iter()
        .enumerate()
        .filter_map(|(i, &(start, end))| {
            let limit = anchors.get(i + 1).map_or(text.len(), |next| next.0);
            read_sheet(text, start, end, limit, windows)
        })
        .collect();

    let found = candidates.len();
    let mut episodes = merge_episodes(candidates);
    for (i, episode) in episodes.iter_mut().enumerate() {
        episode.findings = validate_episode(episode, i + 1);
    }

    tracing::debug!(
        anchors = anchors.len(),
        accepted = found,
        episodes = episodes.len(),
        "Surgical episodes extracted"
    );

    SurgeryExtraction {
        episodes,
        findings: Vec::new(),
    }
}

/// Sheet headings, skipping repeats within `gap` characters of the previous one.
fn sheet_anchors(text: &str, gap: usize) -> Vec<(usize, usize)> {
    let mut hits: Vec<(usize, usize)> = scan(&ANCHOR_RULES, text)
        .into_iter()
        .map(|h| (h.start, h.end))
        .collect();
    hits.dedup_by_key(|h| h.0);

    let mut anchors = Vec::new();
    let mut prev: Option<usize> = None;
    for (start, end) in hits {
        let near = prev.is_some_and(|p| text[p..start].chars().count() < gap);
        prev = Some(start);
        if !near {
            anchors.push((start, end));
        }
    }
    anchors
}

/// Read one sheet starting at `start`, not past `limit`.
fn read_sheet(
    text: &str,
    start: usize,
    end: usize,
    limit: usize,
    windows: &ScanWindows,
) -> Option<SurgicalEpisode> {
    let validation = sheet_slice(text, start, end, limit, windows.surgery_validation);
    let listed = extract_team(validation);
    let has = |role: TeamRole| listed.iter().any(|m| m.role == role);
    let (surgeon, anesthetist, endoscopist) = (
        has(TeamRole::Surgeon),
        has(TeamRole::Anesthetist),
        has(TeamRole::Endoscopist),
    );
    let endoscopic = ENDOSCOPIC_RE.is_match(validation);

    if !(surgeon || anesthetist || endoscopist || NO_ANESTHESIA_RE.is_match(validation)) {
        return None;
    }

    let short = (anesthetist && (endoscopic || !surgeon))
        || (surgeon && endoscopic)
        || (endoscopist && !surgeon);
    let extent = if short {
        windows.surgery_short_extent
    } else {
        windows.surgery_extent
    };
    let block = sheet_slice(text, start, end, limit, extent);

    let team = extract_team(block);
    let has_in_block = |role: TeamRole| team.iter().any(|m| m.role == role);
    let accepted = has_in_block(TeamRole::Anesthetist)
        || (has_in_block(TeamRole::Surgeon) && has_in_block(TeamRole::Endoscopist))
        || (has_in_block(TeamRole::Surgeon) && endoscopic);
    if !accepted {
        return None;
    }

    let start_match = START_TIME_RULES
        .iter()
        .find_map(|r| r.regex.captures(block));
    let start_time = start_match
        .as_ref()
        .and_then(|c| time_from_parts(&c[1], &c[2], None));

    let date = match start_match.as_ref().and_then(|c| c.get(0)) {
        Some(m) => sheet_date(&block[..m.start()])
            .or_else(|| {
                let (_, to) = expand(block, m.end(), m.end(), 0, 200);
                sheet_date(&block[m.end()..to])
            })
            .or_else(|| sheet_date(block)),
        None => sheet_date(block),
    };

    let end_time = END_TIME_RULES
        .iter()
        .find_map(|r| r.regex.captures(block))
        .and_then(|c| time_from_parts(&c[1], &c[2], None));

    let (prior_date, prior_time) = lookback(text, start, windows.surgery_lookback);

    Some(SurgicalEpisode {
        date: date.or(prior_date),
        start_time: start_time.or(prior_time),
        end_time,
        team,
        energy_device: energy_device(block),
        endoscopic,
        anchor_offset: start,
        findings: Vec::new(),
    })
}

/// `extent` characters from the heading, cut at `limit`.
fn sheet_slice(text: &str, start: usize, end: usize, limit: usize, extent: usize) -> &str {
    let (_, to) = expand(text, start, end, 0, extent);
    &text[start..to.min(limit).max(start)]
}

/// Labelled surgery date, else the first date.
fn sheet_date(text: &str) -> Option<NaiveDate> {
    SURGERY_DATE_RE
        .captures_iter(text)
        .find_map(|c| captured_date(&c, 1))
        .or_else(|| first_date(text))
}

/// Last antecedent timestamp before the sheet, by pattern priority.
fn lookback(text: &str, start: usize, lookback: usize) -> (Option<NaiveDate>, Option<NaiveTime>) {
    let (from, _) = expand(text, start, start, lookback, 0);
    let before = &text[from..start];
    for r in LOOKBACK_RULES.iter() {
        let last = r
            .regex
            .captures_iter(before)
            .filter_map(|c| {
                let date = captured_date(&c, 1)?;
                let time = if r.meta {
                    time_from_parts(&c[4], &c[5], None)
                } else {
                    None
                };
                Some((date, time))
            })
            .last();
        if let Some((date, time)) = last {
            return (Some(date), time);
        }
    }
    (None, None)
}

fn energy_device(block: &str) -> EnergyDeviceUse {
    let answer = ENERGY_DEVICE_RULES
        .iter()
        .find_map(|r| r.regex.captures(block))
        .map(|c| c[1].to_lowercase());
    match answer.as_deref() {
        Some("no") => EnergyDeviceUse::NotUsed,
        Some(_) => EnergyDeviceUse::Used,
        None => EnergyDeviceUse::Unknown,
    }
}

/// Team members by role, one entry per distinct (role, person).
pub fn extract_team(block: &str) -> Vec<TeamMember> {
    let mut team: Vec<TeamMember> = Vec::new();
    let mut seen = BTreeSet::new();

    for r in ROLE_RULES.iter() {
        for caps in r.regex.captures_iter(block) {
            let (Some(whole), Some(raw)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if r.meta == TeamRole::Assistant && is_qualified_assistant(block, whole.start(), raw.as_str()) {
                continue;
            }
            let Some(name) = clean_name(raw.as_str()) else {
                continue;
            };
            if seen.insert((r.meta, normalize_person(&name))) {
                team.push(TeamMember { role: r.meta, name });
            }
        }
    }
    team
}

/// A bare "ayudante" that is really a first or resident assistant.
fn is_qualified_assistant(block: &str, at: usize, name: &str) -> bool {
    let before = block[..at].trim_end().to_lowercase();
    let name = name.to_lowercase();
    before.ends_with("primer") || name.starts_with("residen") || name.starts_with("de residen")
}

fn clean_name(raw: &str) -> Option<String> {
    let name = trim_trailing_labels(raw, TEAM_STOP_WORDS, 5);
    let name = squash(name.trim_matches(|c: char| !c.is_alphabetic()));
    let letters = name.chars().filter(|c| c.is_alphabetic()).count();
    (letters > 3).then_some(name)
}

/// Merge candidates that share a date, an identical team and compatible
/// start times. Undated candidates are never merged.
fn merge_episodes(candidates: Vec<SurgicalEpisode>) -> Vec<SurgicalEpisode> {
    let mut episodes: Vec<SurgicalEpisode> = Vec::new();
    let mut by_key: BTreeMap<(NaiveDate, BTreeSet<(TeamRole, String)>), Vec<usize>> = BTreeMap::new();

    for candidate in candidates {
        let Some(date) = candidate.date else {
            episodes.push(candidate);
            continue;
        };
        let key = (date, candidate.team_key());
        let slot = by_key.entry(key).or_default();
        let compatible = slot.iter().copied().find(|&i| {
            match (episodes[i].start_time, candidate.start_time) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        });
        match compatible {
            Some(i) => absorb(&mut episodes[i], candidate),
            None => {
                slot.push(episodes.len());
                episodes.push(candidate);
            }
        }
    }
    episodes
}

fn absorb(kept: &mut SurgicalEpisode, other: SurgicalEpisode) {
    kept.start_time = kept.start_time.or(other.start_time);
    kept.end_time = kept.end_time.or(other.end_time);
    if kept.energy_device == EnergyDeviceUse::Unknown {
        kept.energy_device = other.energy_device;
    }
    kept.endoscopic |= other.endoscopic;
}

fn validate_episode(episode: &SurgicalEpisode, ordinal: usize) -> Vec<Finding> {
    let source = episode.label(ordinal);
    let mut findings = Vec::new();

    if episode.start_time.is_none() {
        findings.push(Finding::critical(
            FindingCategory::SurgicalRecord,
            "Hora de comienzo de cirugía no registrada",
            source.clone(),
        ));
    }
    if episode.date.is_none() {
        findings.push(Finding::critical(
            FindingCategory::SurgicalRecord,
            "Fecha de cirugía no registrada",
            source.clone(),
        ));
    }
    if episode.end_time.is_none() {
        findings.push(Finding::warning(
            FindingCategory::SurgicalRecord,
            "Hora de finalización de cirugía no registrada",
            source.clone(),
        ));
    }

    let exclusive: Vec<&TeamMember> = episode.team.iter().filter(|m| m.role.is_exclusive()).collect();
    let mut reported = BTreeSet::new();
    for (i, a) in exclusive.iter().enumerate() {
        for b in &exclusive[i + 1..] {
            let person = normalize_person(&a.name);
            if a.role != b.role
                && person == normalize_person(&b.name)
                && reported.insert((a.role.min(b.role), a.role.max(b.role), person))
            {
                findings.push(Finding::critical(
                    FindingCategory::TeamRoleCollision,
                    format!(
                        "El mismo profesional ({}) figura como {} y {}",
                        a.name,
                        a.role.label(),
                        b.role.label()
                    ),
                    source.clone(),
                ));
            }
        }
    }

    if episode.energy_device == EnergyDeviceUse::Used {
        findings.push(Finding::critical(
            FindingCategory::EnergyDeviceAuthorization,
            "Uso de bisturí armónico: requiere autorización especial",
            source.clone(),
        ));
    }

    for f in &mut findings {
        f.date = episode.date;
    }
    findings
}
