use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifying attributes of a cooking team. Treated as immutable once a
/// session starts; a change of team means a new activity record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    pub school: String,
    pub grade: String,
    pub class_name: String,
    pub stove_number: String,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub member_names: Vec<String>,
}

/// Separator used when member names travel as a single string.
pub const MEMBER_NAME_SEPARATOR: &str = "、";

impl TeamInfo {
    /// Stable identifier used as storage key and in the upload URL.
    pub fn team_id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.school.trim(),
            self.grade.trim(),
            self.class_name.trim(),
            self.stove_number.trim()
        )
    }

    pub fn display_name(&self) -> String {
        format!(
            "{} grade {} class {} stove {}",
            self.school, self.grade, self.class_name, self.stove_number
        )
    }

    pub fn is_valid(&self) -> bool {
        !self.school.trim().is_empty()
            && !self.grade.trim().is_empty()
            && !self.class_name.trim().is_empty()
            && !self.stove_number.trim().is_empty()
            && self.member_count > 0
            && !self.member_names.is_empty()
    }

    pub fn member_names_joined(&self) -> String {
        self.member_names.join(MEMBER_NAME_SEPARATOR)
    }
}

/// Split a free-form member list on the separators operators actually type.
pub fn split_member_names(raw: &str) -> Vec<String> {
    raw.split(|c: char| matches!(c, '、' | ',' | '，' | ';' | '\n'))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DivisionRole {
    Leader,
    Cooking,
    SoupRice,
    Fire,
    Hygiene,
}

impl DivisionRole {
    pub const ALL: [DivisionRole; 5] = [
        DivisionRole::Leader,
        DivisionRole::Cooking,
        DivisionRole::SoupRice,
        DivisionRole::Fire,
        DivisionRole::Hygiene,
    ];

    /// Key used by the collector's `teamDivision` map.
    pub fn key(self) -> &'static str {
        match self {
            DivisionRole::Leader => "groupLeader",
            DivisionRole::Cooking => "groupCooking",
            DivisionRole::SoupRice => "groupSoupRice",
            DivisionRole::Fire => "groupFire",
            DivisionRole::Hygiene => "groupHealth",
        }
    }
}

/// Who does what within the team.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamDivision {
    pub leader: String,
    pub cooking: String,
    pub soup_rice: String,
    pub fire: String,
    pub hygiene: String,
}

impl TeamDivision {
    pub fn get(&self, role: DivisionRole) -> &str {
        match role {
            DivisionRole::Leader => &self.leader,
            DivisionRole::Cooking => &self.cooking,
            DivisionRole::SoupRice => &self.soup_rice,
            DivisionRole::Fire => &self.fire,
            DivisionRole::Hygiene => &self.hygiene,
        }
    }

    pub fn set(&mut self, role: DivisionRole, who: impl Into<String>) {
        let slot = match role {
            DivisionRole::Leader => &mut self.leader,
            DivisionRole::Cooking => &mut self.cooking,
            DivisionRole::SoupRice => &mut self.soup_rice,
            DivisionRole::Fire => &mut self.fire,
            DivisionRole::Hygiene => &mut self.hygiene,
        };
        *slot = who.into();
    }

    /// Assigned roles keyed by collector name, blank roles omitted.
    /// `None` when nobody has been assigned anything.
    pub fn assigned(&self) -> Option<BTreeMap<String, String>> {
        let map: BTreeMap<String, String> = DivisionRole::ALL
            .into_iter()
            .filter_map(|role| {
                let who = self.get(role).trim();
                (!who.is_empty()).then(|| (role.key().to_string(), who.to_string()))
            })
            .collect();
        (!map.is_empty()).then_some(map)
    }
}
