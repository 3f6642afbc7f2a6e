use serde::{Deserialize, Serialize};
use std::fmt;

/// One ordered phase of the camp-cooking activity.
///
/// Variants are declared in traversal order; `Ord` follows that order, so
/// `Stage::Preparation < Stage::FireMaking` holds and sorted collections keyed
/// by `Stage` iterate in activity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Preparation,
    FireMaking,
    CookingRice,
    CookingDishes,
    Showcase,
    Cleaning,
    /// Overall review of the whole activity. Serialized as `COMPLETED` for
    /// compatibility with the collector.
    #[serde(rename = "COMPLETED")]
    Overall,
}

pub const ALL_STAGES: [Stage; 7] = [
    Stage::Preparation,
    Stage::FireMaking,
    Stage::CookingRice,
    Stage::CookingDishes,
    Stage::Showcase,
    Stage::Cleaning,
    Stage::Overall,
];

/// Minimum evidence a stage should carry before it is marked complete.
///
/// Advisory only: the state machine never enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRequirements {
    pub min_photos: usize,
    pub min_videos: usize,
}

pub const DEFAULT_REQUIREMENTS: StageRequirements = StageRequirements {
    min_photos: 3,
    min_videos: 1,
};

/// Group photo + dish photo, plus one speech video.
pub const SHOWCASE_REQUIREMENTS: StageRequirements = StageRequirements {
    min_photos: 2,
    min_videos: 1,
};

/// Tags offered for a stage, split by sentiment.
#[derive(Debug, Clone, Copy)]
pub struct TagGroup {
    pub positive: &'static [&'static str],
    pub problems: &'static [&'static str],
}

/// Tags that apply to every stage.
pub const TEAMWORK_TAGS: &[&str] = &[
    "Clear roles",
    "Helped each other",
    "Good communication",
    "Efficient",
    "Everyone took part",
];

/// Iterate stages in traversal order. Restartable: every call yields the
/// same sequence.
pub fn ordered_stages() -> impl Iterator<Item = Stage> {
    ALL_STAGES.into_iter()
}

impl Stage {
    pub fn first() -> Stage {
        ALL_STAGES[0]
    }

    pub fn last() -> Stage {
        ALL_STAGES[ALL_STAGES.len() - 1]
    }

    /// 1-based position in the activity.
    pub fn order(self) -> u8 {
        match self {
            Stage::Preparation => 1,
            Stage::FireMaking => 2,
            Stage::CookingRice => 3,
            Stage::CookingDishes => 4,
            Stage::Showcase => 5,
            Stage::Cleaning => 6,
            Stage::Overall => 7,
        }
    }

    pub fn from_order(order: u8) -> Option<Stage> {
        ALL_STAGES.into_iter().find(|s| s.order() == order)
    }

    /// The stage after `self`, or `None` past the last one.
    pub fn next(self) -> Option<Stage> {
        Stage::from_order(self.order() + 1)
    }

    /// Wire name, e.g. `FIRE_MAKING`.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Preparation => "PREPARATION",
            Stage::FireMaking => "FIRE_MAKING",
            Stage::CookingRice => "COOKING_RICE",
            Stage::CookingDishes => "COOKING_DISHES",
            Stage::Showcase => "SHOWCASE",
            Stage::Cleaning => "CLEANING",
            Stage::Overall => "COMPLETED",
        }
    }

    /// Parse a wire name, a kebab/snake-case name, or a 1-based order number.
    pub fn parse(raw: &str) -> Option<Stage> {
        let trimmed = raw.trim();
        if let Ok(order) = trimmed.parse::<u8>() {
            return Stage::from_order(order);
        }
        let normalized = trimmed.replace('-', "_").to_ascii_uppercase();
        if normalized == "OVERALL" {
            return Some(Stage::Overall);
        }
        ALL_STAGES.into_iter().find(|s| s.as_str() == normalized)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Stage::Preparation => "Preparation",
            Stage::FireMaking => "Fire making",
            Stage::CookingRice => "Cooking rice",
            Stage::CookingDishes => "Cooking dishes",
            Stage::Showcase => "Showcase",
            Stage::Cleaning => "Cleaning up",
            Stage::Overall => "Overall review",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::Preparation => "Prepare ingredients and tools",
            Stage::FireMaking => "Build the stove and light the fire",
            Stage::CookingRice => "Wash and cook the rice",
            Stage::CookingDishes => "Wash, cut and stir-fry the dishes",
            Stage::Showcase => "Present the results and share",
            Stage::Cleaning => "Clean and tidy the site",
            Stage::Overall => "Eat together and review the day",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Stage::Preparation => "Check ingredients and tools, and agree who does what.",
            Stage::FireMaking => "Stay safe: stack the wood neatly and leave room for air.",
            Stage::CookingRice => "Water level matters. Watch the heat and adjust in time.",
            Stage::CookingDishes => "Control the heat and keep stirring.",
            Stage::Showcase => {
                "Take a group photo and a dish photo, and record a short speech video."
            }
            Stage::Cleaning => "Clear the site, put tools back and sort the rubbish.",
            Stage::Overall => "Look back over the whole day and rate yourselves.",
        }
    }

    /// Evidence quota for this stage.
    pub fn requirements(self) -> StageRequirements {
        match self {
            Stage::Showcase => SHOWCASE_REQUIREMENTS,
            _ => DEFAULT_REQUIREMENTS,
        }
    }

    pub fn tags(self) -> TagGroup {
        match self {
            Stage::Preparation => TagGroup {
                positive: &["Well prepared", "Clear roles", "Complete toolkit", "Careful checks"],
                problems: &["Under-prepared", "Missing tools", "Unclear roles"],
            },
            Stage::FireMaking => TagGroup {
                positive: &[
                    "Quick start",
                    "Wood well stacked",
                    "Good airflow",
                    "Safe handling",
                    "Steady fire",
                ],
                problems: &["Several attempts", "Damp wood", "Too much smoke", "Unsteady fire"],
            },
            Stage::CookingRice => TagGroup {
                positive: &[
                    "Right amount of water",
                    "Good heat control",
                    "Lowered the fire in time",
                    "Lid kept on",
                    "Just right texture",
                ],
                problems: &["Burnt", "Undercooked", "Too much water", "Too little water"],
            },
            Stage::CookingDishes => TagGroup {
                positive: &[
                    "Neat knife work",
                    "Well seasoned",
                    "Right heat",
                    "Looks and tastes good",
                    "Nicely plated",
                ],
                problems: &["Burnt", "Too salty or bland", "Undercooked", "Wrong heat"],
            },
            Stage::Showcase => TagGroup {
                positive: &[
                    "Great presentation",
                    "Good sharing",
                    "Clear explanation",
                    "Standout results",
                    "Teamwork",
                ],
                problems: &["Weak presentation", "Unclear explanation", "Not prepared"],
            },
            Stage::Cleaning => TagGroup {
                positive: &[
                    "Spotless",
                    "Well sorted",
                    "Tools returned",
                    "Tidy site",
                    "Rubbish sorted",
                ],
                problems: &["Slow to clean", "Messy site", "Tools scattered", "Rubbish left"],
            },
            Stage::Overall => TagGroup {
                positive: &[
                    "Strong overall",
                    "Good teamwork",
                    "Smooth process",
                    "Highly complete",
                    "Excellent",
                ],
                problems: &["Poor coordination", "Chaotic process", "Incomplete"],
            },
        }
    }

    /// Whether `tag` appears in this stage's catalog or the team-work tags.
    pub fn is_known_tag(self, tag: &str) -> bool {
        let group = self.tags();
        group
            .positive
            .iter()
            .chain(group.problems.iter())
            .chain(TEAMWORK_TAGS.iter())
            .any(|known| *known == tag)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Human label for a 0..=5 self rating. 0 means not rated.
pub fn rating_label(rating: u8) -> &'static str {
    match rating {
        5 => "Excellent",
        4 => "Very good",
        3 => "Okay",
        2 => "Needs effort",
        1 => "Needs practice",
        _ => "Not rated",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_stages_is_restartable_and_ascending() {
        let first: Vec<Stage> = ordered_stages().collect();
        let second: Vec<Stage> = ordered_stages().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
        assert!(first.windows(2).all(|w| w[0].order() + 1 == w[1].order()));
    }

    #[test]
    fn next_walks_the_chain_and_stops_at_the_end() {
        let mut walked = vec![Stage::first()];
        while let Some(next) = walked.last().copied().and_then(Stage::next) {
            walked.push(next);
        }
        assert_eq!(walked, ALL_STAGES.to_vec());
        assert_eq!(Stage::last().next(), None);
    }

    #[test]
    fn overall_stage_uses_completed_wire_name() {
        let json = serde_json::to_string(&Stage::Overall).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        let parsed: Stage = serde_json::from_str("\"FIRE_MAKING\"").unwrap();
        assert_eq!(parsed, Stage::FireMaking);
        for stage in ALL_STAGES {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }

    #[test]
    fn parse_accepts_several_spellings() {
        assert_eq!(Stage::parse("fire-making"), Some(Stage::FireMaking));
        assert_eq!(Stage::parse("cooking_rice"), Some(Stage::CookingRice));
        assert_eq!(Stage::parse("SHOWCASE"), Some(Stage::Showcase));
        assert_eq!(Stage::parse("overall"), Some(Stage::Overall));
        assert_eq!(Stage::parse("completed"), Some(Stage::Overall));
        assert_eq!(Stage::parse("3"), Some(Stage::CookingRice));
        assert_eq!(Stage::parse("8"), None);
        assert_eq!(Stage::parse("lunch"), None);
    }

    #[test]
    fn showcase_has_its_own_quota() {
        assert_eq!(Stage::Showcase.requirements(), SHOWCASE_REQUIREMENTS);
        assert_eq!(Stage::Cleaning.requirements(), DEFAULT_REQUIREMENTS);
    }

    #[test]
    fn known_tags_include_teamwork_tags() {
        assert!(Stage::FireMaking.is_known_tag("Steady fire"));
        assert!(Stage::FireMaking.is_known_tag("Helped each other"));
        assert!(!Stage::FireMaking.is_known_tag("Nicely plated"));
    }
}
