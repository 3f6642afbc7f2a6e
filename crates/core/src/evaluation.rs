use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stage::{ALL_STAGES, Stage};

/// An instructor's assessment of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageEvaluation {
    pub positive_tags: Vec<String>,
    pub improvement_tags: Vec<String>,
    pub comment: String,
}

impl StageEvaluation {
    pub fn has_content(&self) -> bool {
        !self.positive_tags.is_empty()
            || !self.improvement_tags.is_empty()
            || !self.comment.trim().is_empty()
    }
}

/// Instructor evaluation of a whole team, stored next to the team's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationData {
    pub team_id: String,
    pub team_name: String,
    #[serde(default)]
    pub evaluations: BTreeMap<Stage, StageEvaluation>,
    pub updated_at: DateTime<Utc>,
}

impl EvaluationData {
    pub fn new(team_id: impl Into<String>, team_name: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            team_name: team_name.into(),
            evaluations: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn set(&mut self, stage: Stage, evaluation: StageEvaluation) {
        self.evaluations.insert(stage, evaluation);
        self.updated_at = Utc::now();
    }

    pub fn is_all_stages_evaluated(&self) -> bool {
        ALL_STAGES.iter().all(|stage| {
            self.evaluations
                .get(stage)
                .is_some_and(StageEvaluation::has_content)
        })
    }
}
