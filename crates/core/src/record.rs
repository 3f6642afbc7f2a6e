//! Per-stage and per-team activity records, and the stage state machine.
//!
//! An [`ActivityRecord`] owns one [`StageRecord`] per visited stage. All
//! mutations go through `ActivityRecord` so its invariants hold:
//!
//! - `current_stage` always names a stage that has a record;
//! - a record's `ended_at` is set exactly when `is_completed` is true;
//! - `is_completed` never goes from true back to false. Amending a completed
//!   stage goes through [`ActivityRecord::reopen_stage`], which archives the
//!   completed record and installs a fresh one.
//!
//! None of these operations touch storage. Callers persist after mutating.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::media::{MediaCounts, MediaItem};
use crate::stage::{Stage, StageRequirements};
use crate::team::TeamInfo;

pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("stage {0} is already completed; reopen it to amend")]
    StageCompleted(Stage),
    #[error("rating {0} is outside 0..={MAX_RATING}")]
    InvalidRating(u8),
    #[error("stage {stage} has no media at index {index} ({len} items)")]
    MediaIndex {
        stage: Stage,
        index: usize,
        len: usize,
    },
    #[error("activity has already finished")]
    ActivityFinished,
}

// ── StageRecord ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawStageRecord")]
pub struct StageRecord {
    stage: Stage,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    media: Vec<MediaItem>,
    rating: u8,
    tags: BTreeSet<String>,
    notes: String,
    problem_notes: String,
    is_completed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStageRecord {
    stage: Stage,
    started_at: DateTime<Utc>,
    #[serde(default)]
    ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    media: Vec<MediaItem>,
    #[serde(default)]
    rating: u8,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    problem_notes: String,
    #[serde(default)]
    is_completed: bool,
}

impl TryFrom<RawStageRecord> for StageRecord {
    type Error = String;

    fn try_from(raw: RawStageRecord) -> Result<Self, Self::Error> {
        if raw.ended_at.is_some() != raw.is_completed {
            return Err(format!(
                "stage {}: endedAt must be set exactly when isCompleted is true",
                raw.stage.as_str()
            ));
        }
        if raw.rating > MAX_RATING {
            return Err(format!("stage {}: rating {} out of range", raw.stage.as_str(), raw.rating));
        }
        Ok(Self {
            stage: raw.stage,
            started_at: raw.started_at,
            ended_at: raw.ended_at,
            media: raw.media,
            rating: raw.rating,
            tags: raw.tags,
            notes: raw.notes,
            problem_notes: raw.problem_notes,
            is_completed: raw.is_completed,
        })
    }
}

/// Evidence progress of a stage against its advisory quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaProgress {
    pub photos: usize,
    pub videos: usize,
    pub missing_photos: usize,
    pub missing_videos: usize,
}

impl QuotaProgress {
    pub fn is_met(&self) -> bool {
        self.missing_photos == 0 && self.missing_videos == 0
    }
}

impl StageRecord {
    pub fn new(stage: Stage, started_at: DateTime<Utc>) -> Self {
        Self {
            stage,
            started_at,
            ended_at: None,
            media: Vec::new(),
            rating: 0,
            tags: BTreeSet::new(),
            notes: String::new(),
            problem_notes: String::new(),
            is_completed: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn media(&self) -> &[MediaItem] {
        &self.media
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn problem_notes(&self) -> &str {
        &self.problem_notes
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Time spent in the stage. `None` while still in progress.
    pub fn duration(&self) -> Option<Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }

    pub fn media_counts(&self) -> MediaCounts {
        MediaCounts::of(&self.media)
    }

    pub fn quota(&self) -> QuotaProgress {
        let StageRequirements {
            min_photos,
            min_videos,
        } = self.stage.requirements();
        let counts = self.media_counts();
        QuotaProgress {
            photos: counts.photos,
            videos: counts.videos,
            missing_photos: min_photos.saturating_sub(counts.photos),
            missing_videos: min_videos.saturating_sub(counts.videos),
        }
    }

    fn complete(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_completed {
            return false;
        }
        self.ended_at = Some(at);
        self.is_completed = true;
        true
    }

    /// Fresh, open copy of a completed record carrying its evidence forward.
    fn amendment(&self, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ended_at: None,
            is_completed: false,
            ..self.clone()
        }
    }
}

// ── ActivityRecord ──────────────────────────────────────────────────────

/// Result of [`ActivityRecord::move_to_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Started(Stage),
    /// There was no next stage; the activity is finished.
    Finished,
}

/// A media item taken out of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedMedia {
    pub item: MediaItem,
    /// Whether the underlying file is gone. Removal is best-effort.
    pub file_removed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawActivityRecord")]
pub struct ActivityRecord {
    team_info: TeamInfo,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    stages: BTreeMap<Stage, StageRecord>,
    current_stage: Stage,
    overall_notes: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    superseded: Vec<StageRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActivityRecord {
    team_info: TeamInfo,
    started_at: DateTime<Utc>,
    #[serde(default)]
    ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    stages: BTreeMap<Stage, StageRecord>,
    current_stage: Stage,
    #[serde(default)]
    overall_notes: String,
    #[serde(default)]
    superseded: Vec<StageRecord>,
}

impl TryFrom<RawActivityRecord> for ActivityRecord {
    type Error = String;

    fn try_from(raw: RawActivityRecord) -> Result<Self, Self::Error> {
        if let Some((key, record)) = raw.stages.iter().find(|(key, rec)| **key != rec.stage) {
            return Err(format!(
                "stage map key {} holds a record for {}",
                key.as_str(),
                record.stage.as_str()
            ));
        }
        if !raw.stages.contains_key(&raw.current_stage) {
            return Err(format!(
                "current stage {} has no record",
                raw.current_stage.as_str()
            ));
        }
        Ok(Self {
            team_info: raw.team_info,
            started_at: raw.started_at,
            ended_at: raw.ended_at,
            stages: raw.stages,
            current_stage: raw.current_stage,
            overall_notes: raw.overall_notes,
            superseded: raw.superseded,
        })
    }
}

impl ActivityRecord {
    /// Begin a session for `team_info` with the first stage already started.
    pub fn start(team_info: TeamInfo) -> Self {
        let now = Utc::now();
        let first = Stage::first();
        let mut stages = BTreeMap::new();
        stages.insert(first, StageRecord::new(first, now));
        Self {
            team_info,
            started_at: now,
            ended_at: None,
            stages,
            current_stage: first,
            overall_notes: String::new(),
            superseded: Vec::new(),
        }
    }

    pub fn team_info(&self) -> &TeamInfo {
        &self.team_info
    }

    pub fn team_id(&self) -> String {
        self.team_info.team_id()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn current_stage(&self) -> Stage {
        self.current_stage
    }

    pub fn overall_notes(&self) -> &str {
        &self.overall_notes
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.get(&stage)
    }

    pub fn current(&self) -> Option<&StageRecord> {
        self.stages.get(&self.current_stage)
    }

    /// Stage records in activity order.
    pub fn stages(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages.values()
    }

    /// Completed records replaced by [`reopen_stage`](Self::reopen_stage), oldest first.
    pub fn superseded(&self) -> &[StageRecord] {
        &self.superseded
    }

    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn completed_count(&self) -> usize {
        self.stages.values().filter(|r| r.is_completed).count()
    }

    /// Elapsed time, measured to `now` while the activity is still running.
    pub fn total_duration(&self, now: DateTime<Utc>) -> Duration {
        self.ended_at.unwrap_or(now) - self.started_at
    }

    /// Mean rating over completed stages that were rated.
    pub fn overall_rating(&self) -> Option<f32> {
        let rated: Vec<u8> = self
            .stages
            .values()
            .filter(|r| r.is_completed && r.rating > 0)
            .map(|r| r.rating)
            .collect();
        if rated.is_empty() {
            return None;
        }
        let sum: u32 = rated.iter().map(|r| u32::from(*r)).sum();
        Some(sum as f32 / rated.len() as f32)
    }

    /// Every media item across current stage records, in stage order.
    pub fn all_media(&self) -> impl Iterator<Item = (Stage, &MediaItem)> {
        self.stages
            .values()
            .flat_map(|r| r.media.iter().map(move |m| (r.stage, m)))
    }

    // ── Transitions ─────────────────────────────────────────────────────

    /// Make `stage` current, creating its record if it has none.
    ///
    /// Legal for any stage. Jumping out of order is an operator decision
    /// gated by the caller, not by the state machine.
    pub fn start_stage(&mut self, stage: Stage) -> &StageRecord {
        self.current_stage = stage;
        self.stages
            .entry(stage)
            .or_insert_with(|| StageRecord::new(stage, Utc::now()))
    }

    /// Mark the current stage complete. Returns false if it already was.
    pub fn complete_current_stage(&mut self) -> bool {
        let now = Utc::now();
        match self.stages.get_mut(&self.current_stage) {
            Some(record) => record.complete(now),
            None => false,
        }
    }

    /// Complete the current stage and start the next one.
    ///
    /// On the last stage this finishes the activity instead. Once finished,
    /// further calls change nothing and keep returning [`Advance::Finished`].
    pub fn move_to_next(&mut self) -> Advance {
        if self.is_finished() {
            return Advance::Finished;
        }
        self.complete_current_stage();
        match self.current_stage.next() {
            Some(next) => {
                self.start_stage(next);
                Advance::Started(next)
            }
            None => {
                self.ended_at = Some(Utc::now());
                Advance::Finished
            }
        }
    }

    /// End the session without completing the remaining stages.
    pub fn abandon(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.ended_at = Some(Utc::now());
        true
    }

    /// Operator override: reopen a completed stage for amendment.
    ///
    /// The completed record moves to [`superseded`](Self::superseded) and a
    /// fresh open record, carrying the same evidence and ratings, takes its
    /// place as the current stage. A stage that is not completed is simply
    /// started.
    pub fn reopen_stage(&mut self, stage: Stage) -> Result<&StageRecord, RecordError> {
        if self.is_finished() {
            return Err(RecordError::ActivityFinished);
        }
        if let Some(done) = self.stages.get(&stage).filter(|r| r.is_completed) {
            let reopened = done.amendment(Utc::now());
            if let Some(previous) = self.stages.insert(stage, reopened) {
                self.superseded.push(previous);
            }
        }
        Ok(self.start_stage(stage))
    }

    // ── Evidence & assessment ───────────────────────────────────────────

    /// Open record for `stage`, created on first touch.
    ///
    /// Creation mirrors [`start_stage`](Self::start_stage) without moving the
    /// current-stage pointer. Completed records are frozen.
    fn open_stage_mut(&mut self, stage: Stage) -> Result<&mut StageRecord, RecordError> {
        let record = self
            .stages
            .entry(stage)
            .or_insert_with(|| StageRecord::new(stage, Utc::now()));
        if record.is_completed {
            return Err(RecordError::StageCompleted(stage));
        }
        Ok(record)
    }

    pub fn record_rating(&mut self, stage: Stage, rating: u8) -> Result<(), RecordError> {
        if rating > MAX_RATING {
            return Err(RecordError::InvalidRating(rating));
        }
        self.open_stage_mut(stage)?.rating = rating;
        Ok(())
    }

    /// Select (`on = true`) or clear a tag. Returns whether anything changed.
    pub fn toggle_tag(&mut self, stage: Stage, tag: &str, on: bool) -> Result<bool, RecordError> {
        let record = self.open_stage_mut(stage)?;
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(false);
        }
        Ok(if on {
            record.tags.insert(tag.to_string())
        } else {
            record.tags.remove(tag)
        })
    }

    pub fn set_notes(&mut self, stage: Stage, text: impl Into<String>) -> Result<(), RecordError> {
        self.open_stage_mut(stage)?.notes = text.into();
        Ok(())
    }

    pub fn set_problem_notes(
        &mut self,
        stage: Stage,
        text: impl Into<String>,
    ) -> Result<(), RecordError> {
        self.open_stage_mut(stage)?.problem_notes = text.into();
        Ok(())
    }

    pub fn set_overall_notes(&mut self, text: impl Into<String>) {
        self.overall_notes = text.into();
    }

    /// Append evidence to a stage. Returns the item's index.
    pub fn add_media(&mut self, stage: Stage, item: MediaItem) -> Result<usize, RecordError> {
        let record = self.open_stage_mut(stage)?;
        record.media.push(item);
        Ok(record.media.len() - 1)
    }

    /// Remove evidence from a stage and, best-effort, its file.
    pub fn remove_media(&mut self, stage: Stage, index: usize) -> Result<RemovedMedia, RecordError> {
        let record = self.open_stage_mut(stage)?;
        let len = record.media.len();
        if index >= len {
            return Err(RecordError::MediaIndex { stage, index, len });
        }
        let item = record.media.remove(index);
        let file_removed = item.remove_file();
        Ok(RemovedMedia { item, file_removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use crate::stage::ALL_STAGES;
    use crate::testing;

    fn fresh() -> ActivityRecord {
        ActivityRecord::start(testing::team_info("T1"))
    }

    fn assert_invariants(record: &ActivityRecord) {
        assert!(record.stage(record.current_stage()).is_some());
        for stage in record.stages() {
            assert_eq!(stage.ended_at().is_some(), stage.is_completed());
        }
    }

    #[test]
    fn start_auto_starts_first_stage() {
        let record = fresh();
        assert_eq!(record.current_stage(), Stage::Preparation);
        let prep = record.stage(Stage::Preparation).unwrap();
        assert!(!prep.is_completed());
        assert_eq!(record.stages().count(), 1);
        assert_invariants(&record);
    }

    #[test]
    fn rating_and_completion_scenario() {
        let mut record = fresh();
        record.start_stage(Stage::Preparation);
        record.record_rating(Stage::Preparation, 4).unwrap();
        assert!(record.complete_current_stage());

        let prep = record.stage(Stage::Preparation).unwrap();
        assert!(prep.is_completed());
        assert!(prep.ended_at().is_some());
        assert_eq!(prep.rating(), 4);
        assert!(prep.duration().is_some());
    }

    #[test]
    fn complete_is_idempotent() {
        let mut record = fresh();
        assert!(record.complete_current_stage());
        let ended = record.current().unwrap().ended_at();
        assert!(!record.complete_current_stage());
        assert_eq!(record.current().unwrap().ended_at(), ended);
    }

    #[test]
    fn move_to_next_walks_every_stage_then_finishes() {
        let mut record = fresh();
        for expected in ALL_STAGES.iter().skip(1) {
            assert_eq!(record.move_to_next(), Advance::Started(*expected));
            assert_invariants(&record);
        }
        assert_eq!(record.current_stage(), Stage::Overall);
        assert!(!record.is_finished());

        assert_eq!(record.move_to_next(), Advance::Finished);
        let ended = record.ended_at();
        assert!(ended.is_some());
        assert_eq!(record.completed_count(), 7);

        // again: nothing moves
        let snapshot = record.clone();
        assert_eq!(record.move_to_next(), Advance::Finished);
        assert_eq!(record, snapshot);
    }

    #[test]
    fn completed_flag_never_reverts_under_mixed_transitions() {
        let mut record = fresh();
        let script = [
            Stage::Cleaning,
            Stage::Preparation,
            Stage::Showcase,
            Stage::FireMaking,
            Stage::Cleaning,
        ];
        let mut seen_completed: BTreeSet<Stage> = BTreeSet::new();
        for (i, stage) in script.into_iter().enumerate() {
            record.start_stage(stage);
            if i % 2 == 0 {
                record.complete_current_stage();
            } else {
                record.move_to_next();
            }
            for rec in record.stages() {
                if seen_completed.contains(&rec.stage()) {
                    assert!(rec.is_completed(), "{} reverted", rec.stage());
                }
                if rec.is_completed() {
                    seen_completed.insert(rec.stage());
                }
            }
            assert_invariants(&record);
        }
    }

    #[test]
    fn start_stage_keeps_existing_record() {
        let mut record = fresh();
        record.record_rating(Stage::Preparation, 2).unwrap();
        let started = record.stage(Stage::Preparation).unwrap().started_at();
        record.start_stage(Stage::Cleaning);
        record.start_stage(Stage::Preparation);
        let prep = record.stage(Stage::Preparation).unwrap();
        assert_eq!(prep.started_at(), started);
        assert_eq!(prep.rating(), 2);
    }

    #[test]
    fn mutations_auto_create_without_moving_current() {
        let mut record = fresh();
        record
            .toggle_tag(Stage::CookingRice, "Lid kept on", true)
            .unwrap();
        assert_eq!(record.current_stage(), Stage::Preparation);
        let rice = record.stage(Stage::CookingRice).unwrap();
        assert!(rice.tags().contains("Lid kept on"));
        assert!(!rice.is_completed());
    }

    #[test]
    fn toggle_tag_reports_changes() {
        let mut record = fresh();
        let stage = Stage::Preparation;
        assert!(record.toggle_tag(stage, "Well prepared", true).unwrap());
        assert!(!record.toggle_tag(stage, "Well prepared", true).unwrap());
        assert!(record.toggle_tag(stage, "Well prepared", false).unwrap());
        assert!(!record.toggle_tag(stage, "  ", true).unwrap());
        assert!(record.stage(stage).unwrap().tags().is_empty());
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let mut record = fresh();
        assert_eq!(
            record.record_rating(Stage::Preparation, 6),
            Err(RecordError::InvalidRating(6))
        );
        record.record_rating(Stage::Preparation, 0).unwrap();
        record.record_rating(Stage::Preparation, 5).unwrap();
    }

    #[test]
    fn completed_stage_is_frozen() {
        let mut record = fresh();
        record.complete_current_stage();
        assert_eq!(
            record.record_rating(Stage::Preparation, 3),
            Err(RecordError::StageCompleted(Stage::Preparation))
        );
        assert_eq!(
            record.set_notes(Stage::Preparation, "late"),
            Err(RecordError::StageCompleted(Stage::Preparation))
        );
        assert!(
            record
                .add_media(Stage::Preparation, MediaItem::new("x.jpg", MediaKind::Photo))
                .is_err()
        );
    }

    #[test]
    fn reopen_archives_and_carries_evidence_forward() {
        let mut record = fresh();
        record.record_rating(Stage::Preparation, 3).unwrap();
        record
            .add_media(Stage::Preparation, MediaItem::new("a.jpg", MediaKind::Photo))
            .unwrap();
        record.move_to_next();

        record.reopen_stage(Stage::Preparation).unwrap();
        assert_eq!(record.current_stage(), Stage::Preparation);
        let prep = record.stage(Stage::Preparation).unwrap();
        assert!(!prep.is_completed());
        assert_eq!(prep.ended_at(), None);
        assert_eq!(prep.rating(), 3);
        assert_eq!(prep.media().len(), 1);

        assert_eq!(record.superseded().len(), 1);
        assert!(record.superseded()[0].is_completed());

        record.record_rating(Stage::Preparation, 5).unwrap();
        assert_eq!(record.superseded()[0].rating(), 3);
        assert_invariants(&record);
    }

    #[test]
    fn reopen_refused_after_finish() {
        let mut record = fresh();
        record.abandon();
        assert_eq!(
            record.reopen_stage(Stage::Preparation).unwrap_err(),
            RecordError::ActivityFinished
        );
        assert!(!record.abandon());
    }

    #[test]
    fn add_then_remove_media_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let mut record = fresh();
        let idx = record
            .add_media(
                Stage::FireMaking,
                MediaItem::new(path.to_string_lossy(), MediaKind::Photo),
            )
            .unwrap();
        assert_eq!(idx, 0);

        let removed = record.remove_media(Stage::FireMaking, 0).unwrap();
        assert!(removed.file_removed);
        assert!(!path.exists());
        assert!(record.stage(Stage::FireMaking).unwrap().media().is_empty());
    }

    #[test]
    fn remove_media_with_missing_file_still_removes_entry() {
        let mut record = fresh();
        record
            .add_media(Stage::FireMaking, MediaItem::new("a.jpg", MediaKind::Photo))
            .unwrap();
        let removed = record.remove_media(Stage::FireMaking, 0).unwrap();
        assert_eq!(removed.item.reference(), "a.jpg");
        assert!(record.stage(Stage::FireMaking).unwrap().media().is_empty());
    }

    #[test]
    fn remove_media_bad_index() {
        let mut record = fresh();
        assert_eq!(
            record.remove_media(Stage::Preparation, 2),
            Err(RecordError::MediaIndex {
                stage: Stage::Preparation,
                index: 2,
                len: 0
            })
        );
    }

    #[test]
    fn quota_progress_tracks_missing_evidence() {
        let mut record = fresh();
        record
            .add_media(Stage::Showcase, MediaItem::new("g.jpg", MediaKind::Photo))
            .unwrap();
        let quota = record.stage(Stage::Showcase).unwrap().quota();
        assert_eq!(quota.missing_photos, 1);
        assert_eq!(quota.missing_videos, 1);
        assert!(!quota.is_met());

        record
            .add_media(Stage::Showcase, MediaItem::new("d.jpg", MediaKind::Photo))
            .unwrap();
        record
            .add_media(Stage::Showcase, MediaItem::new("s.mp4", MediaKind::Video))
            .unwrap();
        assert!(record.stage(Stage::Showcase).unwrap().quota().is_met());
    }

    #[test]
    fn overall_rating_averages_completed_rated_stages() {
        let mut record = fresh();
        assert_eq!(record.overall_rating(), None);
        record.record_rating(Stage::Preparation, 4).unwrap();
        record.move_to_next();
        record.record_rating(Stage::FireMaking, 2).unwrap();
        record.move_to_next();
        // rated but still open: ignored
        record.record_rating(Stage::CookingRice, 5).unwrap();
        assert_eq!(record.overall_rating(), Some(3.0));
    }

    #[test]
    fn serde_round_trip_is_lossless() {
        let mut record = fresh();
        record.record_rating(Stage::Preparation, 4).unwrap();
        record
            .add_media(Stage::Preparation, MediaItem::new("a.jpg", MediaKind::Photo))
            .unwrap();
        record.move_to_next();
        record.reopen_stage(Stage::Preparation).unwrap();
        record.set_overall_notes("windy day");

        let json = serde_json::to_string(&record).unwrap();
        let back: ActivityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn deserialize_rejects_broken_invariants() {
        let record = fresh();
        let mut value = serde_json::to_value(&record).unwrap();
        value["currentStage"] = serde_json::json!("CLEANING");
        assert!(serde_json::from_value::<ActivityRecord>(value).is_err());

        let mut value = serde_json::to_value(&record).unwrap();
        value["stages"]["PREPARATION"]["isCompleted"] = serde_json::json!(true);
        assert!(serde_json::from_value::<ActivityRecord>(value).is_err());
    }
}
