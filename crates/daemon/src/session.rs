//! Foreground editing of one team's activity.
//!
//! Every change is applied to a copy of the record, saved synchronously, and
//! only then handed to the sync engine. A failed mutation or save leaves the
//! stored record and the in-memory one as they were.

use std::sync::Arc;
use tracing::{debug, warn};

use campcook_core::{
    ActivityRecord, Advance, MediaItem, RecordError, RemovedMedia, Stage, SummaryData,
    TeamDivision, TeamInfo,
};
use campcook_local_store::{LocalStore, StoreError};

use crate::collector::Collector;
use crate::sync::SyncEngine;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("team {team_id} already has a session with different team details")]
    TeamInfoChanged { team_id: String },
    #[error("no active team; set one first")]
    NoActiveTeam,
}

pub struct TeamSession<C: Collector> {
    store: Arc<LocalStore>,
    engine: SyncEngine<C>,
    record: ActivityRecord,
}

impl<C: Collector> TeamSession<C> {
    /// Resume the stored session for this team or start one, and make it the
    /// active team. A fresh session is saved and queued right away.
    pub fn open(engine: SyncEngine<C>, team_info: TeamInfo) -> Result<Self, SessionError> {
        let store = Arc::clone(engine.store());
        let team_id = team_info.team_id();
        let record = match store.load(&team_id)? {
            Some(existing) if existing.team_info() != &team_info => {
                return Err(SessionError::TeamInfoChanged { team_id });
            }
            Some(existing) => existing,
            None => {
                let fresh = ActivityRecord::start(team_info);
                store.save(&fresh)?;
                fresh
            }
        };
        store.set_active_team(&team_id)?;
        let session = Self {
            store,
            engine,
            record,
        };
        session.enqueue();
        Ok(session)
    }

    /// Session for the active team, if one is stored.
    pub fn active(engine: SyncEngine<C>) -> Result<Self, SessionError> {
        let store = Arc::clone(engine.store());
        let team_id = store.active_team()?.ok_or(SessionError::NoActiveTeam)?;
        let record = match store.load(&team_id)? {
            Some(record) => record,
            None => {
                let team = store
                    .load_team_info(&team_id)?
                    .ok_or(SessionError::NoActiveTeam)?;
                ActivityRecord::start(team)
            }
        };
        Ok(Self {
            store,
            engine,
            record,
        })
    }

    pub fn record(&self) -> &ActivityRecord {
        &self.record
    }

    pub fn team_id(&self) -> String {
        self.record.team_id()
    }

    pub fn engine(&self) -> &SyncEngine<C> {
        &self.engine
    }

    fn enqueue(&self) {
        let team_id = self.team_id();
        if let Err(e) = self.engine.enqueue(&team_id) {
            warn!(team_id = %team_id, "could not queue sync: {e}");
        }
    }

    /// Apply `change`, persist, then queue a sync.
    pub fn apply<R>(
        &mut self,
        change: impl FnOnce(&mut ActivityRecord) -> Result<R, RecordError>,
    ) -> Result<R, SessionError> {
        let mut next = self.record.clone();
        let out = change(&mut next)?;
        self.store.save(&next)?;
        self.record = next;
        debug!(team_id = %self.team_id(), stage = %self.record.current_stage(), "saved session change");
        self.enqueue();
        Ok(out)
    }

    pub fn start_stage(&mut self, stage: Stage) -> Result<(), SessionError> {
        self.apply(|r| {
            r.start_stage(stage);
            Ok(())
        })
    }

    pub fn complete_current_stage(&mut self) -> Result<bool, SessionError> {
        self.apply(|r| Ok(r.complete_current_stage()))
    }

    pub fn move_to_next(&mut self) -> Result<Advance, SessionError> {
        self.apply(|r| Ok(r.move_to_next()))
    }

    pub fn reopen_stage(&mut self, stage: Stage) -> Result<(), SessionError> {
        self.apply(|r| r.reopen_stage(stage).map(|_| ()))
    }

    pub fn abandon(&mut self) -> Result<bool, SessionError> {
        self.apply(|r| Ok(r.abandon()))
    }

    pub fn record_rating(&mut self, stage: Stage, rating: u8) -> Result<(), SessionError> {
        self.apply(|r| r.record_rating(stage, rating))
    }

    pub fn toggle_tag(&mut self, stage: Stage, tag: &str, on: bool) -> Result<bool, SessionError> {
        self.apply(|r| r.toggle_tag(stage, tag, on))
    }

    pub fn set_notes(&mut self, stage: Stage, text: &str) -> Result<(), SessionError> {
        self.apply(|r| r.set_notes(stage, text))
    }

    pub fn set_problem_notes(&mut self, stage: Stage, text: &str) -> Result<(), SessionError> {
        self.apply(|r| r.set_problem_notes(stage, text))
    }

    pub fn set_overall_notes(&mut self, text: &str) -> Result<(), SessionError> {
        self.apply(|r| {
            r.set_overall_notes(text);
            Ok(())
        })
    }

    pub fn add_media(&mut self, stage: Stage, item: MediaItem) -> Result<usize, SessionError> {
        self.apply(|r| r.add_media(stage, item))
    }

    /// Removes the entry and, best-effort, its file.
    pub fn remove_media(&mut self, stage: Stage, index: usize) -> Result<RemovedMedia, SessionError> {
        self.apply(|r| r.remove_media(stage, index))
    }

    pub fn save_summary(&self, summary: &SummaryData) -> Result<(), SessionError> {
        self.store.save_summary(&self.team_id(), summary)?;
        self.enqueue();
        Ok(())
    }

    pub fn save_division(&self, division: &TeamDivision) -> Result<(), SessionError> {
        self.store.save_division(&self.team_id(), division)?;
        self.enqueue();
        Ok(())
    }

    /// Operator reset: delete every stored document for the team, its
    /// pending marker, and (best-effort) its media files.
    /// Returns how many media files are gone.
    pub fn discard(self) -> Result<usize, SessionError> {
        let team_id = self.team_id();
        let files_removed = self
            .record
            .all_media()
            .map(|(_, item)| item)
            .chain(self.record.superseded().iter().flat_map(|s| s.media()))
            .filter(|item| item.remove_file())
            .count();
        self.store.delete(&team_id)?;
        debug!(team_id = %team_id, files_removed, "discarded team session");
        Ok(files_removed)
    }
}
