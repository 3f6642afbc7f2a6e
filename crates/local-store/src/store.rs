use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use campcook_core::{ActivityRecord, EvaluationData, SummaryData, TeamDivision, TeamInfo};

use crate::backend::{FileBackend, KvBackend, MemoryBackend};
use crate::lock::{FileLock, LOCK_EXT};
use crate::{StoreError, migrate};

/// Key layout shared by every backend.
pub mod keys {
    pub const ACTIVITY: &str = "activity/";
    pub const TEAM: &str = "team/";
    pub const DIVISION: &str = "division/";
    pub const SUMMARY: &str = "summary/";
    pub const EVALUATION: &str = "evaluation/";
    pub const SYNC_STATE: &str = "sync_state";
    pub const ACTIVE_TEAM: &str = "active_team";

    pub const TEAM_SCOPED: [&str; 5] = [ACTIVITY, TEAM, DIVISION, SUMMARY, EVALUATION];

    /// Lock file stem guarding `SYNC_STATE` updates.
    pub const SYNC_STATE_LOCK: &str = "sync_state";
    /// Lock file stem prefix claiming a team's sync attempt.
    pub const ATTEMPT_LOCK: &str = "attempt-";

    pub fn activity(team_id: &str) -> String {
        format!("{ACTIVITY}{team_id}")
    }

    pub fn team(team_id: &str) -> String {
        format!("{TEAM}{team_id}")
    }

    pub fn division(team_id: &str) -> String {
        format!("{DIVISION}{team_id}")
    }

    pub fn summary(team_id: &str) -> String {
        format!("{SUMMARY}{team_id}")
    }

    pub fn evaluation(team_id: &str) -> String {
        format!("{EVALUATION}{team_id}")
    }
}

// ── Sync state document ─────────────────────────────────────────────────

/// A team whose latest local data has not reached the collector yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    pub marked_at: DateTime<Utc>,
    /// Bumped on every mark, so a sync attempt can tell whether new data
    /// arrived while it was in flight.
    pub revision: u64,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedEntry {
    pub synced_at: DateTime<Utc>,
    pub content_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncState {
    pub pending: BTreeMap<String, PendingEntry>,
    pub synced: BTreeMap<String, SyncedEntry>,
    next_revision: u64,
}

impl SyncState {
    pub fn pending_teams(&self) -> BTreeSet<String> {
        self.pending.keys().cloned().collect()
    }

    fn bump(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    /// Returns true if the team was not pending before.
    fn mark(&mut self, team_id: &str) -> bool {
        let revision = self.bump();
        match self.pending.get_mut(team_id) {
            Some(entry) => {
                entry.revision = revision;
                false
            }
            None => {
                self.pending.insert(
                    team_id.to_string(),
                    PendingEntry {
                        marked_at: Utc::now(),
                        revision,
                        attempts: 0,
                        last_error: None,
                    },
                );
                true
            }
        }
    }
}

/// Cross-process claim on a team's sync attempt, released on drop.
#[derive(Debug)]
pub struct AttemptClaim {
    _lock: Option<FileLock>,
}

struct SyncGuard<'a> {
    _local: MutexGuard<'a, ()>,
    _file: Option<FileLock>,
}

// ── LocalStore ──────────────────────────────────────────────────────────

/// Typed persistence over a [`KvBackend`].
///
/// Cheap to share behind an `Arc`. The sync-state document is updated under
/// an internal lock plus, for on-disk backends, an advisory lock file, so
/// marks and clears from other threads or processes never lose each other.
pub struct LocalStore {
    backend: Arc<dyn KvBackend>,
    sync_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            sync_lock: Mutex::new(()),
        }
    }

    pub fn open_dir(dir: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(FileBackend::open(dir)?)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ── Documents ───────────────────────────────────────────────────────

    fn write_doc<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend.write(key, &bytes)
    }

    fn read_value(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let Some(bytes) = self.backend.read(key)? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                self.discard_corrupt(key, &e);
                Ok(None)
            }
        }
    }

    fn decode<T: DeserializeOwned>(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<Option<T>, StoreError> {
        match serde_json::from_value(value) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                self.discard_corrupt(key, &e);
                Ok(None)
            }
        }
    }

    fn read_doc<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.read_value(key)? {
            Some(value) => self.decode(key, value),
            None => Ok(None),
        }
    }

    fn discard_corrupt(&self, key: &str, err: &serde_json::Error) {
        warn!(key, "discarding unreadable stored document: {err}");
        if let Err(e) = self.backend.remove(key) {
            warn!(key, "failed to remove unreadable document: {e}");
        }
    }

    // ── Activity records ────────────────────────────────────────────────

    /// Persist `record` and its team info. Durable when this returns.
    pub fn save(&self, record: &ActivityRecord) -> Result<(), StoreError> {
        let team_id = record.team_id();
        self.write_doc(&keys::activity(&team_id), record)?;
        self.write_doc(&keys::team(&team_id), record.team_info())?;
        debug!(team_id = %team_id, stage = %record.current_stage(), "saved activity record");
        Ok(())
    }

    /// Most recently saved record, or `None` if absent or unreadable.
    ///
    /// Legacy payloads are upgraded on the way in; the upgraded form is
    /// written back so the conversion happens once.
    pub fn load(&self, team_id: &str) -> Result<Option<ActivityRecord>, StoreError> {
        let key = keys::activity(team_id);
        let Some(mut value) = self.read_value(&key)? else {
            return Ok(None);
        };
        let converted = migrate::upgrade_activity(&mut value);
        let Some(record) = self.decode::<ActivityRecord>(&key, value)? else {
            return Ok(None);
        };
        if converted > 0 {
            info!(team_id, converted, "upgraded legacy media entries");
            self.save(&record)?;
        }
        Ok(Some(record))
    }

    /// Stored record for this team, or a fresh one with the first stage
    /// started. A fresh record is not saved until the caller saves it.
    pub fn load_or_start(&self, team_info: TeamInfo) -> Result<ActivityRecord, StoreError> {
        match self.load(&team_info.team_id())? {
            Some(record) => Ok(record),
            None => Ok(ActivityRecord::start(team_info)),
        }
    }

    /// Remove every document for a team, including its pending-sync marker.
    pub fn delete(&self, team_id: &str) -> Result<(), StoreError> {
        for prefix in keys::TEAM_SCOPED {
            self.backend.remove(&format!("{prefix}{team_id}"))?;
        }
        self.update_sync_state(|state| {
            state.pending.remove(team_id);
            state.synced.remove(team_id);
        })?;
        if self.active_team()?.as_deref() == Some(team_id) {
            self.backend.remove(keys::ACTIVE_TEAM)?;
        }
        info!(team_id, "deleted local team data");
        Ok(())
    }

    /// Remove everything this store holds.
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let _guard = self.sync_guard()?;
        let keys = self.backend.keys()?;
        for key in &keys {
            self.backend.remove(key)?;
        }
        info!(removed = keys.len(), "cleared local store");
        Ok(keys.len())
    }

    /// Team ids with any stored document.
    pub fn team_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .backend
            .keys()?
            .into_iter()
            .filter_map(|key| {
                keys::TEAM_SCOPED
                    .iter()
                    .find_map(|prefix| key.strip_prefix(prefix).map(str::to_string))
            })
            .collect())
    }

    // ── Auxiliary documents ─────────────────────────────────────────────

    pub fn save_team_info(&self, team: &TeamInfo) -> Result<(), StoreError> {
        self.write_doc(&keys::team(&team.team_id()), team)
    }

    pub fn load_team_info(&self, team_id: &str) -> Result<Option<TeamInfo>, StoreError> {
        self.read_doc(&keys::team(team_id))
    }

    pub fn save_division(&self, team_id: &str, division: &TeamDivision) -> Result<(), StoreError> {
        self.write_doc(&keys::division(team_id), division)
    }

    pub fn load_division(&self, team_id: &str) -> Result<Option<TeamDivision>, StoreError> {
        self.read_doc(&keys::division(team_id))
    }

    pub fn save_summary(&self, team_id: &str, summary: &SummaryData) -> Result<(), StoreError> {
        self.write_doc(&keys::summary(team_id), summary)
    }

    pub fn load_summary(&self, team_id: &str) -> Result<Option<SummaryData>, StoreError> {
        self.read_doc(&keys::summary(team_id))
    }

    pub fn save_evaluation(&self, evaluation: &EvaluationData) -> Result<(), StoreError> {
        self.write_doc(&keys::evaluation(&evaluation.team_id), evaluation)
    }

    pub fn load_evaluation(&self, team_id: &str) -> Result<Option<EvaluationData>, StoreError> {
        self.read_doc(&keys::evaluation(team_id))
    }

    pub fn set_active_team(&self, team_id: &str) -> Result<(), StoreError> {
        self.write_doc(keys::ACTIVE_TEAM, team_id)
    }

    pub fn active_team(&self) -> Result<Option<String>, StoreError> {
        self.read_doc(keys::ACTIVE_TEAM)
    }

    // ── Pending sync ────────────────────────────────────────────────────

    fn lock_path(&self, stem: &str) -> Option<std::path::PathBuf> {
        self.backend
            .lock_dir()
            .map(|dir| dir.join(format!("{}{LOCK_EXT}", urlencoding::encode(stem))))
    }

    fn sync_guard(&self) -> Result<SyncGuard<'_>, StoreError> {
        let local = self
            .sync_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let file = match self.lock_path(keys::SYNC_STATE_LOCK) {
            Some(path) => Some(FileLock::acquire(&path)?),
            None => None,
        };
        Ok(SyncGuard {
            _local: local,
            _file: file,
        })
    }

    /// Claim the right to run a sync attempt for `team_id`. `None` while
    /// another process sharing this store holds the claim.
    pub fn try_claim_attempt(&self, team_id: &str) -> Result<Option<AttemptClaim>, StoreError> {
        let Some(path) = self.lock_path(&format!("{}{team_id}", keys::ATTEMPT_LOCK)) else {
            return Ok(Some(AttemptClaim { _lock: None }));
        };
        Ok(FileLock::try_acquire(&path)?.map(|lock| AttemptClaim { _lock: Some(lock) }))
    }

    /// Callers hold the sync guard.
    ///
    /// An unreadable document would otherwise lose every pending marker, so
    /// it is rebuilt with every stored team pending.
    fn read_sync_state(&self) -> Result<SyncState, StoreError> {
        let Some(bytes) = self.backend.read(keys::SYNC_STATE)? else {
            return Ok(SyncState::default());
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(state),
            Err(e) => {
                let mut state = SyncState::default();
                for team_id in self.team_ids()? {
                    state.mark(&team_id);
                }
                warn!(
                    teams = state.pending.len(),
                    "sync state unreadable ({e}); marking every stored team pending"
                );
                self.write_doc(keys::SYNC_STATE, &state)?;
                Ok(state)
            }
        }
    }

    pub fn sync_state(&self) -> Result<SyncState, StoreError> {
        let _guard = self.sync_guard()?;
        self.read_sync_state()
    }

    fn update_sync_state<R>(
        &self,
        change: impl FnOnce(&mut SyncState) -> R,
    ) -> Result<R, StoreError> {
        let _guard = self.sync_guard()?;
        let mut state = self.read_sync_state()?;
        let out = change(&mut state);
        self.write_doc(keys::SYNC_STATE, &state)?;
        Ok(out)
    }

    /// Mark a team as having unsynced data. Returns true if it was not
    /// pending before; marking again only bumps the revision.
    pub fn mark_pending(&self, team_id: &str) -> Result<bool, StoreError> {
        self.update_sync_state(|state| state.mark(team_id))
    }

    pub fn is_pending(&self, team_id: &str) -> Result<bool, StoreError> {
        Ok(self.sync_state()?.pending.contains_key(team_id))
    }

    pub fn pending_entry(&self, team_id: &str) -> Result<Option<PendingEntry>, StoreError> {
        Ok(self.sync_state()?.pending.remove(team_id))
    }

    pub fn pending_teams(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.sync_state()?.pending_teams())
    }

    /// Unconditionally drop the pending marker. Returns whether one existed.
    pub fn clear_pending(&self, team_id: &str) -> Result<bool, StoreError> {
        self.update_sync_state(|state| state.pending.remove(team_id).is_some())
    }

    /// Record a successful submit of `content_hash`.
    ///
    /// `revision` is the pending revision read after the submit, before the
    /// stored data was re-hashed and found equal to `content_hash`. The marker
    /// is cleared only if nobody re-marked the team since; `None` means the
    /// team was not pending at that point. Returns whether it was cleared.
    pub fn complete_sync(
        &self,
        team_id: &str,
        revision: Option<u64>,
        content_hash: &str,
    ) -> Result<bool, StoreError> {
        self.update_sync_state(|state| {
            state.synced.insert(
                team_id.to_string(),
                SyncedEntry {
                    synced_at: Utc::now(),
                    content_hash: content_hash.to_string(),
                },
            );
            let unchanged = state
                .pending
                .get(team_id)
                .is_some_and(|entry| Some(entry.revision) == revision);
            if unchanged {
                state.pending.remove(team_id);
            }
            unchanged
        })
    }

    /// Note a failed attempt; the team stays pending.
    pub fn record_failure(&self, team_id: &str, error: &str) -> Result<(), StoreError> {
        self.update_sync_state(|state| {
            if let Some(entry) = state.pending.get_mut(team_id) {
                entry.attempts = entry.attempts.saturating_add(1);
                entry.last_error = Some(error.to_string());
            }
        })
    }

    pub fn last_synced(&self, team_id: &str) -> Result<Option<SyncedEntry>, StoreError> {
        Ok(self.sync_state()?.synced.remove(team_id))
    }
}
