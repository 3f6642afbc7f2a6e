//! Offline-first push of team records to the remote collector.
//!
//! Callers save to the [`LocalStore`] first and then [`SyncEngine::enqueue`]
//! the team. Each team gets at most one worker task; enqueueing a team whose
//! worker is busy only flags a re-check, which runs after the current attempt
//! and is skipped when the team no longer has pending data. Attempts also
//! claim the team in the store, so two processes sharing one store never
//! submit the same team at once.

use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use campcook_api_types::{SubmitRequest, SubmitResponse};
use campcook_core::ActivityRecord;
use campcook_local_store::LocalStore;

use crate::collector::Collector;
use crate::error::SyncError;

/// Outcome of one successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub team_id: String,
    /// References uploaded in this attempt, in stage order.
    pub uploaded: Vec<String>,
    /// References whose files were gone before upload.
    pub missing: Vec<String>,
    /// `(reference, error)` for uploads the collector refused or never got.
    pub failed: Vec<(String, String)>,
    pub content_hash: String,
    /// Whether the pending marker was cleared. False when newer data landed
    /// while the submit was in flight.
    pub cleared: bool,
    pub response: SubmitResponse,
}

impl SyncReport {
    pub fn media_complete(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }
}

#[derive(Default)]
struct WorkerSlot {
    rerun: bool,
}

struct Inner<C> {
    store: Arc<LocalStore>,
    collector: C,
    runtime: Option<Handle>,
    workers: Mutex<HashMap<String, WorkerSlot>>,
    team_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    idle: Notify,
}

/// Background sync of pending teams. Cheap to clone.
pub struct SyncEngine<C: Collector> {
    inner: Arc<Inner<C>>,
}

impl<C: Collector> Clone for SyncEngine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<C: Collector> SyncEngine<C> {
    /// Workers are spawned on the Tokio runtime current at construction.
    /// Without one, `enqueue` still marks teams pending but nothing runs
    /// until a later process resumes them.
    pub fn new(store: Arc<LocalStore>, collector: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                collector,
                runtime: Handle::try_current().ok(),
                workers: Mutex::new(HashMap::new()),
                team_locks: Mutex::new(HashMap::new()),
                idle: Notify::new(),
            }),
        }
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.inner.store
    }

    /// Mark `team_id` pending and make sure an attempt will run.
    ///
    /// Returns whether the team was newly marked. Never waits on the network.
    pub fn enqueue(&self, team_id: &str) -> Result<bool, SyncError> {
        let newly = self.inner.store.mark_pending(team_id)?;
        debug!(team_id, newly, "enqueued sync");
        Inner::schedule(&self.inner, team_id);
        Ok(newly)
    }

    /// Schedule an attempt for every pending team, e.g. after a restart.
    pub fn resume_pending(&self) -> Result<usize, SyncError> {
        let pending = self.inner.store.pending_teams()?;
        for team_id in &pending {
            Inner::schedule(&self.inner, team_id);
        }
        if !pending.is_empty() {
            info!(count = pending.len(), "resuming pending sync");
        }
        Ok(pending.len())
    }

    pub fn pending_teams(&self) -> Result<BTreeSet<String>, SyncError> {
        Ok(self.inner.store.pending_teams()?)
    }

    /// Teams with a worker running or queued.
    pub fn active_workers(&self) -> usize {
        lock(&self.inner.workers).len()
    }

    /// Resolve once no worker is running or queued.
    pub async fn wait_idle(&self) {
        loop {
            let mut notified = std::pin::pin!(self.inner.idle.notified());
            notified.as_mut().enable();
            if lock(&self.inner.workers).is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Run one attempt for `team_id` now, serialized with any worker
    /// attempt for the same team.
    pub async fn attempt_sync(&self, team_id: &str) -> Result<SyncReport, SyncError> {
        self.inner.attempt_sync(team_id).await
    }

    /// The document that would be submitted for `team_id` right now.
    pub fn build_request(&self, team_id: &str) -> Result<SubmitRequest, SyncError> {
        Ok(self.inner.build_request(team_id)?.0)
    }
}

impl<C: Collector> Inner<C> {
    fn schedule(this: &Arc<Self>, team_id: &str) {
        let mut workers = lock(&this.workers);
        if let Some(slot) = workers.get_mut(team_id) {
            slot.rerun = true;
            debug!(team_id, "sync already running; queued a re-check");
            return;
        }
        let Some(runtime) = &this.runtime else {
            warn!(team_id, "no async runtime available; team stays pending");
            return;
        };
        workers.insert(team_id.to_string(), WorkerSlot::default());
        let inner = Arc::clone(this);
        let team_id = team_id.to_string();
        runtime.spawn(async move { inner.run_worker(team_id).await });
    }

    async fn run_worker(self: Arc<Self>, team_id: String) {
        loop {
            match self.store.is_pending(&team_id) {
                Ok(true) => match self.attempt_sync(&team_id).await {
                    Ok(report) if report.cleared => {
                        info!(team_id = %team_id, uploaded = report.uploaded.len(), "team synced");
                    }
                    Ok(_) => debug!(team_id = %team_id, "submitted; newer data still pending"),
                    Err(SyncError::InProgress(_)) => {
                        debug!(team_id = %team_id, "another process is syncing this team");
                    }
                    Err(SyncError::NothingToSync(_)) => {
                        warn!(team_id = %team_id, "nothing stored for pending team; dropping marker");
                        if let Err(e) = self.store.clear_pending(&team_id) {
                            warn!(team_id = %team_id, "failed to clear pending marker: {e}");
                        }
                    }
                    Err(e) => warn!(team_id = %team_id, "sync attempt failed: {e}"),
                },
                Ok(false) => debug!(team_id = %team_id, "nothing pending; skipping"),
                Err(e) => warn!(team_id = %team_id, "could not read sync state: {e}"),
            }

            let mut workers = lock(&self.workers);
            let rerun = workers
                .get_mut(&team_id)
                .is_some_and(|slot| std::mem::take(&mut slot.rerun));
            if rerun {
                continue;
            }
            workers.remove(&team_id);
            let idle = workers.is_empty();
            drop(workers);
            if idle {
                self.idle.notify_waiters();
            }
            return;
        }
    }

    fn team_lock(&self, team_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            lock(&self.team_locks)
                .entry(team_id.to_string())
                .or_default(),
        )
    }

    /// Fresh read of everything stored for the team.
    fn build_request(
        &self,
        team_id: &str,
    ) -> Result<(SubmitRequest, Option<ActivityRecord>), SyncError> {
        let activity = self.store.load(team_id)?;
        let team_info = match &activity {
            Some(record) => record.team_info().clone(),
            None => self
                .store
                .load_team_info(team_id)?
                .ok_or_else(|| SyncError::NothingToSync(team_id.to_string()))?,
        };
        let summary = self.store.load_summary(team_id)?;
        let division = self.store.load_division(team_id)?;
        let request = SubmitRequest::build(
            &team_info,
            activity.as_ref(),
            summary,
            division.as_ref(),
            Utc::now(),
        );
        Ok((request, activity))
    }

    async fn attempt_sync(&self, team_id: &str) -> Result<SyncReport, SyncError> {
        let team_lock = self.team_lock(team_id);
        let _guard = team_lock.lock().await;
        let Some(_claim) = self.store.try_claim_attempt(team_id)? else {
            return Err(SyncError::InProgress(team_id.to_string()));
        };

        let result = self.attempt_locked(team_id).await;
        if let Err(e) = &result {
            if let Err(store_err) = self.store.record_failure(team_id, &e.to_string()) {
                warn!(team_id, "failed to record sync failure: {store_err}");
            }
        }
        result
    }

    async fn attempt_locked(&self, team_id: &str) -> Result<SyncReport, SyncError> {
        self.collector.ready()?;
        let (request, activity) = self.build_request(team_id)?;
        let content_hash = request.content_hash()?;

        let mut uploaded = Vec::new();
        let mut missing = Vec::new();
        let mut failed = Vec::new();
        if let Some(activity) = &activity {
            for (stage, item) in activity.all_media() {
                let reference = item.reference().to_string();
                if !item.file_exists() {
                    warn!(team_id, stage = %stage, reference = %reference, "media file missing; not uploaded");
                    missing.push(reference);
                    continue;
                }
                match self.collector.upload_media(team_id, item).await {
                    Ok(()) => uploaded.push(reference),
                    Err(e) => {
                        warn!(team_id, stage = %stage, reference = %reference, "media upload failed: {e}");
                        failed.push((reference, e.to_string()));
                    }
                }
            }
        }

        let response = self.collector.submit(&request, &content_hash).await?;

        // Saves land before their mark, so every mark up to this revision is
        // covered by the re-hash below. Later marks keep the team pending.
        let revision = self.store.pending_entry(team_id)?.map(|e| e.revision);
        let stored_hash = match self.build_request(team_id) {
            Ok((current, _)) => Some(current.content_hash()?),
            Err(SyncError::NothingToSync(_)) => None,
            Err(e) => return Err(e),
        };
        let cleared = if stored_hash.as_deref() == Some(content_hash.as_str()) {
            self.store.complete_sync(team_id, revision, &content_hash)?
        } else {
            debug!(team_id, "stored data changed during submit; staying pending");
            false
        };

        info!(
            team_id,
            uploaded = uploaded.len(),
            missing = missing.len(),
            failed = failed.len(),
            cleared,
            "submitted team record"
        );
        Ok(SyncReport {
            team_id: team_id.to_string(),
            uploaded,
            missing,
            failed,
            content_hash,
            cleared,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campcook_core::{MediaItem, MediaKind, Stage, SummaryData, testing};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Hook = Box<dyn Fn() + Send + Sync>;

    /// In-process collector recording every call in order.
    #[derive(Default)]
    struct FakeCollector {
        events: Mutex<Vec<String>>,
        submits: Mutex<Vec<(SubmitRequest, String)>>,
        submit_results: Mutex<VecDeque<Result<(), SyncError>>>,
        failing_uploads: Mutex<Vec<String>>,
        on_submit: Mutex<Option<Hook>>,
        gate: Mutex<Option<Arc<Notify>>>,
        unusable: Mutex<Option<String>>,
        started: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeCollector {
        fn submit_count(&self) -> usize {
            lock(&self.submits).len()
        }

        fn events(&self) -> Vec<String> {
            lock(&self.events).clone()
        }
    }

    impl Collector for Arc<FakeCollector> {
        fn ready(&self) -> Result<(), SyncError> {
            match lock(&self.unusable).clone() {
                Some(reason) => Err(SyncError::Configuration(reason)),
                None => Ok(()),
            }
        }

        fn upload_media(
            &self,
            _team_id: &str,
            item: &MediaItem,
        ) -> impl Future<Output = Result<(), SyncError>> + Send {
            let reference = item.file_name();
            lock(&self.events).push(format!("upload:{reference}"));
            let fail = lock(&self.failing_uploads).contains(&reference);
            async move {
                if fail {
                    Err(SyncError::Server {
                        status: 500,
                        body: "disk full".into(),
                    })
                } else {
                    Ok(())
                }
            }
        }

        fn submit(
            &self,
            request: &SubmitRequest,
            content_hash: &str,
        ) -> impl Future<Output = Result<SubmitResponse, SyncError>> + Send {
            let this = Arc::clone(self);
            let request = request.clone();
            let content_hash = content_hash.to_string();
            async move {
                this.started.fetch_add(1, Ordering::SeqCst);
                let now = this.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                this.max_in_flight.fetch_max(now, Ordering::SeqCst);
                let gate = lock(&this.gate).take();
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                lock(&this.events).push("submit".to_string());
                if let Some(hook) = lock(&this.on_submit).as_ref() {
                    hook();
                }
                let result = lock(&this.submit_results).pop_front().unwrap_or(Ok(()));
                this.in_flight.fetch_sub(1, Ordering::SeqCst);
                result?;
                lock(&this.submits).push((request, content_hash));
                Ok(SubmitResponse::default())
            }
        }
    }

    fn setup() -> (Arc<LocalStore>, Arc<FakeCollector>, SyncEngine<Arc<FakeCollector>>) {
        let store = Arc::new(LocalStore::in_memory());
        let fake = Arc::new(FakeCollector::default());
        let engine = SyncEngine::new(Arc::clone(&store), Arc::clone(&fake));
        (store, fake, engine)
    }

    fn saved_record(store: &LocalStore, stove: &str) -> ActivityRecord {
        let record = ActivityRecord::start(testing::team_info(stove));
        store.save(&record).unwrap();
        record
    }

    #[tokio::test]
    async fn double_enqueue_submits_once() {
        let (store, fake, engine) = setup();
        let team_id = saved_record(&store, "T1").team_id();

        assert!(engine.enqueue(&team_id).unwrap());
        assert!(!engine.enqueue(&team_id).unwrap());
        engine.wait_idle().await;

        assert_eq!(fake.submit_count(), 1);
        assert!(engine.pending_teams().unwrap().is_empty());
        assert!(store.last_synced(&team_id).unwrap().is_some());
    }

    #[tokio::test]
    async fn unreachable_collector_keeps_team_pending() {
        let (store, fake, engine) = setup();
        let team_id = saved_record(&store, "T3").team_id();
        lock(&fake.submit_results).push_back(Err(SyncError::Network("connection refused".into())));

        store.mark_pending(&team_id).unwrap();
        let err = engine.attempt_sync(&team_id).await.unwrap_err();
        assert_eq!(err, SyncError::Network("connection refused".into()));
        assert!(engine.pending_teams().unwrap().contains(&team_id));
        let entry = store.pending_entry(&team_id).unwrap().unwrap();
        assert_eq!(entry.attempts, 1);
        assert!(entry.last_error.unwrap().contains("connection refused"));

        let report = engine.attempt_sync(&team_id).await.unwrap();
        assert!(report.cleared);
        assert!(!engine.pending_teams().unwrap().contains(&team_id));
    }

    #[tokio::test]
    async fn server_rejection_is_reported_with_status() {
        let (store, fake, engine) = setup();
        let team_id = saved_record(&store, "T3").team_id();
        lock(&fake.submit_results).push_back(Err(SyncError::Server {
            status: 400,
            body: "missing teamInfo".into(),
        }));
        store.mark_pending(&team_id).unwrap();

        let err = engine.attempt_sync(&team_id).await.unwrap_err();
        assert!(matches!(err, SyncError::Server { status: 400, .. }));
        assert!(store.is_pending(&team_id).unwrap());
    }

    #[tokio::test]
    async fn media_uploads_precede_submit_and_fail_independently() {
        let tmp = tempfile::tempdir().unwrap();
        let (store, fake, engine) = setup();
        let mut record = ActivityRecord::start(testing::team_info("T4"));
        for name in ["a.jpg", "b.jpg"] {
            record
                .add_media(
                    Stage::Preparation,
                    testing::media_file(tmp.path(), name, MediaKind::Photo),
                )
                .unwrap();
        }
        record.move_to_next();
        record
            .add_media(
                Stage::FireMaking,
                testing::media_file(tmp.path(), "c.mp4", MediaKind::Video),
            )
            .unwrap();
        record.add_media(Stage::FireMaking, testing::photo("gone.jpg")).unwrap();
        store.save(&record).unwrap();
        lock(&fake.failing_uploads).push("b.jpg".to_string());

        engine.enqueue(&record.team_id()).unwrap();
        engine.wait_idle().await;

        assert_eq!(
            fake.events(),
            vec!["upload:a.jpg", "upload:b.jpg", "upload:c.mp4", "submit"]
        );
        assert!(!store.is_pending(&record.team_id()).unwrap());

        store.mark_pending(&record.team_id()).unwrap();
        let report = engine.attempt_sync(&record.team_id()).await.unwrap();
        assert_eq!(report.uploaded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.ends_with("b.jpg"));
        assert_eq!(report.missing, vec!["/nonexistent/gone.jpg".to_string()]);
        assert!(!report.media_complete());
    }

    #[tokio::test]
    async fn changes_during_submit_keep_team_pending() {
        let (store, fake, engine) = setup();
        let record = saved_record(&store, "T5");
        let team_id = record.team_id();
        let writer = Arc::clone(&store);
        let mut changed = record.clone();
        changed.set_overall_notes("late edit");
        *lock(&fake.on_submit) = Some(Box::new(move || writer.save(&changed).unwrap()));

        store.mark_pending(&team_id).unwrap();
        let report = engine.attempt_sync(&team_id).await.unwrap();
        assert!(!report.cleared);
        assert!(store.is_pending(&team_id).unwrap());

        *lock(&fake.on_submit) = None;
        let report = engine.attempt_sync(&team_id).await.unwrap();
        assert!(report.cleared);
        let submitted = &lock(&fake.submits)[1].0;
        assert_eq!(
            submitted.process_record.as_ref().unwrap().overall_notes,
            "late edit"
        );
    }

    #[tokio::test]
    async fn enqueue_during_attempt_reruns_after_it() {
        let (store, fake, engine) = setup();
        let mut record = saved_record(&store, "T6");
        let team_id = record.team_id();
        let gate = Arc::new(Notify::new());
        *lock(&fake.gate) = Some(Arc::clone(&gate));

        engine.enqueue(&team_id).unwrap();
        while fake.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        record.record_rating(Stage::Preparation, 3).unwrap();
        store.save(&record).unwrap();
        engine.enqueue(&team_id).unwrap();
        assert_eq!(engine.active_workers(), 1);

        gate.notify_one();
        engine.wait_idle().await;

        assert_eq!(fake.submit_count(), 2);
        assert_eq!(fake.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(!store.is_pending(&team_id).unwrap());
        let last = &lock(&fake.submits)[1].0;
        assert_eq!(
            last.process_record.as_ref().unwrap().stages["PREPARATION"].self_rating,
            3
        );
    }

    #[tokio::test]
    async fn enqueue_without_changes_during_submit_submits_once() {
        let (store, fake, engine) = setup();
        let team_id = saved_record(&store, "T6").team_id();
        let gate = Arc::new(Notify::new());
        *lock(&fake.gate) = Some(Arc::clone(&gate));

        engine.enqueue(&team_id).unwrap();
        while fake.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(!engine.enqueue(&team_id).unwrap());

        gate.notify_one();
        engine.wait_idle().await;

        assert_eq!(fake.submit_count(), 1);
        assert!(!store.is_pending(&team_id).unwrap());
    }

    #[tokio::test]
    async fn unusable_collector_uploads_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let (store, fake, engine) = setup();
        let mut record = ActivityRecord::start(testing::team_info("T8"));
        record
            .add_media(
                Stage::Preparation,
                testing::media_file(tmp.path(), "a.jpg", MediaKind::Photo),
            )
            .unwrap();
        store.save(&record).unwrap();
        *lock(&fake.unusable) = Some("port 0 is out of range".into());

        store.mark_pending(&record.team_id()).unwrap();
        let err = engine.attempt_sync(&record.team_id()).await.unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert!(fake.events().is_empty());
        let entry = store.pending_entry(&record.team_id()).unwrap().unwrap();
        assert_eq!(entry.attempts, 1);
    }

    #[tokio::test]
    async fn team_claimed_by_another_store_is_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let daemon_store = Arc::new(LocalStore::open_dir(tmp.path()).unwrap());
        let cli_store = Arc::new(LocalStore::open_dir(tmp.path()).unwrap());
        let fake = Arc::new(FakeCollector::default());
        let daemon = SyncEngine::new(Arc::clone(&daemon_store), Arc::clone(&fake));
        let cli = SyncEngine::new(Arc::clone(&cli_store), Arc::clone(&fake));
        let team_id = saved_record(&daemon_store, "T9").team_id();
        let gate = Arc::new(Notify::new());
        *lock(&fake.gate) = Some(Arc::clone(&gate));

        daemon.enqueue(&team_id).unwrap();
        while fake.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        let err = cli.attempt_sync(&team_id).await.unwrap_err();
        assert_eq!(err, SyncError::InProgress(team_id.clone()));
        assert_eq!(cli_store.pending_entry(&team_id).unwrap().unwrap().attempts, 0);

        gate.notify_one();
        daemon.wait_idle().await;
        assert_eq!(fake.submit_count(), 1);
        assert!(!cli_store.is_pending(&team_id).unwrap());
    }

    #[tokio::test]
    async fn team_info_alone_is_submitted() {
        let (store, fake, engine) = setup();
        let team = testing::team_info("T7");
        store.save_team_info(&team).unwrap();
        store
            .save_summary(
                &team.team_id(),
                &SummaryData {
                    answer2: "teamwork".into(),
                    ..Default::default()
                },
            )
            .unwrap();

        store.mark_pending(&team.team_id()).unwrap();
        engine.attempt_sync(&team.team_id()).await.unwrap();
        let (request, _) = &lock(&fake.submits)[0];
        assert!(request.process_record.is_none());
        assert_eq!(request.summary_data.as_ref().unwrap().answer2, "teamwork");
    }

    #[tokio::test]
    async fn pending_team_without_data_is_dropped() {
        let (store, fake, engine) = setup();
        engine.enqueue("ghost").unwrap();
        engine.wait_idle().await;
        assert_eq!(fake.submit_count(), 0);
        assert!(!store.is_pending("ghost").unwrap());
    }

    #[tokio::test]
    async fn resume_picks_up_pending_teams() {
        let (store, fake, engine) = setup();
        let a = saved_record(&store, "A").team_id();
        let b = saved_record(&store, "B").team_id();
        store.mark_pending(&a).unwrap();
        store.mark_pending(&b).unwrap();

        assert_eq!(engine.resume_pending().unwrap(), 2);
        engine.wait_idle().await;
        assert_eq!(fake.submit_count(), 2);
        assert!(engine.pending_teams().unwrap().is_empty());
    }

    #[test]
    fn enqueue_without_runtime_only_marks() {
        let store = Arc::new(LocalStore::in_memory());
        let engine = SyncEngine::new(Arc::clone(&store), Arc::new(FakeCollector::default()));
        assert!(engine.enqueue("T9").unwrap());
        assert_eq!(engine.active_workers(), 0);
        assert!(store.is_pending("T9").unwrap());
    }
}
