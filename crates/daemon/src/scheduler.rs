use std::time::Duration;
use tracing::{debug, info, warn};

use crate::collector::Collector;
use crate::sync::SyncEngine;

/// Re-schedule every pending team at startup and then every
/// `retry_interval_secs`. An interval of 0 resumes once and returns.
pub async fn run_resume_loop<C: Collector>(
    engine: SyncEngine<C>,
    retry_interval_secs: u64,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    if retry_interval_secs == 0 {
        resume(&engine);
        info!("Periodic retry disabled (retry_interval_secs=0)");
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(retry_interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => resume(&engine),
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!("Resume loop shutting down");
                    break;
                }
            }
        }
    }
}

fn resume<C: Collector>(engine: &SyncEngine<C>) {
    match engine.resume_pending() {
        Ok(0) => debug!("no pending teams"),
        Ok(count) => debug!(count, "scheduled pending teams"),
        Err(e) => warn!("Failed to read pending teams: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use campcook_api_types::{SubmitRequest, SubmitResponse};
    use campcook_core::{ActivityRecord, MediaItem, testing};
    use campcook_local_store::LocalStore;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        submits: AtomicUsize,
    }

    impl Collector for Arc<Counting> {
        async fn upload_media(&self, _team_id: &str, _item: &MediaItem) -> Result<(), SyncError> {
            Ok(())
        }

        async fn submit(
            &self,
            _request: &SubmitRequest,
            _content_hash: &str,
        ) -> Result<SubmitResponse, SyncError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            Ok(SubmitResponse::default())
        }
    }

    fn store_with_pending(stoves: &[&str]) -> Arc<LocalStore> {
        let store = Arc::new(LocalStore::in_memory());
        for stove in stoves {
            let record = ActivityRecord::start(testing::team_info(stove));
            store.save(&record).unwrap();
            store.mark_pending(&record.team_id()).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn zero_interval_resumes_once() {
        let store = store_with_pending(&["S1", "S2"]);
        let counting = Arc::new(Counting::default());
        let engine = SyncEngine::new(Arc::clone(&store), Arc::clone(&counting));
        let (_tx, rx) = tokio::sync::watch::channel(false);

        run_resume_loop(engine.clone(), 0, rx).await;
        engine.wait_idle().await;

        assert_eq!(counting.submits.load(Ordering::SeqCst), 2);
        assert!(store.pending_teams().unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_tick_resumes_then_stops_on_shutdown() {
        let store = store_with_pending(&["S1"]);
        let counting = Arc::new(Counting::default());
        let engine = SyncEngine::new(Arc::clone(&store), Arc::clone(&counting));
        let (tx, rx) = tokio::sync::watch::channel(false);

        let task = tokio::spawn(run_resume_loop(engine.clone(), 3600, rx));
        tokio::time::timeout(Duration::from_secs(10), async {
            while !store.pending_teams().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .unwrap()
            .unwrap();
        engine.wait_idle().await;
        assert_eq!(counting.submits.load(Ordering::SeqCst), 1);
    }
}
