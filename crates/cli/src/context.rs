use anyhow::{Context as _, Result, bail};
use dialoguer::Confirm;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use campcook_api_client::CollectorClient;
use campcook_api_types::{SubmitRequest, SubmitResponse};
use campcook_core::MediaItem;
use campcook_daemon::{Collector, SyncEngine, SyncError, TeamSession, config};
use campcook_local_store::LocalStore;
use campcook_runtime_config::CampcookConfig;

use crate::output;

/// How long a command waits for its queued sync before leaving it pending.
const SYNC_WAIT: Duration = Duration::from_secs(15);

/// The collector as configured. A bad endpoint does not stop local edits;
/// every attempt against it fails and the team stays pending.
#[derive(Clone)]
pub enum Remote {
    Collector(CollectorClient),
    Misconfigured(String),
}

impl Remote {
    pub fn from_config(config: &CampcookConfig) -> Self {
        match CollectorClient::from_config(config) {
            Ok(client) => Remote::Collector(client),
            Err(e) => {
                warn!("collector endpoint unusable: {e}");
                Remote::Misconfigured(e.to_string())
            }
        }
    }

    pub fn client(&self) -> Result<&CollectorClient> {
        match self {
            Remote::Collector(client) => Ok(client),
            Remote::Misconfigured(reason) => bail!("collector endpoint unusable: {reason}"),
        }
    }
}

impl Collector for Remote {
    fn ready(&self) -> Result<(), SyncError> {
        match self {
            Remote::Collector(_) => Ok(()),
            Remote::Misconfigured(reason) => Err(SyncError::Configuration(reason.clone())),
        }
    }

    async fn upload_media(&self, team_id: &str, item: &MediaItem) -> Result<(), SyncError> {
        match self {
            Remote::Collector(client) => Collector::upload_media(client, team_id, item).await,
            Remote::Misconfigured(reason) => Err(SyncError::Configuration(reason.clone())),
        }
    }

    async fn submit(
        &self,
        request: &SubmitRequest,
        content_hash: &str,
    ) -> Result<SubmitResponse, SyncError> {
        match self {
            Remote::Collector(client) => Collector::submit(client, request, content_hash).await,
            Remote::Misconfigured(reason) => Err(SyncError::Configuration(reason.clone())),
        }
    }
}

/// Everything a command needs: config, store and sync engine.
pub struct Ctx {
    pub config: CampcookConfig,
    pub remote: Remote,
    pub engine: SyncEngine<Remote>,
    wait: bool,
}

impl Ctx {
    pub fn load(wait: bool) -> Result<Self> {
        let config = config::load_config()?;
        let store = Arc::new(config::open_store(&config)?);
        let remote = Remote::from_config(&config);
        let engine = SyncEngine::new(store, remote.clone());
        Ok(Self {
            config,
            remote,
            engine,
            wait,
        })
    }

    pub fn store(&self) -> &LocalStore {
        self.engine.store()
    }

    pub fn session(&self) -> Result<TeamSession<Remote>> {
        TeamSession::active(self.engine.clone()).context("load active team")
    }

    /// Give queued syncs a bounded chance to finish, then report where
    /// `team_id` stands. Anything unfinished stays pending on disk.
    pub async fn settle(&self, team_id: &str) -> Result<()> {
        if self.wait
            && tokio::time::timeout(SYNC_WAIT, self.engine.wait_idle())
                .await
                .is_err()
        {
            warn!(team_id, "sync still running; leaving it pending");
        }
        output::print_sync_line(self.store(), team_id)
    }
}

/// Ask before an operator override. `--yes` skips the prompt; without a
/// terminal the override is refused.
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !(std::io::stdin().is_terminal() && std::io::stdout().is_terminal()) {
        bail!("{prompt} (confirmation required: pass --yes)");
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("read confirmation")
}
