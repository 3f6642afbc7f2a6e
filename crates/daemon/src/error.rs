use campcook_api_client::ClientError;
use campcook_local_store::StoreError;

/// Why a sync attempt did not reach the collector.
///
/// Every variant leaves the team pending; none of them is fatal to the
/// caller that triggered the attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("collector configuration is invalid: {0}")]
    Configuration(String),
    #[error("local storage failed: {0}")]
    Persistence(String),
    #[error("collector unreachable: {0}")]
    Network(String),
    #[error("collector answered HTTP {status}: {body}")]
    Server { status: u16, body: String },
    #[error("could not encode submission: {0}")]
    Serialization(String),
    #[error("no stored data for team {0}")]
    NothingToSync(String),
    #[error("another process is syncing team {0}")]
    InProgress(String),
}

impl SyncError {
    /// Failures worth retrying later without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_) | SyncError::Server { .. } | SyncError::InProgress(_)
        )
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<ClientError> for SyncError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Config(e) => SyncError::Configuration(e.to_string()),
            ClientError::Build(e) => SyncError::Configuration(e.to_string()),
            ClientError::Status { status, body, .. } => SyncError::Server { status, body },
            ClientError::MediaRead { .. } => SyncError::Persistence(err.to_string()),
            ClientError::Network { .. } | ClientError::Decode { .. } => {
                SyncError::Network(error_chain(&err))
            }
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
