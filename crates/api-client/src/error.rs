use campcook_runtime_config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("media file {path} is not readable: {source}")]
    MediaRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// True for failures the collector itself reported.
    pub fn is_status(&self) -> bool {
        matches!(self, ClientError::Status { .. })
    }
}
