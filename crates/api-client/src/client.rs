use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::debug;

use campcook_api_types::{
    CONTENT_HASH_HEADER, MediaUploadFields, STATUS_PATH, SUBMIT_PATH, StatusResponse,
    SubmitRequest, SubmitResponse, media_upload_path,
};
use campcook_core::MediaItem;
use campcook_runtime_config::CampcookConfig;

use crate::error::ClientError;
use crate::retry::{RetryConfig, retry_send};

/// Typed HTTP client for the remote collector.
///
/// Submit and upload calls retry with backoff; the status probe does not.
#[derive(Clone)]
pub struct CollectorClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl CollectorClient {
    /// Create a new client with the given base URL and timeouts.
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self::with_client(client, base_url, retry))
    }

    /// Build from configuration, revalidating the server endpoint.
    pub fn from_config(config: &CampcookConfig) -> Result<Self, ClientError> {
        let endpoint = config.server.endpoint()?;
        Self::new(
            &endpoint.base_url(),
            Duration::from_secs(config.sync.request_timeout_secs),
            Duration::from_secs(config.sync.connect_timeout_secs),
            RetryConfig::with_max_retries(config.sync.max_retries as usize),
        )
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str, retry: RetryConfig) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Health ────────────────────────────────────────────────────────────

    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        let url = self.url(STATUS_PATH);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Network {
                url: url.clone(),
                source,
            })?;
        let resp = ensure_success(&url, resp).await?;
        resp.json()
            .await
            .map_err(|source| ClientError::Decode { url, source })
    }

    // ── Submit ────────────────────────────────────────────────────────────

    /// POST the full team document. `content_hash` travels in a header so the
    /// collector can drop repeats.
    pub async fn submit(
        &self,
        request: &SubmitRequest,
        content_hash: &str,
    ) -> Result<SubmitResponse, ClientError> {
        let url = self.url(SUBMIT_PATH);
        let resp = retry_send("submit", &self.retry, || {
            self.client
                .post(&url)
                .header(CONTENT_HASH_HEADER, content_hash)
                .json(request)
                .send()
        })
        .await
        .map_err(|source| ClientError::Network {
            url: url.clone(),
            source,
        })?;
        let resp = ensure_success(&url, resp).await?;
        // A 2xx is the success signal; a body we cannot read is not a failure.
        let body = resp.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    // ── Media ─────────────────────────────────────────────────────────────

    /// Upload one captured file as multipart form data.
    pub async fn upload_media(&self, team_id: &str, item: &MediaItem) -> Result<(), ClientError> {
        let bytes = tokio::fs::read(item.path())
            .await
            .map_err(|source| ClientError::MediaRead {
                path: item.reference().to_string(),
                source,
            })?;
        let fields = MediaUploadFields::from(item);
        let file_name = item.file_name();
        let mime = item.mime_type();
        let url = self.url(&media_upload_path(team_id));
        let size = bytes.len();

        let resp = retry_send("media upload", &self.retry, || {
            let mut form = Form::new().part(
                "file",
                Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .unwrap_or_else(|_| Part::bytes(bytes.clone()).file_name(file_name.clone())),
            );
            for (name, value) in fields.pairs() {
                form = form.text(name, value);
            }
            self.client.post(&url).multipart(form).send()
        })
        .await
        .map_err(|source| ClientError::Network {
            url: url.clone(),
            source,
        })?;
        ensure_success(&url, resp).await?;
        debug!(team_id, reference = item.reference(), size, "uploaded media");
        Ok(())
    }
}

/// Pass 2xx responses through; turn anything else into [`ClientError::Status`]
/// carrying the body text.
async fn ensure_success(url: &str, resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}
