use std::future::Future;

use campcook_api_client::CollectorClient;
use campcook_api_types::{SubmitRequest, SubmitResponse};
use campcook_core::MediaItem;

use crate::error::SyncError;

/// The remote side of a sync attempt.
///
/// [`CollectorClient`] is the production implementation; tests drive the
/// engine with an in-process fake.
pub trait Collector: Send + Sync + 'static {
    /// Checked once before an attempt uploads anything. An error here means
    /// the attempt is not made at all.
    fn ready(&self) -> Result<(), SyncError> {
        Ok(())
    }

    fn upload_media(
        &self,
        team_id: &str,
        item: &MediaItem,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    fn submit(
        &self,
        request: &SubmitRequest,
        content_hash: &str,
    ) -> impl Future<Output = Result<SubmitResponse, SyncError>> + Send;
}

impl Collector for CollectorClient {
    async fn upload_media(&self, team_id: &str, item: &MediaItem) -> Result<(), SyncError> {
        Ok(CollectorClient::upload_media(self, team_id, item).await?)
    }

    async fn submit(
        &self,
        request: &SubmitRequest,
        content_hash: &str,
    ) -> Result<SubmitResponse, SyncError> {
        Ok(CollectorClient::submit(self, request, content_hash).await?)
    }
}
