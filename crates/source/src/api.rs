//! Raw upstream endpoints.

use async_trait::async_trait;

use tmplsync_core::{DateWindow, ExternalId, RawTemplate};

use crate::error::SourceError;

/// The three endpoints of the template-management service.
///
/// Implementations perform exactly one request per call; retry and
/// re-authentication policy lives in [`SourceClient`](crate::SourceClient).
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Exchange username/password for a bearer token.
    async fn login(&self, username: &str, password: &str) -> Result<String, SourceError>;

    /// Templates created or modified within `window`. A `None` token sends
    /// the request unauthenticated.
    async fn templates(
        &self,
        token: Option<&str>,
        window: &DateWindow,
    ) -> Result<Vec<RawTemplate>, SourceError>;

    /// Identifiers the downstream consumer already knows about.
    async fn existing_ids(
        &self,
        token: Option<&str>,
        window: &DateWindow,
    ) -> Result<Vec<ExternalId>, SourceError>;
}
