//! Remote JSON message provider.
//!
//! Pulls the published messages of a remote message server, maps the
//! wire format into the shared model, and — once the store has detected
//! a genuine change — rewrites attachment references to the local
//! repository and enqueues the stale files for mirroring.

pub mod error;
pub mod response;

pub use error::RemoteError;
pub use response::SearchResult;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use navwarn_core::Error;
use navwarn_core::model::Message;
use navwarn_core::store::MessageProvider;

use crate::mirror::AttachmentMirror;

/// Provider id of the remote source.
pub const PROVIDER_ID: &str = "msinm";

/// Priority of the remote source among registered providers.
pub const PRIORITY: i32 = 100;

/// Supported languages, in prioritized order.
pub const LANGUAGES: &[&str] = &["da", "en"];

/// Remote provider configuration.
#[derive(Debug, Clone)]
pub struct RemoteProviderConfig {
    /// Base URL of the remote message server.
    pub server_url: String,
    /// Connect timeout (default: 5s).
    pub connect_timeout: Duration,
    /// Read timeout (default: 10s).
    pub read_timeout: Duration,
    /// User-Agent string.
    pub user_agent: String,
}

impl RemoteProviderConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            user_agent: "navwarn/0.1".to_string(),
        }
    }
}

/// Provider for a remote message server speaking the JSON wire format.
pub struct RemoteProvider {
    config: RemoteProviderConfig,
    http: reqwest::Client,
    mirror: Arc<AttachmentMirror>,
}

impl RemoteProvider {
    pub fn new(
        config: RemoteProviderConfig,
        mirror: Arc<AttachmentMirror>,
    ) -> Result<Self, Error> {
        url::Url::parse(&config.server_url)
            .map_err(|e| Error::SourceUnavailable(format!("invalid server URL: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::SourceUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, http, mirror })
    }

    /// Endpoint returning active messages sorted by area. The stable
    /// sort order is what makes the watermark comparison meaningful.
    fn active_messages_url(&self) -> String {
        format!(
            "{}/rest/messages/published?sortBy=AREA&sortOrder=ASC&attachments=true",
            self.config.server_url.trim_end_matches('/')
        )
    }

    async fn fetch_active_messages(&self) -> Result<SearchResult, RemoteError> {
        let url = self.active_messages_url();
        tracing::debug!("fetching active messages from {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Http { status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MessageProvider for RemoteProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn languages(&self) -> &[&str] {
        LANGUAGES
    }

    async fn load(&self) -> Result<Vec<Message>, Error> {
        let result = self.fetch_active_messages().await.map_err(Error::from)?;
        let messages: Vec<Message> =
            result.messages.into_iter().filter_map(|wire| wire.into_message()).collect();
        Ok(messages)
    }

    async fn prepare(&self, messages: &mut [Message]) {
        self.mirror.sync_messages(PROVIDER_ID, &self.config.server_url, messages);
    }
}
