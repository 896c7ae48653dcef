//! Client resolution policy: remote backend first, device-local fallback.
//!
//! Every operation commits to exactly one path. If a backend is configured
//! the client attempts it over HTTP with a bounded timeout; on any failure
//! (connect error, timeout, non-success status, malformed body) or when no
//! backend is configured, the operation is served by the device-local
//! store instead. The fallback is silent and non-fatal: a user can always
//! create a page, accepting that an offline link only resolves on this
//! device. Results are tagged with the path that served them so callers
//! can say so.

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use reqwest::StatusCode;
use url::Url;

use crate::store::local::{LinkBookmark, LocalStore};
use crate::store::{self, StoreError, TipPageInput, TipPageStore, TipPageView};

/// Which path satisfied an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Served<T> {
    /// Satisfied by the configured backend; the link is shareable.
    Remote(T),
    /// Satisfied by the device-local store; the link only resolves here.
    Local(T),
}

impl<T> Served<T> {
    pub fn is_local(&self) -> bool {
        matches!(self, Served::Local(_))
    }

    pub fn inner(&self) -> &T {
        match self {
            Served::Remote(v) | Served::Local(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Served::Remote(v) | Served::Local(v) => v,
        }
    }
}

/// Explicitly injected client configuration. `base_url: None` means the
/// client stays on the local path for the whole session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Option<Url>,
    timeout: Duration,
}

impl ClientConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

    pub fn offline() -> Self {
        Self {
            base_url: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn remote(base_url: Url) -> Self {
        Self {
            base_url: Some(base_url),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }
}

pub struct TipClient {
    config: ClientConfig,
    http: reqwest::Client,
    local: LocalStore,
}

impl TipClient {
    pub fn new(config: ClientConfig, local: LocalStore) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            config,
            http,
            local,
        })
    }

    /// Create a tip page, remote if possible, and bookmark the new token.
    pub async fn create_tip_page(
        &self,
        input: TipPageInput,
    ) -> Result<Served<String>, StoreError> {
        // Validate up front so bad input is rejected identically on both
        // paths and never turned into a spurious offline success.
        store::validate(&input)?;

        if let Some(base) = self.config.base_url() {
            match self.remote_create(base, &input).await {
                Ok(token) => {
                    self.bookmark(&token, &input)?;
                    return Ok(Served::Remote(token));
                }
                Err(e) => {
                    tracing::warn!("[CLIENT] remote create failed, using local store: {e:#}");
                }
            }
        }

        let token = self.local.create(input.clone())?;
        self.bookmark(&token, &input)?;
        Ok(Served::Local(token))
    }

    /// Read a tip page by token. A remote 404 is permanent for that
    /// backend, but the local store is still consulted so pages created
    /// offline on this device resolve.
    pub async fn get_tip_page(&self, token: &str) -> Result<Served<TipPageView>, StoreError> {
        if let Some(base) = self.config.base_url() {
            match self.remote_get(base, token).await {
                Ok(Some(view)) => return Ok(Served::Remote(view)),
                Ok(None) => {
                    tracing::debug!("[CLIENT] backend has no such page, checking local store");
                }
                Err(e) => {
                    tracing::warn!("[CLIENT] remote read failed, using local store: {e:#}");
                }
            }
        }

        let page = self.local.get(token)?;
        Ok(Served::Local(page.into()))
    }

    /// Shareable URL when remote-configured, otherwise a human-readable
    /// notice carrying the token.
    pub fn tip_page_url(&self, token: &str) -> String {
        match self.config.base_url() {
            Some(base) => format!("{}/tip/{token}", base.as_str().trim_end_matches('/')),
            None => format!(
                "Anonymous Tip Token: {token}\n(This is an offline tip page - data stored locally on this device)"
            ),
        }
    }

    /// Bookmarks for pages created from this device, newest first.
    pub fn links(&self) -> Result<Vec<LinkBookmark>, StoreError> {
        self.local.links()
    }

    /// Forget a bookmark. Never touches the record it points to.
    pub fn remove_link(&self, token: &str) -> Result<(), StoreError> {
        self.local.remove_link(token)
    }

    fn bookmark(&self, token: &str, input: &TipPageInput) -> Result<(), StoreError> {
        self.local.add_link(&LinkBookmark {
            token: token.to_string(),
            display_name: input.display_name.trim().to_string(),
            created_at: Utc::now(),
        })
    }

    async fn remote_create(&self, base: &Url, input: &TipPageInput) -> anyhow::Result<String> {
        let url = format!(
            "{}/api/create-tip-page",
            base.as_str().trim_end_matches('/')
        );
        let resp = self.http.post(url).json(input).send().await?;
        if !resp.status().is_success() {
            bail!("backend returned {}", resp.status());
        }
        let wire: CreateWire = resp.json().await?;
        if !wire.success {
            bail!(
                "backend rejected create: {}",
                wire.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        wire.token
            .ok_or_else(|| anyhow!("backend response missing token"))
    }

    async fn remote_get(&self, base: &Url, token: &str) -> anyhow::Result<Option<TipPageView>> {
        let url = format!("{}/api/tip/{token}", base.as_str().trim_end_matches('/'));
        let resp = self.http.get(url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            bail!("backend returned {}", resp.status());
        }
        Ok(Some(resp.json::<TipPageView>().await?))
    }
}

#[derive(Debug, serde::Deserialize)]
struct CreateWire {
    success: bool,
    token: Option<String>,
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PaymentKind, PaymentMethod, DEFAULT_MESSAGE};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn input(name: &str) -> TipPageInput {
        let mut methods = BTreeMap::new();
        methods.insert(PaymentKind::Bitcoin, PaymentMethod::address("bc1xyz"));
        TipPageInput {
            display_name: name.to_string(),
            message: None,
            payment_methods: methods,
        }
    }

    fn offline_client(dir: &TempDir) -> TipClient {
        let local = LocalStore::open(dir.path()).unwrap();
        TipClient::new(ClientConfig::offline(), local).unwrap()
    }

    /// A routable address nothing listens on; connects fail fast.
    fn dead_backend() -> Url {
        "http://127.0.0.1:9".parse().unwrap()
    }

    #[tokio::test]
    async fn unconfigured_client_serves_locally() {
        let tmp = TempDir::new().unwrap();
        let client = offline_client(&tmp);

        let served = client.create_tip_page(input("Alice")).await.unwrap();
        assert!(served.is_local());

        let token = served.into_inner();
        let page = client.get_tip_page(&token).await.unwrap();
        assert!(page.is_local());
        assert_eq!(page.inner().display_name, "Alice");
        assert_eq!(page.inner().message, DEFAULT_MESSAGE);
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_create_to_local() {
        let tmp = TempDir::new().unwrap();
        let local = LocalStore::open(tmp.path()).unwrap();
        let config =
            ClientConfig::remote(dead_backend()).with_timeout(Duration::from_millis(200));
        let client = TipClient::new(config, local).unwrap();

        let served = client.create_tip_page(input("Alice")).await.unwrap();
        assert!(served.is_local(), "create must degrade, not fail");

        // The page committed to the local path only, so a local read works.
        let token = served.into_inner();
        let page = client.get_tip_page(&token).await.unwrap();
        assert!(page.is_local());
        assert_eq!(page.inner().display_name, "Alice");
    }

    #[tokio::test]
    async fn get_without_any_source_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let client = offline_client(&tmp);
        let missing = crate::token::generate();
        assert!(matches!(
            client.get_tip_page(&missing).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_without_bookmark() {
        let tmp = TempDir::new().unwrap();
        let client = offline_client(&tmp);

        let bad = TipPageInput {
            display_name: "  ".to_string(),
            message: None,
            payment_methods: BTreeMap::new(),
        };
        assert!(matches!(
            client.create_tip_page(bad).await,
            Err(StoreError::InvalidData)
        ));
        assert!(client.links().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_records_a_bookmark() {
        let tmp = TempDir::new().unwrap();
        let client = offline_client(&tmp);

        let token = client
            .create_tip_page(input("  Alice  "))
            .await
            .unwrap()
            .into_inner();

        let links = client.links().unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].token, token);
        assert_eq!(links[0].display_name, "Alice");

        client.remove_link(&token).unwrap();
        assert!(client.links().unwrap().is_empty());
        // Bookmark deletion never deletes the record.
        assert!(client.get_tip_page(&token).await.is_ok());
    }

    #[test]
    fn url_is_remote_when_configured() {
        let tmp = TempDir::new().unwrap();
        let local = LocalStore::open(tmp.path()).unwrap();
        let config = ClientConfig::remote("http://tips.example.com".parse().unwrap());
        let client = TipClient::new(config, local).unwrap();
        assert_eq!(
            client.tip_page_url("00112233445566778899aabbccddeeff"),
            "http://tips.example.com/tip/00112233445566778899aabbccddeeff"
        );
    }

    #[test]
    fn url_is_offline_notice_when_unconfigured() {
        let tmp = TempDir::new().unwrap();
        let client = offline_client(&tmp);
        let url = client.tip_page_url("00112233445566778899aabbccddeeff");
        assert!(url.contains("00112233445566778899aabbccddeeff"));
        assert!(url.contains("offline"));
    }
}
