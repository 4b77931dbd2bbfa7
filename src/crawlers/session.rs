use crate::error::SessionError;
use crate::extract::Selector;
use async_trait::async_trait;
use std::time::Duration;

/// A single browser page driven by the automation engine.
///
/// Everything the crawl needs from the engine goes through this trait, so the
/// driver and the visit handler never depend on a particular protocol.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate to the URL and wait for the document to load
    async fn goto(&self, url: &str) -> Result<(), SessionError>;

    /// URL of the loaded document (after redirects)
    async fn current_url(&self) -> Result<String, SessionError>;

    async fn title(&self) -> Result<String, SessionError>;

    /// Serialized DOM of the loaded document
    async fn source(&self) -> Result<String, SessionError>;

    /// Set a cookie scoped to the given URL
    async fn add_cookie(&self, name: &str, value: &str, url: &str) -> Result<(), SessionError>;

    /// Wait for a CSS selector using the engine's own wait.
    /// Returns `false` when the timeout elapses first.
    async fn wait_for_css(&self, selector: &str, timeout: Duration)
    -> Result<bool, SessionError>;

    /// Whether any node currently matches the selector
    async fn exists(&self, selector: &Selector) -> Result<bool, SessionError>;

    /// Rendered text of the first node matching the selector
    async fn inner_text(&self, selector: &Selector) -> Result<Option<String>, SessionError>;

    /// Abort every sub-resource request whose URL matches one of the
    /// wildcard patterns. An empty list lifts any previous block.
    async fn block_resources(&self, patterns: &[String]) -> Result<(), SessionError>;

    /// End the session
    async fn close(&self) -> Result<(), SessionError>;
}

/// Opens browser sessions for crawl workers
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, worker_id: usize) -> Result<Box<dyn PageSession>, SessionError>;
}
