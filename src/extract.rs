use crate::crawlers::session::PageSession;
use crate::error::{SessionError, VisitError};
use std::fmt;
use std::time::{Duration, Instant};

/// Wait applied to the selector when none is configured
pub const DEFAULT_SELECTOR_TIMEOUT: Duration = Duration::from_millis(1000);

/// How often a path-query wait re-checks the document
const PATH_QUERY_POLL: Duration = Duration::from_millis(100);

/// A content selector, decided once when the configuration is validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector, waited on with the engine's native wait
    Css(String),
    /// Structural path query (XPath), waited on by polling
    PathQuery(String),
}

impl Selector {
    /// Classify a raw selector string. A leading `/` marks a path query.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else if raw.starts_with('/') {
            Some(Selector::PathQuery(raw.to_string()))
        } else {
            Some(Selector::Css(raw.to_string()))
        }
    }

    /// The document body
    pub fn body() -> Self {
        Selector::Css("body".to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Selector::Css(s) | Selector::PathQuery(s) => s,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wait until the selector matches a node or the timeout elapses
pub async fn wait_for_selector(
    session: &dyn PageSession,
    selector: &Selector,
    timeout: Duration,
) -> Result<(), VisitError> {
    let found = match selector {
        Selector::Css(css) => session.wait_for_css(css, timeout).await?,
        Selector::PathQuery(_) => poll_until_present(session, selector, timeout).await?,
    };

    if found {
        Ok(())
    } else {
        Err(VisitError::SelectorTimeout {
            selector: selector.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}

async fn poll_until_present(
    session: &dyn PageSession,
    selector: &Selector,
    timeout: Duration,
) -> Result<bool, SessionError> {
    let start = Instant::now();
    loop {
        if session.exists(selector).await? {
            return Ok(true);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(false);
        }
        tokio::time::sleep(PATH_QUERY_POLL.min(timeout - elapsed)).await;
    }
}

/// Text content of the first node matching the selector (the body if none
/// is given). A selector that matches nothing yields an empty string.
pub async fn extract_text(
    session: &dyn PageSession,
    selector: Option<&Selector>,
) -> Result<String, SessionError> {
    let text = match selector {
        Some(selector) => session.inner_text(selector).await?,
        None => session.inner_text(&Selector::body()).await?,
    };
    Ok(text.unwrap_or_default())
}
