use serde::{Deserialize, Serialize};

/// The persisted result of visiting one page.
///
/// `html` holds the text extracted by the configured selector, not the page
/// markup. The field keeps its name so output files stay compatible with
/// existing consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Document title at visit time
    pub title: String,

    /// Loaded URL of the page (after redirects)
    pub url: String,

    /// Extracted text content
    pub html: String,
}

impl PageRecord {
    /// Create a new page record
    pub fn new(title: String, url: String, html: String) -> Self {
        Self { title, url, html }
    }
}

/// Counters reported at the end of a crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages whose visit handler completed
    pub pages_visited: usize,

    /// Requests that failed after all retries
    pub pages_failed: usize,

    /// Distinct normalized URLs admitted to the queue
    pub requests_seen: usize,
}
