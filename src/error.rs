use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a crawl run or an aggregation pass
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Malformed or missing configuration, reported before any navigation
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[source] serde_json::Error),

    #[error("failed to read links file {path}: {source}")]
    LinksFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to download sitemap {url}: {source}")]
    Sitemap {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("record store error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed record {path}: {source}")]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write output file {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not open a browser session: {0}")]
    Session(#[from] SessionError),
}

/// Errors raised by the browser automation engine
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Command(#[from] fantoccini::error::CmdError),

    #[error(transparent)]
    Connect(#[from] fantoccini::error::NewSessionError),

    #[error("{0}")]
    Other(String),
}

/// A failure scoped to a single page visit
///
/// These never abort the run. The driver logs them with the offending URL
/// and may retry the request.
#[derive(Debug, Error)]
pub enum VisitError {
    #[error("navigation failed: {0}")]
    Navigation(#[source] SessionError),

    #[error("selector `{selector}` did not appear within {timeout_ms} ms")]
    SelectorTimeout { selector: String, timeout_ms: u64 },

    #[error("browser command failed: {0}")]
    Session(#[from] SessionError),

    #[error("failed to persist record: {0}")]
    Persist(#[source] Box<CrawlError>),

    #[error("page hook failed: {0:#}")]
    Hook(anyhow::Error),
}

impl VisitError {
    /// Whether the browser session should be reopened before retrying
    pub fn needs_new_session(&self) -> bool {
        matches!(self, VisitError::Navigation(_))
    }
}
