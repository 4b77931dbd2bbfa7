use crate::error::CrawlError;
use crate::extract::{DEFAULT_SELECTOR_TIMEOUT, Selector};
use crate::filter::{LinkMatcher, MatchPattern};
use crate::resources::ResourceFilter;
use crate::seed::SeedMode;
use crate::storage::DEFAULT_STORAGE_DIR;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Cookie injected into every visited page, e.g. for cookie consent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieConfig {
    pub name: String,
    pub value: String,
}

/// Configuration for a crawl run.
///
/// Field names follow the JSON configuration surface (`maxPagesToCrawl`,
/// `outputFileName`, ...). Call [`Config::validate`] to turn it into a
/// [`CrawlPlan`] before crawling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// URL to start the crawl; a URL ending in `sitemap.xml` seeds from the sitemap
    #[serde(default)]
    pub url: String,

    /// Glob pattern(s) a discovered link must match to be crawled
    #[serde(rename = "match", default)]
    pub match_pattern: MatchPattern,

    /// Selector to grab the text from; a leading `/` makes it an XPath query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Don't crawl more than this many pages
    #[serde(default = "default_max_pages")]
    pub max_pages_to_crawl: usize,

    /// File name for the finished data
    #[serde(default = "default_output_file_name")]
    pub output_file_name: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<CookieConfig>,

    /// Milliseconds to wait for the selector to appear
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_selector_timeout: Option<u64>,

    /// File extensions of sub-resources to abort (`png`, `woff2`, ...)
    #[serde(default)]
    pub resource_exclusions: Vec<String>,

    /// Milliseconds to pause after each page before enqueuing its links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crawl_interval: Option<u64>,

    /// Whether to seed only from a links file
    #[serde(default)]
    pub crawl_from_links_file: bool,

    /// Name of the links file, if `crawl_from_links_file` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links_file_name: Option<String>,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Number of concurrent browser sessions
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Retries for a request whose visit failed
    #[serde(default = "default_max_request_retries")]
    pub max_request_retries: usize,

    /// Run the browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Directory holding the individually persisted records
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Empty the record store before crawling
    #[serde(default = "default_true")]
    pub purge_on_start: bool,
}

fn default_max_pages() -> usize {
    50
}

fn default_output_file_name() -> PathBuf {
    PathBuf::from("output.json")
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

fn default_max_request_retries() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            match_pattern: MatchPattern::default(),
            selector: None,
            max_pages_to_crawl: default_max_pages(),
            output_file_name: default_output_file_name(),
            cookie: None,
            wait_for_selector_timeout: None,
            resource_exclusions: Vec::new(),
            crawl_interval: None,
            crawl_from_links_file: false,
            links_file_name: None,
            webdriver_url: default_webdriver_url(),
            max_concurrency: default_max_concurrency(),
            max_request_retries: default_max_request_retries(),
            headless: true,
            storage_dir: default_storage_dir(),
            purge_on_start: true,
        }
    }
}

impl Config {
    /// Create a configuration with default values for the given start URL
    /// and link pattern
    pub fn new(url: &str, match_pattern: impl Into<MatchPattern>) -> Self {
        Self {
            url: url.to_string(),
            match_pattern: match_pattern.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| CrawlError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, CrawlError> {
        serde_json::from_str(json).map_err(CrawlError::ConfigParse)
    }

    /// Check the configuration and resolve everything that only needs to be
    /// decided once: seed mode, selector kind, compiled link globs.
    pub fn validate(&self) -> Result<CrawlPlan, CrawlError> {
        if self.max_pages_to_crawl == 0 {
            return Err(invalid("maxPagesToCrawl must be a positive integer"));
        }
        if self.max_concurrency == 0 {
            return Err(invalid("maxConcurrency must be a positive integer"));
        }
        if self.match_pattern.is_empty() {
            return Err(invalid("match must contain at least one glob pattern"));
        }
        if self.output_file_name.as_os_str().is_empty() {
            return Err(invalid("outputFileName must not be empty"));
        }

        let seed = SeedMode::select(
            &self.url,
            self.crawl_from_links_file,
            self.links_file_name.as_deref(),
        );
        match &seed {
            SeedMode::LinksFile(_) => {}
            SeedMode::Sitemap(url) | SeedMode::Direct(url) => check_start_url(url)?,
        }

        let matcher = LinkMatcher::from_pattern(&self.match_pattern)
            .map_err(|e| invalid(&format!("invalid match pattern: {}", e)))?;

        if let Some(cookie) = &self.cookie {
            if cookie.name.trim().is_empty() {
                return Err(invalid("cookie name must not be empty"));
            }
        }

        Ok(CrawlPlan {
            seed,
            matcher,
            selector: self.selector.as_deref().and_then(Selector::parse),
            max_pages: self.max_pages_to_crawl,
            output_file: self.output_file_name.clone(),
            cookie: self.cookie.clone(),
            selector_timeout: self
                .wait_for_selector_timeout
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SELECTOR_TIMEOUT),
            resources: ResourceFilter::new(&self.resource_exclusions),
            crawl_interval: self
                .crawl_interval
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            max_concurrency: self.max_concurrency,
            max_request_retries: self.max_request_retries,
            storage_dir: self.storage_dir.clone(),
            purge_on_start: self.purge_on_start,
        })
    }
}

fn check_start_url(url: &str) -> Result<(), CrawlError> {
    if url.is_empty() {
        return Err(invalid("url is required unless crawling from a links file"));
    }
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Ok(parsed) => Err(invalid(&format!(
            "url must be http or https, got scheme `{}`",
            parsed.scheme()
        ))),
        Err(e) => Err(invalid(&format!("url `{}` is not valid: {}", url, e))),
    }
}

fn invalid(message: &str) -> CrawlError {
    CrawlError::Config(message.to_string())
}

/// A validated crawl run, ready for the driver
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    pub seed: SeedMode,
    pub matcher: LinkMatcher,
    pub selector: Option<Selector>,
    pub max_pages: usize,
    pub output_file: PathBuf,
    pub cookie: Option<CookieConfig>,
    pub selector_timeout: Duration,
    pub resources: ResourceFilter,
    pub crawl_interval: Option<Duration>,
    pub max_concurrency: usize,
    pub max_request_retries: usize,
    pub storage_dir: PathBuf,
    pub purge_on_start: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config = Config::from_json(
            r#"{ "url": "https://ex.com", "match": "https://ex.com/blog/**" }"#,
        )
        .unwrap();

        assert_eq!(config.max_pages_to_crawl, 50);
        assert_eq!(config.output_file_name, PathBuf::from("output.json"));
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert_eq!(config.max_request_retries, 3);
        assert!(config.headless);
        assert!(config.purge_on_start);
        assert!(!config.crawl_from_links_file);

        let plan = config.validate().unwrap();
        assert_eq!(plan.seed, SeedMode::Direct("https://ex.com".to_string()));
        assert_eq!(plan.selector, None);
        assert_eq!(plan.selector_timeout, Duration::from_millis(1000));
        assert!(plan.resources.is_empty());
        assert_eq!(plan.crawl_interval, None);
    }

    #[test]
    fn test_full_json_surface() {
        let config = Config::from_json(
            r#"{
                "url": "https://ex.com/sitemap.xml",
                "match": ["https://ex.com/a/**", "https://ex.com/b/**"],
                "selector": "//main",
                "maxPagesToCrawl": 10,
                "outputFileName": "out.json",
                "cookie": { "name": "consent", "value": "yes" },
                "waitForSelectorTimeout": 2500,
                "resourceExclusions": ["png", "jpg"],
                "crawlInterval": 2000,
                "crawlFromLinksFile": false,
                "linksFileName": "links.txt"
            }"#,
        )
        .unwrap();

        let plan = config.validate().unwrap();
        assert_eq!(
            plan.seed,
            SeedMode::Sitemap("https://ex.com/sitemap.xml".to_string())
        );
        assert_eq!(plan.selector, Some(Selector::PathQuery("//main".to_string())));
        assert_eq!(plan.max_pages, 10);
        assert_eq!(plan.output_file, PathBuf::from("out.json"));
        assert_eq!(plan.selector_timeout, Duration::from_millis(2500));
        assert_eq!(plan.crawl_interval, Some(Duration::from_millis(2000)));
        assert_eq!(plan.resources.extensions().len(), 2);
        assert_eq!(plan.matcher.globs().len(), 2);
        assert_eq!(plan.cookie.unwrap().name, "consent");
    }

    #[test]
    fn test_links_file_mode_needs_no_url() {
        let mut config = Config::new("", "https://ex.com/**");
        config.crawl_from_links_file = true;
        config.links_file_name = Some("links.txt".to_string());

        let plan = config.validate().unwrap();
        assert_eq!(plan.seed, SeedMode::LinksFile(PathBuf::from("links.txt")));
    }

    #[test]
    fn test_rejects_invalid_configurations() {
        let mut config = Config::new("https://ex.com", "https://ex.com/**");
        config.max_pages_to_crawl = 0;
        assert!(matches!(config.validate(), Err(CrawlError::Config(_))));

        let config = Config::new("", "https://ex.com/**");
        assert!(matches!(config.validate(), Err(CrawlError::Config(_))));

        let config = Config::new("ftp://ex.com", "https://ex.com/**");
        assert!(matches!(config.validate(), Err(CrawlError::Config(_))));

        let config = Config::new("https://ex.com", "");
        assert!(matches!(config.validate(), Err(CrawlError::Config(_))));

        let config = Config::new("https://ex.com", "https://ex.com/{a,b");
        assert!(matches!(config.validate(), Err(CrawlError::Config(_))));

        let mut config = Config::new("https://ex.com", "https://ex.com/**");
        config.cookie = Some(CookieConfig {
            name: " ".to_string(),
            value: "v".to_string(),
        });
        assert!(matches!(config.validate(), Err(CrawlError::Config(_))));

        let mut config = Config::new("https://ex.com", "https://ex.com/**");
        config.max_concurrency = 0;
        assert!(matches!(config.validate(), Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_links_flag_without_file_name_falls_back_to_url() {
        let mut config = Config::new("https://ex.com", "https://ex.com/**");
        config.crawl_from_links_file = true;

        let plan = config.validate().unwrap();
        assert_eq!(plan.seed, SeedMode::Direct("https://ex.com".to_string()));
    }

    #[test]
    fn test_zero_interval_disables_throttle() {
        let mut config = Config::new("https://ex.com", "https://ex.com/**");
        config.crawl_interval = Some(0);
        assert_eq!(config.validate().unwrap().crawl_interval, None);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "url": "https://ex.com", "match": "https://ex.com/**" }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.url, "https://ex.com");

        let err = Config::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CrawlError::ConfigFile { .. }));

        fs::write(&path, "{ broken").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(CrawlError::ConfigParse(_))
        ));
    }
}
