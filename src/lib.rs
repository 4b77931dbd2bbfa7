// Re-export modules
pub mod aggregate;
pub mod config;
pub mod crawlers;
pub mod error;
pub mod extract;
pub mod filter;
pub mod html;
pub mod resources;
pub mod results;
pub mod seed;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{Config, CookieConfig, CrawlPlan};
pub use crawlers::{PageSession, SessionFactory, VisitHook, VisitPage, WebCrawler};
pub use error::{CrawlError, SessionError, VisitError};
pub use extract::Selector;
pub use filter::{LinkMatcher, MatchPattern};
pub use results::{CrawlStats, PageRecord};
pub use seed::SeedMode;

use std::sync::Arc;

/// Environment variable that, set to `"true"`, skips navigation so only
/// the output file is rebuilt from already persisted records
pub const NO_CRAWL_ENV: &str = "NO_CRAWL";

/// Whether the environment asks to skip the crawl
pub fn crawl_disabled() -> bool {
    is_disabled_flag(std::env::var(NO_CRAWL_ENV).ok().as_deref())
}

fn is_disabled_flag(value: Option<&str>) -> bool {
    value == Some("true")
}

/// Crawl with browser sessions from the configured WebDriver server.
///
/// The `WEBDRIVER_URL` environment variable overrides the configured
/// endpoint.
pub async fn crawl(config: &Config) -> Result<CrawlStats, CrawlError> {
    let mut webdriver_url = config.webdriver_url.clone();
    if let Ok(from_env) = std::env::var("WEBDRIVER_URL") {
        if !from_env.is_empty() {
            webdriver_url = from_env;
        }
    }

    let factory = Arc::new(crawlers::WebDriverFactory::new(
        webdriver_url,
        config.headless,
    ));
    crawl_with(config, factory, None).await
}

/// Crawl using the given session factory and optional page hook, unless
/// the `NO_CRAWL` environment variable asks to skip it.
pub async fn crawl_with(
    config: &Config,
    factory: Arc<dyn SessionFactory>,
    hook: Option<Arc<dyn VisitHook>>,
) -> Result<CrawlStats, CrawlError> {
    crawl_with_options(config, factory, hook, crawl_disabled()).await
}

/// Like [`crawl_with`], with the skip decision made by the caller.
///
/// The configuration is validated first; seeds are resolved before any
/// navigation, so an unreadable links file or sitemap aborts the run
/// without visiting anything. A skipped run leaves the record store
/// untouched.
pub async fn crawl_with_options(
    config: &Config,
    factory: Arc<dyn SessionFactory>,
    hook: Option<Arc<dyn VisitHook>>,
    skip_crawl: bool,
) -> Result<CrawlStats, CrawlError> {
    let plan = config.validate()?;

    if skip_crawl {
        ::log::info!("{}=true, skipping the crawl", NO_CRAWL_ENV);
        return Ok(CrawlStats::default());
    }

    let seeds = plan.seed.resolve().await?;
    let mut crawler = WebCrawler::new(plan, factory);
    if let Some(hook) = hook {
        crawler = crawler.with_visit_hook(hook);
    }
    crawler.run(seeds).await
}

/// Aggregate every persisted record into the configured output file.
/// Returns the number of records written.
pub fn write(config: &Config) -> Result<usize, CrawlError> {
    let plan = config.validate()?;
    aggregate::write_output(&plan.storage_dir, &plan.output_file)
}
