use crate::config::CrawlPlan;
use crate::crawlers::session::PageSession;
use crate::error::{CrawlError, VisitError};
use crate::extract::{extract_text, wait_for_selector};
use crate::html::discover_links;
use crate::results::PageRecord;
use crate::storage::Dataset;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a page hook gets to work with: the live page and a way to persist
/// additional records.
pub struct VisitPage<'a> {
    session: &'a dyn PageSession,
    dataset: &'a Dataset,
    url: &'a str,
}

impl<'a> VisitPage<'a> {
    pub fn new(session: &'a dyn PageSession, dataset: &'a Dataset, url: &'a str) -> Self {
        Self {
            session,
            dataset,
            url,
        }
    }

    /// The browser page currently showing the visited document
    pub fn page(&self) -> &dyn PageSession {
        self.session
    }

    /// Loaded URL of the visited page
    pub fn url(&self) -> &str {
        self.url
    }

    /// Persist a record alongside the one the crawler already wrote
    pub fn persist(&self, record: &PageRecord) -> Result<PathBuf, CrawlError> {
        self.dataset.push(record)
    }
}

/// User code run on every visited page, after its record is persisted.
///
/// An error fails the visit like any other per-page error.
#[async_trait]
pub trait VisitHook: Send + Sync {
    async fn on_visit(&self, page: &VisitPage<'_>) -> anyhow::Result<()>;
}

/// Per-run page visit logic shared by all workers
pub struct VisitHandler {
    plan: Arc<CrawlPlan>,
    dataset: Arc<Dataset>,
    hook: Option<Arc<dyn VisitHook>>,
    pages_started: AtomicUsize,
}

impl VisitHandler {
    pub fn new(
        plan: Arc<CrawlPlan>,
        dataset: Arc<Dataset>,
        hook: Option<Arc<dyn VisitHook>>,
    ) -> Self {
        Self {
            plan,
            dataset,
            hook,
            pages_started: AtomicUsize::new(0),
        }
    }

    /// Pages that reached the progress log line so far
    pub fn pages_started(&self) -> usize {
        self.pages_started.load(Ordering::Relaxed)
    }

    /// Install the resource exclusions on the session. No-op when the
    /// exclusion list is empty.
    pub async fn before_navigation(&self, session: &dyn PageSession) -> Result<(), VisitError> {
        if self.plan.resources.is_empty() {
            return Ok(());
        }
        session
            .block_resources(&self.plan.resources.block_patterns())
            .await?;
        ::log::debug!(
            "Aborting requests for excluded resources: {}",
            self.plan.resources.extensions().join(",")
        );
        Ok(())
    }

    /// Visit one request and return the discovered links eligible for the
    /// queue.
    ///
    /// `persisted` carries the record written by an earlier attempt of the
    /// same request; when set, the page is not persisted again.
    pub async fn visit(
        &self,
        session: &dyn PageSession,
        request_url: &str,
        persisted: &mut Option<PathBuf>,
    ) -> Result<Vec<String>, VisitError> {
        self.before_navigation(session).await?;
        session
            .goto(request_url)
            .await
            .map_err(VisitError::Navigation)?;

        let loaded_url = session.current_url().await?;

        if let Some(cookie) = &self.plan.cookie {
            session
                .add_cookie(&cookie.name, &cookie.value, &loaded_url)
                .await?;
        }

        let title = session.title().await?;
        let page_number = self.pages_started.fetch_add(1, Ordering::Relaxed) + 1;
        ::log::info!(
            "Crawling: Page {} / {} - URL: {}...",
            page_number,
            self.plan.max_pages,
            loaded_url
        );

        if let Some(selector) = &self.plan.selector {
            wait_for_selector(session, selector, self.plan.selector_timeout).await?;
        }

        let text = extract_text(session, self.plan.selector.as_ref()).await?;
        match persisted {
            Some(path) => {
                ::log::debug!("Record for {} already at {}", loaded_url, path.display());
            }
            None => {
                let record = PageRecord::new(title, loaded_url.clone(), text);
                let path = self
                    .dataset
                    .push(&record)
                    .map_err(|e| VisitError::Persist(Box::new(e)))?;
                *persisted = Some(path);
            }
        }

        if let Some(hook) = &self.hook {
            let page = VisitPage::new(session, &self.dataset, &loaded_url);
            hook.on_visit(&page).await.map_err(VisitError::Hook)?;
        }

        if let Some(interval) = self.plan.crawl_interval {
            tokio::time::sleep(interval).await;
        }

        let source = session.source().await?;
        let links = discover_links(&source, &loaded_url);
        let eligible = self.plan.matcher.filter(&links);
        ::log::debug!(
            "{} of {} links on {} match the crawl pattern",
            eligible.len(),
            links.len(),
            loaded_url
        );
        Ok(eligible)
    }
}
