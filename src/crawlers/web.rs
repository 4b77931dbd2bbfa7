use crate::config::CrawlPlan;
use crate::crawlers::session::{PageSession, SessionFactory};
use crate::crawlers::visit::{VisitHandler, VisitHook};
use crate::error::CrawlError;
use crate::filter::normalize_str;
use crate::results::CrawlStats;
use crate::storage::Dataset;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinSet;

/// Request queue with deduplication and the page budget.
///
/// A visit is "started" when it leaves the queue; once `max_pages` visits
/// have started no further request is handed out, even if the queue still
/// holds links. Visits already in flight run to completion.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<String>,
    seen: HashSet<String>,
    started: usize,
    in_flight: usize,
    max_pages: usize,
}

/// What a worker should do next
#[derive(Debug, PartialEq, Eq)]
pub enum Next {
    /// Visit this URL
    Visit(String),
    /// Nothing queued yet, but in-flight visits may still add links
    Wait,
    /// The queue is drained or the budget is spent
    Done,
}

impl Frontier {
    pub fn new(max_pages: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            started: 0,
            in_flight: 0,
            max_pages,
        }
    }

    /// Queue a URL unless its normalized form was seen before.
    /// Returns whether it was queued.
    pub fn push(&mut self, url: &str) -> bool {
        let normalized = match normalize_str(url) {
            Some(normalized) => normalized,
            None => {
                ::log::warn!("Skipping invalid request URL: {}", url);
                return false;
            }
        };

        if !self.seen.insert(normalized.clone()) {
            ::log::trace!("Skipping already visited or queued link: {}", normalized);
            return false;
        }

        ::log::debug!("Queuing link for crawling: {}", normalized);
        self.queue.push_back(normalized);
        true
    }

    /// Hand out the next request if the budget allows
    pub fn next(&mut self) -> Next {
        if self.started >= self.max_pages {
            return Next::Done;
        }

        match self.queue.pop_front() {
            Some(url) => {
                self.started += 1;
                self.in_flight += 1;
                Next::Visit(url)
            }
            None if self.in_flight > 0 => Next::Wait,
            None => Next::Done,
        }
    }

    /// Mark an in-flight visit as finished
    pub fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn started(&self) -> usize {
        self.started
    }

    pub fn seen(&self) -> usize {
        self.seen.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// State shared by every worker of one run
struct RunState {
    frontier: Mutex<Frontier>,
    wake: Notify,
    handler: VisitHandler,
    factory: Arc<dyn SessionFactory>,
    max_request_retries: usize,
    visited: AtomicUsize,
    failed: AtomicUsize,
}

/// Drives a crawl run over a pool of browser sessions
pub struct WebCrawler {
    plan: Arc<CrawlPlan>,
    factory: Arc<dyn SessionFactory>,
    hook: Option<Arc<dyn VisitHook>>,
}

impl WebCrawler {
    pub fn new(plan: CrawlPlan, factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            plan: Arc::new(plan),
            factory,
            hook: None,
        }
    }

    /// Run this hook on every visited page
    pub fn with_visit_hook(mut self, hook: Arc<dyn VisitHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Crawl from the given seeds until the queue drains or the page budget
    /// is spent.
    pub async fn run(&self, seeds: Vec<String>) -> Result<CrawlStats, CrawlError> {
        let dataset = Dataset::open(&self.plan.storage_dir)?;
        if self.plan.purge_on_start {
            let purged = dataset.purge()?;
            ::log::info!(
                "Purged {} previous records from {}",
                purged,
                dataset.dir().display()
            );
        }

        let mut frontier = Frontier::new(self.plan.max_pages);
        for seed in &seeds {
            frontier.push(seed);
        }
        ::log::info!(
            "Starting crawl with {} requests (budget {} pages, {} workers)",
            frontier.pending(),
            self.plan.max_pages,
            self.plan.max_concurrency
        );

        let state = Arc::new(RunState {
            frontier: Mutex::new(frontier),
            wake: Notify::new(),
            handler: VisitHandler::new(
                Arc::clone(&self.plan),
                Arc::new(dataset),
                self.hook.clone(),
            ),
            factory: Arc::clone(&self.factory),
            max_request_retries: self.plan.max_request_retries,
            visited: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        });

        let start_time = std::time::Instant::now();
        let mut workers = JoinSet::new();
        for worker_id in 0..self.plan.max_concurrency {
            ::log::trace!("Spawning worker {}", worker_id);
            workers.spawn(worker_loop(worker_id, Arc::clone(&state)));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                ::log::error!("Crawl worker terminated abnormally: {}", e);
            }
        }

        let frontier = state.frontier.lock().await;
        let stats = CrawlStats {
            pages_visited: state.visited.load(Ordering::SeqCst),
            pages_failed: state.failed.load(Ordering::SeqCst),
            requests_seen: frontier.seen(),
        };
        ::log::info!(
            "Crawl finished in {:.2} seconds: {} visited, {} failed, {} pages loaded, {} of {} budget started",
            start_time.elapsed().as_secs_f64(),
            stats.pages_visited,
            stats.pages_failed,
            state.handler.pages_started(),
            frontier.started(),
            self.plan.max_pages
        );
        Ok(stats)
    }
}

/// Takes requests from the frontier until there is nothing left to do.
/// The browser session is opened lazily on the first request.
async fn worker_loop(worker_id: usize, state: Arc<RunState>) {
    ::log::debug!("Worker {} starting processing loop", worker_id);
    let mut session: Option<Box<dyn PageSession>> = None;

    loop {
        let url = {
            let mut frontier = state.frontier.lock().await;
            match frontier.next() {
                Next::Visit(url) => url,
                Next::Wait => {
                    // Registered before the lock is released so no wakeup is lost
                    let notified = state.wake.notified();
                    drop(frontier);
                    notified.await;
                    continue;
                }
                Next::Done => break,
            }
        };

        let links = process_request(worker_id, &state, &mut session, &url).await;

        {
            let mut frontier = state.frontier.lock().await;
            for link in links.iter().flatten() {
                frontier.push(link);
            }
            frontier.finish();
        }
        state.wake.notify_waiters();
    }

    state.wake.notify_waiters();
    if let Some(session) = session {
        if let Err(e) = session.close().await {
            ::log::warn!("Worker {} failed to close session: {}", worker_id, e);
        }
    }
    ::log::debug!("Worker {} completed processing loop", worker_id);
}

/// Visit one request with retries. Returns the links to enqueue, or `None`
/// when every attempt failed.
async fn process_request(
    worker_id: usize,
    state: &RunState,
    session: &mut Option<Box<dyn PageSession>>,
    url: &str,
) -> Option<Vec<String>> {
    let attempts = state.max_request_retries + 1;
    let mut persisted = None;

    for attempt in 1..=attempts {
        if session.is_none() {
            match state.factory.open(worker_id).await {
                Ok(opened) => *session = Some(opened),
                Err(e) => {
                    ::log::error!(
                        "Worker {} could not open a browser session for {} (attempt {}/{}): {}",
                        worker_id,
                        url,
                        attempt,
                        attempts,
                        e
                    );
                    continue;
                }
            }
        }
        let Some(current) = session.as_deref() else {
            continue;
        };

        let reopen = match state.handler.visit(current, url, &mut persisted).await {
            Ok(links) => {
                state.visited.fetch_add(1, Ordering::SeqCst);
                return Some(links);
            }
            Err(e) => {
                ::log::warn!(
                    "Worker {} failed to visit {} (attempt {}/{}): {}",
                    worker_id,
                    url,
                    attempt,
                    attempts,
                    e
                );
                e.needs_new_session()
            }
        };

        if reopen {
            if let Some(stale) = session.take() {
                if let Err(e) = stale.close().await {
                    ::log::warn!("Worker {} failed to close session: {}", worker_id, e);
                }
            }
        }
    }

    state.failed.fetch_add(1, Ordering::SeqCst);
    ::log::error!("Request {} failed after {} attempts", url, attempts);
    None
}
