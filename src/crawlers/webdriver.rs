use crate::crawlers::session::{PageSession, SessionFactory};
use crate::error::SessionError;
use crate::extract::Selector;
use async_trait::async_trait;
use fantoccini::cookies::Cookie;
use fantoccini::error::CmdError;
use fantoccini::wd::{Capabilities, WebDriverCompatibleCommand};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Endpoints tried when the configured WebDriver URL refuses the connection
const FALLBACK_WEBDRIVER_URLS: [&str; 3] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// Opens fantoccini sessions against a WebDriver server
#[derive(Debug, Clone)]
pub struct WebDriverFactory {
    webdriver_url: String,
    headless: bool,
}

impl WebDriverFactory {
    pub fn new(webdriver_url: impl Into<String>, headless: bool) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            headless,
        }
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::new();
        if self.headless {
            caps.insert(
                "goog:chromeOptions".to_string(),
                json!({ "args": ["--headless=new", "--disable-gpu"] }),
            );
        }
        caps
    }

    async fn connect(&self, webdriver_url: &str) -> Result<Client, SessionError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());
        Ok(builder.connect(webdriver_url).await?)
    }
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    async fn open(&self, worker_id: usize) -> Result<Box<dyn PageSession>, SessionError> {
        let first_error = match self.connect(&self.webdriver_url).await {
            Ok(client) => {
                ::log::debug!(
                    "Worker {} connected to WebDriver at {}",
                    worker_id,
                    self.webdriver_url
                );
                return Ok(Box::new(WebDriverSession::new(client)));
            }
            Err(e) => {
                ::log::error!(
                    "Worker {} failed to connect to WebDriver at {}: {}",
                    worker_id,
                    self.webdriver_url,
                    e
                );
                e
            }
        };

        for url in FALLBACK_WEBDRIVER_URLS {
            if url == self.webdriver_url {
                continue;
            }

            ::log::info!("Worker {} trying fallback WebDriver URL: {}", worker_id, url);
            if let Ok(client) = self.connect(url).await {
                ::log::debug!(
                    "Worker {} connected to fallback WebDriver at {}",
                    worker_id,
                    url
                );
                return Ok(Box::new(WebDriverSession::new(client)));
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(first_error)
    }
}

/// A browser page backed by a fantoccini client
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn evaluate_path(&self, xpath: &str) -> Result<Option<String>, SessionError> {
        let value = self
            .client
            .execute(EVALUATE_PATH_SCRIPT, vec![json!(xpath)])
            .await?;
        path_text(xpath, value)
    }

    async fn cdp(&self, cmd: &'static str, params: serde_json::Value) -> Result<(), SessionError> {
        self.client.issue_cmd(CdpCommand { cmd, params }).await?;
        Ok(())
    }
}

/// Text content of the first node an XPath expression yields, or null.
/// Works for attribute and text nodes too, which element lookups reject.
const EVALUATE_PATH_SCRIPT: &str = r#"
const result = document.evaluate(arguments[0], document, null, XPathResult.ANY_TYPE, null);
const node = result.iterateNext();
return node ? (node.textContent || "") : null;
"#;

/// Cookie for the page being visited. Without a domain, WebDriver scopes it
/// to the current host only.
fn page_cookie(name: &str, value: &str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_string(), value.to_string());
    cookie.set_path("/");
    cookie
}

fn path_text(xpath: &str, value: serde_json::Value) -> Result<Option<String>, SessionError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(text) => Ok(Some(text)),
        other => Err(SessionError::Other(format!(
            "unexpected result evaluating {}: {}",
            xpath, other
        ))),
    }
}

#[async_trait]
impl PageSession for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<(), SessionError> {
        Ok(self.client.goto(url).await?)
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn title(&self) -> Result<String, SessionError> {
        Ok(self.client.title().await?)
    }

    async fn source(&self) -> Result<String, SessionError> {
        Ok(self.client.source().await?)
    }

    async fn add_cookie(&self, name: &str, value: &str, url: &str) -> Result<(), SessionError> {
        ::log::trace!("Setting cookie {} for {}", name, url);
        Ok(self.client.add_cookie(page_cookie(name, value)).await?)
    }

    async fn wait_for_css(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, SessionError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(_) => Ok(true),
            Err(CmdError::WaitTimeout) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, selector: &Selector) -> Result<bool, SessionError> {
        match selector {
            Selector::Css(css) => {
                let found = self.client.find_all(Locator::Css(css)).await?;
                Ok(!found.is_empty())
            }
            Selector::PathQuery(xpath) => Ok(self.evaluate_path(xpath).await?.is_some()),
        }
    }

    async fn inner_text(&self, selector: &Selector) -> Result<Option<String>, SessionError> {
        match selector {
            Selector::Css(css) => {
                let found = self.client.find_all(Locator::Css(css)).await?;
                match found.into_iter().next() {
                    Some(element) => Ok(Some(element.text().await?)),
                    None => Ok(None),
                }
            }
            Selector::PathQuery(xpath) => self.evaluate_path(xpath).await,
        }
    }

    async fn block_resources(&self, patterns: &[String]) -> Result<(), SessionError> {
        self.cdp("Network.enable", json!({})).await?;
        self.cdp("Network.setBlockedURLs", json!({ "urls": patterns }))
            .await
    }

    async fn close(&self) -> Result<(), SessionError> {
        Ok(self.client.clone().close().await?)
    }
}

/// Chrome DevTools command tunnelled through ChromeDriver's vendor endpoint
#[derive(Debug)]
struct CdpCommand {
    cmd: &'static str,
    params: serde_json::Value,
}

impl WebDriverCompatibleCommand for CdpCommand {
    fn endpoint(
        &self,
        base_url: &Url,
        session_id: Option<&str>,
    ) -> Result<Url, url::ParseError> {
        let session_id = session_id.unwrap_or_default();
        base_url.join(&format!("session/{}/goog/cdp/execute", session_id))
    }

    fn method_and_body(&self, _request_url: &Url) -> (http::Method, Option<String>) {
        let body = json!({ "cmd": self.cmd, "params": self.params });
        (http::Method::POST, Some(body.to_string()))
    }
}
