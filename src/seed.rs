use crate::error::CrawlError;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

static LOC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").expect("sitemap <loc> pattern should be valid")
});

/// Where the initial request set comes from, decided once at validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedMode {
    /// Newline-delimited URLs in a local file
    LinksFile(PathBuf),
    /// A sitemap whose `<loc>` entries seed the queue
    Sitemap(String),
    /// A single start URL
    Direct(String),
}

impl SeedMode {
    /// Pick the seed mode: a links file wins, then a URL ending in
    /// `sitemap.xml`, then the plain URL.
    pub fn select(url: &str, crawl_from_links_file: bool, links_file: Option<&str>) -> Self {
        match links_file {
            Some(path) if crawl_from_links_file && !path.trim().is_empty() => {
                SeedMode::LinksFile(PathBuf::from(path))
            }
            _ if url.trim_end().ends_with("sitemap.xml") => SeedMode::Sitemap(url.trim().to_string()),
            _ => SeedMode::Direct(url.trim().to_string()),
        }
    }

    /// Resolve the mode to the initial request URLs
    pub async fn resolve(&self) -> Result<Vec<String>, CrawlError> {
        match self {
            SeedMode::LinksFile(path) => {
                let links = read_links_file(path)?;
                ::log::info!("Seeding {} URLs from links file {}", links.len(), path.display());
                Ok(links)
            }
            SeedMode::Sitemap(url) => {
                let links = download_sitemap(url).await?;
                ::log::info!("Seeding {} URLs from sitemap {}", links.len(), url);
                Ok(links)
            }
            SeedMode::Direct(url) => Ok(vec![url.clone()]),
        }
    }
}

/// Non-empty lines of the links file, in file order
pub fn read_links_file(path: &std::path::Path) -> Result<Vec<String>, CrawlError> {
    let contents = fs::read_to_string(path).map_err(|source| CrawlError::LinksFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_links(&contents))
}

/// Split newline-delimited URLs, skipping blank lines
pub fn parse_links(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fetch a sitemap over HTTP and return its URL list
pub async fn download_sitemap(url: &str) -> Result<Vec<String>, CrawlError> {
    let sitemap_error = |source| CrawlError::Sitemap {
        url: url.to_string(),
        source,
    };

    let body = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(sitemap_error)?
        .text()
        .await
        .map_err(sitemap_error)?;

    Ok(parse_sitemap(&body))
}

/// `<loc>` entries of a sitemap document in document order
pub fn parse_sitemap(xml: &str) -> Vec<String> {
    LOC_REGEX
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_xml(strip_cdata(m.as_str().trim())))
        .filter(|loc| !loc.is_empty())
        .collect()
}

fn strip_cdata(value: &str) -> &str {
    value
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .map(str::trim)
        .unwrap_or(value)
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
