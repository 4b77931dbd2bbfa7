use clap::Parser;
use site_harvest::{Config, CrawlError, MatchPattern};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "site-harvest")]
#[command(about = "Crawl a site in a browser and collect page text into one JSON file")]
#[command(version)]
pub struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// First URL of the website to crawl (a sitemap.xml URL seeds from the sitemap)
    #[arg(short, long)]
    pub url: Option<String>,

    /// URL glob pattern of links to follow (repeatable)
    #[arg(short = 'm', long = "match")]
    pub match_patterns: Vec<String>,

    /// CSS selector (or XPath starting with `/`) to take the text from
    #[arg(short, long)]
    pub selector: Option<String>,

    /// Maximum number of pages to crawl
    #[arg(long, visible_alias = "max-pages-to-crawl")]
    pub max_pages: Option<usize>,

    /// Name of the output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pause in milliseconds after each page
    #[arg(long)]
    pub crawl_interval: Option<u64>,

    /// Seed the crawl from a links file instead of the URL
    #[arg(long)]
    pub crawl_from_links_file: bool,

    /// Name of the links file
    #[arg(long)]
    pub links_file_name: Option<String>,

    /// URL of the WebDriver server
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Number of concurrent browser sessions
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Skip the crawl and only rebuild the output from persisted records
    #[arg(long)]
    pub write_only: bool,
}

impl Args {
    /// Merge the flags over the configuration file (or the defaults)
    pub fn to_config(&self) -> Result<Config, CrawlError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        match self.match_patterns.as_slice() {
            [] => {}
            [single] => config.match_pattern = MatchPattern::Single(single.clone()),
            many => config.match_pattern = MatchPattern::Many(many.to_vec()),
        }
        if let Some(selector) = &self.selector {
            config.selector = Some(selector.clone());
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages_to_crawl = max_pages;
        }
        if let Some(output) = &self.output {
            config.output_file_name = output.clone();
        }
        if let Some(interval) = self.crawl_interval {
            config.crawl_interval = Some(interval);
        }
        if self.crawl_from_links_file {
            config.crawl_from_links_file = true;
        }
        if let Some(links_file) = &self.links_file_name {
            config.links_file_name = Some(links_file.clone());
        }
        if config.crawl_from_links_file && config.links_file_name.is_none() {
            config.links_file_name = Some("links.txt".to_string());
        }
        if let Some(webdriver_url) = &self.webdriver_url {
            config.webdriver_url = webdriver_url.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrency = concurrency;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_build_config() {
        let args = Args::parse_from([
            "site-harvest",
            "-u",
            "https://ex.com",
            "-m",
            "https://ex.com/blog/**",
            "-s",
            "article",
            "--max-pages",
            "3",
        ]);
        let config = args.to_config().unwrap();

        assert_eq!(config.url, "https://ex.com");
        assert_eq!(
            config.match_pattern,
            MatchPattern::Single("https://ex.com/blog/**".to_string())
        );
        assert_eq!(config.selector.as_deref(), Some("article"));
        assert_eq!(config.max_pages_to_crawl, 3);
    }

    #[test]
    fn test_repeated_match_and_links_file_default() {
        let args = Args::parse_from([
            "site-harvest",
            "-m",
            "https://ex.com/a/**",
            "-m",
            "https://ex.com/b/**",
            "--crawl-from-links-file",
        ]);
        let config = args.to_config().unwrap();

        assert_eq!(config.match_pattern.patterns().len(), 2);
        assert_eq!(config.links_file_name.as_deref(), Some("links.txt"));
    }
}
