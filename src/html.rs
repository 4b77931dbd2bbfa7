use crate::filter::normalize_url;
use scraper::{Html, Selector};
use url::Url;

/// Extracts the outbound links of a rendered document.
///
/// Every `a[href]` is resolved against `base` (the loaded URL). Non-http(s)
/// targets are dropped, fragments are stripped and duplicates removed while
/// keeping document order.
pub fn discover_links(html: &str, base: &str) -> Vec<String> {
    let base = match Url::parse(base) {
        Ok(base) => base,
        Err(e) => {
            ::log::warn!("Cannot resolve links against invalid base {}: {}", base, e);
            return Vec::new();
        }
    };

    let doc = Html::parse_document(html);
    let link_selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    let mut links: Vec<String> = Vec::new();
    for href in doc
        .select(&link_selector)
        .filter_map(|e| e.value().attr("href"))
    {
        let resolved = match base.join(href.trim()) {
            Ok(resolved) => resolved,
            Err(_) => continue,
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }

        let normalized = normalize_url(&resolved).to_string();
        if !links.contains(&normalized) {
            links.push(normalized);
        }
    }

    ::log::debug!("Discovered {} links on {}", links.len(), base);
    links
}
