use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// One glob or an ordered list of globs, as written in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchPattern {
    Single(String),
    Many(Vec<String>),
}

impl MatchPattern {
    /// The patterns as a slice, whatever form they were given in
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            MatchPattern::Single(p) => vec![p.as_str()],
            MatchPattern::Many(ps) => ps.iter().map(String::as_str).collect(),
        }
    }

    /// True when no usable pattern is present
    pub fn is_empty(&self) -> bool {
        self.patterns().iter().all(|p| p.trim().is_empty())
    }
}

impl Default for MatchPattern {
    fn default() -> Self {
        MatchPattern::Many(Vec::new())
    }
}

impl From<&str> for MatchPattern {
    fn from(pattern: &str) -> Self {
        MatchPattern::Single(pattern.to_string())
    }
}

impl From<Vec<String>> for MatchPattern {
    fn from(patterns: Vec<String>) -> Self {
        MatchPattern::Many(patterns)
    }
}

/// Decides which discovered links are eligible for the queue
///
/// Globs are compiled once into anchored regexes. A link is eligible iff it
/// matches at least one of them.
#[derive(Debug, Clone)]
pub struct LinkMatcher {
    globs: Vec<String>,
    regexes: Vec<Regex>,
}

impl LinkMatcher {
    /// Compile a matcher from glob patterns
    pub fn new<S: AsRef<str>>(globs: &[S]) -> Result<Self, regex::Error> {
        let mut regexes = Vec::with_capacity(globs.len());
        let mut sources = Vec::with_capacity(globs.len());
        for glob in globs {
            let glob = glob.as_ref().trim();
            if glob.is_empty() {
                continue;
            }
            regexes.push(Regex::new(&glob_to_regex(glob))?);
            sources.push(glob.to_string());
        }

        Ok(Self {
            globs: sources,
            regexes,
        })
    }

    /// Compile a matcher from the configured pattern(s)
    pub fn from_pattern(pattern: &MatchPattern) -> Result<Self, regex::Error> {
        Self::new(&pattern.patterns())
    }

    /// Whether the link matches any of the globs
    pub fn matches(&self, link: &str) -> bool {
        self.regexes.iter().any(|regex| regex.is_match(link))
    }

    /// The globs this matcher was built from
    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    /// Keep only the links eligible for the queue, preserving order
    pub fn filter<'a, I>(&self, links: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        links
            .into_iter()
            .filter(|link| {
                let eligible = self.matches(link);
                if !eligible {
                    ::log::trace!("Link matcher rejected: {}", link);
                }
                eligible
            })
            .cloned()
            .collect()
    }
}

/// Translate a path glob into an anchored regex.
///
/// `*` matches within one segment, `**` matches across segments, `?` matches
/// one non-separator character, `{a,b}` is alternation and `[...]` a
/// character class.
pub fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let mut brace_depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    // `/**/` may also collapse to a single `/`
                    let after = i + 2;
                    if chars.get(after) == Some(&'/') && out.ends_with('/') {
                        out.push_str("(?:.*/)?");
                        i = after + 1;
                        continue;
                    }
                    out.push_str(".*");
                    i = after;
                    continue;
                }
                out.push_str("[^/]*");
            }
            '?' => out.push_str("[^/]"),
            '[' => {
                if let Some(end) = chars[i + 1..].iter().position(|&ch| ch == ']') {
                    let class: String = chars[i + 1..i + 1 + end].iter().collect();
                    out.push('[');
                    if let Some(rest) = class.strip_prefix('!') {
                        out.push('^');
                        out.push_str(&rest.replace('\\', "\\\\"));
                    } else {
                        out.push_str(&class.replace('\\', "\\\\"));
                    }
                    out.push(']');
                    i += end + 2;
                    continue;
                }
                out.push_str("\\[");
            }
            '{' => {
                brace_depth += 1;
                out.push_str("(?:");
            }
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                out.push(')');
            }
            ',' if brace_depth > 0 => out.push('|'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// Create a normalized version of the URL used for queue deduplication
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized
}

/// Parse and normalize a URL string, rejecting anything but http(s)
pub fn normalize_str(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    Some(normalize_url(&parsed).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_star_matches_any_suffix() {
        let matcher = LinkMatcher::new(&["https://example.com/store/**"]).unwrap();

        assert!(matcher.matches("https://example.com/store/a"));
        assert!(matcher.matches("https://example.com/store/a/b"));
        assert!(matcher.matches("https://example.com/store/"));

        assert!(!matcher.matches("https://example.com/shop/a"));
        assert!(!matcher.matches("https://example.com/storefront/a"));
        assert!(!matcher.matches("https://other.com/store/a"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let matcher = LinkMatcher::new(&["https://example.com/docs/*"]).unwrap();

        assert!(matcher.matches("https://example.com/docs/intro"));
        assert!(!matcher.matches("https://example.com/docs/guide/intro"));
    }

    #[test]
    fn test_globstar_in_middle() {
        let matcher = LinkMatcher::new(&["https://example.com/**/page.html"]).unwrap();

        assert!(matcher.matches("https://example.com/page.html"));
        assert!(matcher.matches("https://example.com/a/b/page.html"));
        assert!(!matcher.matches("https://example.com/a/other.html"));
    }

    #[test]
    fn test_first_of_many_patterns_suffices() {
        let pattern = MatchPattern::Many(vec![
            "https://example.com/blog/**".to_string(),
            "https://example.com/news/*".to_string(),
        ]);
        let matcher = LinkMatcher::from_pattern(&pattern).unwrap();

        assert!(matcher.matches("https://example.com/blog/2024/post"));
        assert!(matcher.matches("https://example.com/news/today"));
        assert!(!matcher.matches("https://example.com/news/2024/today"));
        assert!(!matcher.matches("https://example.com/about"));
    }

    #[test]
    fn test_literal_regex_characters_are_escaped() {
        let matcher = LinkMatcher::new(&["https://example.com/search?q=*"]).unwrap();

        // `?` is a single-character wildcard, `.` must be literal
        assert!(matcher.matches("https://example.com/searchXq=rust"));
        assert!(!matcher.matches("https://exampleXcom/search?q=rust"));
    }

    #[test]
    fn test_braces_and_classes() {
        let matcher = LinkMatcher::new(&["https://example.com/{docs,api}/v[12]/**"]).unwrap();

        assert!(matcher.matches("https://example.com/docs/v1/x"));
        assert!(matcher.matches("https://example.com/api/v2/x/y"));
        assert!(!matcher.matches("https://example.com/blog/v1/x"));
        assert!(!matcher.matches("https://example.com/api/v3/x"));
    }

    #[test]
    fn test_empty_patterns_match_nothing() {
        let matcher = LinkMatcher::new(&["", "  "]).unwrap();
        assert!(matcher.globs().is_empty());
        assert!(!matcher.matches("https://example.com/"));
        assert!(MatchPattern::Single(String::new()).is_empty());
    }

    #[test]
    fn test_filter_preserves_order() {
        let matcher = LinkMatcher::new(&["https://ex.com/blog/**"]).unwrap();
        let links = vec![
            "https://ex.com/blog/b".to_string(),
            "https://ex.com/about".to_string(),
            "https://ex.com/blog/a".to_string(),
        ];

        assert_eq!(
            matcher.filter(&links),
            vec!["https://ex.com/blog/b", "https://ex.com/blog/a"]
        );
    }

    #[test]
    fn test_match_pattern_deserializes_both_forms() {
        let single: MatchPattern = serde_json::from_str(r#""https://a.com/**""#).unwrap();
        assert_eq!(single.patterns(), vec!["https://a.com/**"]);

        let many: MatchPattern = serde_json::from_str(r#"["https://a.com/x/*", "https://a.com/y/*"]"#).unwrap();
        assert_eq!(many.patterns().len(), 2);
    }

    #[test]
    fn test_normalize_strips_fragment() {
        let url = Url::parse("https://example.com/page#section").unwrap();
        assert_eq!(normalize_url(&url).as_str(), "https://example.com/page");

        assert_eq!(
            normalize_str("https://example.com/a#b").as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(normalize_str("mailto:someone@example.com"), None);
        assert_eq!(normalize_str("not a url"), None);
    }
}
