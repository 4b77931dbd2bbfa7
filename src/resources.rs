use url::Url;

/// Suppresses sub-resource requests by file extension
///
/// The filter is installed on the browser session before each navigation.
/// An empty exclusion list makes it a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    extensions: Vec<String>,
}

impl ResourceFilter {
    /// Build a filter from configured extensions (`"png"`, `".png"` and
    /// `"PNG"` are equivalent)
    pub fn new<S: AsRef<str>>(exclusions: &[S]) -> Self {
        let mut extensions: Vec<String> = Vec::with_capacity(exclusions.len());
        for ext in exclusions {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase();
            if !ext.is_empty() && !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }
        Self { extensions }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// URL patterns handed to the browser's request blocker.
    ///
    /// Each extension yields a bare form and a form with a query string so
    /// that `logo.png?v=3` is caught as well.
    pub fn block_patterns(&self) -> Vec<String> {
        self.extensions
            .iter()
            .flat_map(|ext| [format!("*.{}", ext), format!("*.{}?*", ext)])
            .collect()
    }

    /// Whether a request for this URL must be aborted
    pub fn blocks(&self, url: &str) -> bool {
        if self.extensions.is_empty() {
            return false;
        }

        let path = match Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
        };

        let file = path.rsplit('/').next().unwrap_or("");
        match file.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|excluded| *excluded == ext)
            }
            None => false,
        }
    }
}
