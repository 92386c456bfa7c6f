//! Report link extraction from listing page lines
//!
//! The listing HTML carries at most one report link per line, so a narrow
//! single-capture href scan is deliberately used instead of an HTML parser.

use regex::Regex;

use super::{Result, SpimexError};

/// Pattern capturing the value of an `href` attribute
const HREF_PATTERN: &str = r#"href="([^"]+)""#;

/// Pure link extractor over raw listing page lines
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    site_url: String,
    href_pattern: Regex,
}

impl LinkExtractor {
    /// Create an extractor that prefixes `site_url` onto extracted links
    pub fn new(site_url: impl Into<String>) -> Result<Self> {
        let href_pattern = Regex::new(HREF_PATTERN)?;

        let extractor = Self {
            site_url: site_url.into(),
            href_pattern,
        };

        if extractor.href_pattern.captures_len() != 2 {
            return Err(SpimexError::InvalidInput(
                "href pattern must carry exactly one capture group".to_string(),
            ));
        }

        Ok(extractor)
    }

    /// Extract report URLs from the given lines
    ///
    /// Keeps lines containing `path_pattern`, captures their href value and
    /// strips any query-string suffix. Results come back in source order with
    /// duplicates preserved; no match yields an empty vector, never an error.
    pub fn extract(&self, lines: &[String], path_pattern: &str) -> Vec<String> {
        self.extract_with_origin(lines, path_pattern, true)
    }

    /// Extract report URLs, optionally without the site origin prefix
    pub fn extract_with_origin(
        &self,
        lines: &[String],
        path_pattern: &str,
        with_origin: bool,
    ) -> Vec<String> {
        lines
            .iter()
            .filter(|line| line.contains(path_pattern))
            .filter_map(|line| self.href_pattern.captures(line))
            .map(|captures| {
                let href = &captures[1];
                let href = href.split('?').next().unwrap_or(href);
                if with_origin {
                    format!("{}{}", self.site_url, href)
                } else {
                    href.to_string()
                }
            })
            .collect()
    }
}
