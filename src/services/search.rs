//! Web search via the DuckDuckGo Lite results page
//!
//! Scrapes result titles instead of calling a paid search API.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::{Error, Result};

/// Request timeout for searches
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Browser user agent; the lite page serves plain HTML to browsers
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Web-search collaborator
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Search the web, returning result titles in rank order (possibly empty)
    async fn search(&self, query: &str) -> Result<Vec<String>>;
}

/// DuckDuckGo Lite scraper
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    /// Create a new search client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(SEARCH_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .map_err(Error::Http)?,
        })
    }
}

#[async_trait]
impl SearchService for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<String>> {
        let url = format!("https://duckduckgo.com/lite/?q={}", urlencoding::encode(query));

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Search(format!("search returned {status}")));
        }

        let html = response.text().await?;
        Ok(extract_result_titles(&html))
    }
}

/// Pull result titles out of a DuckDuckGo Lite results page
fn extract_result_titles(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    // Result links carry the `result-link` class on the lite page
    let Ok(selector) = Selector::parse("a.result-link") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_titles_in_order() {
        let html = r#"
            <html><body>
              <a class="result-link" href="http://a">Erstes Ergebnis</a>
              <a class="other" href="http://x">Nicht relevant</a>
              <a class="result-link" href="http://b"> Zweites Ergebnis </a>
            </body></html>
        "#;
        let titles = extract_result_titles(html);
        assert_eq!(titles, vec!["Erstes Ergebnis", "Zweites Ergebnis"]);
    }

    #[test]
    fn empty_page_yields_no_results() {
        assert!(extract_result_titles("<html><body></body></html>").is_empty());
    }
}
