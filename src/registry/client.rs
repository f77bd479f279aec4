use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use tokio_util::sync::CancellationToken;

use super::scrape::parse_search_page;
use super::{PackageSearch, SearchPage};
use crate::error::CancelledError;
use crate::http::HttpClient;

pub const DEFAULT_SEARCH_URL: &str = "https://pypi.org/search/";

/// Classifier applied when searching with an empty keyword, so the index
/// returns a useful listing instead of everything.
pub const DEFAULT_CATEGORY: &str = "Programming Language :: Python :: 3";

/// Searches the package index by scraping its search page.
#[derive(Clone)]
pub struct RegistryClient {
    http: HttpClient,
    search_url: String,
}

impl RegistryClient {
    pub fn new(http: HttpClient, search_url: Option<String>) -> Self {
        let search_url = search_url.unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string());
        Self { http, search_url }
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    async fn fetch(&self, keyword: &str, page: u32) -> Result<String> {
        let page = page.to_string();
        let mut query = vec![("q", keyword), ("page", page.as_str())];
        if keyword.is_empty() {
            query.push(("c", DEFAULT_CATEGORY));
        }

        self.http
            .get_text_with_query(&self.search_url, &query)
            .await
            .with_context(|| format!("Failed to search the package index for '{}'", keyword))
    }
}

#[async_trait]
impl PackageSearch for RegistryClient {
    #[tracing::instrument(skip(self, cancel))]
    async fn search(
        &self,
        keyword: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<SearchPage> {
        let keyword = keyword.trim();
        let page = page.max(1);

        // Dropping the request future aborts the connection.
        let body = tokio::select! {
            body = self.fetch(keyword, page) => body?,
            _ = cancel.cancelled() => {
                debug!("Search for '{}' cancelled", keyword);
                return Err(CancelledError.into());
            }
        };

        parse_search_page(&body, keyword, page, &self.search_url)
    }
}
