//! Remote package index access: search and mirror selection.
//!
//! Callers only ever see [`SearchPage`]; how results are pulled out of the
//! index's markup stays inside this module.

mod client;
mod markup;
mod mirror;
mod scrape;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub use client::{DEFAULT_CATEGORY, DEFAULT_SEARCH_URL, RegistryClient};
pub use mirror::Mirror;
pub use scrape::parse_search_page;

/// One entry of a search result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResultItem {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Release timestamp as published by the index (ISO 8601 when available).
    pub updated: String,
    /// Absolute link to the project page.
    pub href: Option<String>,
}

/// A page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPage {
    pub items: Vec<SearchResultItem>,
    /// Always at least 1, and never below the page that was requested.
    pub total_pages: u32,
}

/// Package index search.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageSearch: Send + Sync {
    /// Search for `keyword`, returning the 1-based `page` of results.
    ///
    /// Fails with `NoResultError` when the index rendered no result list and
    /// with `CancelledError` when `cancel` fires before the response arrives.
    async fn search(
        &self,
        keyword: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<SearchPage>;
}
