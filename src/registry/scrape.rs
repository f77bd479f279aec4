//! Extraction of search results from the index's search page.
//!
//! The page is not an API. Two fragments are cut out of the raw response by
//! their structural markers and parsed on their own: the results list and the
//! pagination control. If the page layout changes upstream, the patterns
//! below are what needs revisiting.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use log::debug;
use regex::Regex;
use reqwest::Url;

use super::markup::{Element, parse_fragment};
use super::{SearchPage, SearchResultItem};
use crate::error::NoResultError;

static RESULTS_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<ul[^>]*aria-label="Search results"[^>]*>.*?</ul>"#)
        .expect("results pattern is valid")
});

static PAGINATION_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="button-group button-group--pagination"[^>]*>.*?</div>"#)
        .expect("pagination pattern is valid")
});

/// Build a [`SearchPage`] from a raw search response.
///
/// Fails with [`NoResultError`] when the results list is missing entirely.
/// `page` is the page that was requested; the reported total never falls
/// below it. Relative links are resolved against `base_url`.
pub fn parse_search_page(body: &str, keyword: &str, page: u32, base_url: &str) -> Result<SearchPage> {
    let Some(results) = RESULTS_FRAGMENT.find(body) else {
        return Err(NoResultError {
            keyword: keyword.to_string(),
        }
        .into());
    };

    let list = parse_fragment(results.as_str()).context("Failed to parse search results")?;
    let base = Url::parse(base_url).ok();

    let items: Vec<SearchResultItem> = list
        .descendants("li")
        .into_iter()
        .filter_map(|entry| extract_item(entry, base.as_ref()))
        .collect();

    let total_pages = PAGINATION_FRAGMENT
        .find(body)
        .and_then(|fragment| match parse_fragment(fragment.as_str()) {
            Ok(pagination) => last_page(&pagination),
            Err(e) => {
                debug!("Ignoring unreadable pagination: {}", e);
                None
            }
        })
        .unwrap_or(1)
        .max(page)
        .max(1);

    debug!("Parsed {} result(s), {} page(s)", items.len(), total_pages);

    Ok(SearchPage { items, total_pages })
}

fn extract_item(entry: &Element, base: Option<&Url>) -> Option<SearchResultItem> {
    // Labels are matched by class, falling back to position for older layouts.
    let labels = entry.descendants("span");
    let labelled = |class: &str, index: usize| {
        labels
            .iter()
            .find(|label| label.has_class(class))
            .or_else(|| labels.get(index))
            .map(|label| label.text())
    };

    let name = labelled("package-snippet__name", 0)?;
    if name.is_empty() {
        return None;
    }
    let version = labelled("package-snippet__version", 1).unwrap_or_default();

    let updated = entry
        .find("time")
        .map(|time| {
            time.attr("datetime")
                .map(str::to_string)
                .unwrap_or_else(|| time.text())
        })
        .unwrap_or_default();

    let description = entry.find("p").map(Element::text).unwrap_or_default();

    let href = entry
        .find("a")
        .and_then(|link| link.attr("href"))
        .map(|href| match base.and_then(|b| b.join(href).ok()) {
            Some(url) => url.to_string(),
            None => href.to_string(),
        });

    Some(SearchResultItem {
        name,
        version,
        description,
        updated,
        href,
    })
}

/// The "last page" link is the second-to-last link of the control; the last
/// one is "Next".
fn last_page(pagination: &Element) -> Option<u32> {
    let links = pagination.descendants("a");
    let index = links.len().checked_sub(2)?;
    links[index].text().trim().parse().ok()
}
