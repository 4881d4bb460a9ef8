// =============================================================================
// extractor/navigation.rs - WHERE DOES THIS CARD POINT NEXT?
// =============================================================================
//
// Every detail page has a `.neighbor` block with "prev" and "next" anchors.
// The whole crawl is just following the "next" one until it isn't there.
// =============================================================================

use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::models::PageId;

static NEIGHBOR_ANCHORS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".neighbor a").expect("static selector `.neighbor a` is valid")
});

const NEXT_TOKEN: &str = "next";

/// Find the next page identifier in the page's navigation region.
///
/// The first anchor whose visible text contains the token `next` wins
/// (case-sensitive, whitespace-delimited, so `next »` matches but `Next` and
/// `nextcard` don't). If that anchor has no `href`, the sequence is over.
pub fn next_page(document: &Html) -> Option<PageId> {
    let anchor = document.select(&NEIGHBOR_ANCHORS).find(|a| {
        a.text()
            .collect::<String>()
            .split_whitespace()
            .any(|token| token == NEXT_TOKEN)
    })?;

    anchor
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(PageId::new)
}
