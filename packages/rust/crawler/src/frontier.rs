//! Frontier extraction: candidate URLs discovered on a fetched page.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

/// Link prefixes that never lead to another crawlable page.
const SKIPPED_PREFIXES: [&str; 5] = ["#", "mailto:", "tel:", "data:", "javascript:"];

/// Extract the same-site frontier of `html`, fetched from `base_url`.
///
/// Every `<a href>` is resolved against `base_url`. Empty hrefs, fragment
/// links, and `mailto:`/`tel:`/`data:`/`javascript:` links are dropped, as is
/// any href containing `#`. A resolved URL is kept only if its string starts
/// with the full `base_url` string, so a seed with a path component keeps its
/// subpaths in scope and leaves sibling paths out.
///
/// The result is deduplicated and keeps first-seen order.
pub fn extract_frontier(html: &str, base_url: &str) -> Vec<String> {
    static LINK_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

    let Ok(base) = Url::parse(base_url) else {
        tracing::warn!(base_url, "unparseable base URL, frontier is empty");
        return Vec::new();
    };

    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut frontier = Vec::new();

    for el in doc.select(&LINK_SEL) {
        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };

        if href.is_empty()
            || href.contains('#')
            || SKIPPED_PREFIXES.iter().any(|p| href.starts_with(p))
        {
            continue;
        }

        let Ok(resolved) = base.join(href) else {
            continue;
        };

        let resolved = resolved.to_string();
        if resolved.starts_with(base_url) && seen.insert(resolved.clone()) {
            frontier.push(resolved);
        }
    }

    frontier
}
