//! HTML-to-Markdown normalization for fetched organization pages.
//!
//! Converts raw HTML to lightweight Markdown using the `htmd` crate, dropping
//! non-content elements entirely, then applies cleanup passes that collapse
//! whitespace, strip leftover layout tags and resolve relative links.

mod cleanup;

use tracing::{debug, instrument, warn};
use url::Url;

use orgscout_shared::Outcome;

/// Elements removed together with everything inside them.
const SKIPPED_TAGS: [&str; 7] = ["head", "script", "style", "meta", "iframe", "svg", "noscript"];

/// Convert raw markup into normalized Markdown text.
///
/// Never fails: if `htmd` cannot convert the input, the original markup is
/// returned unchanged as a [`Outcome::Degraded`] value. A `Complete` result
/// may still be empty (a page made only of scripts, for instance), so callers
/// must inspect the content rather than assume success means non-empty.
#[instrument(skip(html), fields(len = html.len()))]
pub fn normalize(html: &str, base_url: Option<&Url>) -> Outcome<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();

    from_conversion(html, converter.convert(html), base_url)
}

/// Clean a conversion result, or fall back to the original markup.
fn from_conversion(
    html: &str,
    converted: std::io::Result<String>,
    base_url: Option<&Url>,
) -> Outcome<String> {
    let raw_markdown = match converted {
        Ok(md) => md,
        Err(e) => {
            warn!(error = %e, "htmd conversion failed, keeping original markup");
            return Outcome::degraded(html.to_string(), format!("htmd conversion failed: {e}"));
        }
    };

    let cleaned = cleanup::run_pipeline(&raw_markdown, base_url);
    debug!(raw_len = raw_markdown.len(), final_len = cleaned.len(), "normalization complete");

    Outcome::Complete(cleaned)
}
