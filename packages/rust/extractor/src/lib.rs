//! Readable-content extraction from arbitrary blog markup.
//!
//! Extraction is deliberately simple: pick the first matching content
//! container, walk its text-bearing elements in document order, and keep the
//! fragments long enough to be prose rather than chrome.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use vidpack_shared::{ExtractedDocument, Result, VidPackError};

/// Content containers in priority order. `body` is the last resort.
const CONTAINER_SELECTORS: [&str; 4] = ["article", "main", ".post-content", "body"];

/// Elements whose text becomes part of the body.
const FRAGMENT_SELECTOR: &str = "p, h2, h3, h4, ul, ol, li";

/// Fragments must be strictly longer than this many characters.
pub const MIN_FRAGMENT_CHARS: usize = 20;

/// The trimmed body must be at least this many characters.
pub const MIN_BODY_CHARS: usize = 100;

/// Title used when the page has neither an `<h1>` nor a `<title>`.
pub const UNTITLED: &str = "Untitled";

static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    CONTAINER_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});
static FRAGMENTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(FRAGMENT_SELECTOR).expect("valid selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));

/// Extract the title and readable body from raw HTML.
#[instrument(skip_all, fields(markup_len = markup.len()))]
pub fn extract(markup: &str) -> Result<ExtractedDocument> {
    let doc = Html::parse_document(markup);

    let container = select_container(&doc);
    debug!(container = container.value().name(), "content container selected");

    let title = extract_title(&doc);

    let fragments: Vec<String> = container
        .select(&FRAGMENTS)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| text.chars().count() > MIN_FRAGMENT_CHARS)
        .collect();

    let body = fragments.join("\n\n");
    let body_chars = body.trim().chars().count();

    if body_chars < MIN_BODY_CHARS {
        return Err(VidPackError::insufficient(format!(
            "found {body_chars} characters of text in {} fragments, need at least {MIN_BODY_CHARS}",
            fragments.len()
        )));
    }

    debug!(%title, fragments = fragments.len(), body_chars, "document extracted");

    Ok(ExtractedDocument { title, body })
}

/// First container matching the priority list, falling back to the root.
fn select_container(doc: &Html) -> ElementRef<'_> {
    CONTAINERS
        .iter()
        .find_map(|sel| doc.select(sel).next())
        .unwrap_or_else(|| doc.root_element())
}

/// Title fallback chain: first `<h1>`, then `<title>`, then [`UNTITLED`].
fn extract_title(doc: &Html) -> String {
    let h1 = doc
        .select(&H1)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    if let Some(title) = h1 {
        return title;
    }

    doc.select(&TITLE)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Collapse runs of whitespace into single spaces, as browsers do for `document.title`.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn article_fragments_in_document_order() {
        let doc = extract(&load_fixture("blog_post.html")).unwrap();

        assert_eq!(doc.title, "Async Rust in Practice");

        let fragments: Vec<&str> = doc.body.split("\n\n").collect();
        assert_eq!(
            fragments,
            vec![
                "Async Rust lets a single thread juggle thousands of connections.",
                "A future does nothing until it is polled by an executor such as Tokio.",
                "Pinning without tears",
                "Pin guarantees an address will not change.\n      Tiny item",
                "Pin guarantees an address will not change.",
                "The async book covers executors, wakers and pinning in more depth.",
            ]
        );

        // Nav and footer live outside <article>
        assert!(!doc.body.contains("Subscribe"));
        assert!(!doc.body.contains("Copyright"));
    }

    #[test]
    fn post_content_class_is_used_without_article_or_main() {
        let doc = extract(&load_fixture("post_content.html")).unwrap();

        assert_eq!(doc.title, "Sourdough Notes");
        assert!(doc.body.starts_with("Sourdough starts with"));
        assert!(!doc.body.contains("Popular posts"));
    }

    #[test]
    fn thin_page_is_rejected() {
        let err = extract(&load_fixture("thin.html")).unwrap_err();
        assert!(matches!(err, VidPackError::ExtractionInsufficient { .. }));
    }

    #[test]
    fn five_paragraphs_joined_by_blank_lines() {
        let paragraphs = [
            "First paragraph with plenty of words in it.",
            "Second paragraph with plenty of words in it.",
            "Third paragraph with plenty of words in it.",
            "Fourth paragraph with plenty of words in it.",
            "Fifth paragraph with plenty of words in it.",
        ];
        let html = format!(
            "<html><body><main>{}</main></body></html>",
            paragraphs
                .iter()
                .map(|p| format!("<p>  {p}  </p>"))
                .collect::<String>()
        );

        let doc = extract(&html).unwrap();
        assert_eq!(doc.body, paragraphs.join("\n\n"));
    }

    #[test]
    fn article_wins_over_main() {
        let long = "This sentence is long enough to count as a fragment of prose.";
        let html = format!(
            "<html><body><main><p>Main only: {long}</p></main>\
             <article><p>{long}</p><p>{long}</p></article></body></html>"
        );

        let doc = extract(&html).unwrap();
        assert!(!doc.body.contains("Main only"));
    }

    #[test]
    fn body_is_last_resort() {
        let long = "Plain body paragraph that is comfortably over twenty characters.";
        let html = format!("<html><body><div><p>{long}</p><p>{long}</p></div></body></html>");

        let doc = extract(&html).unwrap();
        assert_eq!(doc.body, format!("{long}\n\n{long}"));
        assert_eq!(doc.title, UNTITLED);
    }

    #[test]
    fn fragments_of_exactly_twenty_chars_are_dropped() {
        let twenty = "a".repeat(20);
        let long = "b".repeat(120);
        let html = format!("<html><body><p>{twenty}</p><p>{long}</p></body></html>");

        let doc = extract(&html).unwrap();
        assert_eq!(doc.body, long);
    }

    #[test]
    fn empty_h1_falls_back_to_title() {
        let long = "c".repeat(150);
        let html = format!(
            "<html><head><title>  Spaced\n   Title </title></head>\
             <body><h1>   </h1><p>{long}</p></body></html>"
        );

        let doc = extract(&html).unwrap();
        assert_eq!(doc.title, "Spaced Title");
    }

    #[test]
    fn empty_markup_is_rejected() {
        assert!(matches!(
            extract(""),
            Err(VidPackError::ExtractionInsufficient { .. })
        ));
    }
}
