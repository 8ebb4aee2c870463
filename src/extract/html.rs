//! Small helpers over `scraper` shared by the login flow and the table extractor.

use scraper::{ElementRef, Html, Selector};

/// Parse a CSS selector, reporting a readable error instead of panicking.
pub fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector '{css}': {e:?}"))
}

/// Collapse sequences of whitespace into a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All text below `el`, whitespace-normalized.
pub fn element_text(el: ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<String>())
}

/// Trimmed `<title>` text of a document, if present.
pub fn page_title(doc: &Html) -> Option<String> {
    let sel = selector("title").ok()?;
    doc.select(&sel).next().map(element_text)
}
