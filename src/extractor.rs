//! Page fetching and text extraction.
//!
//! [`HtmlExtractor`] downloads a page with a blocking HTTP client and hands
//! the body to [`extract_fields`], which walks the parsed HTML tree and
//! derives a title, a meta description and the readable main text.

use std::time::Duration;

use scraper::{ElementRef, Html, Node};

use crate::error::{Error, Result};

/// Upper bound on a single page fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

/// Number of period-delimited segments kept by [`generate_summary`].
const SUMMARY_SEGMENTS: usize = 3;

/// Subtrees that never contribute to the main text.
const SKIPPED_TAGS: &[&str] =
    &["script", "style", "nav", "footer", "header", "aside"];

/// Fields derived from a fetched page. Each one is empty when the page does
/// not provide it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub description: String,
    pub content: String,
}

/// Something that can turn a URL into [`Extracted`] fields.
pub trait ContentExtractor {
    fn extract(&self, url: &str) -> Result<Extracted>;
}

impl<T: ContentExtractor + ?Sized> ContentExtractor for &T {
    fn extract(&self, url: &str) -> Result<Extracted> {
        (**self).extract(url)
    }
}

/// Fetches pages over HTTP and extracts their text.
pub struct HtmlExtractor {
    client: reqwest::blocking::Client,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl ContentExtractor for HtmlExtractor {
    fn extract(&self, url: &str) -> Result<Extracted> {
        tracing::debug!(url, "fetching page");

        let response = self.client.get(url).send().inspect_err(|e| {
            tracing::debug!(url, error = %e, "fetch failed");
        })?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text()?;
        Ok(extract_fields(&body))
    }
}

impl std::fmt::Debug for HtmlExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlExtractor").finish_non_exhaustive()
    }
}

/// Parse an HTML document and derive title, description and main text.
pub fn extract_fields(html: &str) -> Extracted {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut content = String::new();
    collect_text(root, &mut content);

    Extracted {
        title: find_title(root).unwrap_or_default(),
        description: find_meta_description(root).unwrap_or_default(),
        content,
    }
}

/// Text of the first `<title>` in document order that has any text.
fn find_title(element: ElementRef<'_>) -> Option<String> {
    if element.value().name() == "title" {
        let text: String = element.text().collect();
        return (!text.is_empty()).then_some(text);
    }
    element
        .children()
        .filter_map(ElementRef::wrap)
        .find_map(find_title)
}

/// `content` of the first `<meta name="description">` with a non-empty
/// `content` attribute.
fn find_meta_description(element: ElementRef<'_>) -> Option<String> {
    let el = element.value();
    if el.name() == "meta"
        && el.attr("name") == Some("description")
        && let Some(content) = el.attr("content").filter(|c| !c.is_empty())
    {
        return Some(content.to_string());
    }
    element
        .children()
        .filter_map(ElementRef::wrap)
        .find_map(find_meta_description)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
            continue;
        }
        match child.value() {
            Node::Text(text) => push_text(text, out),
            // `<template>` contents live under a fragment node.
            Node::Fragment => {
                for inner in child.children() {
                    if let Some(inner_element) = ElementRef::wrap(inner) {
                        collect_text(inner_element, out);
                    } else if let Node::Text(text) = inner.value() {
                        push_text(text, out);
                    }
                }
            }
            _ => {}
        }
    }

    if name == "p" || is_heading(name) {
        out.push_str("\n\n");
    }
}

fn push_text(text: &str, out: &mut String) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push_str(trimmed);
        out.push(' ');
    }
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Build a short summary from the first three period-delimited segments of
/// `content`.
///
/// Splitting is on the literal `.` character with no sentence detection, so
/// `"e.g. this"` counts as three segments.
pub fn generate_summary(content: &str) -> String {
    let segments: Vec<&str> =
        content.split('.').take(SUMMARY_SEGMENTS).collect();

    let mut summary = segments.join(".");
    if !segments.is_empty() {
        summary.push('.');
    }
    summary.trim().to_string()
}
