//! DOM scraping: ordered selector lists and the page title.
//!
//! For each field the selectors are tried in order; the first element with a
//! non-empty value wins. Text fields use the element's text content, image
//! fields use `src`, `data-src`, or a CSS `background-image` URL.

use super::{non_empty, Document, Element, MetadataCandidate};
use crate::config::ScrapingConfig;
use crate::types::FieldSource;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

lazy_static! {
    // background-image: url("...") with optional quotes
    static ref CSS_URL: Regex = Regex::new(
        r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#
    ).unwrap();
}

pub fn extract(document: &dyn Document, config: &ScrapingConfig) -> MetadataCandidate {
    MetadataCandidate {
        source: FieldSource::Dom,
        title: first_match(document, &config.title_selectors, text_value)
            .or_else(|| page_title(document, &config.placeholder_title)),
        artist: first_match(document, &config.artist_selectors, text_value),
        art_url: first_match(document, &config.art_selectors, image_value),
        logo: first_match(document, &config.logo_selectors, image_value),
    }
}

/// Page title, unless it is the app's placeholder (compared case-insensitively)
fn page_title(document: &dyn Document, placeholder: &str) -> Option<String> {
    let title = non_empty(Some(document.title().as_str()))?;
    if title.eq_ignore_ascii_case(placeholder.trim()) {
        trace!("Page title is the placeholder, ignoring");
        return None;
    }
    Some(title)
}

fn first_match(
    document: &dyn Document,
    selectors: &[String],
    value: fn(&Element) -> Option<String>,
) -> Option<String> {
    selectors.iter().find_map(|selector| {
        document
            .query_selector_all(selector)
            .iter()
            .find_map(value)
    })
}

fn text_value(element: &Element) -> Option<String> {
    non_empty(Some(element.text.as_str()))
}

fn image_value(element: &Element) -> Option<String> {
    non_empty(element.attribute("src"))
        .or_else(|| non_empty(element.attribute("data-src")))
        .or_else(|| element.attribute("style").and_then(css_url))
}

/// Extract the URL from a `background-image: url(...)` declaration
pub fn css_url(style: &str) -> Option<String> {
    CSS_URL
        .captures(style)
        .and_then(|caps| non_empty(caps.get(1).map(|m| m.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Default)]
    struct FakeDocument {
        title: String,
        elements: HashMap<String, Vec<Element>>,
    }

    impl FakeDocument {
        fn with(mut self, selector: &str, element: Element) -> Self {
            self.elements
                .entry(selector.to_string())
                .or_default()
                .push(element);
            self
        }
    }

    impl Document for FakeDocument {
        fn title(&self) -> String {
            self.title.clone()
        }

        fn query_selector_all(&self, selector: &str) -> Vec<Element> {
            self.elements.get(selector).cloned().unwrap_or_default()
        }
    }

    fn text(value: &str) -> Element {
        Element {
            text: value.to_string(),
            ..Default::default()
        }
    }

    fn attr(name: &str, value: &str) -> Element {
        Element {
            text: String::new(),
            attributes: BTreeMap::from([(name.to_string(), value.to_string())]),
        }
    }

    fn config() -> ScrapingConfig {
        ScrapingConfig {
            title_selectors: vec![".title".into(), "h1".into()],
            artist_selectors: vec![".series".into()],
            art_selectors: vec![".poster".into(), ".backdrop".into()],
            logo_selectors: vec![".logo".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_first_non_empty_element_wins() {
        let document = FakeDocument::default()
            .with(".title", text("  "))
            .with("h1", text("Heading"))
            .with("h1", text("Second heading"));

        let candidate = extract(&document, &config());
        assert_eq!(candidate.title.as_deref(), Some("Heading"));
    }

    #[test]
    fn test_page_title_fallback() {
        let document = FakeDocument {
            title: "My Show".to_string(),
            ..Default::default()
        };

        let candidate = extract(&document, &config());
        assert_eq!(candidate.title.as_deref(), Some("My Show"));
    }

    #[test]
    fn test_placeholder_page_title_suppressed() {
        let document = FakeDocument {
            title: "STREMIO".to_string(),
            ..Default::default()
        };
        assert!(extract(&document, &config()).title.is_none());

        let document = FakeDocument {
            title: "stremio".to_string(),
            ..Default::default()
        }
        .with("h1", text("From selector"));
        assert_eq!(
            extract(&document, &config()).title.as_deref(),
            Some("From selector")
        );
    }

    #[test]
    fn test_image_values() {
        let document = FakeDocument::default()
            .with(".poster", attr("alt", "no image here"))
            .with(
                ".backdrop",
                attr("style", "background-image: url(\"https://img/bg.jpg\");"),
            )
            .with(".logo", attr("data-src", "https://img/logo.png"));

        let candidate = extract(&document, &config());
        assert_eq!(candidate.art_url.as_deref(), Some("https://img/bg.jpg"));
        assert_eq!(candidate.logo.as_deref(), Some("https://img/logo.png"));
        assert!(candidate.artist.is_none());
    }

    #[test]
    fn test_css_url() {
        assert_eq!(
            css_url("background-image: url('https://a/b.jpg')").as_deref(),
            Some("https://a/b.jpg")
        );
        assert_eq!(
            css_url("background: url(https://a/c.png) no-repeat").as_deref(),
            Some("https://a/c.png")
        );
        assert!(css_url("color: red").is_none());
    }
}
