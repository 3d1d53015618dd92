//! Markup parsing and tag lookup
//!
//! Lookups are expressed as a tag name plus an optional attribute filter. The
//! attribute value must match exactly. `class` gets one extra rule: a filter
//! made of a single class token also matches an element that carries that
//! token among others. A filter listing several classes must match the
//! attribute byte-for-byte, in the same order. This is brittle against markup
//! changes on the target site, and the selectors are calibrated for exactly
//! that markup, so it stays this way.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Error type for markup lookups
#[derive(Debug, Error)]
pub enum MarkupError {
    /// The filter does not form a valid selector
    #[error("Invalid tag filter '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// A tag name with an optional exact attribute match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    /// Element name, e.g. `div`
    pub tag: String,

    /// Attribute name and the value it must carry
    pub attr: Option<(String, String)>,
}

impl TagFilter {
    /// Match every element with the given tag name
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attr: None,
        }
    }

    /// Require an exact attribute value
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attr = Some((name.into(), value.into()));
        self
    }

    /// Require a class attribute, see the module docs for the matching rules
    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.with_attr("class", class)
    }

    /// The CSS selector this filter compiles to
    pub fn css(&self) -> String {
        match &self.attr {
            None => self.tag.clone(),
            Some((name, value)) => {
                let operator = if name == "class" && !value.contains(char::is_whitespace) {
                    "~="
                } else {
                    "="
                };
                format!("{}[{}{}\"{}\"]", self.tag, name, operator, escape(value))
            }
        }
    }

    /// Compile the filter into a selector
    pub fn selector(&self) -> Result<Selector, MarkupError> {
        let css = self.css();
        Selector::parse(&css).map_err(|e| MarkupError::InvalidSelector {
            selector: css.clone(),
            reason: e.to_string(),
        })
    }

    /// Check that the filter compiles
    pub fn validate(&self) -> Result<(), MarkupError> {
        self.selector().map(|_| ())
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A parsed, queryable markup document
///
/// Parsing never fails; unusable input produces a document nothing matches in.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse raw markup into a document
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// All elements in the document matching `filter`, in document order
    pub fn find_all(&self, filter: &TagFilter) -> Vec<ElementRef<'_>> {
        match filter.selector() {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(e) => {
                warn!("Skipping lookup: {}", e);
                Vec::new()
            }
        }
    }

    /// The first element matching `filter`
    pub fn find(&self, filter: &TagFilter) -> Option<ElementRef<'_>> {
        self.find_all(filter).into_iter().next()
    }
}

/// All descendants of `scope` matching `filter`, in document order
///
/// `scope` itself is never part of the result.
pub fn find_all<'a>(scope: ElementRef<'a>, filter: &TagFilter) -> Vec<ElementRef<'a>> {
    match filter.selector() {
        Ok(selector) => scope
            .select(&selector)
            .filter(|element| element.id() != scope.id())
            .collect(),
        Err(e) => {
            warn!("Skipping lookup: {}", e);
            Vec::new()
        }
    }
}

/// The first descendant of `scope` with the given tag name
pub fn first_descendant<'a>(scope: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.id() != scope.id())
        .find(|element| element.value().name() == tag)
}

/// Concatenated text of an element and all its descendants
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Value of an attribute on an element
pub fn attr_of<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div class="card">one</div>
        <div class="card wide">two</div>
        <p class="_2sc7ZR _2V5EHH">exact</p>
        <p class="_2V5EHH _2sc7ZR">swapped</p>
        <p class="_2sc7ZR _2V5EHH extra">longer</p>
        <a class="link" href="/p/1">first</a>
        <a class="link">no href</a>
    </body></html>"#;

    #[test]
    fn test_css_for_filters() {
        assert_eq!(TagFilter::new("span").css(), "span");
        assert_eq!(TagFilter::new("span").with_class("B_NuCI").css(), "span[class~=\"B_NuCI\"]");
        assert_eq!(TagFilter::new("p").with_class("a b").css(), "p[class=\"a b\"]");
        assert_eq!(TagFilter::new("a").with_attr("data-id", "x\"y").css(), "a[data-id=\"x\\\"y\"]");
    }

    #[test]
    fn test_single_class_matches_token() {
        let doc = Document::parse(PAGE);
        let cards = doc.find_all(&TagFilter::new("div").with_class("card"));
        let texts: Vec<String> = cards.into_iter().map(text_of).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_multi_class_matches_exact_order_only() {
        let doc = Document::parse(PAGE);
        let found = doc.find_all(&TagFilter::new("p").with_class("_2sc7ZR _2V5EHH"));
        assert_eq!(found.len(), 1);
        assert_eq!(text_of(found[0]), "exact");
    }

    #[test]
    fn test_scoped_lookup_excludes_scope() {
        let doc = Document::parse(
            r#"<div class="box"><div class="box">inner</div><span>text</span></div>"#,
        );
        let outer = doc.find(&TagFilter::new("div").with_class("box")).unwrap();
        let inner = find_all(outer, &TagFilter::new("div").with_class("box"));
        assert_eq!(inner.len(), 1);
        assert_eq!(text_of(inner[0]), "inner");
    }

    #[test]
    fn test_first_descendant() {
        let doc = Document::parse(r#"<div id="body"><div><div>deep text</div></div></div>"#);
        let body = doc.find(&TagFilter::new("div").with_attr("id", "body")).unwrap();
        let level_one = first_descendant(body, "div").unwrap();
        let level_two = first_descendant(level_one, "div").unwrap();
        assert_eq!(text_of(level_two), "deep text");
        assert!(first_descendant(level_two, "div").is_none());
    }

    #[test]
    fn test_attr_of() {
        let doc = Document::parse(PAGE);
        let links = doc.find_all(&TagFilter::new("a").with_class("link"));
        assert_eq!(links.len(), 2);
        assert_eq!(attr_of(links[0], "href"), Some("/p/1"));
        assert_eq!(attr_of(links[1], "href"), None);
    }

    #[test]
    fn test_invalid_filter() {
        let filter = TagFilter::new("div[");
        assert!(filter.validate().is_err());
        assert!(Document::parse(PAGE).find_all(&filter).is_empty());
    }

    #[test]
    fn test_garbage_markup_parses() {
        let doc = Document::parse("Invalid URL");
        assert!(doc.find(&TagFilter::new("span").with_class("B_NuCI")).is_none());
    }
}
