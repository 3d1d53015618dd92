//! Product link resolution from a search results page

use tracing::debug;

use crate::markup::{Document, TagFilter, attr_of};

/// Resolve product page URLs from a parsed search results document
///
/// Every anchor matching `anchor` contributes `site_base + anchor[link_attr]`,
/// in document order. Links are neither deduplicated nor capped; anchors
/// without the attribute are skipped.
pub fn resolve_links(
    document: &Document,
    anchor: &TagFilter,
    link_attr: &str,
    site_base: &str,
) -> Vec<String> {
    document
        .find_all(anchor)
        .into_iter()
        .filter_map(|element| match attr_of(element, link_attr) {
            Some(target) => Some(format!("{}{}", site_base, target)),
            None => {
                debug!("Anchor without '{}' attribute", link_attr);
                None
            }
        })
        .collect()
}

/// Parse search results markup and resolve its product links
pub fn links_from_markup(
    markup: &str,
    anchor: &TagFilter,
    link_attr: &str,
    site_base: &str,
) -> Vec<String> {
    let document = Document::parse(markup);
    resolve_links(&document, anchor, link_attr, site_base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> TagFilter {
        TagFilter::new("a").with_class("_1fQZEK")
    }

    #[test]
    fn test_links_in_document_order() {
        let markup = r#"<div>
            <a class="_1fQZEK" href="/mouse-b/p/2">B</a>
            <a class="other" href="/ignored">x</a>
            <a class="_1fQZEK" href="/mouse-a/p/1">A</a>
        </div>"#;

        let links = links_from_markup(markup, &anchor(), "href", "https://www.flipkart.com");
        assert_eq!(
            links,
            vec![
                "https://www.flipkart.com/mouse-b/p/2",
                "https://www.flipkart.com/mouse-a/p/1",
            ]
        );
    }

    #[test]
    fn test_duplicates_are_kept() {
        let markup = r#"<a class="_1fQZEK" href="/p/1">A</a><a class="_1fQZEK" href="/p/1">A</a>"#;
        let links = links_from_markup(markup, &anchor(), "href", "http://shop");
        assert_eq!(links, vec!["http://shop/p/1", "http://shop/p/1"]);
    }

    #[test]
    fn test_anchor_without_href_is_skipped() {
        let markup = r#"<a class="_1fQZEK">A</a><a class="_1fQZEK" href="/p/2">B</a>"#;
        let links = links_from_markup(markup, &anchor(), "href", "http://shop");
        assert_eq!(links, vec!["http://shop/p/2"]);
    }

    #[test]
    fn test_failed_search_page_has_no_links() {
        assert!(links_from_markup("", &anchor(), "href", "http://shop").is_empty());
    }
}
