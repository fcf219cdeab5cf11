//! Link and word extraction from fetched HTML.

use lazy_static::lazy_static;
use scraper::{Html, Node, Selector};
use wordhunt_core::tokenizer::tokenize;

lazy_static! {
    static ref ANCHORS: Selector = Selector::parse("a[href]").expect("valid selector");
}

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// `href` values of every anchor, in document order. Duplicates are kept.
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

/// Visible text of the document, tokenized. Script and style bodies are
/// ignored.
pub fn extract_words(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name()))
            .is_some_and(|name| SKIPPED_ELEMENTS.contains(&name));
        if !hidden {
            text.push_str(chunk);
            text.push(' ');
        }
    }
    tokenize(&text)
}
