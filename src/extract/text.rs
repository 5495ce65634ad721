//! Visible-text rendering of a parsed document, approximating what a
//! browser's `innerText` would hand the heuristic classifier.

use ego_tree::NodeRef;
use scraper::{Html, Node};

/// Elements whose subtree never contributes visible text.
const SKIPPED: &[&str] = &["script", "style", "noscript", "head", "template"];

/// Elements that terminate a visual line.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt",
    "fieldset", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "table", "td", "th", "tr", "ul",
];

/// Text nodes in document order, with line breaks at block-element
/// boundaries and `<br>`.
pub fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    walk(document.tree.root(), &mut out);
    out
}

fn walk(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            let name = element.name();
            if SKIPPED.contains(&name) {
                return;
            }
            if name == "br" {
                out.push('\n');
                return;
            }
            for child in node.children() {
                walk(child, out);
            }
            if BLOCK.contains(&name) && !out.ends_with('\n') {
                out.push('\n');
            }
        }
        _ => {
            for child in node.children() {
                walk(child, out);
            }
        }
    }
}

// ── Tests ──
