//! Quick readability check without full parsing.
//!
//! [`is_probably_readerable`] is a fast pre-flight filter: it looks at the
//! paragraph-like nodes of a page and accumulates a score without running
//! the extraction engine.
//!
//! ```rust
//! use readerview::{is_probably_readerable, Readability};
//!
//! let html = "<html>...</html>";
//! if is_probably_readerable(html, None) {
//!     let article = Readability::new(html, None, None).unwrap().parse();
//! }
//! ```

use kuchikikiki::NodeRef;

use crate::constants::REGEXPS;
use crate::dom_utils::{get_inner_text, is_probably_visible, match_string, parse_html};

/// Thresholds for [`is_probably_readerable`].
#[derive(Debug, Clone)]
pub struct ReaderableOptions {
    /// Paragraphs shorter than this many characters are ignored.
    ///
    /// Default: `140`
    pub min_content_length: usize,

    /// Accumulated score needed before the document counts as readerable.
    ///
    /// Default: `20.0`
    pub min_score: f64,
}

impl Default for ReaderableOptions {
    fn default() -> Self {
        Self {
            min_content_length: 140,
            min_score: 20.0,
        }
    }
}

/// Decide whether a page likely contains extractable article content.
///
/// Considers `<p>` and `<pre>` elements plus `<div>`s that contain a `<br>`,
/// skips hidden and unlikely-classed nodes, and adds the square root of each
/// node's text length beyond `min_content_length` until `min_score` is
/// reached.
pub fn is_probably_readerable(html: &str, options: Option<ReaderableOptions>) -> bool {
    let options = options.unwrap_or_default();
    let doc = parse_html(html);

    let mut nodes: Vec<NodeRef> = Vec::new();
    if let Ok(sel) = doc.select("p, pre, article") {
        nodes.extend(sel.map(|e| e.as_node().clone()));
    }
    if let Ok(sel) = doc.select("div > br") {
        for br in sel {
            if let Some(parent) = br.as_node().parent() {
                if !nodes.contains(&parent) {
                    nodes.push(parent);
                }
            }
        }
    }

    let mut score = 0.0;
    for node in nodes {
        if !is_probably_visible(&node) {
            continue;
        }
        let match_string = match_string(&node);
        if REGEXPS.unlikely_candidates.is_match(&match_string)
            && !REGEXPS.ok_maybe_its_a_candidate.is_match(&match_string)
        {
            continue;
        }
        let text_length = get_inner_text(&node, true).chars().count();
        if text_length < options.min_content_length {
            continue;
        }
        score += ((text_length - options.min_content_length) as f64).sqrt();
        if score > options.min_score {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_paragraphs(n: usize, attrs: &str) -> String {
        (0..n)
            .map(|i| {
                format!(
                    "<p {attrs}>Paragraph {i} of a reasonably long article with enough \
                     text to pass the minimum content length threshold for the \
                     readerable probe, which requires well over one hundred and forty \
                     characters of visible prose per paragraph.</p>"
                )
            })
            .collect()
    }

    #[test]
    fn article_page_is_readerable() {
        let html = format!(
            "<html><body><article>{}</article></body></html>",
            long_paragraphs(5, "")
        );
        assert!(is_probably_readerable(&html, None));
    }

    #[test]
    fn navigation_page_is_not() {
        let html = r#"<html><body>
            <ul><li><a href="/a">Link A</a></li><li><a href="/b">Link B</a></li></ul>
        </body></html>"#;
        assert!(!is_probably_readerable(html, None));
    }

    #[test]
    fn hidden_content_ignored() {
        let html = format!(
            "<html><body>{}</body></html>",
            long_paragraphs(5, r#"style="display:none""#)
        );
        assert!(!is_probably_readerable(&html, None));
    }

    #[test]
    fn unlikely_classes_ignored() {
        let html = format!(
            "<html><body>{}</body></html>",
            long_paragraphs(5, r#"class="comment""#)
        );
        assert!(!is_probably_readerable(&html, None));
    }

    #[test]
    fn thresholds_adjustable() {
        let html = format!("<html><body>{}</body></html>", long_paragraphs(1, ""));
        let strict = ReaderableOptions {
            min_content_length: 140,
            min_score: 50.0,
        };
        assert!(!is_probably_readerable(&html, Some(strict)));
        let lax = ReaderableOptions {
            min_content_length: 50,
            min_score: 1.0,
        };
        assert!(is_probably_readerable(&html, Some(lax)));
    }
}
