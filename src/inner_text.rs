//! Block-aware plain-text rendering of a DOM subtree.
//!
//! Mirrors the visual block/inline structure of the markup without a layout
//! engine: block containers request newlines, table cells request tabs, and
//! runs of whitespace collapse into at most one pending separator that is only
//! written out immediately before the next word.

use kuchikikiki::NodeRef;

use crate::dom_utils::element_name;

const NO_BREAK_SPACE: char = '\u{00A0}';

/// Render the plain text of a subtree.
///
/// Inside `<pre>` the text is emitted verbatim; everywhere else whitespace is
/// collapsed word-by-word. `<br>` contributes exactly one non-collapsing
/// newline, block containers request one or two collapsing newlines, and
/// `<td>`/`<th>` queue a tab as the next inter-word separator.
pub fn inner_text(node: &NodeRef) -> String {
    let mut builder = TextBuilder::default();
    render(node, false, &mut builder);
    builder.into_string()
}

fn render(node: &NodeRef, keep_whitespace: bool, tb: &mut TextBuilder) {
    if let Some(text) = node.as_text() {
        let data = text.borrow();
        if keep_whitespace {
            tb.write_pre(&data);
        } else {
            let mut start_of_word: Option<usize> = None;
            for (i, c) in data.char_indices() {
                if c.is_whitespace() {
                    if let Some(start) = start_of_word.take() {
                        tb.write_word(&data[start..i]);
                    }
                    if c == NO_BREAK_SPACE {
                        tb.queue_space(NO_BREAK_SPACE);
                    } else {
                        tb.queue_space(' ');
                    }
                } else if start_of_word.is_none() {
                    start_of_word = Some(i);
                }
            }
            if let Some(start) = start_of_word {
                tb.write_word(&data[start..]);
            }
        }
        return;
    }

    let mut keep_whitespace = keep_whitespace;
    if let Some(name) = element_name(node) {
        match name {
            // These never contain user-facing text; skip their subtrees.
            "head" | "meta" | "style" | "script" | "iframe" | "audio" | "video" | "track"
            | "source" | "canvas" | "svg" | "map" | "area" => return,
            "br" => tb.write_newline(1, false),
            "hr" | "p" | "blockquote" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "ul" | "ol"
            | "dl" | "table" => tb.write_newline(2, true),
            "pre" => {
                tb.write_newline(2, true);
                keep_whitespace = true;
            }
            "th" | "td" => tb.queue_space('\t'),
            "div" | "figure" | "figcaption" | "picture" | "li" | "dt" | "dd" | "header"
            | "footer" | "main" | "section" | "article" | "aside" | "nav" | "address"
            | "details" | "summary" | "dialog" | "form" | "fieldset" | "caption" | "thead"
            | "tbody" | "tfoot" | "tr" => tb.write_newline(1, true),
            _ => {}
        }
    }

    for child in node.children() {
        render(&child, keep_whitespace, tb);
    }
}

/// Accumulates output with at most one pending separator character and a
/// count of newlines already emitted since the last word.
#[derive(Default)]
struct TextBuilder {
    out: String,
    separator: Option<char>,
    newlines: u8,
}

impl TextBuilder {
    fn into_string(self) -> String {
        self.out
    }

    fn queue_space(&mut self, c: char) {
        if self.separator.is_none() {
            self.separator = Some(c);
        }
    }

    fn write_newline(&mut self, requested: u8, collapse: bool) {
        let mut n = requested;
        if collapse {
            if self.newlines >= n {
                return;
            }
            n -= self.newlines;
        }
        self.newlines = self.newlines.saturating_add(n);
        // Collapsing requests before any output would produce leading blank
        // lines; a <br> before any text still writes.
        if collapse && self.out.is_empty() {
            return;
        }
        for _ in 0..n {
            self.out.push('\n');
        }
    }

    fn write_word(&mut self, word: &str) {
        if let Some(sep) = self.separator {
            if self.newlines == 0 {
                self.out.push(sep);
            }
        }
        self.out.push_str(word);
        self.newlines = 0;
        self.separator = None;
    }

    fn write_pre(&mut self, text: &str) {
        self.out.push_str(text);
        self.newlines = 0;
        self.separator = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom_utils::parse_html;

    fn render_str(html: &str) -> String {
        inner_text(&parse_html(html))
    }

    #[test]
    fn mixed_blocks() {
        let html = "<p><span>Hi there!<p><img/>How have you been?\n\
                    <ul><li>pretty good</li><li>not bad</li><li>meh</li>\n\
                    <p><span>Inline</span><span>No</span><span>Spaces</span><div>Fin\n\
                    <table><tr><th>header 1</th><th>header 2</th></tr><tr><td>cell 1</td><td>cell 2</td></tr></table>\n\
                    <div>\n\t<div>\n\t\t<div>\n\t\t\t<div>\n\t\t\t\tDeeply nested\n\t\t\t</div>\n\t\t</div>\n\t</div>\n</div>";
        let expected = "Hi there!\n\nHow have you been?\n\npretty good\nnot bad\nmeh\n\nInlineNoSpaces\nFin\n\nheader 1\theader 2\ncell 1\tcell 2\nDeeply nested";
        assert_eq!(render_str(html), expected);
    }

    #[test]
    fn no_break_space_is_preserved() {
        let html = "<div> <p> open\u{a0}source software </p> </div>";
        assert_eq!(render_str(html), "open\u{a0}source software");
    }

    #[test]
    fn entity_no_break_space_is_preserved() {
        let html = "<div> <p> open&nbsp;source software </p> </div>";
        assert_eq!(render_str(html), "open\u{a0}source software");
    }

    #[test]
    fn br_newlines_do_not_collapse() {
        let html = "<p>hard<br>line<br><br><br>breaks</p>";
        assert_eq!(render_str(html), "hard\nline\n\n\nbreaks");
    }

    #[test]
    fn pre_preserves_whitespace() {
        let html = "<div>\n\t<p> Example code: </p>\n\t<pre><code>def normalize(s: str) -&gt; str:\n    <span class=\"comment\"># remove all U+00AD (SOFT HYPHEN)</span>\n    return s.<span class=\"fn\">replace</span>('\\u00ad', '')\n</code></pre>\n</div>";
        let expected = "Example code:\n\ndef normalize(s: str) -> str:\n    # remove all U+00AD (SOFT HYPHEN)\n    return s.replace('\\u00ad', '')\n";
        assert_eq!(render_str(html), expected);
    }

    #[test]
    fn headings_get_blank_lines() {
        let html = "<h1>HEADING 1</h1>\n\t<p>First paragraph</p>\n\t<h2>HEADING 2</h2>\n\t<p>Second paragraph</p>\n";
        let expected = "HEADING 1\n\nFirst paragraph\n\nHEADING 2\n\nSecond paragraph";
        assert_eq!(render_str(html), expected);
    }

    #[test]
    fn multibyte_text_with_inline_links() {
        let html = "<p align=\"center\">\n\t<a href=\"../../../index.html\">福娘童話集</a> &gt; <a href=\"../index.html\">きょうのイソップ童話</a> &gt; <a href=\"../itiran/01gatu.htm\">１月のイソップ童話</a> &gt; 欲張りなイヌ\n</p>";
        assert_eq!(
            render_str(html),
            "福娘童話集 > きょうのイソップ童話 > １月のイソップ童話 > 欲張りなイヌ"
        );
    }

    #[test]
    fn long_br_runs_saturate_the_newline_counter() {
        let html = format!("<p>top{}bottom</p>", "<br>".repeat(300));
        let text = render_str(&html);
        assert!(text.starts_with("top\n"));
        assert!(text.ends_with("\nbottom"));
    }

    #[test]
    fn never_more_than_two_consecutive_newlines() {
        let html = "<div><p>a</p></div><div></div><ul></ul><table></table><div><p>b</p></div>";
        let text = render_str(html);
        assert!(!text.contains("\n\n\n"));
        assert!(!text.starts_with('\n'));
    }
}
