//! Document preprocessing ahead of scoring.
//!
//! Runs once per parse, before any scoring pass: recovers lazy-loaded images
//! hidden behind `<noscript>`, removes scripts/styles/comments, folds runs of
//! `<br>` into real paragraphs and rewrites presentational `<font>` tags.

use kuchikikiki::NodeRef;
use log::debug;

use crate::dom_utils::{
    element_name, first_element_child, is_element, is_phrasing_content, is_whitespace_node,
    new_element, next_significant_node, rename_element,
};

/// Prepare the document for extraction. Mutates the tree in place.
pub fn prep_document(doc: &NodeRef) {
    unwrap_noscript_images(doc);
    remove_scripts(doc);
    remove_tags(doc, "style");
    remove_comments(doc);
    replace_brs(doc);
    for font in collect_tags(doc, "font") {
        rename_element(&font, "span");
    }
}

fn collect_tags(doc: &NodeRef, tag: &str) -> Vec<NodeRef> {
    match doc.select(tag) {
        Ok(sel) => sel.map(|e| e.as_node().clone()).collect(),
        Err(()) => Vec::new(),
    }
}

fn remove_tags(doc: &NodeRef, tag: &str) {
    for node in collect_tags(doc, tag) {
        node.detach();
    }
}

fn remove_scripts(doc: &NodeRef) {
    remove_tags(doc, "script");
    remove_tags(doc, "noscript");
}

fn remove_comments(doc: &NodeRef) {
    let comments: Vec<NodeRef> = doc
        .inclusive_descendants()
        .filter(|n| n.as_comment().is_some())
        .collect();
    for comment in comments {
        comment.detach();
    }
}

/// Whether a subtree consists of exactly one `<img>`, possibly wrapped in
/// single-child containers, with no visible text.
fn is_single_image(node: &NodeRef) -> bool {
    if is_element(node, "img") {
        return true;
    }
    if node.as_element().is_none() {
        return false;
    }
    let element_children: Vec<NodeRef> =
        node.children().filter(|c| c.as_element().is_some()).collect();
    if element_children.len() != 1 {
        return false;
    }
    if !node.text_contents().trim().is_empty() {
        return false;
    }
    is_single_image(&element_children[0])
}

/// Find lazy-loading patterns of the form `<img …><noscript><img …></noscript>`
/// and replace the placeholder image with the real one from the `<noscript>`,
/// keeping attributes the placeholder had that the real image lacks.
///
/// Placeholder images that carry no `src`/`srcset` (or data-URI equivalents)
/// anywhere in their attributes are dropped first.
pub fn unwrap_noscript_images(doc: &NodeRef) {
    for img in collect_tags(doc, "img") {
        let meaningful = img
            .as_element()
            .map(|e| {
                e.attributes.borrow().map.iter().any(|(name, attr)| {
                    matches!(&*name.local, "src" | "srcset" | "data-src" | "data-srcset")
                        || attr.value.contains(".jpg")
                        || attr.value.contains(".jpeg")
                        || attr.value.contains(".png")
                        || attr.value.contains(".webp")
                })
            })
            .unwrap_or(false);
        if !meaningful {
            img.detach();
        }
    }

    for noscript in collect_tags(doc, "noscript") {
        let content = noscript_content(&noscript);
        if !is_single_image(&content) {
            continue;
        }
        let Some(prev) = previous_element_sibling(&noscript) else {
            continue;
        };
        if !is_single_image(&prev) {
            continue;
        }
        let Some(new_img) = find_img(&content) else {
            continue;
        };
        let Some(prev_img) = find_img(&prev) else {
            continue;
        };

        // Keep attributes from the placeholder that the real image is missing;
        // conflicting src-like values are preserved under a data-old- prefix.
        if let (Some(from), Some(to)) = (prev_img.as_element(), new_img.as_element()) {
            let from_attrs: Vec<(String, String)> = from
                .attributes
                .borrow()
                .map
                .iter()
                .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
                .collect();
            for (name, value) in from_attrs {
                if value.is_empty() {
                    continue;
                }
                let mut attrs = to.attributes.borrow_mut();
                let target = if attrs.get(name.as_str()).is_some() {
                    if attrs.get(name.as_str()) == Some(value.as_str()) {
                        continue;
                    }
                    let renamed = format!("data-old-{}", name);
                    if attrs.get(renamed.as_str()).is_some() {
                        continue;
                    }
                    renamed
                } else {
                    name
                };
                attrs.insert(target.as_str(), value);
            }
        }

        debug!("recovered lazy-loaded image from noscript");
        new_img.detach();
        prev.insert_before(new_img);
        prev.detach();
    }
}

/// The parsed content of a `<noscript>`. The HTML parser treats it as raw
/// text when scripting is on, so the markup has to be re-parsed to be
/// inspected.
fn noscript_content(noscript: &NodeRef) -> NodeRef {
    if first_element_child(noscript).is_some() {
        return noscript.clone();
    }
    let parsed = crate::dom_utils::parse_html(&noscript.text_contents());
    parsed
        .select_first("body")
        .map(|b| b.as_node().clone())
        .unwrap_or(parsed)
}

fn previous_element_sibling(node: &NodeRef) -> Option<NodeRef> {
    let mut current = node.previous_sibling();
    while let Some(n) = current {
        if n.as_element().is_some() {
            return Some(n);
        }
        current = n.previous_sibling();
    }
    None
}

fn find_img(node: &NodeRef) -> Option<NodeRef> {
    if is_element(node, "img") {
        return Some(node.clone());
    }
    node.select_first("img").ok().map(|e| e.as_node().clone())
}

/// Collapse runs of two or more `<br>` elements into paragraph breaks: the
/// chain is removed and the phrasing content that follows is gathered into a
/// new `<p>`.
pub fn replace_brs(root: &NodeRef) {
    for br in collect_tags(root, "br") {
        if br.parent().is_none() {
            // Consumed by an earlier chain.
            continue;
        }
        let mut replaced = false;

        // Remove the rest of the chain, leaving this <br> to become the <p>.
        let mut next = br.next_sibling();
        while let Some(n) = next_significant_node(next.take()) {
            if is_element(&n, "br") {
                replaced = true;
                next = n.next_sibling();
                n.detach();
            } else {
                break;
            }
        }
        if !replaced {
            continue;
        }

        let p = new_element("p");
        br.insert_after(p.clone());
        br.detach();

        let mut next = p.next_sibling();
        while let Some(n) = next.take() {
            // Another <br><br> means the paragraph ends here.
            if is_element(&n, "br") {
                if let Some(after) = next_significant_node(n.next_sibling()) {
                    if is_element(&after, "br") {
                        break;
                    }
                }
            }
            if !is_phrasing_content(&n) {
                break;
            }
            let sibling = n.next_sibling();
            n.detach();
            // Whitespace left behind by the removed chain would otherwise
            // lead the paragraph.
            if p.first_child().is_some() || !is_whitespace_node(&n) {
                p.append(n);
            }
            next = sibling;
        }

        while let Some(last) = p.last_child() {
            if is_whitespace_node(&last) {
                last.detach();
            } else {
                break;
            }
        }

        if let Some(parent) = p.parent() {
            if element_name(&parent) == Some("p") {
                rename_element(&parent, "div");
            }
        }
    }
}
