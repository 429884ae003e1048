//! DOM helpers over the kuchikikiki node tree.
//!
//! All tree access and mutation in the engine goes through these functions so
//! the rest of the crate reads in terms of elements, attributes and siblings
//! rather than raw `NodeData` plumbing.

use html5ever::{namespace_url, ns, LocalName, QualName};
use kuchikikiki::traits::TendrilSink;
use kuchikikiki::{Attribute, ExpandedName, NodeData, NodeRef};

use crate::constants::{PHRASING_ELEMS, REGEXPS};

/// Parse a complete HTML document into a node tree.
///
/// Follows the HTML5 parsing spec; `<html>`, `<head>` and `<body>` are
/// synthesised when missing and invalid byte sequences have already been
/// replaced by the time text reaches the tree.
pub fn parse_html(html: &str) -> NodeRef {
    kuchikikiki::parse_html().one(html)
}

/// Create a new, detached HTML element with no attributes.
pub fn new_element(tag: &str) -> NodeRef {
    NodeRef::new_element(
        QualName::new(None, ns!(html), LocalName::from(tag)),
        std::iter::empty::<(ExpandedName, Attribute)>(),
    )
}

/// Lowercase local name of an element node, or `None` for non-elements.
pub fn element_name(node: &NodeRef) -> Option<&str> {
    node.as_element().map(|e| &*e.name.local)
}

pub fn is_element(node: &NodeRef, tag: &str) -> bool {
    element_name(node) == Some(tag)
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|e| e.attributes.borrow().get(name).map(String::from))
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(e) = node.as_element() {
        e.attributes.borrow_mut().insert(name, value.to_string());
    }
}

pub fn remove_attr(node: &NodeRef, name: &str) {
    if let Some(e) = node.as_element() {
        e.attributes.borrow_mut().remove(name);
    }
}

/// `class` and `id` joined into the string the keyword matchers run against.
pub fn match_string(node: &NodeRef) -> String {
    let class = attr(node, "class").unwrap_or_default();
    let id = attr(node, "id").unwrap_or_default();
    format!("{} {}", class, id)
}

/// Serialize a node (including itself) to an HTML string.
pub fn outer_html(node: &NodeRef) -> String {
    let mut buf = Vec::new();
    let _ = node.serialize(&mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

/// Serialize only the children of a node.
pub fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| outer_html(&child)).collect()
}

/// Recursively copy a subtree into new, detached nodes.
pub fn deep_clone(node: &NodeRef) -> NodeRef {
    let copy = shallow_clone(node);
    for child in node.children() {
        copy.append(deep_clone(&child));
    }
    copy
}

fn shallow_clone(node: &NodeRef) -> NodeRef {
    match node.data() {
        NodeData::Element(e) => NodeRef::new_element(
            e.name.clone(),
            e.attributes
                .borrow()
                .map
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        ),
        NodeData::Text(t) => NodeRef::new_text(t.borrow().clone()),
        NodeData::Comment(c) => NodeRef::new_comment(c.borrow().clone()),
        NodeData::ProcessingInstruction(pi) => {
            let (target, data) = pi.borrow().clone();
            NodeRef::new_processing_instruction(target, data)
        }
        NodeData::Doctype(d) => {
            NodeRef::new_doctype(d.name.clone(), d.public_id.clone(), d.system_id.clone())
        }
        NodeData::Document(_) => NodeRef::new_document(),
        NodeData::DocumentFragment => NodeRef::new(NodeData::DocumentFragment),
    }
}

/// Replace an element with a new one of a different tag name, keeping its
/// attributes and children. Returns the replacement.
pub fn rename_element(node: &NodeRef, tag: &str) -> NodeRef {
    let replacement = new_element(tag);
    if let (Some(from), Some(to)) = (node.as_element(), replacement.as_element()) {
        for (name, value) in from.attributes.borrow().map.iter() {
            to.attributes
                .borrow_mut()
                .map
                .insert(name.clone(), value.clone());
        }
    }
    move_children(node, &replacement);
    node.insert_after(replacement.clone());
    node.detach();
    replacement
}

/// Move every child of `from` to the end of `to`, preserving order.
pub fn move_children(from: &NodeRef, to: &NodeRef) {
    while let Some(child) = from.first_child() {
        child.detach();
        to.append(child);
    }
}

pub fn first_element_child(node: &NodeRef) -> Option<NodeRef> {
    node.children().find(|c| c.as_element().is_some())
}

pub fn next_element_sibling(node: &NodeRef) -> Option<NodeRef> {
    let mut current = node.next_sibling();
    while let Some(n) = current {
        if n.as_element().is_some() {
            return Some(n);
        }
        current = n.next_sibling();
    }
    None
}

pub fn element_children(node: &NodeRef) -> Vec<NodeRef> {
    node.children().filter(|c| c.as_element().is_some()).collect()
}

/// Starting at `node` (or its siblings), skip whitespace-only text nodes and
/// comments; stop at the first element or non-whitespace text node.
pub fn next_significant_node(mut node: Option<NodeRef>) -> Option<NodeRef> {
    while let Some(n) = node {
        if n.as_element().is_some() {
            return Some(n);
        }
        if let Some(text) = n.as_text() {
            if !text.borrow().trim().is_empty() {
                return Some(n);
            }
        }
        node = n.next_sibling();
    }
    None
}

/// Depth-first walk over elements only, as used by the stripping passes.
pub fn get_next_element(node: &NodeRef, ignore_self_and_kids: bool) -> Option<NodeRef> {
    if !ignore_self_and_kids {
        if let Some(child) = first_element_child(node) {
            return Some(child);
        }
    }
    if let Some(sibling) = next_element_sibling(node) {
        return Some(sibling);
    }
    let mut parent = node.parent();
    while let Some(p) = parent {
        if let Some(sibling) = next_element_sibling(&p) {
            return Some(sibling);
        }
        parent = p.parent();
    }
    None
}

/// Detach `node` and return the next element in document order, so removal
/// loops can keep walking without revisiting the removed subtree.
pub fn remove_and_get_next(node: NodeRef) -> Option<NodeRef> {
    let next = get_next_element(&node, true);
    node.detach();
    next
}

/// Ancestors of a node, closest first, up to `max_depth` (0 = unlimited).
pub fn get_node_ancestors(node: &NodeRef, max_depth: usize) -> Vec<NodeRef> {
    let mut ancestors = Vec::new();
    let mut current = node.parent();
    while let Some(p) = current {
        ancestors.push(p.clone());
        if max_depth > 0 && ancestors.len() == max_depth {
            break;
        }
        current = p.parent();
    }
    ancestors
}

pub fn has_ancestor_tag(node: &NodeRef, tag: &str, max_depth: usize) -> bool {
    get_node_ancestors(node, max_depth)
        .iter()
        .any(|a| is_element(a, tag))
}

/// Concatenated text of a subtree, trimmed, with interior whitespace runs
/// optionally collapsed to single spaces.
pub fn get_inner_text(node: &NodeRef, normalize_spaces: bool) -> String {
    let text = node.text_contents();
    let trimmed = text.trim();
    if normalize_spaces {
        REGEXPS.normalize.replace_all(trimmed, " ").into_owned()
    } else {
        trimmed.to_string()
    }
}

pub fn text_length(node: &NodeRef) -> usize {
    get_inner_text(node, true).chars().count()
}

/// Fraction of a subtree's text that sits inside `<a>` elements, in [0, 1].
///
/// Links to in-page anchors only count for 30% of their length; they are
/// navigation but cheap navigation.
pub fn get_link_density(node: &NodeRef) -> f64 {
    let total = text_length(node) as f64;
    if total == 0.0 {
        return 0.0;
    }
    let mut link_length = 0.0;
    if let Ok(links) = node.select("a") {
        for link in links {
            let href = attr(link.as_node(), "href").unwrap_or_default();
            let coefficient = if href.starts_with('#') { 0.3 } else { 1.0 };
            link_length += text_length(link.as_node()) as f64 * coefficient;
        }
    }
    (link_length / total).min(1.0)
}

/// Whether a node is phrasing (inline) content per the HTML spec.
pub fn is_phrasing_content(node: &NodeRef) -> bool {
    if node.as_text().is_some() {
        return true;
    }
    match element_name(node) {
        Some(name) if PHRASING_ELEMS.contains(&name) => true,
        Some("a") | Some("del") | Some("ins") => node.children().all(|c| is_phrasing_content(&c)),
        _ => false,
    }
}

pub fn is_whitespace_node(node: &NodeRef) -> bool {
    if let Some(text) = node.as_text() {
        return text.borrow().trim().is_empty();
    }
    is_element(node, "br")
}

/// An element counts as empty when it has no text and contains only `<br>`
/// and `<hr>` children.
pub fn is_element_without_content(node: &NodeRef) -> bool {
    if node.as_element().is_none() {
        return false;
    }
    if !node.text_contents().trim().is_empty() {
        return false;
    }
    node.children().all(|c| {
        matches!(element_name(&c), Some("br") | Some("hr")) || is_whitespace_node(&c)
    })
}

/// True when `node` has exactly one element child with tag `tag` and no
/// non-whitespace text children.
pub fn has_single_tag_inside(node: &NodeRef, tag: &str) -> bool {
    let children = element_children(node);
    if children.len() != 1 || !is_element(&children[0], tag) {
        return false;
    }
    !node.children().any(|c| {
        c.as_text()
            .map(|t| !t.borrow().trim().is_empty())
            .unwrap_or(false)
    })
}

const DIV_TO_P_ELEMS: &[&str] = &[
    "blockquote", "dl", "div", "img", "ol", "p", "pre", "table", "ul",
];

/// Whether any descendant is a block-level element that prevents treating a
/// `<div>` as a paragraph.
pub fn has_child_block_element(node: &NodeRef) -> bool {
    node.children().any(|child| {
        element_name(&child)
            .map(|name| DIV_TO_P_ELEMS.contains(&name))
            .unwrap_or(false)
            || has_child_block_element(&child)
    })
}

/// Rough visibility check: inline `display:none`/`visibility:hidden`, the
/// `hidden` attribute, or `aria-hidden` (except fallback images).
pub fn is_probably_visible(node: &NodeRef) -> bool {
    if let Some(style) = attr(node, "style") {
        let style = style.to_lowercase();
        if style.contains("display:none")
            || style.contains("display: none")
            || style.contains("visibility:hidden")
            || style.contains("visibility: hidden")
        {
            return false;
        }
    }
    if node
        .as_element()
        .map(|e| e.attributes.borrow().contains("hidden"))
        .unwrap_or(false)
    {
        return false;
    }
    if attr(node, "aria-hidden").as_deref() == Some("true") {
        let class = attr(node, "class").unwrap_or_default();
        if !class.contains("fallback-image") {
            return false;
        }
    }
    true
}

pub fn count_elements(node: &NodeRef) -> usize {
    node.inclusive_descendants()
        .filter(|n| n.as_element().is_some())
        .count()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Similarity of two strings as 1 − (length of tokens unique to `b` /
/// total token length of `b`), tokenized on non-word characters.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let tokenize = |s: &str| {
        s.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    };
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let unique_b: Vec<&str> = tokens_b
        .iter()
        .filter(|t| !tokens_a.contains(t))
        .map(String::as_str)
        .collect();
    let distance = unique_b.join(" ").len() as f64 / tokens_b.join(" ").len() as f64;
    1.0 - distance
}

/// Validate that a string parses as an absolute http(s) URL.
pub fn is_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| u.scheme().starts_with("http"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_keeps_attributes_and_children() {
        let doc = parse_html(r#"<div id="x" class="y"><p>one</p><p>two</p></div>"#);
        let div = doc.select_first("div").unwrap().as_node().clone();
        let span = rename_element(&div, "span");
        assert_eq!(element_name(&span), Some("span"));
        assert_eq!(attr(&span, "id").as_deref(), Some("x"));
        assert_eq!(element_children(&span).len(), 2);
        assert!(doc.select_first("div").is_err());
    }

    #[test]
    fn deep_clone_is_detached_and_structurally_equal() {
        let doc = parse_html("<div><p>hello <b>world</b></p></div>");
        let div = doc.select_first("div").unwrap().as_node().clone();
        let copy = deep_clone(&div);
        assert!(copy.parent().is_none());
        assert_eq!(outer_html(&copy), outer_html(&div));
        // Mutating the copy leaves the original alone.
        copy.first_child().unwrap().detach();
        assert_eq!(element_children(&div).len(), 1);
    }

    #[test]
    fn link_density_bounds() {
        let doc = parse_html(r#"<div><a href="/x">all link text</a></div>"#);
        let div = doc.select_first("div").unwrap().as_node().clone();
        let density = get_link_density(&div);
        assert!((density - 1.0).abs() < f64::EPSILON);

        let doc = parse_html("<div>no links at all here</div>");
        let div = doc.select_first("div").unwrap().as_node().clone();
        assert_eq!(get_link_density(&div), 0.0);
    }

    #[test]
    fn hash_links_count_less() {
        let doc = parse_html(r##"<div><a href="#top">anchor text</a>plain text</div>"##);
        let div = doc.select_first("div").unwrap().as_node().clone();
        let density = get_link_density(&div);
        assert!(density > 0.0 && density < 0.5);
    }

    #[test]
    fn phrasing_content_checks() {
        let doc = parse_html("<p><span>inline</span><div>block</div><a><em>x</em></a></p>");
        let span = doc.select_first("span").unwrap().as_node().clone();
        let div = doc.select_first("div").unwrap().as_node().clone();
        let a = doc.select_first("a").unwrap().as_node().clone();
        assert!(is_phrasing_content(&span));
        assert!(!is_phrasing_content(&div));
        assert!(is_phrasing_content(&a));
    }

    #[test]
    fn element_walk_covers_document_order() {
        let doc = parse_html("<div><p>a</p></div><span>b</span>");
        let body = doc.select_first("body").unwrap().as_node().clone();
        let mut tags = Vec::new();
        let mut node = Some(body);
        while let Some(n) = node {
            tags.push(element_name(&n).unwrap_or("").to_string());
            node = get_next_element(&n, false);
        }
        assert_eq!(tags, ["body", "div", "p", "span"]);
    }

    #[test]
    fn visibility_checks() {
        let doc = parse_html(
            r#"<p style="display:none">a</p><p hidden>b</p><p aria-hidden="true">c</p><p>d</p>"#,
        );
        let paras: Vec<_> = doc.select("p").unwrap().collect();
        assert!(!is_probably_visible(paras[0].as_node()));
        assert!(!is_probably_visible(paras[1].as_node()));
        assert!(!is_probably_visible(paras[2].as_node()));
        assert!(is_probably_visible(paras[3].as_node()));
    }

    #[test]
    fn similarity_of_title_variants() {
        let sim = text_similarity("Article Title | Site Name", "Article Title");
        assert!(sim > 0.75);
        assert!(text_similarity("one two three", "four five") < 0.1);
    }
}
