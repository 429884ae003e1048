//! Final cleanup of the extracted content: absolute URLs, wrapper collapse,
//! class and presentational-attribute stripping.

use kuchikikiki::NodeRef;
use url::Url;

use crate::constants::{DEPRECATED_SIZE_ATTRIBUTE_ELEMS, PRESENTATIONAL_ATTRIBUTES};
use crate::dom_utils::{
    attr, element_name, first_element_child, get_next_element, has_single_tag_inside,
    is_element_without_content, move_children, remove_and_get_next, remove_attr, set_attr,
};
use crate::metadata::resolve_url;
use crate::options::ReadabilityOptions;

/// Run the whole post-processing pass over the extracted article node.
pub fn post_process_content(
    article_content: &NodeRef,
    base_url: Option<&Url>,
    options: &ReadabilityOptions,
) {
    if base_url.is_some() {
        fix_relative_uris(article_content, base_url);
    }
    simplify_nested_elements(article_content);
    clean_presentational_attributes(article_content);
    if !options.keep_classes {
        clean_classes(article_content, &options.classes_to_preserve);
    }
}

/// Rewrite `href`, `src`, `poster` and `srcset` attributes to absolute URLs.
/// `javascript:` links are unwrapped into their contents; fragment-only
/// links and `data:` URIs are left alone.
pub fn fix_relative_uris(root: &NodeRef, base_url: Option<&Url>) {
    let links: Vec<NodeRef> = match root.select("a") {
        Ok(sel) => sel.map(|e| e.as_node().clone()).collect(),
        Err(()) => Vec::new(),
    };
    for link in links {
        let href = match attr(&link, "href") {
            Some(h) if !h.trim().is_empty() => h.trim().to_string(),
            _ => continue,
        };
        if href.starts_with("javascript:") {
            // Keep the visible text, drop the link itself.
            if link.children().count() == 1
                && link.first_child().map(|c| c.as_text().is_some()) == Some(true)
            {
                let text = link.text_contents();
                link.insert_after(NodeRef::new_text(text));
            } else {
                let container = crate::dom_utils::new_element("span");
                move_children(&link, &container);
                link.insert_after(container);
            }
            link.detach();
        } else if href.starts_with('#') {
            // fragment link within the page, keep as-is
        } else {
            set_attr(&link, "href", &resolve_url(&href, base_url));
        }
    }

    let media: Vec<NodeRef> = match root.select("img, picture, figure, video, audio, source") {
        Ok(sel) => sel.map(|e| e.as_node().clone()).collect(),
        Err(()) => Vec::new(),
    };
    for node in media {
        if let Some(src) = attr(&node, "src").filter(|s| !s.trim().is_empty()) {
            set_attr(&node, "src", &resolve_url(src.trim(), base_url));
        }
        if let Some(poster) = attr(&node, "poster").filter(|p| !p.trim().is_empty()) {
            set_attr(&node, "poster", &resolve_url(poster.trim(), base_url));
        }
        if let Some(srcset) = attr(&node, "srcset").filter(|s| !s.trim().is_empty()) {
            set_attr(&node, "srcset", &fix_srcset(&srcset, base_url));
        }
    }
}

/// Resolve each candidate URL in a srcset value, preserving descriptors.
fn fix_srcset(srcset: &str, base_url: Option<&Url>) -> String {
    srcset
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            let mut parts = entry.split_whitespace();
            let url = parts.next()?;
            let descriptor = parts.collect::<Vec<_>>().join(" ");
            let resolved = resolve_url(url, base_url);
            if descriptor.is_empty() {
                Some(resolved)
            } else {
                Some(format!("{} {}", resolved, descriptor))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collapse pointless wrapper chains: a `<div>` or `<section>` whose only
/// element child is another div/section is replaced by that child, and ones
/// without any content are dropped.
pub fn simplify_nested_elements(root: &NodeRef) {
    let mut node = Some(root.clone());
    while let Some(current) = node {
        let is_wrapper = matches!(element_name(&current), Some("div") | Some("section"))
            && !attr(&current, "id")
                .map(|id| id.starts_with("readability"))
                .unwrap_or(false);
        if is_wrapper && current.parent().is_some() {
            if is_element_without_content(&current) {
                node = remove_and_get_next(current);
                continue;
            }
            if has_single_tag_inside(&current, "div") || has_single_tag_inside(&current, "section")
            {
                if let Some(child) = first_element_child(&current) {
                    // carry the wrapper's attributes down onto the child
                    if let (Some(from), Some(to)) = (current.as_element(), child.as_element()) {
                        let from_attrs = from.attributes.borrow();
                        let mut to_attrs = to.attributes.borrow_mut();
                        for (name, value) in from_attrs.map.iter() {
                            to_attrs.map.entry(name.clone()).or_insert(value.clone());
                        }
                    }
                    current.insert_after(child.clone());
                    current.detach();
                    node = Some(child);
                    continue;
                }
            }
        }
        node = get_next_element(&current, false);
    }
}

/// Strip class attributes except the configured survivors.
pub fn clean_classes(root: &NodeRef, classes_to_preserve: &[String]) {
    let mut node = Some(root.clone());
    while let Some(current) = node {
        if current.as_element().is_some() {
            match attr(&current, "class") {
                Some(class) => {
                    let kept: Vec<&str> = class
                        .split_whitespace()
                        .filter(|c| classes_to_preserve.iter().any(|p| p == c))
                        .collect();
                    if kept.is_empty() {
                        remove_attr(&current, "class");
                    } else {
                        set_attr(&current, "class", &kept.join(" "));
                    }
                }
                None => {}
            }
        }
        node = get_next_element(&current, false);
    }
}

/// Remove inline styling and the deprecated size attributes from every
/// element in the subtree.
pub fn clean_presentational_attributes(root: &NodeRef) {
    let mut node = Some(root.clone());
    while let Some(current) = node {
        if let Some(tag) = element_name(&current).map(str::to_string) {
            for attribute in PRESENTATIONAL_ATTRIBUTES {
                remove_attr(&current, attribute);
            }
            if DEPRECATED_SIZE_ATTRIBUTE_ELEMS.contains(&tag.as_str()) {
                remove_attr(&current, "width");
                remove_attr(&current, "height");
            }
        }
        node = get_next_element(&current, false);
    }
}
