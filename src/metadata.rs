//! Metadata extraction: `<meta>` tags, embedded JSON-LD, and the document
//! title/byline heuristics.
//!
//! Values found directly in `<meta>` tags take precedence; structured data
//! fills the gaps. Nothing here mutates the document.

use std::collections::HashMap;

use kuchikikiki::NodeRef;
use log::debug;
use serde_json::Value;
use url::Url;

use crate::constants::REGEXPS;
use crate::dom_utils::{self, attr, text_similarity, word_count};
use crate::scoring::is_valid_byline;

/// Metadata gathered from the document before content extraction.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
    pub published_time: Option<String>,
    pub modified_time: Option<String>,
    pub lang: Option<String>,
}

/// Parse `<script type="application/ld+json">` blocks for schema.org
/// Article-like objects. Returns the first matching object's fields.
pub fn get_json_ld(doc: &NodeRef) -> Metadata {
    let mut metadata = Metadata::default();
    let scripts = match doc.select("script") {
        Ok(sel) => sel.collect::<Vec<_>>(),
        Err(()) => return metadata,
    };

    for script in scripts {
        if attr(script.as_node(), "type").as_deref() != Some("application/ld+json") {
            continue;
        }
        let raw = script.as_node().text_contents();
        let raw = raw
            .trim()
            .trim_start_matches("<![CDATA[")
            .trim_end_matches("]]>")
            .trim();

        let parsed: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(err) => {
                debug!("skipping malformed JSON-LD block: {}", err);
                continue;
            }
        };

        let candidate = if let Value::Array(items) = &parsed {
            match items.iter().find(|v| type_matches(v)) {
                Some(v) => v.clone(),
                None => continue,
            }
        } else {
            parsed
        };

        if !context_matches(&candidate) {
            continue;
        }

        // The article may sit inside an @graph collection.
        let article = if type_matches(&candidate) {
            candidate
        } else if let Some(graph) = candidate.get("@graph").and_then(Value::as_array) {
            match graph.iter().find(|v| type_matches(v)) {
                Some(v) => v.clone(),
                None => continue,
            }
        } else {
            continue;
        };

        // Schema.org "name" can be either the article title or the site
        // title; prefer "headline" when it is the one matching <title>.
        let name = article.get("name").and_then(Value::as_str);
        let headline = article.get("headline").and_then(Value::as_str);
        metadata.title = match (name, headline) {
            (Some(name), Some(headline)) if name != headline => {
                let doc_title = get_document_title(doc).unwrap_or_default();
                let headline_matches = text_similarity(headline, &doc_title) > 0.75;
                let name_matches = text_similarity(name, &doc_title) > 0.75;
                if headline_matches && !name_matches {
                    Some(headline.trim().to_string())
                } else {
                    Some(name.trim().to_string())
                }
            }
            (Some(name), _) => Some(name.trim().to_string()),
            (None, Some(headline)) => Some(headline.trim().to_string()),
            (None, None) => None,
        };

        if let Some(author) = article.get("author") {
            if let Some(name) = author.get("name").and_then(Value::as_str) {
                metadata.byline = Some(name.trim().to_string());
            } else if let Some(authors) = author.as_array() {
                let names: Vec<&str> = authors
                    .iter()
                    .filter_map(|a| a.get("name").and_then(Value::as_str))
                    .map(str::trim)
                    .collect();
                if !names.is_empty() {
                    metadata.byline = Some(names.join(", "));
                }
            }
        }

        metadata.excerpt = article
            .get("description")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string());
        metadata.site_name = article
            .get("publisher")
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string());
        metadata.published_time = article
            .get("datePublished")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string());
        metadata.modified_time = article
            .get("dateModified")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string());
        break;
    }

    metadata
}

fn type_matches(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(s)) => REGEXPS.json_ld_article_types.is_match(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| REGEXPS.json_ld_article_types.is_match(s)),
        _ => false,
    }
}

fn context_matches(value: &Value) -> bool {
    match value.get("@context") {
        Some(Value::String(s)) => REGEXPS.schema_org_context.is_match(s),
        Some(Value::Object(obj)) => obj
            .get("@vocab")
            .and_then(Value::as_str)
            .map(|v| REGEXPS.schema_org_context.is_match(v))
            .unwrap_or(false),
        _ => false,
    }
}

/// Scan `<meta>` tags and merge with JSON-LD values; meta tags win per field,
/// structured data fills the gaps.
pub fn get_article_metadata(
    doc: &NodeRef,
    json_ld: Metadata,
    base_url: Option<&Url>,
) -> Metadata {
    let mut values: HashMap<String, String> = HashMap::new();

    if let Ok(metas) = doc.select("meta") {
        for meta in metas {
            let node = meta.as_node();
            let content = match attr(node, "content") {
                Some(c) if !c.trim().is_empty() => c.trim().to_string(),
                _ => continue,
            };

            let mut property_matched = false;
            if let Some(property) = attr(node, "property") {
                // property is a space-separated list of values
                for prop in property.split_whitespace() {
                    if let Some(m) = REGEXPS.meta_property.find(prop) {
                        let key = m.as_str().to_lowercase();
                        values.insert(key, content.clone());
                        property_matched = true;
                    }
                }
            }
            if !property_matched {
                if let Some(name) = attr(node, "name") {
                    if REGEXPS.meta_name.is_match(&name) {
                        let key = name
                            .trim()
                            .to_lowercase()
                            .replace(char::is_whitespace, "")
                            .replace('.', ":");
                        values.insert(key, content.clone());
                    }
                }
            }
        }
    }

    let pick = |keys: &[&str]| -> Option<String> {
        keys.iter().find_map(|k| values.get(*k).cloned())
    };

    let mut metadata = Metadata::default();

    metadata.title = pick(&[
        "dc:title",
        "dcterm:title",
        "og:title",
        "weibo:article:title",
        "weibo:webpage:title",
        "title",
        "twitter:title",
        "parsely-title",
    ])
    .or(json_ld.title)
    .or_else(|| get_article_title(doc));

    let article_author = values
        .get("article:author")
        .filter(|v| !dom_utils::is_url(v))
        .cloned();
    metadata.byline = pick(&["dc:creator", "dcterm:creator", "author", "parsely-author"])
        .or(article_author)
        .or(json_ld.byline)
        .or_else(|| get_dom_byline(doc));

    metadata.excerpt = pick(&[
        "dc:description",
        "dcterm:description",
        "og:description",
        "weibo:article:description",
        "weibo:webpage:description",
        "description",
        "twitter:description",
    ])
    .or(json_ld.excerpt);

    metadata.site_name = pick(&["og:site_name"]).or(json_ld.site_name);
    metadata.image = pick(&["og:image", "image", "twitter:image"])
        .map(|src| resolve_url(&src, base_url));
    metadata.favicon = get_favicon(doc, base_url);
    metadata.published_time =
        pick(&["article:published_time", "parsely-pub-date"]).or(json_ld.published_time);
    metadata.modified_time = pick(&["article:modified_time"]).or(json_ld.modified_time);
    metadata.lang = get_language(doc);

    metadata.title = metadata
        .title
        .map(|t| unescape_html_entities(&t))
        .filter(|t| !t.trim().is_empty());
    metadata.byline = metadata
        .byline
        .map(|b| unescape_html_entities(&b))
        .filter(|b| is_valid_byline(b));
    metadata.excerpt = metadata
        .excerpt
        .map(|e| unescape_html_entities(&e))
        .filter(|e| !e.trim().is_empty());
    metadata.site_name = metadata.site_name.map(|s| unescape_html_entities(&s));

    metadata
}

/// The `<title>`-based heuristic used when no usable meta title exists.
///
/// Titles of the form "Article Title | Site Name" are split at the last
/// separator and the side with the higher word count wins, unless one side
/// matches the innermost `<h1>`, in which case the heading text is preferred.
pub fn get_article_title(doc: &NodeRef) -> Option<String> {
    let orig_title = get_document_title(doc)?;
    let h1_text = innermost_h1_text(doc);

    if let Some(sep) = REGEXPS.title_separator.find_iter(&orig_title).last() {
        let before = orig_title[..sep.start()].trim();
        let after = orig_title[sep.end()..].trim();

        if let Some(h1) = &h1_text {
            for side in [before, after] {
                if side == h1.trim() || text_similarity(h1, side) > 0.75 {
                    return Some(h1.trim().to_string());
                }
            }
        }

        let chosen = if word_count(after) > word_count(before) {
            after
        } else {
            before
        };
        if !chosen.is_empty() {
            return Some(normalize_title(chosen));
        }
        return Some(normalize_title(&orig_title));
    }

    if orig_title.contains(": ") {
        // A heading carrying the exact full string means the colon belongs
        // to the title itself.
        let full_match = ["h1", "h2"].iter().any(|tag| {
            doc.select(tag)
                .map(|mut sel| {
                    sel.any(|h| h.as_node().text_contents().trim() == orig_title.trim())
                })
                .unwrap_or(false)
        });
        if !full_match {
            if let Some(pos) = orig_title.rfind(':') {
                let tail = orig_title[pos + 1..].trim();
                if word_count(tail) >= 3 {
                    return Some(normalize_title(tail));
                }
                if let Some(first) = orig_title.find(':') {
                    let tail = orig_title[first + 1..].trim();
                    if !tail.is_empty() {
                        return Some(normalize_title(tail));
                    }
                }
            }
        }
        return Some(normalize_title(&orig_title));
    }

    let char_count = orig_title.chars().count();
    if !(15..=150).contains(&char_count) {
        if let Some(h1) = h1_text {
            return Some(h1.trim().to_string());
        }
    }

    Some(normalize_title(&orig_title))
}

fn normalize_title(title: &str) -> String {
    REGEXPS.normalize.replace_all(title.trim(), " ").into_owned()
}

fn get_document_title(doc: &NodeRef) -> Option<String> {
    doc.select_first("title")
        .ok()
        .map(|t| t.as_node().text_contents().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn innermost_h1_text(doc: &NodeRef) -> Option<String> {
    let headings: Vec<String> = doc
        .select("h1")
        .map(|sel| {
            sel.map(|h| h.as_node().text_contents().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();
    // Document order is outermost-first; the last heading is the innermost
    // and most likely the article heading rather than a site banner.
    headings.into_iter().last()
}

/// Byline candidates in the document body: `rel="author"` links, elements
/// with an author `itemprop`, then class/id keyword matches. First plausible
/// match wins.
fn get_dom_byline(doc: &NodeRef) -> Option<String> {
    let selectors = ["a[rel~='author']", "[itemprop~='author']"];
    for selector in selectors {
        if let Ok(sel) = doc.select(selector) {
            for element in sel {
                let text = normalize_title(&element.as_node().text_contents());
                if is_valid_byline(&text) {
                    return Some(text);
                }
            }
        }
    }

    if let Ok(sel) = doc.select("*") {
        for element in sel {
            let node = element.as_node();
            let match_string = dom_utils::match_string(node);
            if !REGEXPS.byline.is_match(&match_string) {
                continue;
            }
            let text = normalize_title(&node.text_contents());
            if is_valid_byline(&text) {
                return Some(text);
            }
        }
    }
    None
}

fn get_favicon(doc: &NodeRef, base_url: Option<&Url>) -> Option<String> {
    let links = doc.select("link").ok()?;
    for link in links {
        let node = link.as_node();
        let rel = attr(node, "rel").unwrap_or_default().to_lowercase();
        let is_icon = rel
            .split_whitespace()
            .any(|token| token == "icon" || token == "apple-touch-icon");
        if !is_icon {
            continue;
        }
        if let Some(href) = attr(node, "href").filter(|h| !h.trim().is_empty()) {
            return Some(resolve_url(href.trim(), base_url));
        }
    }
    None
}

fn get_language(doc: &NodeRef) -> Option<String> {
    if let Ok(html) = doc.select_first("html") {
        if let Some(lang) = attr(html.as_node(), "lang").filter(|l| !l.trim().is_empty()) {
            return Some(lang.trim().to_string());
        }
    }
    if let Ok(metas) = doc.select("meta") {
        for meta in metas {
            let node = meta.as_node();
            let http_equiv = attr(node, "http-equiv").unwrap_or_default();
            if http_equiv.eq_ignore_ascii_case("content-language") {
                if let Some(content) = attr(node, "content").filter(|c| !c.trim().is_empty()) {
                    return Some(content.trim().to_string());
                }
            }
        }
    }
    None
}

pub fn resolve_url(href: &str, base_url: Option<&Url>) -> String {
    if href.starts_with("data:") {
        return href.to_string();
    }
    match base_url {
        Some(base) => base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}

/// Decode the named and numeric character references that commonly appear in
/// metadata strings embedded as raw text (JSON-LD payloads in particular).
fn unescape_html_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let end = match rest.find(';') {
            Some(end) if end <= 10 => end,
            _ => {
                out.push('&');
                rest = &rest[1..];
                continue;
            }
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        num.parse::<u32>().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
