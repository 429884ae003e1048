//! The grab-article engine: candidate scoring, top-candidate selection,
//! sibling merging and the conditional cleaning that follows.
//!
//! Extraction runs in passes. Each pass works on a fresh parse of the
//! preprocessed document; when the result is too short, one heuristic flag is
//! relaxed and the pass runs again. When every combination is exhausted the
//! longest attempt wins.

use std::collections::HashSet;

use bitflags::bitflags;
use kuchikikiki::NodeRef;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{
    ALTER_TO_DIV_EXCEPTIONS, DEFAULT_TAGS_TO_SCORE, MIN_PARAGRAPH_LENGTH, REGEXPS,
    SCORE_ANCESTOR_DEPTH, UNLIKELY_ROLES,
};
use crate::dom_utils::{
    attr, element_children, element_name, first_element_child, get_inner_text, get_link_density,
    get_next_element, get_node_ancestors, has_ancestor_tag, has_child_block_element,
    has_single_tag_inside, is_element, is_element_without_content, is_phrasing_content,
    is_probably_visible, is_whitespace_node, match_string, move_children, new_element, outer_html,
    parse_html, remove_and_get_next, rename_element, set_attr, text_similarity,
};
use crate::options::ReadabilityOptions;
use crate::scoring::{get_class_weight, initialize_node, is_valid_byline, node_key, ScoreMap};

bitflags! {
    /// Heuristics that can be switched off between extraction passes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GrabFlags: u32 {
        const STRIP_UNLIKELYS = 0x1;
        const WEIGHT_CLASSES = 0x2;
        const CLEAN_CONDITIONALLY = 0x4;
    }
}

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.( |$)").unwrap());
static LAZY_SRCSET_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp)\s+\d").unwrap());
static LAZY_SRC_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*\S+\.(jpg|jpeg|png|webp)\S*\s*$").unwrap());
static IMAGE_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp)").unwrap());

/// What a successful grab produces.
pub struct ExtractedContent {
    pub content: NodeRef,
    pub byline: Option<String>,
    pub dir: Option<String>,
}

struct Attempt {
    content: NodeRef,
    dir: Option<String>,
    text_length: usize,
}

/// Run the extraction loop against a preprocessed document. Returns `None`
/// only when no pass produced any text at all.
pub fn grab_article(
    doc: &NodeRef,
    title: &str,
    options: &ReadabilityOptions,
) -> Option<ExtractedContent> {
    // Each pass mutates its document heavily, so retries start from a cached
    // serialization of the preprocessed tree.
    let page_html = outer_html(doc);

    let mut flags = GrabFlags::all();
    let mut byline: Option<String> = None;
    let mut attempts: Vec<Attempt> = Vec::new();

    loop {
        let pass_doc = parse_html(&page_html);
        let result = grab_once(&pass_doc, title, options, flags, &mut byline);

        if let Some((content, dir, text_length)) = result {
            if text_length >= options.char_threshold {
                return Some(ExtractedContent {
                    content,
                    byline,
                    dir,
                });
            }
            attempts.push(Attempt {
                content,
                dir,
                text_length,
            });
        }

        if let Some(relaxed) = relax_one(&mut flags) {
            debug!("content too short, retrying without {:?}", relaxed);
        } else {
            // Out of heuristics to shed; the longest attempt is as good as
            // it gets.
            attempts.sort_by(|a, b| b.text_length.cmp(&a.text_length));
            let best = attempts.into_iter().next().filter(|a| a.text_length > 0)?;
            log::warn!(
                "no extraction pass reached the character threshold, \
                 returning best attempt ({} chars)",
                best.text_length
            );
            return Some(ExtractedContent {
                content: best.content,
                byline,
                dir: best.dir,
            });
        }
    }
}

/// Drop the most aggressive remaining heuristic. Returns the flag that was
/// relaxed, or `None` once all three are off.
fn relax_one(flags: &mut GrabFlags) -> Option<GrabFlags> {
    for flag in [
        GrabFlags::STRIP_UNLIKELYS,
        GrabFlags::WEIGHT_CLASSES,
        GrabFlags::CLEAN_CONDITIONALLY,
    ] {
        if flags.contains(flag) {
            flags.remove(flag);
            return Some(flag);
        }
    }
    None
}

/// One extraction pass over a fresh document copy.
fn grab_once(
    doc: &NodeRef,
    title: &str,
    options: &ReadabilityOptions,
    flags: GrabFlags,
    byline: &mut Option<String>,
) -> Option<(NodeRef, Option<String>, usize)> {
    let body = doc.select_first("body").ok()?.as_node().clone();
    let strip_unlikelys = flags.contains(GrabFlags::STRIP_UNLIKELYS);
    let weight_classes = flags.contains(GrabFlags::WEIGHT_CLASSES);

    let mut elements_to_score: Vec<NodeRef> = Vec::new();
    let mut should_remove_title_header = true;

    let root = doc
        .select_first("html")
        .map(|e| e.as_node().clone())
        .unwrap_or_else(|_| body.clone());
    let mut node = Some(root);

    while let Some(current) = node {
        let tag = match element_name(&current) {
            Some(t) => t.to_string(),
            None => {
                node = get_next_element(&current, false);
                continue;
            }
        };
        let match_string = match_string(&current);

        if !is_probably_visible(&current) {
            node = remove_and_get_next(current);
            continue;
        }

        if byline.is_none() && check_byline(&current, &match_string) {
            *byline = Some(get_inner_text(&current, true));
            node = remove_and_get_next(current);
            continue;
        }

        if should_remove_title_header && header_duplicates_title(&current, &tag, title) {
            should_remove_title_header = false;
            node = remove_and_get_next(current);
            continue;
        }

        if strip_unlikelys {
            if REGEXPS.unlikely_candidates.is_match(&match_string)
                && !REGEXPS.ok_maybe_its_a_candidate.is_match(&match_string)
                && !has_ancestor_tag(&current, "table", 3)
                && !has_ancestor_tag(&current, "code", 3)
                && tag != "body"
                && tag != "a"
            {
                debug!("removing unlikely candidate: {}", match_string);
                node = remove_and_get_next(current);
                continue;
            }
            if let Some(role) = attr(&current, "role") {
                if UNLIKELY_ROLES.contains(&role.as_str()) {
                    node = remove_and_get_next(current);
                    continue;
                }
            }
        }

        if matches!(
            tag.as_str(),
            "div" | "section" | "header" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
        ) && is_element_without_content(&current)
        {
            node = remove_and_get_next(current);
            continue;
        }

        if DEFAULT_TAGS_TO_SCORE.contains(&tag.as_str()) {
            elements_to_score.push(current.clone());
        }

        if tag == "div" {
            // Runs of inline content inside a div get their own paragraph,
            // so they take part in scoring.
            wrap_phrasing_runs(&current);

            if has_single_tag_inside(&current, "p") && get_link_density(&current) < 0.25 {
                let child = first_element_child(&current)
                    .unwrap_or_else(|| unreachable!("single-tag check guarantees a child"));
                current.insert_after(child.clone());
                current.detach();
                elements_to_score.push(child.clone());
                node = get_next_element(&child, false);
                continue;
            } else if !has_child_block_element(&current) {
                let paragraph = rename_element(&current, "p");
                elements_to_score.push(paragraph.clone());
                node = get_next_element(&paragraph, false);
                continue;
            }
        }

        node = get_next_element(&current, false);
    }

    // Score paragraphs and spread the score over their ancestors.
    let mut scores = ScoreMap::default();
    let mut candidates: Vec<NodeRef> = Vec::new();
    for elem in &elements_to_score {
        if elem.parent().is_none() {
            continue;
        }
        let inner_text = get_inner_text(elem, true);
        let char_count = inner_text.chars().count();
        if char_count < MIN_PARAGRAPH_LENGTH {
            continue;
        }
        let ancestors = get_node_ancestors(elem, SCORE_ANCESTOR_DEPTH);
        if ancestors.is_empty() {
            continue;
        }

        let mut content_score = 1.0;
        content_score += REGEXPS.commas.find_iter(&inner_text).count() as f64;
        content_score += (char_count as f64 / 100.0).min(3.0);

        for (level, ancestor) in ancestors.iter().enumerate() {
            if element_name(ancestor).is_none() || ancestor.parent().is_none() {
                continue;
            }
            if !scores.is_candidate(ancestor) {
                initialize_node(ancestor, weight_classes, &mut scores);
                candidates.push(ancestor.clone());
            }
            let divider = match level {
                0 => 1.0,
                1 => 2.0,
                l => (l * 3) as f64,
            };
            scores.add(ancestor, content_score / divider);
        }
    }

    // Scale candidates by link density and keep the best few.
    let mut top_candidates: Vec<NodeRef> = Vec::new();
    for candidate in candidates {
        let scaled = scores.score(&candidate) * (1.0 - get_link_density(&candidate));
        scores.set(&candidate, scaled);
        for i in 0..options.nb_top_candidates {
            let beats = top_candidates
                .get(i)
                .map(|existing| scaled > scores.score(existing))
                .unwrap_or(true);
            if beats {
                top_candidates.insert(i, candidate.clone());
                if top_candidates.len() > options.nb_top_candidates {
                    top_candidates.pop();
                }
                break;
            }
        }
    }

    let mut needed_to_create = false;
    let mut top_candidate = top_candidates.first().cloned();

    if top_candidate.is_none()
        || top_candidate
            .as_ref()
            .map(|t| is_element(t, "body"))
            .unwrap_or(false)
    {
        // Nothing scored; treat the whole body as the article.
        let synthetic = new_element("div");
        move_children(&body, &synthetic);
        body.append(synthetic.clone());
        initialize_node(&synthetic, weight_classes, &mut scores);
        top_candidate = Some(synthetic);
        needed_to_create = true;
    } else if let Some(top) = top_candidate.clone() {
        // When several top candidates share an ancestor, that ancestor is
        // likely the real article container.
        let top_score = scores.score(&top);
        let alternative_ancestors: Vec<Vec<NodeRef>> = top_candidates
            .iter()
            .skip(1)
            .filter(|c| scores.score(c) / top_score >= 0.75)
            .map(|c| get_node_ancestors(c, 0))
            .collect();
        const MINIMUM_TOPCANDIDATES: usize = 3;
        let mut top = top;
        if alternative_ancestors.len() >= MINIMUM_TOPCANDIDATES {
            let mut parent = top.parent();
            while let Some(p) = parent {
                if is_element(&p, "body") {
                    break;
                }
                let shared = alternative_ancestors
                    .iter()
                    .filter(|ancestors| ancestors.iter().any(|a| *a == p))
                    .count();
                if shared >= MINIMUM_TOPCANDIDATES {
                    top = p;
                    break;
                }
                parent = p.parent();
            }
        }
        if !scores.is_candidate(&top) {
            initialize_node(&top, weight_classes, &mut scores);
        }

        // Climb while parents score better; a strong parent means the
        // candidate was only a fragment of the article.
        let mut last_score = scores.score(&top);
        let score_threshold = last_score / 3.0;
        let mut parent = top.parent();
        while let Some(p) = parent {
            if is_element(&p, "body") {
                break;
            }
            if !scores.is_candidate(&p) {
                parent = p.parent();
                continue;
            }
            let parent_score = scores.score(&p);
            if parent_score < score_threshold {
                break;
            }
            if parent_score > last_score {
                top = p;
                break;
            }
            last_score = parent_score;
            parent = p.parent();
        }

        // An only child can always be swapped for its parent without
        // changing the content.
        let mut parent = top.parent();
        while let Some(p) = parent {
            if is_element(&p, "body") || element_children(&p).len() != 1 {
                break;
            }
            top = p.clone();
            parent = p.parent();
        }
        if !scores.is_candidate(&top) {
            initialize_node(&top, weight_classes, &mut scores);
        }
        top_candidate = Some(top);
    }

    let top_candidate = top_candidate?;

    // Pull in siblings that look like they belong to the same article.
    let article_content = new_element("div");
    let top_score = scores.score(&top_candidate);
    let sibling_threshold = (top_score * 0.2).max(10.0);
    let parent_of_top = top_candidate.parent().unwrap_or_else(|| body.clone());
    let top_class = attr(&top_candidate, "class").unwrap_or_default();

    for sibling in element_children(&parent_of_top) {
        let mut append = sibling == top_candidate;

        if !append {
            let mut content_bonus = 0.0;
            let sibling_class = attr(&sibling, "class").unwrap_or_default();
            if !top_class.is_empty() && sibling_class == top_class {
                content_bonus = top_score * 0.2;
            }
            if scores.is_candidate(&sibling)
                && scores.score(&sibling) + content_bonus >= sibling_threshold
            {
                append = true;
            } else if is_element(&sibling, "p") {
                let link_density = get_link_density(&sibling);
                let node_content = get_inner_text(&sibling, true);
                let node_length = node_content.chars().count();
                if node_length > 80 && link_density < 0.25 {
                    append = true;
                } else if node_length > 0
                    && node_length < 80
                    && link_density == 0.0
                    && SENTENCE_END.is_match(&node_content)
                {
                    append = true;
                }
            }
        }

        if append {
            debug!(
                "appending sibling <{}>",
                element_name(&sibling).unwrap_or("?")
            );
            let keep_tag = element_name(&sibling)
                .map(|t| ALTER_TO_DIV_EXCEPTIONS.contains(&t))
                .unwrap_or(false);
            let to_append = if keep_tag {
                sibling.clone()
            } else {
                rename_element(&sibling, "div")
            };
            article_content.append(to_append);
        }
    }

    prep_article(&article_content, flags, options, &scores);

    // Text direction comes from the candidate's own ancestry.
    let mut dir = None;
    let mut dir_chain = vec![parent_of_top.clone(), top_candidate.clone()];
    dir_chain.extend(get_node_ancestors(&parent_of_top, 0));
    for node in dir_chain {
        if let Some(value) = attr(&node, "dir").filter(|v| !v.trim().is_empty()) {
            dir = Some(value.trim().to_string());
            break;
        }
    }

    if needed_to_create {
        set_attr(&top_candidate, "id", "readability-page-1");
        set_attr(&top_candidate, "class", "page");
    } else {
        let page = new_element("div");
        set_attr(&page, "id", "readability-page-1");
        set_attr(&page, "class", "page");
        move_children(&article_content, &page);
        article_content.append(page);
    }

    let text_length = get_inner_text(&article_content, true).chars().count();
    Some((article_content, dir, text_length))
}

/// Group consecutive phrasing children of a div into `<p>` wrappers.
fn wrap_phrasing_runs(div: &NodeRef) {
    let mut paragraph: Option<NodeRef> = None;
    let mut child_opt = div.first_child();
    while let Some(child) = child_opt {
        let next = child.next_sibling();
        if is_phrasing_content(&child) {
            if let Some(p) = &paragraph {
                p.append(child);
            } else if !is_whitespace_node(&child) {
                let p = new_element("p");
                child.insert_before(p.clone());
                p.append(child);
                paragraph = Some(p);
            }
        } else if let Some(p) = paragraph.take() {
            while let Some(last) = p.last_child() {
                if is_whitespace_node(&last) {
                    last.detach();
                } else {
                    break;
                }
            }
        }
        child_opt = next;
    }
    if let Some(p) = paragraph {
        while let Some(last) = p.last_child() {
            if is_whitespace_node(&last) {
                last.detach();
            } else {
                break;
            }
        }
    }
}

fn check_byline(node: &NodeRef, match_string: &str) -> bool {
    let rel = attr(node, "rel").unwrap_or_default();
    let itemprop = attr(node, "itemprop").unwrap_or_default();
    let looks_like_byline = rel.split_whitespace().any(|t| t == "author")
        || itemprop.contains("author")
        || REGEXPS.byline.is_match(match_string);
    looks_like_byline && is_valid_byline(node.text_contents().trim())
}

fn header_duplicates_title(node: &NodeRef, tag: &str, title: &str) -> bool {
    if tag != "h1" && tag != "h2" || title.is_empty() {
        return false;
    }
    text_similarity(title, node.text_contents().trim()) > 0.75
}

/// Clean the merged article content in place.
fn prep_article(
    article_content: &NodeRef,
    flags: GrabFlags,
    options: &ReadabilityOptions,
    scores: &ScoreMap,
) {
    let weight_classes = flags.contains(GrabFlags::WEIGHT_CLASSES);
    let clean_conditionally_enabled = flags.contains(GrabFlags::CLEAN_CONDITIONALLY);
    let data_tables = mark_data_tables(article_content);
    fix_lazy_images(article_content);

    let ctx = CleanContext {
        options,
        scores,
        weight_classes,
        data_tables: &data_tables,
    };

    if clean_conditionally_enabled {
        clean_conditionally(article_content, "form", &ctx);
        clean_conditionally(article_content, "fieldset", &ctx);
    }
    clean(article_content, "object", options);
    clean(article_content, "embed", options);
    clean(article_content, "footer", options);
    clean(article_content, "link", options);
    clean(article_content, "aside", options);

    // Share widgets at the top level of the article, unless they carry a
    // meaningful amount of text themselves.
    let share_threshold = options.char_threshold;
    for child in element_children(article_content) {
        clean_matched_nodes(&child, |node, match_string| {
            REGEXPS.share_elements.is_match(match_string)
                && node.text_contents().chars().count() < share_threshold
        });
    }

    clean(article_content, "iframe", options);
    clean(article_content, "input", options);
    clean(article_content, "textarea", options);
    clean(article_content, "select", options);
    clean(article_content, "button", options);
    clean_headers(article_content, weight_classes);

    if clean_conditionally_enabled {
        clean_conditionally(article_content, "table", &ctx);
        clean_conditionally(article_content, "ul", &ctx);
        clean_conditionally(article_content, "div", &ctx);
    }

    // The page title is the only h1 the article should have.
    for h1 in collect_tags(article_content, "h1") {
        rename_element(&h1, "h2");
    }

    for paragraph in collect_tags(article_content, "p") {
        let media_count = ["img", "embed", "object", "iframe", "picture"]
            .iter()
            .map(|tag| collect_tags(&paragraph, tag).len())
            .sum::<usize>();
        if media_count == 0 && get_inner_text(&paragraph, false).is_empty() {
            paragraph.detach();
        }
    }

    for br in collect_tags(article_content, "br") {
        if let Some(next) = crate::dom_utils::next_significant_node(br.next_sibling()) {
            if is_element(&next, "p") {
                br.detach();
            }
        }
    }

    // A single-cell table is just a styling wrapper.
    for table in collect_tags(article_content, "table") {
        let tbody = if has_single_tag_inside(&table, "tbody") {
            first_element_child(&table).unwrap_or_else(|| table.clone())
        } else {
            table.clone()
        };
        if has_single_tag_inside(&tbody, "tr") {
            let row = match first_element_child(&tbody) {
                Some(r) => r,
                None => continue,
            };
            if has_single_tag_inside(&row, "td") {
                let cell = match first_element_child(&row) {
                    Some(c) => c,
                    None => continue,
                };
                let all_phrasing = cell.children().all(|c| is_phrasing_content(&c));
                let replacement = rename_element(&cell, if all_phrasing { "p" } else { "div" });
                table.insert_after(replacement);
                table.detach();
            }
        }
    }
}

struct CleanContext<'a> {
    options: &'a ReadabilityOptions,
    scores: &'a ScoreMap,
    weight_classes: bool,
    data_tables: &'a HashSet<usize>,
}

fn collect_tags(root: &NodeRef, tag: &str) -> Vec<NodeRef> {
    match root.select(tag) {
        Ok(sel) => sel.map(|e| e.as_node().clone()).collect(),
        Err(()) => Vec::new(),
    }
}

/// Unconditionally remove every element of `tag`, sparing embeds that point
/// at an allowed video host.
fn clean(root: &NodeRef, tag: &str, options: &ReadabilityOptions) {
    let videos = options
        .allowed_video_regex
        .as_ref()
        .unwrap_or(&REGEXPS.videos);
    let is_embed = matches!(tag, "object" | "embed" | "iframe");

    for node in collect_tags(root, tag) {
        if is_embed {
            let attribute_values = node
                .as_element()
                .map(|e| {
                    e.attributes
                        .borrow()
                        .map
                        .values()
                        .map(|v| v.value.clone())
                        .collect::<Vec<_>>()
                        .join("|")
                })
                .unwrap_or_default();
            if videos.is_match(&attribute_values) {
                continue;
            }
            if tag == "object" && videos.is_match(&crate::dom_utils::inner_html(&node)) {
                continue;
            }
        }
        node.detach();
    }
}

/// Remove nodes below `root` whose class/id match the filter. `root` itself
/// is spared.
fn clean_matched_nodes<F>(root: &NodeRef, filter: F)
where
    F: Fn(&NodeRef, &str) -> bool,
{
    let end_of_search = get_next_element(root, true);
    let mut next = get_next_element(root, false);
    while let Some(node) = next {
        if end_of_search.as_ref() == Some(&node) {
            break;
        }
        let match_string = match_string(&node);
        if filter(&node, &match_string) {
            next = remove_and_get_next(node);
        } else {
            next = get_next_element(&node, false);
        }
    }
}

/// Drop h1/h2 headers with negative class weight.
fn clean_headers(root: &NodeRef, weight_classes: bool) {
    if !weight_classes {
        return;
    }
    for tag in ["h1", "h2"] {
        for header in collect_tags(root, tag) {
            if get_class_weight(&header) < 0.0 {
                header.detach();
            }
        }
    }
}

/// Classify tables as layout or data tables, by node identity.
fn mark_data_tables(root: &NodeRef) -> HashSet<usize> {
    let mut data_tables = HashSet::new();
    for table in collect_tags(root, "table") {
        if attr(&table, "role").as_deref() == Some("presentation") {
            continue;
        }
        if attr(&table, "datatable").as_deref() == Some("0") {
            continue;
        }
        if attr(&table, "summary").is_some() {
            data_tables.insert(node_key(&table));
            continue;
        }
        if let Ok(caption) = table.select_first("caption") {
            if caption.as_node().children().next().is_some() {
                data_tables.insert(node_key(&table));
                continue;
            }
        }
        let descendant_markers = ["col", "colgroup", "tfoot", "thead", "th"];
        if descendant_markers
            .iter()
            .any(|t| !collect_tags(&table, t).is_empty())
        {
            data_tables.insert(node_key(&table));
            continue;
        }
        if !collect_tags(&table, "table").is_empty() {
            // nested tables mean layout
            continue;
        }
        let (rows, columns) = get_row_and_column_count(&table);
        if rows >= 10 || columns > 4 || rows * columns > 10 {
            data_tables.insert(node_key(&table));
        }
    }
    data_tables
}

fn get_row_and_column_count(table: &NodeRef) -> (usize, usize) {
    let mut rows = 0;
    let mut columns = 0;
    for tr in collect_tags(table, "tr") {
        let rowspan = attr(&tr, "rowspan")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1);
        rows += rowspan;
        let mut columns_in_row = 0;
        for cell in element_children(&tr) {
            if !is_element(&cell, "td") && !is_element(&cell, "th") {
                continue;
            }
            let colspan = attr(&cell, "colspan")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1);
            columns_in_row += colspan;
        }
        columns = columns.max(columns_in_row);
    }
    (rows, columns)
}

/// Rescue image URLs that lazy-loading scripts stashed in data attributes,
/// and drop tiny base64 placeholders that would otherwise shadow them.
fn fix_lazy_images(root: &NodeRef) {
    let mut nodes = Vec::new();
    for tag in ["img", "picture", "figure"] {
        nodes.extend(collect_tags(root, tag));
    }

    for node in nodes {
        let src = attr(&node, "src").unwrap_or_default();
        let srcset = attr(&node, "srcset").unwrap_or_default();
        let class = attr(&node, "class").unwrap_or_default();

        if !src.is_empty() {
            if let Some(captures) = REGEXPS.b64_data_url.captures(&src) {
                if captures.get(1).map(|m| m.as_str()) == Some("image/svg+xml") {
                    continue;
                }
                let other_attr_has_image = node
                    .as_element()
                    .map(|e| {
                        e.attributes.borrow().map.iter().any(|(name, value)| {
                            &*name.local != "src" && IMAGE_EXT.is_match(&value.value)
                        })
                    })
                    .unwrap_or(false);
                if other_attr_has_image {
                    let b64_start = captures.get(0).map(|m| m.end()).unwrap_or(0);
                    if src.len() - b64_start < 133 {
                        crate::dom_utils::remove_attr(&node, "src");
                    }
                }
            }
        }

        let has_real_source = (!src.is_empty() || (!srcset.is_empty() && srcset != "null"))
            && !class.to_lowercase().contains("lazy");
        if has_real_source {
            continue;
        }

        let attrs: Vec<(String, String)> = node
            .as_element()
            .map(|e| {
                e.attributes
                    .borrow()
                    .map
                    .iter()
                    .map(|(name, value)| (name.local.to_string(), value.value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        for (name, value) in attrs {
            if name == "src" || name == "srcset" || name == "alt" {
                continue;
            }
            let copy_to = if LAZY_SRCSET_VALUE.is_match(&value) {
                Some("srcset")
            } else if LAZY_SRC_VALUE.is_match(&value) {
                Some("src")
            } else {
                None
            };
            let Some(copy_to) = copy_to else { continue };

            if is_element(&node, "img") || is_element(&node, "picture") {
                set_attr(&node, copy_to, &value);
            } else if is_element(&node, "figure")
                && collect_tags(&node, "img").is_empty()
                && collect_tags(&node, "picture").is_empty()
            {
                let img = new_element("img");
                set_attr(&img, copy_to, &value);
                node.append(img);
            }
        }
    }
}

fn get_text_density(node: &NodeRef, tags: &[&str]) -> f64 {
    let total = get_inner_text(node, true).chars().count() as f64;
    if total == 0.0 {
        return 0.0;
    }
    let mut tagged = 0.0;
    for tag in tags {
        for elem in collect_tags(node, tag) {
            tagged += get_inner_text(&elem, true).chars().count() as f64;
        }
    }
    tagged / total
}

/// Remove `tag` elements that look like boilerplate: too many links, too
/// little text, suspicious shapes.
fn clean_conditionally(root: &NodeRef, tag: &str, ctx: &CleanContext<'_>) {
    for node in collect_tags(root, tag) {
        if node.parent().is_none() {
            continue;
        }
        if has_ancestor_tag(&node, "code", 3) {
            continue;
        }
        let is_data_table = |n: &NodeRef| ctx.data_tables.contains(&node_key(n));
        if tag == "table" && is_data_table(&node) {
            continue;
        }
        if get_node_ancestors(&node, 0)
            .iter()
            .any(|a| is_element(a, "table") && is_data_table(a))
        {
            continue;
        }

        let mut is_list = tag == "ul" || tag == "ol";
        if !is_list {
            let content_length = get_inner_text(&node, true).chars().count();
            if content_length > 0 {
                let mut list_length = 0;
                for list_tag in ["ul", "ol"] {
                    for list in collect_tags(&node, list_tag) {
                        list_length += get_inner_text(&list, true).chars().count();
                    }
                }
                is_list = list_length as f64 / content_length as f64 > 0.9;
            }
        }

        let weight = if ctx.weight_classes {
            get_class_weight(&node)
        } else {
            0.0
        };
        if weight < 0.0 {
            node.detach();
            continue;
        }

        let inner_text = get_inner_text(&node, true);
        if REGEXPS.commas.find_iter(&inner_text).count() >= 10 {
            continue;
        }

        let p = collect_tags(&node, "p").len() as f64;
        let img = collect_tags(&node, "img").len() as f64;
        let li = collect_tags(&node, "li").len() as f64 - 100.0;
        let input = collect_tags(&node, "input").len() as f64;
        let heading_density = get_text_density(&node, &["h1", "h2", "h3", "h4", "h5", "h6"]);

        let videos = ctx
            .options
            .allowed_video_regex
            .as_ref()
            .unwrap_or(&REGEXPS.videos);
        let mut embed_count = 0;
        let mut keep_for_video = false;
        for embed_tag in ["object", "embed", "iframe"] {
            for embed in collect_tags(&node, embed_tag) {
                let attribute_values = embed
                    .as_element()
                    .map(|e| {
                        e.attributes
                            .borrow()
                            .map
                            .values()
                            .map(|v| v.value.clone())
                            .collect::<Vec<_>>()
                            .join("|")
                    })
                    .unwrap_or_default();
                if videos.is_match(&attribute_values)
                    || videos.is_match(&crate::dom_utils::inner_html(&embed))
                {
                    keep_for_video = true;
                    break;
                }
                embed_count += 1;
            }
            if keep_for_video {
                break;
            }
        }
        if keep_for_video {
            continue;
        }

        let link_density = get_link_density(&node);
        let content_length = inner_text.chars().count();
        let modifier = ctx.options.link_density_modifier;

        let mut have_to_remove = (img > 1.0
            && p / img < 0.5
            && !has_ancestor_tag(&node, "figure", 3))
            || (!is_list && li > p)
            || (input > (p / 3.0).floor())
            || (!is_list
                && heading_density < 0.9
                && content_length < 25
                && (img == 0.0 || img > 2.0)
                && !has_ancestor_tag(&node, "figure", 3))
            || (!is_list && weight < 25.0 && link_density > 0.2 + modifier)
            || (weight >= 25.0 && link_density > 0.5 + modifier)
            || ((embed_count == 1 && content_length < 75) || embed_count > 1);

        // Image galleries arrive as lists with one image per item.
        if is_list && have_to_remove {
            let mut gallery = element_children(&node)
                .iter()
                .all(|child| element_children(child).len() <= 1);
            if gallery {
                let li_count = collect_tags(&node, "li").len() as f64;
                gallery = img == li_count;
            }
            if gallery {
                have_to_remove = false;
            }
        }

        if have_to_remove {
            debug!(
                "conditionally cleaning <{}> (weight {}, link density {:.2})",
                tag, weight, link_density
            );
            node.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom_utils::parse_html;

    fn default_options() -> ReadabilityOptions {
        ReadabilityOptions::default()
    }

    fn article_paragraphs(n: usize) -> String {
        (0..n)
            .map(|i| {
                format!(
                    "<p>Paragraph {} carries enough words, commas, and length to score \
                     well in the candidate pass of the extraction engine, clearly.</p>",
                    i
                )
            })
            .collect()
    }

    #[test]
    fn extracts_main_content_and_drops_sidebar() {
        let html = format!(
            r#"<html><body>
                <div class="sidebar"><a href="/a">one</a><a href="/b">two</a></div>
                <div class="article-body">{}</div>
            </body></html>"#,
            article_paragraphs(8)
        );
        let doc = parse_html(&html);
        let result = grab_article(&doc, "", &default_options()).unwrap();
        let text = get_inner_text(&result.content, true);
        assert!(text.contains("Paragraph 0"));
        assert!(text.contains("Paragraph 7"));
        assert!(!text.contains("one"));
    }

    #[test]
    fn short_document_falls_back_to_best_attempt() {
        let doc = parse_html(
            "<html><body><h1>Hello World</h1><p>This is an article.</p></body></html>",
        );
        let result = grab_article(&doc, "", &default_options()).unwrap();
        let html = crate::dom_utils::outer_html(&result.content);
        assert!(html.contains(r#"id="readability-page-1""#));
        // h1 is demoted; the page title is the only h1.
        assert!(html.contains("<h2>Hello World</h2>"));
        assert!(html.contains("<p>This is an article.</p>"));
    }

    #[test]
    fn empty_document_yields_none() {
        let doc = parse_html("<html><body></body></html>");
        assert!(grab_article(&doc, "", &default_options()).is_none());
    }

    #[test]
    fn byline_detected_and_removed() {
        let html = format!(
            r#"<html><body><div class="main">
                <div class="byline">John Writer</div>{}
            </div></body></html>"#,
            article_paragraphs(8)
        );
        let doc = parse_html(&html);
        let result = grab_article(&doc, "", &default_options()).unwrap();
        assert_eq!(result.byline.as_deref(), Some("John Writer"));
        let text = get_inner_text(&result.content, true);
        assert!(!text.contains("John Writer"));
    }

    #[test]
    fn title_duplicate_header_removed() {
        let html = format!(
            r#"<html><body><div class="main">
                <h1>The Article Title</h1>{}
            </div></body></html>"#,
            article_paragraphs(8)
        );
        let doc = parse_html(&html);
        let result = grab_article(&doc, "The Article Title", &default_options()).unwrap();
        let text = get_inner_text(&result.content, true);
        assert!(!text.contains("The Article Title"));
    }

    #[test]
    fn unlikely_candidates_stripped_when_long_enough() {
        let html = format!(
            r#"<html><body>
                <div class="article">{}</div>
                <div id="comments-section"><p>First, a comment that is fairly long and chatty, full of words.</p></div>
            </body></html>"#,
            article_paragraphs(8)
        );
        let doc = parse_html(&html);
        let result = grab_article(&doc, "", &default_options()).unwrap();
        let text = get_inner_text(&result.content, true);
        assert!(!text.contains("a comment"));
    }

    #[test]
    fn dir_attribute_propagates() {
        let html = format!(
            r#"<html><body dir="rtl"><div class="main">{}</div></body></html>"#,
            article_paragraphs(8)
        );
        let doc = parse_html(&html);
        let result = grab_article(&doc, "", &default_options()).unwrap();
        assert_eq!(result.dir.as_deref(), Some("rtl"));
    }

    #[test]
    fn video_iframe_survives_cleaning() {
        let html = format!(
            r#"<html><body><div class="main">{}
                <iframe src="https://www.youtube.com/embed/abc123"></iframe>
            </div></body></html>"#,
            article_paragraphs(8)
        );
        let doc = parse_html(&html);
        let result = grab_article(&doc, "", &default_options()).unwrap();
        let html = crate::dom_utils::outer_html(&result.content);
        assert!(html.contains("youtube.com/embed/abc123"));
    }

    #[test]
    fn data_table_kept_layout_table_heuristics() {
        let table = "<table><thead><tr><th>a</th><th>b</th></tr></thead>\
                     <tbody><tr><td>1</td><td>2</td></tr></tbody></table>";
        let html = format!(
            r#"<html><body><div class="main">{}{}</div></body></html>"#,
            article_paragraphs(8),
            table
        );
        let doc = parse_html(&html);
        let result = grab_article(&doc, "", &default_options()).unwrap();
        let html = crate::dom_utils::outer_html(&result.content);
        assert!(html.contains("<th>a</th>"));
    }

    #[test]
    fn lazy_image_src_recovered() {
        let html = format!(
            r#"<html><body><div class="main">{}
                <img class="lazy" data-src="https://example.com/photo.jpg">
            </div></body></html>"#,
            article_paragraphs(8)
        );
        let doc = parse_html(&html);
        let result = grab_article(&doc, "", &default_options()).unwrap();
        let html = crate::dom_utils::outer_html(&result.content);
        assert!(html.contains(r#"src="https://example.com/photo.jpg""#));
    }

    #[test]
    fn flags_relax_one_at_a_time_in_fixed_order() {
        let mut flags = GrabFlags::all();
        assert_eq!(relax_one(&mut flags), Some(GrabFlags::STRIP_UNLIKELYS));
        assert!(flags.contains(GrabFlags::WEIGHT_CLASSES));
        assert_eq!(relax_one(&mut flags), Some(GrabFlags::WEIGHT_CLASSES));
        assert!(flags.contains(GrabFlags::CLEAN_CONDITIONALLY));
        assert_eq!(relax_one(&mut flags), Some(GrabFlags::CLEAN_CONDITIONALLY));
        assert!(flags.is_empty());
        assert_eq!(relax_one(&mut flags), None);
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = format!(
            r#"<html><body>
                <div class="nav"><a href="/x">x</a></div>
                <div class="article-body">{}</div>
                <div class="other">{}</div>
            </body></html>"#,
            article_paragraphs(6),
            article_paragraphs(2)
        );
        let first = grab_article(&parse_html(&html), "", &default_options()).unwrap();
        let second = grab_article(&parse_html(&html), "", &default_options()).unwrap();
        assert_eq!(
            crate::dom_utils::outer_html(&first.content),
            crate::dom_utils::outer_html(&second.content)
        );
    }

    #[test]
    fn relaxation_recovers_unlikely_classed_content() {
        // All content sits in a container whose class matches the unlikely
        // regex, so the first pass drops everything.
        let html = format!(
            r#"<html><body><div class="sidebar">{}</div></body></html>"#,
            article_paragraphs(10)
        );
        let doc = parse_html(&html);
        let result = grab_article(&doc, "", &default_options()).unwrap();
        let text = get_inner_text(&result.content, true);
        assert!(text.contains("Paragraph 9"));
    }
}
