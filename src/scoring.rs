//! Content-score bookkeeping for the grab-article engine.
//!
//! Scores are parse-scoped and live outside the DOM: a map keyed by node
//! identity rather than an attribute written onto elements, so a parse leaves
//! no trace on the tree and concurrent parses cannot interfere.

use std::collections::HashMap;
use std::rc::Rc;

use kuchikikiki::NodeRef;

use crate::constants::{tag_base_score, CLASS_WEIGHT, REGEXPS};
use crate::dom_utils;

/// Per-parse store of candidate content scores.
#[derive(Default)]
pub struct ScoreMap {
    scores: HashMap<usize, f64>,
}

pub(crate) fn node_key(node: &NodeRef) -> usize {
    Rc::as_ptr(&node.0) as *const () as usize
}

impl ScoreMap {
    pub fn get(&self, node: &NodeRef) -> Option<f64> {
        self.scores.get(&node_key(node)).copied()
    }

    pub fn score(&self, node: &NodeRef) -> f64 {
        self.get(node).unwrap_or(0.0)
    }

    pub fn is_candidate(&self, node: &NodeRef) -> bool {
        self.scores.contains_key(&node_key(node))
    }

    pub fn set(&mut self, node: &NodeRef, score: f64) {
        self.scores.insert(node_key(node), score);
    }

    pub fn add(&mut self, node: &NodeRef, delta: f64) {
        *self.scores.entry(node_key(node)).or_insert(0.0) += delta;
    }
}

/// Class/id keyword adjustment: ±25 per matching attribute.
pub fn get_class_weight(node: &NodeRef) -> f64 {
    let mut weight = 0.0;
    if let Some(class) = dom_utils::attr(node, "class") {
        if !class.is_empty() {
            if REGEXPS.negative.is_match(&class) {
                weight -= CLASS_WEIGHT;
            }
            if REGEXPS.positive.is_match(&class) {
                weight += CLASS_WEIGHT;
            }
        }
    }
    if let Some(id) = dom_utils::attr(node, "id") {
        if !id.is_empty() {
            if REGEXPS.negative.is_match(&id) {
                weight -= CLASS_WEIGHT;
            }
            if REGEXPS.positive.is_match(&id) {
                weight += CLASS_WEIGHT;
            }
        }
    }
    weight
}

/// Give a candidate container its starting score: a tag-based base plus, when
/// `weight_classes` is active, the class/id keyword weight.
pub fn initialize_node(node: &NodeRef, weight_classes: bool, scores: &mut ScoreMap) {
    let base = dom_utils::element_name(node)
        .map(tag_base_score)
        .unwrap_or(0.0);
    let weight = if weight_classes {
        get_class_weight(node)
    } else {
        0.0
    };
    scores.set(node, base + weight);
}

/// Plausible byline text: non-empty and under 100 characters.
pub fn is_valid_byline(text: &str) -> bool {
    let len = text.trim().chars().count();
    len > 0 && len < 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom_utils::parse_html;

    #[test]
    fn class_weight_positive_and_negative() {
        let doc = parse_html(
            r#"<div id="a" class="article-content"></div>
               <div id="b" class="sidebar"></div>
               <div id="c" class="sidebar article"></div>"#,
        );
        let get = |id: &str| doc.select_first(&format!("#{}", id)).unwrap().as_node().clone();
        assert_eq!(get_class_weight(&get("a")), CLASS_WEIGHT);
        assert_eq!(get_class_weight(&get("b")), -CLASS_WEIGHT);
        // A class string matching both sets cancels out.
        assert_eq!(get_class_weight(&get("c")), 0.0);
    }

    #[test]
    fn score_map_tracks_identity_not_structure() {
        let doc = parse_html("<div><p>a</p><p>a</p></div>");
        let paras: Vec<_> = doc
            .select("p")
            .unwrap()
            .map(|p| p.as_node().clone())
            .collect();
        let mut scores = ScoreMap::default();
        scores.set(&paras[0], 3.0);
        assert_eq!(scores.get(&paras[0]), Some(3.0));
        assert_eq!(scores.get(&paras[1]), None);
        scores.add(&paras[1], 2.5);
        assert_eq!(scores.score(&paras[1]), 2.5);
        assert!(!scores.is_candidate(&doc));
    }

    #[test]
    fn initialize_by_tag() {
        let doc = parse_html("<div id=d></div><blockquote id=q></blockquote><ul id=u></ul>");
        let mut scores = ScoreMap::default();
        let get = |sel: &str| doc.select_first(sel).unwrap().as_node().clone();
        initialize_node(&get("#d"), false, &mut scores);
        initialize_node(&get("#q"), false, &mut scores);
        initialize_node(&get("#u"), false, &mut scores);
        assert_eq!(scores.score(&get("#d")), 5.0);
        assert_eq!(scores.score(&get("#q")), 3.0);
        assert_eq!(scores.score(&get("#u")), -3.0);
    }
}
