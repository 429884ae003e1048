//! Shared regular expressions, tag lists and scoring constants.
//!
//! The keyword sets and magic numbers below are the empirically tuned values
//! from Readability-style extractors; changing them changes extraction results
//! on real pages, so they are kept verbatim.

use once_cell::sync::Lazy;
use regex::Regex;

/// All keyword/classification regexes, compiled once and shared across parses.
pub struct Regexps {
    pub unlikely_candidates: Regex,
    pub ok_maybe_its_a_candidate: Regex,
    pub positive: Regex,
    pub negative: Regex,
    pub byline: Regex,
    pub share_elements: Regex,
    pub videos: Regex,
    pub commas: Regex,
    pub normalize: Regex,
    pub b64_data_url: Regex,
    pub json_ld_article_types: Regex,
    pub schema_org_context: Regex,
    pub title_separator: Regex,
    pub meta_property: Regex,
    pub meta_name: Regex,
}

pub static REGEXPS: Lazy<Regexps> = Lazy::new(|| Regexps {
    unlikely_candidates: Regex::new(
        r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote",
    )
    .unwrap(),
    ok_maybe_its_a_candidate: Regex::new(r"(?i)and|article|body|column|content|main|shadow")
        .unwrap(),
    positive: Regex::new(
        r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story",
    )
    .unwrap(),
    negative: Regex::new(
        r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|foot|footer|footnote|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|tool|widget",
    )
    .unwrap(),
    byline: Regex::new(r"(?i)byline|author|dateline|writtenby|p-author").unwrap(),
    share_elements: Regex::new(r"(?i)(\b|_)(share|sharedaddy)(\b|_)").unwrap(),
    videos: Regex::new(
        r"(?i)//(www\.)?((dailymotion|youtube|youtube-nocookie|player\.vimeo|v\.qq)\.com|(archive|upload\.wikimedia)\.org|player\.twitch\.tv)",
    )
    .unwrap(),
    commas: Regex::new(r"\u{002C}|\u{060C}|\u{FE50}|\u{FE10}|\u{FE11}|\u{2E41}|\u{2E34}|\u{2E32}|\u{FF0C}")
        .unwrap(),
    normalize: Regex::new(r"\s{2,}").unwrap(),
    b64_data_url: Regex::new(r"(?i)^data:\s*([^\s;,]+)\s*;\s*base64\s*,").unwrap(),
    json_ld_article_types: Regex::new(
        r"^Article|AdvertiserContentArticle|NewsArticle|AnalysisNewsArticle|AskPublicNewsArticle|BackgroundNewsArticle|OpinionNewsArticle|ReportageNewsArticle|ReviewNewsArticle|Report|SatiricalArticle|ScholarlyArticle|MedicalScholarlyArticle|SocialMediaPosting|BlogPosting|LiveBlogPosting|DiscussionForumPosting|TechArticle|APIReference$",
    )
    .unwrap(),
    schema_org_context: Regex::new(r"^https?://schema\.org/?$").unwrap(),
    title_separator: Regex::new(r"\s[|\-–—\\/>»]\s").unwrap(),
    meta_property: Regex::new(
        r"(?i)\s*(article|dc|dcterm|og|twitter)\s*:\s*(author|creator|description|published_time|modified_time|image|title|site_name)\s*",
    )
    .unwrap(),
    meta_name: Regex::new(
        r"(?i)^\s*(?:(?:article|dc|dcterm|og|twitter|parsely|weibo:(?:article|webpage))\s*[-\.:]\s*)?(author|author_name|creator|pub-date|description|image|title|site_name)\s*$",
    )
    .unwrap(),
});

/// Tags whose text is scored directly during the scoring pass.
pub const DEFAULT_TAGS_TO_SCORE: &[&str] =
    &["section", "h2", "h3", "h4", "h5", "h6", "p", "td", "pre"];

/// Phrasing (inline) content per the HTML spec, used when deciding whether a
/// `<div>` can be treated as a paragraph.
pub const PHRASING_ELEMS: &[&str] = &[
    "abbr", "audio", "b", "bdo", "br", "button", "cite", "code", "data", "datalist", "dfn", "em",
    "embed", "i", "img", "input", "kbd", "label", "mark", "math", "meter", "noscript", "object",
    "output", "progress", "q", "ruby", "samp", "script", "select", "small", "span", "strong",
    "sub", "sup", "textarea", "time", "var", "wbr",
];

/// Sibling tags kept as-is when merged into the article; everything else is
/// renamed to `<div>`.
pub const ALTER_TO_DIV_EXCEPTIONS: &[&str] = &["div", "article", "section", "p", "ol", "ul"];

/// ARIA roles that mark an element as non-content.
pub const UNLIKELY_ROLES: &[&str] = &[
    "menu",
    "menubar",
    "complementary",
    "navigation",
    "alert",
    "alertdialog",
    "dialog",
];

/// Attributes stripped by the post-processor's presentational cleanup.
pub const PRESENTATIONAL_ATTRIBUTES: &[&str] = &[
    "align",
    "background",
    "bgcolor",
    "border",
    "cellpadding",
    "cellspacing",
    "frame",
    "hspace",
    "rules",
    "style",
    "valign",
    "vspace",
];

pub const DEPRECATED_SIZE_ATTRIBUTE_ELEMS: &[&str] = &["table", "th", "td", "hr", "pre"];

/// Class/id keyword weight applied when `WEIGHT_CLASSES` is active.
pub const CLASS_WEIGHT: f64 = 25.0;

/// How many ancestor levels a paragraph's score propagates to.
pub const SCORE_ANCESTOR_DEPTH: usize = 5;

/// Minimum text length for a paragraph to take part in scoring.
pub const MIN_PARAGRAPH_LENGTH: usize = 25;

/// Base scores by tag when a candidate container is initialized.
pub fn tag_base_score(tag: &str) -> f64 {
    match tag {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlikely_but_maybe_candidate() {
        assert!(REGEXPS.unlikely_candidates.is_match("sidebar-wrap"));
        assert!(REGEXPS.ok_maybe_its_a_candidate.is_match("main-sidebar"));
        assert!(!REGEXPS.ok_maybe_its_a_candidate.is_match("sidebar"));
    }

    #[test]
    fn title_separator_matches_common_patterns() {
        assert!(REGEXPS.title_separator.is_match("Article Title | Site Name"));
        assert!(REGEXPS.title_separator.is_match("Article Title - Site Name"));
        assert!(!REGEXPS.title_separator.is_match("Self-titled article"));
    }

    #[test]
    fn comma_regex_counts_unicode_commas() {
        assert_eq!(REGEXPS.commas.find_iter("a,b、c，d").count(), 2);
    }
}
