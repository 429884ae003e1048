//! End-to-end extraction tests over the public API.

use kuchikikiki::traits::TendrilSink;
use readerview::{
    inner_text, is_probably_readerable, Readability, ReadabilityError, ReadabilityOptions,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn parse_dom(html: &str) -> readerview::NodeRef {
    kuchikikiki::parse_html().one(html)
}

fn long_article_body(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            format!(
                "<p>Paragraph {} of the article body, with enough commas, words, and \
                 general prose to convince the scoring pass that this is the real \
                 content of the page, not navigation.</p>",
                i
            )
        })
        .collect()
}

#[test]
fn tiny_page_extracts_with_fallback() {
    init_logs();
    let html = "<h1>Hello World</h1><p>This is an article.</p>";
    let article = Readability::new(html, None, None).unwrap().parse().unwrap();

    // The whole body becomes the page; the stray h1 is demoted to h2.
    assert_eq!(
        article.content.as_deref(),
        Some(
            "<div id=\"readability-page-1\" class=\"page\">\
             <h2>Hello World</h2><p>This is an article.</p></div>"
        )
    );
    assert_eq!(
        article.text_content.as_deref(),
        Some("Hello World\n\nThis is an article.")
    );
    assert_eq!(article.length, "Hello World\n\nThis is an article.".chars().count());
}

#[test]
fn renderer_groups_blocks() {
    let doc = parse_dom(
        "<div><p>Intro paragraph.</p>\
         <ul><li>one</li><li>two</li></ul>\
         <table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>\
         <p><span>Sp</span><span>ans</span></p></div>",
    );
    assert_eq!(
        inner_text(&doc),
        "Intro paragraph.\n\none\ntwo\n\na\tb\nc\td\n\nSpans"
    );
}

#[test]
fn renderer_brs_do_not_collapse() {
    let doc = parse_dom("<p>hard<br>line<br><br><br>breaks</p>");
    assert_eq!(inner_text(&doc), "hard\nline\n\n\nbreaks");
}

#[test]
fn renderer_preserves_no_break_space() {
    let doc = parse_dom("<p>open&nbsp;source software</p>");
    assert_eq!(inner_text(&doc), "open\u{a0}source software");
}

#[test]
fn element_ceiling_aborts_before_mutation() {
    let html = "<html><body><div><p>one</p><p>two</p><p>three</p></div></body></html>";
    let doc = parse_dom(html);
    let mut before = Vec::new();
    doc.serialize(&mut before).unwrap();

    let options = ReadabilityOptions::builder().max_elems_to_parse(3).build();
    let err = Readability::from_document_mut(doc.clone(), None, Some(options))
        .unwrap()
        .parse()
        .unwrap_err();
    assert!(matches!(err, ReadabilityError::TooManyElements { .. }));

    let mut after = Vec::new();
    doc.serialize(&mut after).unwrap();
    assert_eq!(before, after);
}

#[test]
fn title_prefers_heading_side_of_separator() {
    init_logs();
    let html = format!(
        "<html><head><title>Article Title | Site Name</title></head>\
         <body><h1>Article Title</h1><div class=\"content\">{}</div></body></html>",
        long_article_body(8)
    );
    let article = Readability::new(&html, None, None).unwrap().parse().unwrap();
    assert_eq!(article.title.as_deref(), Some("Article Title"));
    // The heading duplicates the title, so it is not part of the content.
    let text = article.text_content.unwrap();
    assert!(!text.contains("Article Title"));
    assert!(text.contains("Paragraph 7"));
}

#[test]
fn full_article_with_metadata() {
    init_logs();
    let html = format!(
        r#"<html lang="en"><head>
            <title>Ignored | Site</title>
            <meta property="og:title" content="The Real Title">
            <meta name="author" content="Jane Q. Author">
            <meta property="og:site_name" content="Example News">
            <meta property="og:image" content="/img/lead.jpg">
            <meta property="article:published_time" content="2024-03-01T10:00:00Z">
            <link rel="icon" href="/favicon.ico">
        </head><body>
            <div id="sidebar-nav"><a href="/a">a</a><a href="/b">b</a></div>
            <div class="content">
                <img src="figure.png">
                {}
            </div>
        </body></html>"#,
        long_article_body(8)
    );
    let article = Readability::new(&html, Some("https://news.example.com/story/1"), None)
        .unwrap()
        .parse()
        .unwrap();

    assert_eq!(article.title.as_deref(), Some("The Real Title"));
    assert_eq!(article.byline.as_deref(), Some("Jane Q. Author"));
    assert_eq!(article.site_name.as_deref(), Some("Example News"));
    assert_eq!(
        article.image.as_deref(),
        Some("https://news.example.com/img/lead.jpg")
    );
    assert_eq!(
        article.favicon.as_deref(),
        Some("https://news.example.com/favicon.ico")
    );
    assert_eq!(article.lang.as_deref(), Some("en"));
    let published = article.published_time.unwrap();
    assert_eq!(published.to_rfc3339(), "2024-03-01T10:00:00+00:00");

    let content = article.content.unwrap();
    assert!(content.contains("https://news.example.com/story/figure.png"));
    assert!(!content.contains("sidebar-nav"));
    // classes are stripped except the page marker
    assert!(!content.contains("class=\"content\""));
    assert!(content.contains("class=\"page\""));

    // no description meta, so the excerpt falls back to the first paragraph
    let excerpt = article.excerpt.unwrap();
    assert!(excerpt.starts_with("Paragraph 0"));
    assert!(article.length > 500);
}

#[test]
fn byline_element_feeds_article_author() {
    let html = format!(
        r#"<html><body><div class="content">
            <div class="byline">Alex Example</div>{}
        </div></body></html>"#,
        long_article_body(8)
    );
    let article = Readability::new(&html, None, None).unwrap().parse().unwrap();
    assert_eq!(article.byline.as_deref(), Some("Alex Example"));
}

#[test]
fn readerable_gate_matches_extraction() {
    let article_page = format!(
        "<html><body><article>{}</article></body></html>",
        long_article_body(8)
    );
    assert!(is_probably_readerable(&article_page, None));

    let link_farm = r#"<html><body><ul>
        <li><a href="/a">one</a></li><li><a href="/b">two</a></li>
    </ul></body></html>"#;
    assert!(!is_probably_readerable(link_farm, None));
}

#[test]
fn article_node_is_the_extracted_subtree() {
    let html = format!(
        "<html><body><div class=\"content\">{}</div></body></html>",
        long_article_body(8)
    );
    let article = Readability::new(&html, None, None).unwrap().parse().unwrap();
    let node = article.node.as_ref().unwrap();
    // The handle points at the same subtree the string fields were built from.
    assert_eq!(
        inner_text(node).trim(),
        article.text_content.as_deref().unwrap()
    );
}

#[test]
fn serializes_to_json() {
    let html = format!(
        "<html><head><title>A Serializable Article Title</title></head>\
         <body><div class=\"content\">{}</div></body></html>",
        long_article_body(8)
    );
    let article = Readability::new(&html, None, None).unwrap().parse().unwrap();
    let json = serde_json::to_string(&article).unwrap();
    assert!(json.contains("A Serializable Article Title"));
    let roundtrip: readerview::Article = serde_json::from_str(&json).unwrap();
    assert_eq!(roundtrip.title, article.title);
}
