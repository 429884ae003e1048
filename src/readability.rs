//! The [`Readability`] parser: ties preprocessing, metadata extraction, the
//! grab-article engine and post-processing into one pipeline.
//!
//! ```rust,no_run
//! use readerview::Readability;
//!
//! let html = std::fs::read_to_string("article.html").unwrap();
//! let article = Readability::new(&html, Some("https://example.com/article"), None)?
//!     .parse()?;
//!
//! println!("Title: {:?}", article.title);
//! println!("{} chars of text", article.length);
//! # Ok::<(), readerview::ReadabilityError>(())
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use kuchikikiki::NodeRef;
use log::{debug, warn};
use url::Url;

use crate::article::Article;
use crate::cleaner;
use crate::content_extractor::grab_article;
use crate::dom_utils::{self, count_elements, get_inner_text, inner_html};
use crate::error::{ReadabilityError, Result};
use crate::inner_text::inner_text;
use crate::metadata::{self, Metadata};
use crate::options::ReadabilityOptions;
use crate::post_processor::post_process_content;

/// Article extractor for a single document.
///
/// Construct with [`Readability::new`] from an HTML string, or from an
/// existing DOM with [`Readability::from_document`] (which works on a copy)
/// or [`Readability::from_document_mut`] (which consumes and mutates the
/// given tree). Then call [`parse`](Readability::parse).
pub struct Readability {
    doc: NodeRef,
    base_url: Option<Url>,
    options: ReadabilityOptions,
}

impl Readability {
    /// Parse `html` into a new document to extract from. `url` is used to
    /// resolve relative links and must be absolute when given.
    pub fn new(
        html: &str,
        url: Option<&str>,
        options: Option<ReadabilityOptions>,
    ) -> Result<Self> {
        let base_url = parse_base_url(url)?;
        Ok(Self {
            doc: dom_utils::parse_html(html),
            base_url,
            options: options.unwrap_or_default(),
        })
    }

    /// Extract from a copy of an already-parsed document, leaving the
    /// original untouched.
    pub fn from_document(
        doc: &NodeRef,
        url: Option<&str>,
        options: Option<ReadabilityOptions>,
    ) -> Result<Self> {
        let base_url = parse_base_url(url)?;
        Ok(Self {
            doc: dom_utils::deep_clone(doc),
            base_url,
            options: options.unwrap_or_default(),
        })
    }

    /// Extract from an already-parsed document, mutating it in place. The
    /// tree is not usable as the original page afterwards.
    pub fn from_document_mut(
        doc: NodeRef,
        url: Option<&str>,
        options: Option<ReadabilityOptions>,
    ) -> Result<Self> {
        let base_url = parse_base_url(url)?;
        Ok(Self {
            doc,
            base_url,
            options: options.unwrap_or_default(),
        })
    }

    /// Run the extraction pipeline.
    ///
    /// Returns an [`Article`] even when no main content could be isolated;
    /// in that case `content` is `None` and `length` is zero, but whatever
    /// metadata the page carried is still populated. The only errors are an
    /// invalid base URL at construction time and the element-count guard.
    pub fn parse(self) -> Result<Article> {
        let Self {
            doc,
            base_url,
            options,
        } = self;

        if options.max_elems_to_parse > 0 {
            let count = count_elements(&doc);
            if count > options.max_elems_to_parse {
                return Err(ReadabilityError::TooManyElements {
                    count,
                    limit: options.max_elems_to_parse,
                });
            }
        }

        // JSON-LD first; prep_document strips the script tags it lives in.
        let json_ld = if options.disable_json_ld {
            Metadata::default()
        } else {
            metadata::get_json_ld(&doc)
        };

        cleaner::prep_document(&doc);

        let meta = metadata::get_article_metadata(&doc, json_ld, base_url.as_ref());
        if options.debug {
            debug!("metadata: title={:?} byline={:?}", meta.title, meta.byline);
        }

        let title = meta.title.clone().unwrap_or_default();
        let extracted = grab_article(&doc, &title, &options);

        let mut article = Article {
            title: meta.title.or_else(|| title_from_url(base_url.as_ref())),
            excerpt: meta.excerpt,
            byline: meta.byline,
            site_name: meta.site_name,
            image: meta.image,
            favicon: meta.favicon,
            lang: meta.lang,
            published_time: meta.published_time.as_deref().and_then(parse_date),
            modified_time: meta.modified_time.as_deref().and_then(parse_date),
            ..Article::default()
        };

        let extracted = match extracted {
            Some(e) => e,
            None => {
                debug!("no article content found");
                return Ok(article);
            }
        };

        post_process_content(&extracted.content, base_url.as_ref(), &options);

        let text = inner_text(&extracted.content).trim().to_string();
        article.length = text.chars().count();
        article.content = Some(inner_html(&extracted.content));
        article.byline = article.byline.or(extracted.byline);
        article.dir = extracted.dir;

        if article.excerpt.is_none() {
            article.excerpt = first_paragraph_excerpt(&extracted.content);
        }
        article.text_content = Some(text);
        article.node = Some(extracted.content);

        Ok(article)
    }
}

fn parse_base_url(url: Option<&str>) -> Result<Option<Url>> {
    match url {
        Some(raw) => {
            let parsed =
                Url::parse(raw).map_err(|_| ReadabilityError::InvalidUrl(raw.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ReadabilityError::InvalidUrl(raw.to_string()));
            }
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Last-resort title: the host of the page URL.
fn title_from_url(base_url: Option<&Url>) -> Option<String> {
    base_url
        .and_then(|u| u.host_str())
        .map(|host| host.trim_start_matches("www.").to_string())
}

/// First non-empty paragraph of the content, collapsed to a single line.
fn first_paragraph_excerpt(content: &NodeRef) -> Option<String> {
    let paragraphs = content.select("p").ok()?;
    for paragraph in paragraphs {
        let text = get_inner_text(paragraph.as_node(), true);
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

/// Parse the date formats that show up in article metadata. Returns `None`
/// for anything unrecognized.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }
    warn!("unrecognized date format: {:?}", value);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn rejects_invalid_base_url() {
        let err = Readability::new("<html></html>", Some("not a url"), None)
            .err()
            .unwrap();
        assert!(matches!(err, ReadabilityError::InvalidUrl(_)));
        let err = Readability::new("<html></html>", Some("ftp://example.com"), None)
            .err()
            .unwrap();
        assert!(matches!(err, ReadabilityError::InvalidUrl(_)));
    }

    #[test]
    fn element_limit_enforced() {
        let html = "<html><body><p>a</p><p>b</p><p>c</p></body></html>";
        let options = ReadabilityOptions::builder().max_elems_to_parse(2).build();
        let err = Readability::new(html, None, Some(options))
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, ReadabilityError::TooManyElements { .. }));
    }

    #[test]
    fn parses_common_date_formats() {
        assert_eq!(
            parse_date("2024-01-15T08:30:00Z").unwrap().year(),
            2024
        );
        assert_eq!(parse_date("2024-01-15").unwrap().month(), 1);
        assert_eq!(parse_date("January 15, 2024").unwrap().day(), 15);
        assert!(parse_date("sometime last week").is_none());
    }

    #[test]
    fn from_document_leaves_original_untouched() {
        let html = "<html><body><div><h1>Title</h1><p>Some text here.</p></div></body></html>";
        let doc = dom_utils::parse_html(html);
        let before = dom_utils::outer_html(&doc);
        let _ = Readability::from_document(&doc, None, None).unwrap().parse();
        assert_eq!(dom_utils::outer_html(&doc), before);
    }

    #[test]
    fn no_content_still_returns_metadata() {
        let html = r#"<html lang="de"><head><title>Leer</title></head><body></body></html>"#;
        let article = Readability::new(html, None, None).unwrap().parse().unwrap();
        assert!(article.content.is_none());
        assert_eq!(article.length, 0);
        assert_eq!(article.lang.as_deref(), Some("de"));
    }
}
