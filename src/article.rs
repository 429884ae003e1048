//! The parsed output type.
//!
//! [`Article`] holds the cleaned content and every piece of metadata the
//! parser could recover. All metadata fields are optional; pages rarely
//! supply all of them.
//!
//! ```rust,no_run
//! use readerview::Readability;
//!
//! let html = "<html><body><article><h1>Title</h1><p>Body…</p></article></body></html>";
//! let article = Readability::new(html, Some("https://example.com/post"), None)
//!     .unwrap()
//!     .parse()
//!     .unwrap();
//!
//! println!("{:?}", article.title);
//! println!("{} chars", article.length);
//! let json = serde_json::to_string_pretty(&article).unwrap();
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use kuchikikiki::NodeRef;
use serde::{Deserialize, Serialize};

/// A successfully extracted article.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Article {
    /// Title from metadata, or recovered from `<title>`/headings.
    pub title: Option<String>,

    /// Cleaned article HTML: boilerplate removed, relative URLs resolved,
    /// presentational attributes stripped.
    pub content: Option<String>,

    /// Block-aware plain-text rendering of `content`.
    pub text_content: Option<String>,

    /// Character count of `text_content`.
    pub length: usize,

    /// Short description, from metadata or the first paragraph.
    pub excerpt: Option<String>,

    /// Author name(s), comma-separated when the page lists several.
    pub byline: Option<String>,

    /// Text direction of the extracted content ("ltr" or "rtl"), taken from
    /// the nearest ancestor of the top candidate carrying a `dir` attribute.
    pub dir: Option<String>,

    /// Name of the publication, from `og:site_name` or structured data.
    pub site_name: Option<String>,

    /// Lead image URL, from `og:image` or equivalent.
    pub image: Option<String>,

    /// Site icon URL, from `<link rel="icon">` variants.
    pub favicon: Option<String>,

    /// Content language, from `<html lang>` or a Content-Language meta tag.
    pub lang: Option<String>,

    /// Publication timestamp, when the page supplied a parseable date.
    pub published_time: Option<DateTime<Utc>>,

    /// Last-modified timestamp, when the page supplied a parseable date.
    pub modified_time: Option<DateTime<Utc>>,

    /// The extracted content subtree itself, for callers that want to keep
    /// working on the DOM rather than the serialized `content` string. The
    /// `Rc`-based tree stays alive as long as this handle does. Absent from
    /// serialized output and from deserialized values.
    #[serde(skip)]
    pub node: Option<NodeRef>,
}

// NodeRef compares by pointer and carries no Debug impl, so both traits are
// implemented over the extracted values only.
impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.content == other.content
            && self.text_content == other.text_content
            && self.length == other.length
            && self.excerpt == other.excerpt
            && self.byline == other.byline
            && self.dir == other.dir
            && self.site_name == other.site_name
            && self.image == other.image
            && self.favicon == other.favicon
            && self.lang == other.lang
            && self.published_time == other.published_time
            && self.modified_time == other.modified_time
    }
}

impl fmt::Debug for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Article")
            .field("title", &self.title)
            .field("content", &self.content)
            .field("text_content", &self.text_content)
            .field("length", &self.length)
            .field("excerpt", &self.excerpt)
            .field("byline", &self.byline)
            .field("dir", &self.dir)
            .field("site_name", &self.site_name)
            .field("image", &self.image)
            .field("favicon", &self.favicon)
            .field("lang", &self.lang)
            .field("published_time", &self.published_time)
            .field("modified_time", &self.modified_time)
            .field("node", &self.node.as_ref().map(|_| "NodeRef"))
            .finish()
    }
}
