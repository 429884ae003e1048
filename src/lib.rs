//! # readerview
//!
//! Reader-mode article extraction: pull the main content and metadata out of
//! a web page, the way browser reader views do.
//!
//! The extractor preprocesses the DOM, scores candidate containers by their
//! text shape, merges in sibling content, cleans the result and renders it
//! both as HTML and as block-aware plain text. When a strict pass finds too
//! little text it relaxes its heuristics one at a time and retries, keeping
//! the best attempt as a fallback.
//!
//! ## Basic usage
//!
//! ```rust,no_run
//! use readerview::Readability;
//!
//! let html = r#"<html><body><article><h1>Title</h1><p>Content...</p></article></body></html>"#;
//! let article = Readability::new(html, Some("https://example.com/article"), None)?
//!     .parse()?;
//!
//! println!("Title: {:?}", article.title);
//! println!("Author: {:?}", article.byline);
//! println!("HTML: {:?}", article.content);
//! println!("Text: {:?}", article.text_content);
//! # Ok::<(), readerview::ReadabilityError>(())
//! ```
//!
//! ## Tuning
//!
//! ```rust,no_run
//! use readerview::{Readability, ReadabilityOptions};
//!
//! let options = ReadabilityOptions::builder()
//!     .char_threshold(300)
//!     .nb_top_candidates(10)
//!     .keep_classes(true)
//!     .build();
//! let article = Readability::new("<html>...</html>", None, Some(options))?.parse()?;
//! # Ok::<(), readerview::ReadabilityError>(())
//! ```
//!
//! ## Pre-flight check
//!
//! [`is_probably_readerable`] answers "is this an article page at all?"
//! without running the full pipeline:
//!
//! ```rust,no_run
//! use readerview::is_probably_readerable;
//!
//! if is_probably_readerable("<html>...</html>", None) {
//!     // worth a full parse
//! }
//! ```

mod article;
mod cleaner;
mod constants;
mod content_extractor;
mod dom_utils;
mod error;
mod inner_text;
mod metadata;
mod options;
mod post_processor;
mod readability;
mod readerable;
mod scoring;

pub use kuchikikiki::NodeRef;

pub use article::Article;
pub use error::{ReadabilityError, Result};
pub use inner_text::inner_text;
pub use options::{ReadabilityOptions, ReadabilityOptionsBuilder};
pub use readability::Readability;
pub use readerable::{is_probably_readerable, ReaderableOptions};
