//! Error types for the extraction engine.

use thiserror::Error;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ReadabilityError>;

/// Errors that can occur while extracting an article.
///
/// Finding no readable content is *not* an error: [`crate::Readability::parse`]
/// returns an [`crate::Article`] with empty content in that case.
#[derive(Error, Debug)]
pub enum ReadabilityError {
    /// Invalid base URL provided
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Document exceeds the configured element-count ceiling.
    ///
    /// Raised before any mutation happens, see
    /// [`max_elems_to_parse`](crate::ReadabilityOptions::max_elems_to_parse).
    #[error("Document too large: {count} elements (limit {limit})")]
    TooManyElements { count: usize, limit: usize },
}
