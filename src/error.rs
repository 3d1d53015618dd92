//! Error types for the review-aggregator crate

use thiserror::Error;

use crate::fetch::FetchError;
use crate::markup::MarkupError;
use crate::reviews::storage::StorageError;

/// Result type for review-aggregator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for review-aggregator operations
///
/// Only [`Error::EmptyQuery`] and [`Error::InvalidRequest`] are meant to reach
/// the person asking for reviews. Scraping problems never show up here; they
/// degrade into a smaller result and a [`JobOutcome`](crate::reviews::JobOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// The request carried no usable search query
    #[error("No search query was provided")]
    EmptyQuery,

    /// The request body could not be understood
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A configured tag filter does not compile to a selector
    #[error("Selector error: {0}")]
    Selector(#[from] MarkupError),

    /// The HTTP client could not be set up
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Intermediate or result storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A background task could not be joined
    #[error("Task error: {0}")]
    Task(String),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by the pipeline
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::EmptyQuery | Error::InvalidRequest(_))
    }
}
