//! # Review Aggregation Pipeline
//!
//! This module turns a product search query into the merged set of customer
//! reviews for every product the search returns.
//!
//! ## Key Components
//!
//! - `ScraperConfig`: Site addresses, selectors, concurrency and deadlines
//! - `resolve_links`: Product page URLs from a search results document
//! - `ReviewExtractor`: Scrapes one product page and stores its batch
//! - `Aggregator`: Merges stored batches into one result artifact
//! - `Orchestrator`: Runs the whole pipeline for a query
//! - `storage`: The intermediate store handing batches to the aggregator
//!
//! ## Failure model
//!
//! Extraction is best-effort. A product page that cannot be fetched, or a
//! comment block missing one of its fields, only makes the result smaller.
//! Every extraction still writes a batch (possibly empty) and reports a
//! [`JobOutcome`], so "no reviews" and "scraping failed" stay distinguishable.

mod aggregator;
mod config;
mod extractor;
mod links;
mod pipeline;
pub mod storage;

pub use aggregator::{AggregatedResult, Aggregator};
pub use config::{
    FLIPKART_BASE_URL, FLIPKART_SEARCH_URL, ScraperConfig, ScraperConfigBuilder, SiteSelectors,
};
pub use extractor::{ReviewExtractor, ScrapedPage, extract_reviews};
pub use links::{links_from_markup, resolve_links};
pub use pipeline::{Orchestrator, ReviewRun, SearchStatus};
pub use storage::{BatchKey, FsStore, MemoryStore, ReviewStore, StorageConfig, StorageError};

use serde::{Deserialize, Serialize};

/// A single customer review scraped from a product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Product title the review belongs to
    pub product: String,

    /// Reviewer name
    pub name: String,

    /// Rating as displayed on the page
    pub rating: String,

    /// Review heading
    pub heading: String,

    /// Review body
    pub comment: String,
}

/// Reviews extracted from one product page in one run, in page order
pub type ReviewBatch = Vec<ReviewRecord>;

/// What happened to a single product extraction job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// The page was fetched and yielded this many reviews
    Extracted(usize),

    /// The page was fetched but yielded no complete review
    NoReviews,

    /// The page could not be fetched; an empty batch was stored
    FetchFailed(String),

    /// The batch could not be written to intermediate storage
    StoreFailed(String),

    /// The job exceeded its deadline and was cancelled
    TimedOut,

    /// The job's task ended abnormally
    Aborted(String),
}

impl JobOutcome {
    /// Whether the job left a batch behind in intermediate storage
    pub fn stored_batch(&self) -> bool {
        matches!(
            self,
            JobOutcome::Extracted(_) | JobOutcome::NoReviews | JobOutcome::FetchFailed(_)
        )
    }
}

/// Report for one product extraction job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    /// Product page URL
    pub url: String,

    /// Key of the stored batch, if one was written
    pub key: Option<BatchKey>,

    /// Outcome of the job
    pub outcome: JobOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_record_json_shape() {
        let record = ReviewRecord {
            product: "Mouse".to_string(),
            name: "Asha".to_string(),
            rating: "5".to_string(),
            heading: "Great".to_string(),
            comment: "Works well".to_string(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["product"], "Mouse");
        assert_eq!(json["name"], "Asha");
        assert_eq!(json["rating"], "5");
        assert_eq!(json["heading"], "Great");
        assert_eq!(json["comment"], "Works well");
    }

    #[test]
    fn test_stored_batch_outcomes() {
        assert!(JobOutcome::Extracted(3).stored_batch());
        assert!(JobOutcome::NoReviews.stored_batch());
        assert!(JobOutcome::FetchFailed("refused".to_string()).stored_batch());
        assert!(!JobOutcome::StoreFailed("disk full".to_string()).stored_batch());
        assert!(!JobOutcome::TimedOut.stored_batch());
        assert!(!JobOutcome::Aborted("panic".to_string()).stored_batch());
    }
}
