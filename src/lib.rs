//! # review-aggregator - Product Review Scraping for Rust
//!
//! This crate takes a free-text product search query, finds the matching
//! product pages on an e-commerce site, scrapes each product's customer
//! reviews concurrently and merges them into one result.
//!
//! ## Features
//!
//! - Search-to-product link resolution with configurable selectors
//! - Bounded concurrent scraping with per-fetch and per-job deadlines
//! - Record-scoped extraction: a malformed review never costs its siblings
//! - Pluggable intermediate storage (on disk or in memory)
//! - Destructive aggregation into a timestamped result artifact
//! - Per-job outcomes so failed scrapes stay visible
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use review_aggregator::request::ReviewRequest;
//! use review_aggregator::reviews::{Orchestrator, ScraperConfig, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let query = ReviewRequest::from_query_string("query=wireless+mouse").into_query()?;
//!
//!     let orchestrator =
//!         Orchestrator::from_config(ScraperConfig::default(), StorageConfig::default())?;
//!     let run = orchestrator.run(&query).await?;
//!
//!     for review in &run.result.records {
//!         println!("{} - {}: {}", review.product, review.rating, review.heading);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
pub mod fetch;
pub mod markup;
pub mod request;
pub mod reviews;

pub use error::Error;

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::request::{ReviewRequest, SearchQuery};
    pub use crate::reviews::{Orchestrator, ReviewRecord, ScraperConfig};
}
