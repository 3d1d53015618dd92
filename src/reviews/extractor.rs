//! Review extraction for a single product page

use std::sync::Arc;

use scraper::ElementRef;
use tracing::{debug, info, instrument, warn};

use super::config::SiteSelectors;
use super::storage::ReviewStore;
use super::{JobOutcome, JobReport, ReviewBatch, ReviewRecord};
use crate::fetch::PageFetcher;
use crate::markup::{self, Document, TagFilter};

/// Extract every complete review from a product page
///
/// A record is built only when the product title, reviewer name, rating,
/// heading and nested body text all resolve. A block missing any of them is
/// dropped without affecting its siblings. Without a product title every
/// block is dropped.
pub fn extract_reviews(page: &str, selectors: &SiteSelectors) -> ReviewBatch {
    let document = Document::parse(page);
    let product = document.find(&selectors.product_title).map(markup::text_of);

    document
        .find_all(&selectors.comment_block)
        .into_iter()
        .filter_map(|block| build_record(product.as_deref(), block, selectors))
        .collect()
}

fn build_record(
    product: Option<&str>,
    block: ElementRef<'_>,
    selectors: &SiteSelectors,
) -> Option<ReviewRecord> {
    let first_text = |filter: &TagFilter| {
        markup::find_all(block, filter)
            .into_iter()
            .next()
            .map(markup::text_of)
    };

    let name = first_text(&selectors.reviewer_name);
    let rating = first_text(&selectors.rating);
    let heading = first_text(&selectors.heading);
    let comment = markup::find_all(block, &selectors.comment_body)
        .into_iter()
        .next()
        .and_then(|body| markup::first_descendant(body, &selectors.comment_text_tag))
        .and_then(|outer| markup::first_descendant(outer, &selectors.comment_text_tag))
        .map(markup::text_of);

    match (product, name, rating, heading, comment) {
        (Some(product), Some(name), Some(rating), Some(heading), Some(comment)) => {
            Some(ReviewRecord {
                product: product.to_string(),
                name,
                rating,
                heading,
                comment,
            })
        }
        _ => {
            debug!("Dropping incomplete review block");
            None
        }
    }
}

/// Reviews scraped from one product page, not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPage {
    /// Complete reviews in page order
    pub batch: ReviewBatch,

    /// Why the page could not be fetched, if it could not
    pub fetch_failure: Option<String>,
}

/// Scrapes one product page and commits its batch to intermediate storage
pub struct ReviewExtractor<F, S> {
    fetcher: Arc<F>,
    store: Arc<S>,
    selectors: Arc<SiteSelectors>,
}

impl<F, S> Clone for ReviewExtractor<F, S> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            store: Arc::clone(&self.store),
            selectors: Arc::clone(&self.selectors),
        }
    }
}

impl<F: PageFetcher, S: ReviewStore> ReviewExtractor<F, S> {
    /// Create an extractor sharing the given fetcher and store
    pub fn new(fetcher: Arc<F>, store: Arc<S>, selectors: SiteSelectors) -> Self {
        Self {
            fetcher,
            store,
            selectors: Arc::new(selectors),
        }
    }

    /// Fetch, parse and extract `url`, then store the resulting batch
    ///
    /// Never fails: a page that cannot be fetched is scraped as an empty page,
    /// and the (empty) batch is stored all the same. The report says which
    /// of these happened.
    #[instrument(skip(self))]
    pub async fn extract(&self, url: &str) -> JobReport {
        let scraped = self.scrape(url).await;
        self.commit(url, scraped).await
    }

    /// Fetch `url` and extract its reviews without touching the store
    pub async fn scrape(&self, url: &str) -> ScrapedPage {
        let (page, fetch_failure) = match self.fetcher.fetch(url).await {
            Ok(page) => (page, None),
            Err(e) => {
                warn!(error = %e, "Product page fetch failed, scraping an empty page");
                (String::new(), Some(e.to_string()))
            }
        };

        ScrapedPage {
            batch: extract_reviews(&page, &self.selectors),
            fetch_failure,
        }
    }

    /// Store a scraped batch and report the job's outcome
    pub async fn commit(&self, url: &str, scraped: ScrapedPage) -> JobReport {
        let ScrapedPage {
            batch,
            fetch_failure,
        } = scraped;
        let count = batch.len();

        match self.store.put_batch(&batch).await {
            Ok(key) => {
                info!(
                    monotonic_counter.reviews_extracted = count as u64,
                    key = %key,
                    "Stored review batch"
                );
                let outcome = match fetch_failure {
                    Some(reason) => JobOutcome::FetchFailed(reason),
                    None if count == 0 => JobOutcome::NoReviews,
                    None => JobOutcome::Extracted(count),
                };
                JobReport {
                    url: url.to_string(),
                    key: Some(key),
                    outcome,
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to store review batch");
                JobReport {
                    url: url.to_string(),
                    key: None,
                    outcome: JobOutcome::StoreFailed(e.to_string()),
                }
            }
        }
    }
}
