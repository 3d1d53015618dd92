//! Orchestration of a full review run: search, fan-out, aggregate

use std::sync::Arc;

use futures::future;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tokio::time::timeout;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use super::aggregator::{AggregatedResult, Aggregator};
use super::config::ScraperConfig;
use super::extractor::ReviewExtractor;
use super::links::links_from_markup;
use super::storage::{FsStore, ReviewStore, StorageConfig};
use super::{JobOutcome, JobReport};
use crate::error::Result;
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::request::SearchQuery;

/// Whether the search results page itself could be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStatus {
    Fetched,
    Failed(String),
}

/// Everything a review run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRun {
    /// The query the run was started for
    pub query: String,

    /// Product links resolved from the search page, in page order
    pub links: Vec<String>,

    /// Outcome of the search page fetch
    pub search: SearchStatus,

    /// One report per dispatched link, in link order
    pub jobs: Vec<JobReport>,

    /// The aggregated reviews
    pub result: AggregatedResult,
}

/// Runs the review pipeline for a query
///
/// The orchestrator owns the fetcher and the intermediate store and shares
/// them with every extraction job and the aggregator.
pub struct Orchestrator<F, S> {
    config: ScraperConfig,
    fetcher: Arc<F>,
    store: Arc<S>,
}

impl Orchestrator<HttpFetcher, FsStore> {
    /// Create an orchestrator fetching over HTTP and storing on disk
    pub fn from_config(config: ScraperConfig, storage: StorageConfig) -> Result<Self> {
        storage.validate()?;
        let fetcher = HttpFetcher::new(&config.user_agent, config.fetch_timeout)?;
        Self::new(config, fetcher, FsStore::with_config(storage))
    }
}

impl<F: PageFetcher, S: ReviewStore> Orchestrator<F, S> {
    /// Create an orchestrator; fails if a configured selector does not compile
    pub fn new(config: ScraperConfig, fetcher: F, store: S) -> Result<Self> {
        Self::with_shared(config, Arc::new(fetcher), Arc::new(store))
    }

    /// Create an orchestrator over an already shared fetcher and store
    pub fn with_shared(config: ScraperConfig, fetcher: Arc<F>, store: Arc<S>) -> Result<Self> {
        config.selectors.validate()?;
        Ok(Self {
            config,
            fetcher,
            store,
        })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// An extractor sharing this orchestrator's fetcher and store
    pub fn extractor(&self) -> ReviewExtractor<F, S> {
        ReviewExtractor::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.store),
            self.config.selectors.clone(),
        )
    }

    /// An aggregator over this orchestrator's store
    pub fn aggregator(&self) -> Aggregator<S> {
        Aggregator::new(Arc::clone(&self.store))
    }

    /// Fetch the search results page for `query` and resolve its product links
    ///
    /// A failed fetch yields no links rather than an error.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn resolve_product_links(&self, query: &SearchQuery) -> (Vec<String>, SearchStatus) {
        let url = query.search_url(&self.config.search_base);
        debug!("Fetching search page {}", url);

        let (markup, status) = match self.fetcher.fetch(&url).await {
            Ok(markup) => (markup, SearchStatus::Fetched),
            Err(e) => {
                warn!(error = %e, "Search page fetch failed");
                (String::new(), SearchStatus::Failed(e.to_string()))
            }
        };

        let selectors = &self.config.selectors;
        let links = links_from_markup(
            &markup,
            &selectors.product_link,
            &selectors.link_attr,
            &self.config.site_base,
        );
        info!(count = links.len(), "Resolved product links");

        (links, status)
    }

    /// Run the whole pipeline for `query`
    pub async fn run(&self, query: &SearchQuery) -> Result<ReviewRun> {
        self.run_with_progress(query, None).await
    }

    /// Run the whole pipeline, reporting each finished job on `progress`
    pub async fn run_with_progress(
        &self,
        query: &SearchQuery,
        progress: Option<mpsc::Sender<JobReport>>,
    ) -> Result<ReviewRun> {
        let (links, search) = self.resolve_product_links(query).await;
        self.dispatch(query, links, search, progress).await
    }

    /// Scrape already resolved `links` and aggregate the results for `query`
    ///
    /// Returns once every job has finished, timed out or aborted.
    #[instrument(skip(self, links, search, progress), fields(query = %query, links = links.len()))]
    pub async fn dispatch(
        &self,
        query: &SearchQuery,
        links: Vec<String>,
        search: SearchStatus,
        progress: Option<mpsc::Sender<JobReport>>,
    ) -> Result<ReviewRun> {
        let jobs = self.fan_out(&links, progress).await;

        let failed = jobs
            .iter()
            .filter(|job| !matches!(job.outcome, JobOutcome::Extracted(_) | JobOutcome::NoReviews))
            .count();
        info!(jobs = jobs.len(), failed, "All extraction jobs finished");

        let result = self
            .aggregator()
            .aggregate(query.as_str(), !self.config.retain_batches)
            .await?;

        Ok(ReviewRun {
            query: query.as_str().to_string(),
            links,
            search,
            jobs,
            result,
        })
    }

    async fn fan_out(
        &self,
        links: &[String],
        progress: Option<mpsc::Sender<JobReport>>,
    ) -> Vec<JobReport> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        let tasks = links
            .iter()
            .map(|url| {
                let permit = Arc::clone(&semaphore).acquire_owned();
                let extractor = self.extractor();
                let job_timeout = self.config.job_timeout;
                let progress = progress.clone();
                let url = url.clone();

                let span = info_span!("extract", url = %url);

                tokio::spawn(
                    async move {
                        let report = match permit.await {
                            // The deadline covers fetching and extraction only; a store
                            // write is never abandoned halfway
                            Ok(_permit) => {
                                let scraped = timeout(job_timeout, extractor.scrape(&url)).await;
                                match scraped {
                                    Ok(scraped) => extractor.commit(&url, scraped).await,
                                    Err(_) => {
                                        warn!("Extraction job timed out");
                                        JobReport {
                                            url: url.clone(),
                                            key: None,
                                            outcome: JobOutcome::TimedOut,
                                        }
                                    }
                                }
                            }
                            Err(e) => JobReport {
                                url: url.clone(),
                                key: None,
                                outcome: JobOutcome::Aborted(format!(
                                    "Worker slot unavailable: {}",
                                    e
                                )),
                            },
                        };

                        if let Some(progress) = progress {
                            let _ = progress.send(report.clone()).await;
                        }
                        report
                    }
                    .instrument(span),
                )
            })
            .collect::<Vec<_>>();

        // Wait for all tasks to complete
        let results = future::join_all(tasks).await;

        links
            .iter()
            .zip(results)
            .map(|(url, result)| match result {
                Ok(report) => report,
                Err(e) => {
                    warn!(url = %url, error = %e, "Extraction task failed");
                    JobReport {
                        url: url.clone(),
                        key: None,
                        outcome: JobOutcome::Aborted(e.to_string()),
                    }
                }
            })
            .collect()
    }
}
