//! # Scraper Configuration Module
//!
//! This module provides configuration for the review pipeline: where the
//! target site lives, which structural selectors identify product links and
//! review fields, how many product pages are scraped at once, and the
//! deadlines applied to fetches and jobs. It uses a builder pattern for
//! flexible configuration.
//!
//! ## Key Components
//!
//! - `SiteSelectors`: Tag filters calibrated for the target site's markup
//! - `ScraperConfig`: The main configuration struct
//! - `ScraperConfigBuilder`: Builder pattern implementation for easier configuration
//!
//! The default selectors match Flipkart's search and product pages. They are
//! exact class matches and stop working as soon as the site changes its markup.

use std::time::Duration;

use crate::fetch::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::markup::{MarkupError, TagFilter};

/// Base URL product links are resolved against
pub const FLIPKART_BASE_URL: &str = "https://www.flipkart.com";

/// Search URL the query is appended to
pub const FLIPKART_SEARCH_URL: &str = "https://www.flipkart.com/search?q=";

/// Tag filters locating links and review fields on the target site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSelectors {
    /// Anchors on the search results page pointing at product pages
    pub product_link: TagFilter,

    /// Attribute of `product_link` holding the relative product URL
    pub link_attr: String,

    /// Product title on a product page
    pub product_title: TagFilter,

    /// One customer review block
    pub comment_block: TagFilter,

    /// Reviewer name inside a review block
    pub reviewer_name: TagFilter,

    /// Rating inside a review block
    pub rating: TagFilter,

    /// Heading inside a review block
    pub heading: TagFilter,

    /// Container of the review body inside a review block
    pub comment_body: TagFilter,

    /// Tag nested twice under `comment_body` holding the review text
    pub comment_text_tag: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            product_link: TagFilter::new("a").with_class("_1fQZEK"),
            link_attr: "href".to_string(),
            product_title: TagFilter::new("span").with_class("B_NuCI"),
            comment_block: TagFilter::new("div").with_class("_16PBlm"),
            reviewer_name: TagFilter::new("p").with_class("_2sc7ZR _2V5EHH"),
            rating: TagFilter::new("div").with_class("_3LWZlK _1BLPMq"),
            heading: TagFilter::new("p").with_class("_2-N8zT"),
            comment_body: TagFilter::new("div").with_class("t-ZTKy"),
            comment_text_tag: "div".to_string(),
        }
    }
}

impl SiteSelectors {
    /// Check that every filter compiles
    pub fn validate(&self) -> Result<(), MarkupError> {
        for filter in [
            &self.product_link,
            &self.product_title,
            &self.comment_block,
            &self.reviewer_name,
            &self.rating,
            &self.heading,
            &self.comment_body,
        ] {
            filter.validate()?;
        }
        TagFilter::new(self.comment_text_tag.as_str()).validate()
    }
}

/// Configuration for the review pipeline
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Base URL prefixed to every product link
    pub site_base: String,

    /// URL the search query is appended to
    pub search_base: String,

    /// Selectors for links and review fields
    pub selectors: SiteSelectors,

    /// Maximum number of product pages scraped at once
    pub concurrency: usize,

    /// Deadline for a single HTTP fetch
    pub fetch_timeout: Duration,

    /// Deadline for fetching and extracting one product page, measured once
    /// the job holds a worker slot. Storing the batch is not covered.
    pub job_timeout: Duration,

    /// User agent to use for requests
    pub user_agent: String,

    /// Keep intermediate batches after aggregation
    pub retain_batches: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        let fetch_timeout = Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS);
        Self {
            site_base: FLIPKART_BASE_URL.to_string(),
            search_base: FLIPKART_SEARCH_URL.to_string(),
            selectors: SiteSelectors::default(),
            concurrency: default_concurrency(),
            fetch_timeout,
            job_timeout: fetch_timeout * 2,
            user_agent: format!("review-aggregator/{}", env!("CARGO_PKG_VERSION")),
            retain_batches: false,
        }
    }
}

/// Number of worker slots when none is configured
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builder for ScraperConfig
#[derive(Debug, Default)]
pub struct ScraperConfigBuilder {
    config: ScraperConfig,
}

impl ScraperConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ScraperConfig::default(),
        }
    }

    /// Set the base URL for product links
    pub fn site_base(mut self, site_base: impl Into<String>) -> Self {
        self.config.site_base = site_base.into();
        self
    }

    /// Set the URL the query is appended to
    pub fn search_base(mut self, search_base: impl Into<String>) -> Self {
        self.config.search_base = search_base.into();
        self
    }

    /// Set the selectors
    pub fn selectors(mut self, selectors: SiteSelectors) -> Self {
        self.config.selectors = selectors;
        self
    }

    /// Set the number of concurrent extraction jobs (at least one)
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    /// Set the deadline for a single fetch
    pub fn fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.config.fetch_timeout = fetch_timeout;
        self
    }

    /// Set the deadline for fetching and extracting one product page
    pub fn job_timeout(mut self, job_timeout: Duration) -> Self {
        self.config.job_timeout = job_timeout;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Keep intermediate batches after aggregation
    pub fn retain_batches(mut self, retain_batches: bool) -> Self {
        self.config.retain_batches = retain_batches;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ScraperConfig {
        self.config
    }
}

impl ScraperConfig {
    /// Create a new builder
    pub fn builder() -> ScraperConfigBuilder {
        ScraperConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScraperConfig::default();
        assert_eq!(config.site_base, "https://www.flipkart.com");
        assert_eq!(config.search_base, "https://www.flipkart.com/search?q=");
        assert!(config.concurrency >= 1);
        assert!(config.job_timeout > config.fetch_timeout);
        assert!(!config.retain_batches);
        assert!(config.user_agent.starts_with("review-aggregator/"));
    }

    #[test]
    fn test_builder() {
        let config = ScraperConfig::builder()
            .site_base("http://localhost:1234")
            .search_base("http://localhost:1234/search?q=")
            .concurrency(0)
            .fetch_timeout(Duration::from_secs(2))
            .job_timeout(Duration::from_secs(3))
            .user_agent("test-agent")
            .retain_batches(true)
            .build();

        assert_eq!(config.site_base, "http://localhost:1234");
        assert_eq!(config.search_base, "http://localhost:1234/search?q=");
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.fetch_timeout, Duration::from_secs(2));
        assert_eq!(config.job_timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "test-agent");
        assert!(config.retain_batches);
    }

    #[test]
    fn test_default_selectors_validate() {
        let selectors = SiteSelectors::default();
        assert!(selectors.validate().is_ok());
        assert_eq!(selectors.link_attr, "href");
        assert_eq!(selectors.reviewer_name.css(), "p[class=\"_2sc7ZR _2V5EHH\"]");
    }

    #[test]
    fn test_broken_selector_is_rejected() {
        let selectors = SiteSelectors {
            rating: TagFilter::new("div["),
            ..SiteSelectors::default()
        };
        assert!(selectors.validate().is_err());
    }
}
