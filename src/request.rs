//! The inbound request boundary
//!
//! A request carries a single `query` field, delivered either as a URL
//! parameter or as a JSON body field. A missing or blank query is the only
//! error surfaced to the caller as a client error. Any other text is used
//! verbatim as the search URL suffix.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An incoming review request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Free-text product search query
    #[serde(default)]
    pub query: Option<String>,
}

impl ReviewRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
        }
    }

    /// Read the request from a URL query string such as `query=wireless+mouse`
    pub fn from_query_string(query_string: &str) -> Self {
        let query = url::form_urlencoded::parse(query_string.trim_start_matches('?').as_bytes())
            .find(|(key, _)| key == "query")
            .map(|(_, value)| value.into_owned());
        Self { query }
    }

    /// Read the request from a JSON body such as `{"query": "wireless mouse"}`
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::InvalidRequest(e.to_string()))
    }

    /// The validated search query
    pub fn into_query(self) -> Result<SearchQuery> {
        SearchQuery::new(self.query.ok_or(Error::EmptyQuery)?)
    }
}

/// A non-blank product search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
}

impl SearchQuery {
    /// Accept any text that is not blank
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The search results URL: `search_base` followed by the query, unencoded
    pub fn search_url(&self, search_base: &str) -> String {
        format!("{}{}", search_base, self.text)
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
