//! Dispatch surface consumed by protocol adapters (MCP, CLI, embedding apps).
//!
//! Validates inputs, routes to the crawler or detail fetcher, and converts
//! any failure into a structured JSON payload instead of propagating a crash
//! across the adapter boundary.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::cache::{CacheLayer, CacheStats};
use crate::crawler::SearchCrawler;
use crate::detail::DetailFetcher;
use crate::navigate::Navigator;
use crate::query::TrialQuery;
use crate::record::{TrialDetail, TrialListItem};
use crate::session::BrowserSession;
use crate::{RegistryError, Result};

/// The registry query facade: one browser session, one cache layer, the two
/// operations built on them, and the cache management tools.
///
/// The underlying page is a single exclusive resource; this type drives it
/// strictly sequentially. Embedding applications issuing concurrent logical
/// requests must serialize their calls — concurrent unsynchronized use of
/// one `TrialRegistry` against the live site is unsupported.
pub struct TrialRegistry {
    cache: Arc<CacheLayer>,
    crawler: SearchCrawler,
    fetcher: DetailFetcher,
}

impl TrialRegistry {
    /// Builds the registry facade over a browser session with production
    /// navigation settings and cache TTLs.
    pub fn new(session: Arc<dyn BrowserSession>) -> Self {
        Self::with_parts(session, Navigator::new(), Arc::new(CacheLayer::new()))
    }

    /// Builds the facade with explicit collaborators. Tests inject a zero
    /// delay navigator and short-TTL caches here.
    pub fn with_parts(
        session: Arc<dyn BrowserSession>,
        navigator: Navigator,
        cache: Arc<CacheLayer>,
    ) -> Self {
        let crawler = SearchCrawler::new(
            Arc::clone(&session),
            navigator.clone(),
            Arc::clone(&cache),
        );
        let fetcher = DetailFetcher::new(session, navigator, Arc::clone(&cache));
        Self {
            cache,
            crawler,
            fetcher,
        }
    }

    /// Searches trials by keyword, registration number and/or year.
    ///
    /// At least one filter must be non-empty.
    pub async fn search_trials(
        &self,
        keyword: Option<&str>,
        registration_number: Option<&str>,
        year: Option<u16>,
        max_results: usize,
    ) -> Result<Vec<TrialListItem>> {
        let mut query = TrialQuery::new().with_max_results(max_results);
        if let Some(keyword) = keyword {
            query = query.with_keyword(keyword);
        }
        if let Some(regno) = registration_number {
            query = query.with_registration_number(regno);
        }
        if let Some(year) = year {
            query = query.with_year(year);
        }

        if query.is_empty() {
            return Err(RegistryError::Validation(
                "at least one of keyword, registration_number or year is required".to_string(),
            ));
        }

        self.crawler.search(&query).await
    }

    /// Fetches the full structured record for one registration number.
    pub async fn get_trial_detail(&self, registration_number: &str) -> Result<TrialDetail> {
        if registration_number.trim().is_empty() {
            return Err(RegistryError::Validation(
                "registration_number is required".to_string(),
            ));
        }
        self.fetcher.fetch(registration_number.trim()).await
    }

    /// Counters for the search and detail tiers.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Flushes all three cache tiers and returns a confirmation message.
    pub fn clear_cache(&self) -> &'static str {
        self.cache.clear_all();
        "All caches cleared"
    }

    /// The cache layer, exposed for embedding applications that want to
    /// inspect or pre-warm tiers.
    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }
}

/// Renders any registry error as the structured payload adapters return to
/// their callers in place of a crash.
pub fn error_payload(error: &RegistryError) -> Value {
    json!({ "error": error.to_string() })
}
