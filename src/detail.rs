//! Single-record detail fetching.

use std::sync::Arc;

use tracing::debug;

use crate::cache::CacheLayer;
use crate::extract;
use crate::guard;
use crate::navigate::Navigator;
use crate::query::{derive_project_id, detail_url};
use crate::record::TrialDetail;
use crate::session::BrowserSession;
use crate::Result;

/// Fetches one full trial record by registration number.
///
/// The registry's detail URLs take an internal project id, not the public
/// registration number. The fetcher consults the cross-reference tier first
/// and only falls back to stripping the registration prefix, which is valid
/// only while the two numbering schemes coincide.
pub struct DetailFetcher {
    session: Arc<dyn BrowserSession>,
    navigator: Navigator,
    cache: Arc<CacheLayer>,
}

impl DetailFetcher {
    /// Creates a fetcher over the given collaborators.
    pub fn new(
        session: Arc<dyn BrowserSession>,
        navigator: Navigator,
        cache: Arc<CacheLayer>,
    ) -> Self {
        Self {
            session,
            navigator,
            cache,
        }
    }

    /// Returns the structured record, from the detail tier when fresh.
    ///
    /// Underlying failures are wrapped with the registration number; no
    /// retries are attempted.
    pub async fn fetch(&self, registration_number: &str) -> Result<TrialDetail> {
        if let Some(cached) = self.cache.detail().get(&registration_number.to_string()) {
            debug!(registration_number, "Detail cache hit");
            return Ok(cached);
        }
        debug!(registration_number, "Detail cache miss, fetching");

        self.fetch_uncached(registration_number)
            .await
            .map_err(|e| e.for_registration(registration_number))
    }

    async fn fetch_uncached(&self, registration_number: &str) -> Result<TrialDetail> {
        let project_id = match self.cache.crossref().get(&registration_number.to_string()) {
            Some(id) => {
                debug!(registration_number, project_id = %id, "Cross-reference hit");
                id
            }
            None => derive_project_id(registration_number),
        };

        let url = detail_url(&project_id);
        self.navigator
            .navigate(self.session.as_ref(), url.as_str())
            .await?;

        let title = self.session.title().await?;
        guard::check_challenge(&title)?;
        guard::check_not_found(&title, registration_number)?;

        let html = self.session.content().await?;
        let detail = extract::parse_trial_detail(&html)?;

        self.cache
            .detail()
            .insert(registration_number.to_string(), detail.clone());
        Ok(detail)
    }
}
