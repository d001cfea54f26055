//! # chictr-registry
//!
//! A structured query interface over the ChiCTR clinical trial registry
//! website, which is server-rendered, anti-automation hardened and has no
//! public API.
//!
//! The crate drives one headless browser page through a navigation fallback
//! ladder with bot-challenge detection, turns the site's heterogeneous
//! bilingual tables into typed records with a label-driven extractor, and
//! bounds real network traffic with three TTL cache tiers (search results,
//! detail records, registration-number → project-id cross-reference).
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chictr_registry::{ChromeConfig, ChromeSession, TrialRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Arc::new(ChromeSession::new(ChromeConfig::default()));
//!     let registry = TrialRegistry::new(session.clone());
//!
//!     let trials = registry
//!         .search_trials(Some("KRAS G12C"), None, None, 10)
//!         .await?;
//!     for trial in &trials {
//!         println!("{}: {}", trial.registration_number, trial.title);
//!     }
//!
//!     if let Some(first) = trials.first() {
//!         let detail = registry.get_trial_detail(&first.registration_number).await?;
//!         println!("{:#?}", detail.study_info);
//!     }
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! CAPTCHA challenges are detected and reported, never solved; all cached
//! state is process-local and lost on restart.

mod cache;
mod crawler;
mod detail;
mod error;
mod extract;
mod guard;
mod navigate;
mod query;
mod record;
mod service;
mod session;

#[cfg(feature = "headless")]
mod browser;

pub use cache::{CacheLayer, CacheStats, TierStats, TtlCache};
pub use crawler::{SearchCrawler, MAX_PAGES};
pub use detail::DetailFetcher;
pub use error::{RegistryError, Result};
pub use extract::{parse_search_results, parse_trial_detail};
pub use navigate::{DelayWindow, NavigationAttempt, Navigator};
pub use query::{derive_project_id, detail_url, TrialQuery, REGISTRATION_PREFIX};
pub use record::{
    BasicInfo, ContactInfo, EthicsInfo, Intervention, RecruitmentInfo, SearchPagination,
    SponsorInfo, StudyInfo, TrialDetail, TrialListItem,
};
pub use service::{error_payload, TrialRegistry};
pub use session::{BrowserSession, WaitUntil};

#[cfg(feature = "headless")]
pub use browser::{detect_chrome, ChromeConfig, ChromeSession};
