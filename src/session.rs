//! Browser session abstraction: the seam between the crawl pipeline and the
//! real headless browser.
//!
//! The whole pipeline drives exactly one page through this trait, so tests
//! substitute a scripted implementation and production uses
//! [`ChromeSession`](crate::browser::ChromeSession).

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Page-load completion condition for a single navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Network activity has settled.
    NetworkIdle,
    /// The window load event fired.
    Load,
    /// The DOM is parsed (DOMContentLoaded).
    DomReady,
}

/// A single browser page the pipeline navigates sequentially.
///
/// Exactly one navigation may be in flight at a time; callers issue the next
/// `goto` only after the previous call fully completed. Implementations are
/// not required to enforce this.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigates the page and waits for the given completion condition,
    /// failing once `timeout` elapses.
    async fn goto(&self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<()>;

    /// Applies extra HTTP headers to all subsequent requests.
    async fn set_extra_headers(&self, headers: &[(&str, &str)]) -> Result<()>;

    /// Returns the current page's HTML.
    async fn content(&self) -> Result<String>;

    /// Returns the current page's title.
    async fn title(&self) -> Result<String>;

    /// Sleeps for a uniformly random duration from `[min_ms, max_ms]`.
    ///
    /// Lives on the session so deterministic test sessions can make it a
    /// no-op while the production session jitters.
    async fn random_delay(&self, min_ms: u64, max_ms: u64);
}
