//! Navigation strategy: one page load wrapped in a fallback ladder of wait
//! conditions, realistic headers, and jittered delays.

use std::time::Duration;

use tracing::{debug, warn};

use crate::session::{BrowserSession, WaitUntil};
use crate::{RegistryError, Result};

/// Header set applied before every navigation, mirroring what a desktop
/// Chrome sends to the site.
const EXTRA_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,\
         image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("Accept-Language", "zh-CN,zh;q=0.9"),
    ("Connection", "keep-alive"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    ("Upgrade-Insecure-Requests", "1"),
    (
        "sec-ch-ua",
        "\"Google Chrome\";v=\"141\", \"Not?A_Brand\";v=\"8\", \"Chromium\";v=\"141\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"macOS\""),
];

/// Inclusive jitter window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayWindow {
    /// A zero-width window for deterministic tests.
    pub const ZERO: DelayWindow = DelayWindow { min_ms: 0, max_ms: 0 };
}

/// One rung of the fallback ladder: a wait condition and its timeout.
#[derive(Debug, Clone, Copy)]
pub struct NavigationAttempt {
    pub wait: WaitUntil,
    pub timeout: Duration,
    /// Fixed extra settle time applied after this rung succeeds.
    pub settle: Duration,
}

/// Wraps a single page load in an ordered ladder of decreasingly strict wait
/// conditions. Each rung runs only after the previous one errored; the first
/// success wins; exhausting the ladder is fatal for that page.
#[derive(Debug, Clone)]
pub struct Navigator {
    attempts: Vec<NavigationAttempt>,
    settle_delay: DelayWindow,
    page_delay: DelayWindow,
}

impl Navigator {
    /// The production ladder: network-idle, then full load, then DOM-ready
    /// with a fixed settle period.
    pub fn new() -> Self {
        Self {
            attempts: vec![
                NavigationAttempt {
                    wait: WaitUntil::NetworkIdle,
                    timeout: Duration::from_secs(30),
                    settle: Duration::ZERO,
                },
                NavigationAttempt {
                    wait: WaitUntil::Load,
                    timeout: Duration::from_secs(20),
                    settle: Duration::ZERO,
                },
                NavigationAttempt {
                    wait: WaitUntil::DomReady,
                    timeout: Duration::from_secs(15),
                    settle: Duration::from_secs(2),
                },
            ],
            settle_delay: DelayWindow {
                min_ms: 500,
                max_ms: 1500,
            },
            page_delay: DelayWindow {
                min_ms: 1000,
                max_ms: 3000,
            },
        }
    }

    /// Replaces the ladder. Intended for tests shrinking the timeouts.
    pub fn with_attempts(mut self, attempts: Vec<NavigationAttempt>) -> Self {
        self.attempts = attempts;
        self
    }

    /// Replaces both jitter windows. `DelayWindow::ZERO` makes navigation
    /// deterministic.
    pub fn with_delays(mut self, settle: DelayWindow, page: DelayWindow) -> Self {
        self.settle_delay = settle;
        self.page_delay = page;
        self
    }

    /// Loads `url`, trying each ladder rung in order, then applies the
    /// post-settle jitter.
    pub async fn navigate(&self, session: &dyn BrowserSession, url: &str) -> Result<()> {
        session.set_extra_headers(EXTRA_HEADERS).await?;

        let mut last_error = None;
        for (index, attempt) in self.attempts.iter().enumerate() {
            match session.goto(url, attempt.wait, attempt.timeout).await {
                Ok(()) => {
                    debug!(url, rung = index, wait = ?attempt.wait, "Navigation succeeded");
                    if !attempt.settle.is_zero() {
                        tokio::time::sleep(attempt.settle).await;
                    }
                    session
                        .random_delay(self.settle_delay.min_ms, self.settle_delay.max_ms)
                        .await;
                    return Ok(());
                }
                Err(e) => {
                    warn!(url, rung = index, wait = ?attempt.wait, error = %e,
                        "Navigation attempt failed, falling back");
                    last_error = Some(e);
                }
            }
        }

        debug!(url, error = ?last_error, "All navigation attempts exhausted");
        Err(RegistryError::Navigation {
            url: url.to_string(),
            attempts: self.attempts.len(),
        })
    }

    /// Applies the inter-page jitter. Called between consecutive result-page
    /// fetches, never after the last one.
    pub async fn between_pages(&self, session: &dyn BrowserSession) {
        session
            .random_delay(self.page_delay.min_ms, self.page_delay.max_ms)
            .await;
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}
