//! Chromium-backed browser session.
//!
//! This module is only available when the `headless` Cargo feature is
//! enabled. It drives a single page in a single Chrome/Chromium process via
//! the Chrome DevTools Protocol, the way the registry's server-rendered pages
//! require.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::session::{BrowserSession, WaitUntil};
use crate::{RegistryError, Result};

/// Desktop user-agent presented to the registry. Chrome's headless mode
/// injects "HeadlessChrome" into the default UA, which the site blocks.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

/// Well-known Chrome/Chromium executable paths per platform.
#[cfg(target_os = "macos")]
const KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(all(unix, not(target_os = "macos")))]
const KNOWN_PATHS: &[&str] = &[
    "/opt/google/chrome/chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

#[cfg(windows)]
const KNOWN_PATHS: &[&str] = &[];

/// Well-known command names to search in PATH.
const KNOWN_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Locates an installed Chrome/Chromium executable.
pub fn detect_chrome() -> Option<PathBuf> {
    for path in KNOWN_PATHS {
        let candidate = PathBuf::from(path);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    for command in KNOWN_COMMANDS {
        if let Ok(path) = which::which(command) {
            return Some(path);
        }
    }
    None
}

/// Configuration for the Chrome session.
#[derive(Debug, Clone)]
pub struct ChromeConfig {
    /// Whether to run the browser headless.
    pub headless: bool,
    /// Path to the Chrome/Chromium executable. If `None`, auto-detected.
    pub chrome_path: Option<String>,
    /// Proxy URL. Falls back to `HTTP_PROXY`/`HTTPS_PROXY` when unset.
    pub proxy_url: Option<String>,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            proxy_url: None,
        }
    }
}

struct SessionState {
    browser: Browser,
    page: Page,
}

/// A single-page Chrome session implementing [`BrowserSession`].
///
/// The browser is lazily launched on first use; `initialize()` is idempotent.
/// All navigations go through the one shared page, strictly sequentially.
pub struct ChromeSession {
    config: ChromeConfig,
    state: Mutex<Option<SessionState>>,
}

impl ChromeSession {
    /// Creates an unlaunched session with the given configuration.
    pub fn new(config: ChromeConfig) -> Self {
        Self {
            config,
            state: Mutex::new(None),
        }
    }

    /// Launches the browser and opens the single page. Calling this again
    /// after a successful launch is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        debug!("Launching headless browser");

        let mut builder = BrowserConfig::builder();
        if self.config.headless {
            builder = builder.arg("--headless=new");
        }

        let chrome_path = match &self.config.chrome_path {
            Some(path) => PathBuf::from(path),
            None => detect_chrome().ok_or_else(|| {
                RegistryError::Browser(
                    "No Chrome/Chromium installation found; set chrome_path".to_string(),
                )
            })?,
        };
        builder = builder.chrome_executable(chrome_path);

        builder = builder
            .arg(format!("--user-agent={}", USER_AGENT))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-default-apps")
            .arg("--disable-sync")
            .arg("--mute-audio")
            .arg("--no-first-run");

        let proxy = self
            .config
            .proxy_url
            .clone()
            .or_else(|| std::env::var("HTTP_PROXY").ok())
            .or_else(|| std::env::var("HTTPS_PROXY").ok());
        if let Some(proxy) = proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        let browser_config = builder.build().map_err(|e| {
            RegistryError::Browser(format!("Failed to build browser config: {}", e))
        })?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| RegistryError::Browser(format!("Failed to launch browser: {}", e)))?;

        // Drive the CDP event stream in the background.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser CDP handler error: {}", e);
                }
            }
            debug!("Browser CDP handler exited");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RegistryError::Browser(format!("Failed to open page: {}", e)))?;

        *guard = Some(SessionState { browser, page });
        Ok(())
    }

    /// Closes the page and shuts the browser process down.
    pub async fn close(&self) {
        let mut guard = self.state.lock().await;
        if let Some(mut state) = guard.take() {
            if let Err(e) = state.page.close().await {
                warn!("Failed to close page: {}", e);
            }
            if let Err(e) = state.browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            debug!("Browser session closed");
        }
    }

    async fn with_page<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Page) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        self.initialize().await?;
        let guard = self.state.lock().await;
        let page = guard
            .as_ref()
            .map(|state| state.page.clone())
            .ok_or_else(|| RegistryError::Browser("Session not initialized".to_string()))?;
        drop(guard);
        f(page).await
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<()> {
        let url = url.to_string();
        self.with_page(|page| async move {
            let navigation = async {
                page.goto(url.as_str())
                    .await
                    .map_err(|e| RegistryError::Browser(format!("Navigation failed: {}", e)))?;
                match wait {
                    WaitUntil::DomReady => {}
                    WaitUntil::Load => {
                        page.wait_for_navigation().await.map_err(|e| {
                            RegistryError::Browser(format!("Load wait failed: {}", e))
                        })?;
                    }
                    WaitUntil::NetworkIdle => {
                        page.wait_for_navigation().await.map_err(|e| {
                            RegistryError::Browser(format!("Load wait failed: {}", e))
                        })?;
                        // CDP has no first-class network-idle signal; a short
                        // quiet period after load approximates it.
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                }
                Ok(())
            };

            match tokio::time::timeout(timeout, navigation).await {
                Ok(result) => result,
                Err(_) => Err(RegistryError::Browser(format!(
                    "Navigation timed out after {:?}",
                    timeout
                ))),
            }
        })
        .await
    }

    async fn set_extra_headers(&self, headers: &[(&str, &str)]) -> Result<()> {
        let mut map = serde_json::Map::new();
        for (name, value) in headers {
            map.insert(
                (*name).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
        let params = SetExtraHttpHeadersParams::new(Headers::new(serde_json::Value::Object(map)));
        self.with_page(|page| async move {
            page.execute(params)
                .await
                .map_err(|e| RegistryError::Browser(format!("Failed to set headers: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn content(&self) -> Result<String> {
        self.with_page(|page| async move {
            page.content()
                .await
                .map_err(|e| RegistryError::Browser(format!("Failed to get page content: {}", e)))
        })
        .await
    }

    async fn title(&self) -> Result<String> {
        self.with_page(|page| async move {
            let title = page
                .get_title()
                .await
                .map_err(|e| RegistryError::Browser(format!("Failed to get page title: {}", e)))?;
            Ok(title.unwrap_or_default())
        })
        .await
    }

    async fn random_delay(&self, min_ms: u64, max_ms: u64) {
        let delay = {
            let mut rng = rand::thread_rng();
            rng.gen_range(min_ms..=max_ms.max(min_ms))
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}
