//! End-to-end pipeline tests over a scripted browser session.
//!
//! These run fully offline: the session serves canned registry pages and
//! records every navigation, so cache behavior, guard ordering and URL
//! construction are all observable without touching the live site.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chictr_registry::{
    BrowserSession, CacheLayer, DelayWindow, Navigator, RegistryError, Result, TrialRegistry,
    WaitUntil,
};

const SEARCH_PAGE: &str = r#"
    <html><body>
    <div id="data-total">共检索到 3 条记录</div>
    <table class="table1">
        <tr><th>#</th><th>注册号</th><th>题目</th><th>类型</th><th>日期</th></tr>
        <tr><td>1</td><td>ChiCTR2400084905</td>
            <td><a class="tit1" href="showproj.html?proj=2400084905"
                   title="KRAS G12C抑制剂一线治疗研究">t</a><p>甲医院</p></td>
            <td>干预性研究</td><td>2024-05-27</td></tr>
        <tr><td>2</td><td>ChiCTR2400084906</td>
            <td><a class="tit1" href="showproj.html?proj=2400084906"
                   title="KRAS突变胰腺癌观察研究">t</a><p>乙医院</p></td>
            <td>观察性研究</td><td>2024-05-28</td></tr>
        <tr><td>3</td><td>ChiCTR2400084907</td>
            <td><a class="tit1" href="showproj.html?proj=2400084907"
                   title="KRAS G12D靶向治疗研究">t</a><p>丙医院</p></td>
            <td>干预性研究</td><td>2024-05-29</td></tr>
    </table>
    <div class="pagination">共 1 页 第 1 页</div>
    </body></html>
"#;

const DETAIL_PAGE: &str = r#"
    <html><body><table>
    <tr><td class="left_title"><p class="cn">注册号：</p><p class="en">Registration number：</p></td>
        <td>ChiCTR2400084905</td></tr>
    <tr><td class="left_title"><p class="cn">注册题目：</p><p class="en">Public title：</p></td>
        <td>KRAS G12C抑制剂一线治疗研究</td></tr>
    <tr><td class="left_title"><p class="cn">研究疾病：</p><p class="en">Target disease：</p></td>
        <td>胰腺癌</td></tr>
    </table></body></html>
"#;

/// Routes by URL: search pages for the search endpoint, detail pages for the
/// detail endpoint. Optionally serves a challenge title for everything.
struct SiteSession {
    navigations: AtomicUsize,
    visited: Mutex<Vec<String>>,
    challenge: bool,
}

impl SiteSession {
    fn new() -> Self {
        Self {
            navigations: AtomicUsize::new(0),
            visited: Mutex::new(Vec::new()),
            challenge: false,
        }
    }

    fn challenging() -> Self {
        Self {
            challenge: true,
            ..Self::new()
        }
    }

    fn navigation_count(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    fn last_url(&self) -> String {
        self.visited.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn serving_detail(&self) -> bool {
        self.last_url().contains("showproj")
    }
}

#[async_trait]
impl BrowserSession for SiteSession {
    async fn goto(&self, url: &str, _wait: WaitUntil, _timeout: Duration) -> Result<()> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn set_extra_headers(&self, _headers: &[(&str, &str)]) -> Result<()> {
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        Ok(if self.serving_detail() {
            DETAIL_PAGE.to_string()
        } else {
            SEARCH_PAGE.to_string()
        })
    }

    async fn title(&self) -> Result<String> {
        Ok(if self.challenge {
            "安全验证".to_string()
        } else if self.serving_detail() {
            "试验详情".to_string()
        } else {
            "中国临床试验注册中心 - 检索".to_string()
        })
    }

    async fn random_delay(&self, _min_ms: u64, _max_ms: u64) {}
}

fn registry_over(session: Arc<SiteSession>, cache: Arc<CacheLayer>) -> TrialRegistry {
    let navigator = Navigator::new().with_delays(DelayWindow::ZERO, DelayWindow::ZERO);
    TrialRegistry::with_parts(session, navigator, cache)
}

fn default_registry(session: Arc<SiteSession>) -> TrialRegistry {
    registry_over(session, Arc::new(CacheLayer::new()))
}

#[tokio::test]
async fn scenario_a_single_page_keyword_search() {
    let session = Arc::new(SiteSession::new());
    let registry = default_registry(Arc::clone(&session));

    let trials = registry
        .search_trials(Some("KRAS"), None, None, 10)
        .await
        .unwrap();

    assert_eq!(trials.len(), 3);
    assert_eq!(trials[0].registration_number, "ChiCTR2400084905");
    assert_eq!(trials[0].project_id, "2400084905");
    assert_eq!(trials[0].title, "KRAS G12C抑制剂一线治疗研究");
    // Page 1 of 1: the loop must terminate after one navigation.
    assert_eq!(session.navigation_count(), 1);
}

#[tokio::test]
async fn scenario_b_detail_uses_derived_id_when_crossref_empty() {
    let session = Arc::new(SiteSession::new());
    let registry = default_registry(Arc::clone(&session));

    let detail = registry.get_trial_detail("ChiCTR2400084905").await.unwrap();

    assert!(session.last_url().ends_with("proj=2400084905"));
    assert_eq!(detail.basic_info.registration_number, "ChiCTR2400084905");
    assert_eq!(detail.study_info.disease, "胰腺癌");
}

#[tokio::test]
async fn scenario_c_clear_cache_resets_all_tiers() {
    let session = Arc::new(SiteSession::new());
    let registry = default_registry(Arc::clone(&session));

    registry
        .search_trials(Some("KRAS"), None, None, 10)
        .await
        .unwrap();
    registry.get_trial_detail("ChiCTR2400084905").await.unwrap();

    let (search_keys, detail_keys, crossref_keys) = registry.cache().tier_keys();
    assert_eq!(search_keys, 1);
    assert_eq!(detail_keys, 1);
    assert_eq!(crossref_keys, 3);

    assert_eq!(registry.clear_cache(), "All caches cleared");
    assert_eq!(registry.cache().tier_keys(), (0, 0, 0));
    assert_eq!(registry.cache_stats().search.keys, 0);
    assert_eq!(registry.cache_stats().detail.keys, 0);
}

#[tokio::test]
async fn identical_search_within_ttl_navigates_once() {
    let session = Arc::new(SiteSession::new());
    let registry = default_registry(Arc::clone(&session));

    let first = registry
        .search_trials(Some("KRAS"), None, None, 10)
        .await
        .unwrap();
    let second = registry
        .search_trials(Some("KRAS"), None, None, 10)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(session.navigation_count(), 1);
    assert_eq!(registry.cache_stats().search.hits, 1);
}

#[tokio::test]
async fn expired_search_navigates_again() {
    let session = Arc::new(SiteSession::new());
    let cache = Arc::new(CacheLayer::with_ttls(
        Duration::from_millis(40),
        Duration::from_secs(600),
        Duration::from_secs(600),
    ));
    let registry = registry_over(Arc::clone(&session), cache);

    registry
        .search_trials(Some("KRAS"), None, None, 10)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    registry
        .search_trials(Some("KRAS"), None, None, 10)
        .await
        .unwrap();

    assert_eq!(session.navigation_count(), 2);
}

#[tokio::test]
async fn captcha_fails_before_extraction_with_no_partial_results() {
    let session = Arc::new(SiteSession::challenging());
    let registry = default_registry(Arc::clone(&session));

    let err = registry
        .search_trials(Some("KRAS"), None, None, 10)
        .await
        .unwrap_err();
    match err {
        RegistryError::SearchFailed { page, source } => {
            assert_eq!(page, 1);
            assert!(matches!(*source, RegistryError::CaptchaDetected { .. }));
        }
        other => panic!("Expected SearchFailed, got {:?}", other),
    }
    // Nothing cached, nothing returned.
    assert_eq!(registry.cache().tier_keys(), (0, 0, 0));

    let err = registry.get_trial_detail("ChiCTR2400084905").await.unwrap_err();
    match err {
        RegistryError::DetailFailed { source, .. } => {
            assert!(matches!(*source, RegistryError::CaptchaDetected { .. }));
        }
        other => panic!("Expected DetailFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn crossref_hit_beats_derived_fallback() {
    let session = Arc::new(SiteSession::new());
    let registry = default_registry(Arc::clone(&session));

    // Disagreeing cross-reference entry must win over prefix stripping.
    registry
        .cache()
        .crossref()
        .insert("ChiCTR2400084905".to_string(), "99999".to_string());

    registry.get_trial_detail("ChiCTR2400084905").await.unwrap();
    assert!(session.last_url().ends_with("proj=99999"));
}

#[tokio::test]
async fn search_then_detail_reuses_crawled_crossref() {
    let session = Arc::new(SiteSession::new());
    let registry = default_registry(Arc::clone(&session));

    registry
        .search_trials(Some("KRAS"), None, None, 10)
        .await
        .unwrap();

    // The crawl recorded ChiCTR2400084906 → 2400084906; the detail fetch
    // must resolve through the cross-reference tier.
    registry.get_trial_detail("ChiCTR2400084906").await.unwrap();
    assert!(session.last_url().ends_with("proj=2400084906"));
}

#[tokio::test]
async fn validation_error_payload_is_structured() {
    let session = Arc::new(SiteSession::new());
    let registry = default_registry(Arc::clone(&session));

    let err = registry.search_trials(None, None, None, 10).await.unwrap_err();
    let payload = chictr_registry::error_payload(&err);
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .contains("at least one of keyword"));
    assert_eq!(session.navigation_count(), 0);
}
