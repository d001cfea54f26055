//! Search query representation and the registry's URL grammar.
//!
//! The site has no API; it is driven through two fixed endpoints. The search
//! endpoint expects its complete form parameter set on every request, with
//! unused fields sent empty. That grammar is reproduced here exactly and
//! nowhere else.

use url::Url;

/// Search endpoint of the registry.
pub const SEARCH_ENDPOINT: &str = "https://www.chictr.org.cn/searchproj.html";

/// Detail endpoint of the registry.
pub const DETAIL_ENDPOINT: &str = "https://www.chictr.org.cn/showproj.html";

/// Fixed textual prefix of every public registration number.
pub const REGISTRATION_PREFIX: &str = "ChiCTR";

/// A search against the registry.
///
/// At least one of `keyword`, `registration_number` or `year` must be set;
/// the dispatcher validates this before any navigation happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrialQuery {
    /// Free-text keyword matched against the trial title.
    pub keyword: Option<String>,
    /// Exact public registration number.
    pub registration_number: Option<String>,
    /// Registration (creation) year.
    pub year: Option<u16>,
    /// Maximum number of rows to return.
    pub max_results: usize,
}

impl TrialQuery {
    /// Creates an empty query with the default result cap of 10.
    pub fn new() -> Self {
        Self {
            keyword: None,
            registration_number: None,
            year: None,
            max_results: 10,
        }
    }

    /// Sets the title keyword.
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Sets the registration number filter.
    pub fn with_registration_number(mut self, regno: impl Into<String>) -> Self {
        self.registration_number = Some(regno.into());
        self
    }

    /// Sets the creation year filter.
    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    /// Sets the result cap.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// True when no filter field is set.
    pub fn is_empty(&self) -> bool {
        self.keyword.as_deref().map_or(true, str::is_empty)
            && self
                .registration_number
                .as_deref()
                .map_or(true, str::is_empty)
            && self.year.is_none()
    }

    /// Builds the search URL for the given 1-based page index.
    ///
    /// Every parameter the form posts is present, unused ones empty; the
    /// site rejects requests with a reduced parameter set.
    pub fn search_url(&self, page: u32) -> Url {
        let year = self.year.map(|y| y.to_string()).unwrap_or_default();
        let params: [(&str, &str); 33] = [
            ("title", self.keyword.as_deref().unwrap_or("")),
            ("officialname", ""),
            ("subjectid", ""),
            ("regstatus", ""),
            ("regno", self.registration_number.as_deref().unwrap_or("")),
            ("secondaryid", ""),
            ("applier", ""),
            ("studyleader", ""),
            ("createyear", &year),
            ("sponsor", ""),
            ("secsponsor", ""),
            ("sourceofspends", ""),
            ("studyailment", ""),
            ("studyailmentcode", ""),
            ("studytype", ""),
            ("studystage", ""),
            ("studydesign", ""),
            ("recruitmentstatus", ""),
            ("gender", ""),
            ("agreetosign", ""),
            ("measure", ""),
            ("country", ""),
            ("province", ""),
            ("city", ""),
            ("institution", ""),
            ("institutionlevel", ""),
            ("intercode", ""),
            ("ethicalcommitteesanction", ""),
            ("whetherpublic", ""),
            ("minstudyexecutetime", ""),
            ("maxstudyexecutetime", ""),
            ("btngo", "btn"),
            ("page", ""),
        ];

        let page_str = page.to_string();
        let mut url = Url::parse(SEARCH_ENDPOINT).expect("search endpoint is a valid URL");
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params.iter().take(params.len() - 1) {
                pairs.append_pair(name, value);
            }
            pairs.append_pair("page", &page_str);
        }
        url
    }
}

impl Default for TrialQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the detail URL for a registry-internal project id.
pub fn detail_url(project_id: &str) -> Url {
    let mut url = Url::parse(DETAIL_ENDPOINT).expect("detail endpoint is a valid URL");
    url.query_pairs_mut().append_pair("proj", project_id);
    url
}

/// Derives the internal project id from a registration number by stripping
/// the fixed prefix. Heuristic fallback only: the two numbering schemes
/// coincide for current registrations but are not guaranteed to.
pub fn derive_project_id(registration_number: &str) -> String {
    registration_number
        .strip_prefix(REGISTRATION_PREFIX)
        .unwrap_or(registration_number)
        .to_string()
}
