//! Typed records produced by the HTML extractor.

use serde::{Deserialize, Serialize};

/// One row of the search results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialListItem {
    /// Public registration number (fixed `ChiCTR` prefix + digits).
    pub registration_number: String,
    /// Registry-internal numeric id, extracted from the detail link
    /// (`showproj.html?proj=XXX`).
    pub project_id: String,
    /// Trial title.
    pub title: String,
    /// Study type (e.g. 干预性研究 / interventional).
    pub study_type: String,
    /// Date the trial was registered.
    pub registration_date: String,
    /// Registering institution.
    pub institution: String,
}

/// Best-effort pagination metadata scraped from free-text counters.
///
/// The counters on the site are not authoritative; callers must not rely on
/// these numbers for anything beyond loop hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPagination {
    /// Total matching trials reported by the site.
    #[serde(rename = "totalResults")]
    pub total_results: u32,
    /// Total result pages reported by the site.
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    /// The page the scraped document claims to be.
    #[serde(rename = "currentPage")]
    pub current_page: u32,
}

impl Default for SearchPagination {
    fn default() -> Self {
        Self {
            total_results: 0,
            total_pages: 1,
            current_page: 1,
        }
    }
}

/// Registration metadata section of a trial detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub registration_number: String,
    pub title: String,
    pub title_en: String,
    pub scientific_title: String,
    pub scientific_title_en: String,
    pub registration_status: String,
    pub registration_status_en: String,
    pub registration_date: String,
    pub last_update_date: String,
}

/// Applicant and study-leader contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub applicant: String,
    pub applicant_en: String,
    pub study_leader: String,
    pub study_leader_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_leader_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_leader_email: Option<String>,
    pub applicant_institution: String,
    pub applicant_institution_en: String,
    pub leader_institution: String,
    pub leader_institution_en: String,
}

/// Ethics committee approval section. Present only when the page reports an
/// approval status (the `approved` marker field).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthicsInfo {
    pub approved: String,
    pub committee_name: String,
    pub committee_name_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<String>,
}

/// Disease, design and objectives section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyInfo {
    pub disease: String,
    pub disease_en: String,
    pub study_type: String,
    pub study_type_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_phase_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_design: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_design_en: Option<String>,
    pub objectives: String,
    pub objectives_en: String,
}

/// Sponsor and funding section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorInfo {
    pub primary_sponsor: String,
    pub primary_sponsor_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_source_en: Option<String>,
}

/// Recruitment window section. Present only when the page reports a
/// recruitment status (the marker field).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruitmentInfo {
    pub recruitment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_end_date: Option<String>,
}

/// One intervention group from the 干预措施 table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    pub group: String,
    pub group_en: String,
    pub sample_size: String,
    pub intervention: String,
    pub intervention_en: String,
}

/// Full structured record for a single trial.
///
/// Conditional sections are `None` when their marker field was empty on the
/// page; absence means "unknown", never "false" or "empty".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialDetail {
    pub basic_info: BasicInfo,
    pub contact_info: ContactInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethics_info: Option<EthicsInfo>,
    pub study_info: StudyInfo,
    pub sponsor_info: SponsorInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recruitment_info: Option<RecruitmentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interventions: Option<Vec<Intervention>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclusion_criteria: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclusion_criteria_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion_criteria: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion_criteria_en: Option<String>,
}
