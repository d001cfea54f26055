//! Error types for registry operations.

use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while querying the registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Every wait condition in the navigation fallback ladder failed.
    #[error("Navigation to {url} failed after {attempts} wait strategies")]
    Navigation {
        /// The URL that could not be loaded.
        url: String,
        /// Number of fallback attempts that were exhausted.
        attempts: usize,
    },

    /// The site served a human-verification challenge instead of content.
    #[error("CAPTCHA challenge detected: {remediation}")]
    CaptchaDetected {
        /// Guidance for the caller on how to recover.
        remediation: String,
    },

    /// The registration number does not resolve to a trial.
    #[error("No trial found for registration number '{0}'")]
    NotFound(String),

    /// A required input was missing or malformed.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Browser session failure (launch, CDP, page access).
    #[error("Browser error: {0}")]
    Browser(String),

    /// The page markup could not be processed at all. Missing structural
    /// markers are NOT this error; they yield empty results.
    #[error("Failed to process page markup: {0}")]
    Extraction(String),

    /// A search aborted at a specific results page.
    #[error("Search failed at page {page}: {source}")]
    SearchFailed {
        /// 1-based index of the page that failed.
        page: u32,
        /// The underlying failure.
        #[source]
        source: Box<RegistryError>,
    },

    /// A detail fetch failed for a specific registration number.
    #[error("Failed to fetch detail for '{registration_number}': {source}")]
    DetailFailed {
        /// The registration number being fetched.
        registration_number: String,
        /// The underlying failure.
        #[source]
        source: Box<RegistryError>,
    },
}

impl RegistryError {
    /// Wraps an error with the search page index it occurred on.
    pub fn at_page(self, page: u32) -> Self {
        RegistryError::SearchFailed {
            page,
            source: Box::new(self),
        }
    }

    /// Wraps an error with the registration number being fetched.
    pub fn for_registration(self, registration_number: impl Into<String>) -> Self {
        RegistryError::DetailFailed {
            registration_number: registration_number.into(),
            source: Box::new(self),
        }
    }
}
