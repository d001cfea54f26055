//! Post-navigation page inspection: bot-challenge and not-found detection.
//!
//! The registry serves an interactive verification page when it suspects
//! automated access. Solving it is out of scope; the guard detects it from
//! the page title and fails fast, before any extraction is attempted.

use crate::{RegistryError, Result};

/// Title fragments that identify a human-verification challenge.
const CHALLENGE_MARKERS: &[&str] = &["验证", "Verification", "滑动"];

/// Title fragments that identify a missing-trial page (detail flow only).
const NOT_FOUND_MARKERS: &[&str] = &["页面未找到", "404"];

/// Advice attached to a `CaptchaDetected` error.
const REMEDIATION: &str = "The site is serving a verification challenge. \
     Reduce request frequency, rely on cached results, or change network egress \
     (e.g. a different proxy) before retrying.";

/// Fails with `CaptchaDetected` if the page title marks a challenge page.
pub fn check_challenge(title: &str) -> Result<()> {
    if CHALLENGE_MARKERS.iter().any(|m| title.contains(m)) {
        return Err(RegistryError::CaptchaDetected {
            remediation: REMEDIATION.to_string(),
        });
    }
    Ok(())
}

/// Fails with `NotFound` if the page title marks a missing trial.
pub fn check_not_found(title: &str, registration_number: &str) -> Result<()> {
    if NOT_FOUND_MARKERS.iter().any(|m| title.contains(m)) {
        return Err(RegistryError::NotFound(registration_number.to_string()));
    }
    Ok(())
}
