//! Failure classification.
//!
//! The boundary with drivers is free text: whatever produced the failure,
//! only its message and the orchestrator's [`ErrorContext`] are inspected.
//! Rules are checked in order and the first match wins.

use regex::Regex;
use relink_common::failure::{ErrorContext, FailureKind};
use std::sync::LazyLock;

/// Consecutive blockages after which a covered element is blamed on an overlay.
pub const OVERLAY_ESCALATION_THRESHOLD: u32 = 2;

static REF_MISSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)unknown ref|ref not found|stale ref|no element (?:found )?for ref")
        .expect("ref pattern")
});

static AMBIGUOUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)strict mode violation|resolved to \d+ elements|matched \d+ elements")
        .expect("ambiguity pattern")
});

static NOT_INTERACTABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)not interactable|not visible|not enabled|is disabled|\bcovered\b|\bobscured\b|intercepts pointer events|outside of the viewport|not clickable",
    )
    .expect("interactability pattern")
});

static TIMEOUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)timeout|timed out").expect("timeout pattern"));

static CAPTCHA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)captcha|human verification|verify (?:that )?you are (?:a )?human|are you a robot|not a robot|bot detection|detected unusual traffic|cloudflare challenge|turnstile",
    )
    .expect("captcha pattern")
});

pub fn classify(message: &str, ctx: &ErrorContext) -> FailureKind {
    if REF_MISSING.is_match(message) {
        if ctx.navigated() {
            return FailureKind::NavigationChanged;
        }
        return FailureKind::StaleRef;
    }

    if AMBIGUOUS.is_match(message) {
        return FailureKind::StrictMode;
    }

    if NOT_INTERACTABLE.is_match(message) {
        if ctx.not_interactable_count >= OVERLAY_ESCALATION_THRESHOLD {
            return FailureKind::OverlayInterference;
        }
        return FailureKind::NotInteractable;
    }

    if TIMEOUT.is_match(message) && ctx.has_unhandled_dialog {
        return FailureKind::DialogBlocking;
    }

    if CAPTCHA.is_match(message) {
        return FailureKind::CaptchaDetected;
    }

    FailureKind::Unknown
}
