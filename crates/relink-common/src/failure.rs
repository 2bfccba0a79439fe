use serde::{Deserialize, Serialize};
use crate::formatter::format_diagnostic;
use std::fmt;

/// Why an element operation failed.
///
/// Variants are declared in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NavigationChanged,
    StaleRef,
    StrictMode,
    NotInteractable,
    OverlayInterference,
    DialogBlocking,
    CaptchaDetected,
    Unknown,
}

impl FailureKind {
    pub const ALL: [FailureKind; 8] = [
        FailureKind::NavigationChanged,
        FailureKind::StaleRef,
        FailureKind::StrictMode,
        FailureKind::NotInteractable,
        FailureKind::OverlayInterference,
        FailureKind::DialogBlocking,
        FailureKind::CaptchaDetected,
        FailureKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::StaleRef => "stale_ref",
            FailureKind::NotInteractable => "not_interactable",
            FailureKind::StrictMode => "strict_mode",
            FailureKind::DialogBlocking => "dialog_blocking",
            FailureKind::NavigationChanged => "navigation_changed",
            FailureKind::OverlayInterference => "overlay_interference",
            FailureKind::CaptchaDetected => "captcha_detected",
            FailureKind::Unknown => "unknown",
        }
    }

    /// No automated remedy exists; the orchestrator re-raises immediately.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FailureKind::Unknown | FailureKind::CaptchaDetected)
    }

    /// Whether a failure of this kind counts towards overlay escalation.
    pub fn is_blockage(&self) -> bool {
        matches!(
            self,
            FailureKind::NotInteractable | FailureKind::OverlayInterference
        )
    }

    /// Human-actionable next step shown in a [`DiagnosticError`].
    pub fn suggestion(&self) -> &'static str {
        match self {
            FailureKind::StaleRef => {
                "The page changed since the last snapshot. Run a new snapshot to get fresh element refs."
            }
            FailureKind::StrictMode => {
                "Several elements match this ref. Run a new snapshot and pick a more specific ref."
            }
            FailureKind::NotInteractable => {
                "The element is hidden, disabled or off-screen. Scroll it into view or wait for it to become enabled."
            }
            FailureKind::DialogBlocking => {
                "A JavaScript dialog is blocking the page. Accept or dismiss it before continuing."
            }
            FailureKind::NavigationChanged => {
                "The page navigated to a new URL. Run a new snapshot of the new page before using refs."
            }
            FailureKind::OverlayInterference => {
                "An overlay (modal, cookie banner) is covering the page. Dismiss it and retry."
            }
            FailureKind::CaptchaDetected => {
                "CAPTCHA or bot verification detected. Manual intervention required."
            }
            FailureKind::Unknown => {
                "Check the error and console output, then run a new snapshot before retrying."
            }
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signals gathered after a failed attempt, consumed by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub has_unhandled_dialog: bool,
    pub pre_action_url: Option<String>,
    pub current_url: Option<String>,
    pub not_interactable_count: u32,
}

impl ErrorContext {
    /// True only when both URLs are known and differ.
    pub fn navigated(&self) -> bool {
        match (&self.pre_action_url, &self.current_url) {
            (Some(before), Some(after)) => before != after,
            _ => false,
        }
    }
}

/// Structured failure surfaced to the agent once self-healing gives up.
///
/// Displays as the full multi-line text of [`format_diagnostic`], so printing
/// the error alone carries the kind, recoveries, console errors and suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticError {
    pub message: String,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_token: Option<String>,
    pub kind: FailureKind,
    pub attempts: u32,
    pub retry_log: Vec<String>,
    pub console_errors: Vec<String>,
    pub suggestion: String,
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_diagnostic(self))
    }
}

impl std::error::Error for DiagnosticError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_kinds() {
        let terminal: Vec<_> = FailureKind::ALL
            .iter()
            .filter(|k| k.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![&FailureKind::CaptchaDetected, &FailureKind::Unknown]
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::OverlayInterference).unwrap();
        assert_eq!(json, "\"overlay_interference\"");
        assert_eq!(FailureKind::StaleRef.to_string(), "stale_ref");
    }

    #[test]
    fn navigation_requires_both_urls() {
        let mut ctx = ErrorContext {
            pre_action_url: Some("https://a.test/".into()),
            ..Default::default()
        };
        assert!(!ctx.navigated());
        ctx.current_url = Some("https://a.test/".into());
        assert!(!ctx.navigated());
        ctx.current_url = Some("https://b.test/".into());
        assert!(ctx.navigated());
    }

    #[test]
    fn diagnostic_error_uses_ref_field_name() {
        let err = DiagnosticError {
            message: "click failed".into(),
            ref_token: Some("e3".into()),
            kind: FailureKind::StaleRef,
            attempts: 2,
            retry_log: vec!["resnap".into()],
            console_errors: vec![],
            suggestion: FailureKind::StaleRef.suggestion().into(),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["ref"], "e3");
        assert_eq!(value["kind"], "stale_ref");
    }

    #[test]
    fn diagnostic_error_displays_agent_text() {
        let err = DiagnosticError {
            message: "m".into(),
            ref_token: None,
            kind: FailureKind::NotInteractable,
            attempts: 3,
            retry_log: vec!["scroll-dismiss".into(), "scroll-dismiss".into()],
            console_errors: vec!["ReferenceError: cart is not defined".into()],
            suggestion: FailureKind::NotInteractable.suggestion().into(),
        };
        let text = err.to_string();
        assert!(text.starts_with("Error: m\n"));
        assert!(text.contains("# kind: not_interactable\n"));
        assert!(text.contains("# recoveries: scroll-dismiss, scroll-dismiss\n"));
        assert!(text.contains("#   ReferenceError: cart is not defined\n"));
        assert!(text.contains(&format!("Suggestion: {}", err.suggestion)));
    }
}
