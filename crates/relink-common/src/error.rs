use thiserror::Error;

/// Failure reported by a host capability (page control, snapshots, dialogs).
///
/// The `Display` text of these variants is what the failure classifier reads
/// when a capability error bubbles out of an operation, so the element
/// variants keep the driver's phrasing.
#[derive(Debug, Error)]
pub enum BackendError {
    // ============================================================
    // Lifecycle
    // ============================================================
    #[error("Backend not ready")]
    NotReady,

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    // ============================================================
    // Navigation
    // ============================================================
    #[error("Navigation failed: {0}")]
    Navigation(String),

    // ============================================================
    // Element
    // ============================================================
    #[error("Unknown ref: {0}")]
    UnknownRef(String),

    #[error("No element for ref {token}: {reason}")]
    ElementNotFound { token: String, reason: String },

    #[error("strict mode violation: {locator} resolved to {count} elements")]
    Ambiguous { locator: String, count: usize },

    #[error("Element {target} is not interactable: {reason}")]
    ElementNotInteractable { target: String, reason: String },

    #[error("Invalid selector: {selector}")]
    SelectorInvalid { selector: String },

    // ============================================================
    // Execution
    // ============================================================
    #[error("Script execution error: {0}")]
    Script(String),

    #[error("Timeout: {operation}")]
    Timeout { operation: String },

    #[error("Dialog error: {0}")]
    Dialog(String),

    // ============================================================
    // System
    // ============================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("{0}")]
    Other(String),
}
