//! Capabilities the host hands to the self-healing layer.
//!
//! The engine never talks to a browser directly. Every driver interaction a
//! recovery strategy or the orchestrator needs goes through one of these
//! traits, so any automation driver can sit behind them.

use async_trait::async_trait;
pub use relink_common::error::BackendError;
use relink_common::failure::FailureKind;
use relink_common::refs::{Snapshot, SnapshotOptions};
use serde::{Deserialize, Serialize};

/// Opaque host-side identifier of a located element (a remote object id,
/// a WebDriver element id, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Low-level page control used by recovery strategies.
#[async_trait]
pub trait PageControl: Send + Sync {
    /// URL of the page currently loaded.
    async fn current_url(&self) -> Result<String, BackendError>;

    /// Scroll the viewport by the given pixel deltas.
    async fn scroll(&self, dx: i64, dy: i64) -> Result<(), BackendError>;

    /// Press a single named key (e.g. `Escape`).
    async fn press_key(&self, key: &str) -> Result<(), BackendError>;

    /// First element matching a CSS selector, if any.
    async fn locate_by_selector(&self, css: &str) -> Result<Option<ElementHandle>, BackendError>;

    /// First descendant of `scope` matching a CSS selector, if any.
    async fn locate_within(
        &self,
        scope: &ElementHandle,
        css: &str,
    ) -> Result<Option<ElementHandle>, BackendError>;

    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool, BackendError>;

    async fn click(&self, handle: &ElementHandle) -> Result<(), BackendError>;
}

/// The host's way of taking a compacted, ref-annotated snapshot of a live page.
///
/// Implementations are expected to store the returned table as the page's
/// current table, replacing the previous one.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn take_snapshot(&self, options: &SnapshotOptions) -> Result<Snapshot, BackendError>;
}

/// What to do with a JavaScript dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogAction {
    Accept,
    Dismiss,
}

/// How a host handles dialogs as they open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogPolicy {
    Accept,
    Dismiss,
    /// Keep dialogs pending until someone resolves them explicitly.
    #[default]
    Queue,
}

/// Pending JavaScript dialogs of a page.
#[async_trait]
pub trait DialogBuffer: Send + Sync {
    async fn has_pending(&self) -> bool;

    /// Resolve the oldest pending dialog. `text` is used for prompts.
    async fn resolve_oldest(
        &self,
        action: DialogAction,
        text: Option<&str>,
    ) -> Result<(), BackendError>;

    fn policy(&self) -> DialogPolicy;

    fn set_policy(&self, policy: DialogPolicy);
}

/// Console buffer (read) and retry statistics (write).
///
/// Statistics are write-only from the engine's point of view; nothing read
/// back from a sink ever influences classification or recovery.
pub trait ObservabilitySink: Send + Sync {
    /// Most recent console error texts, oldest first, at most `limit`.
    fn recent_console_errors(&self, limit: usize) -> Vec<String>;

    fn record_attempt(&self, kind: FailureKind);

    fn record_outcome(&self, succeeded: bool);
}

/// Page control and snapshots always travel together: recovery needs both.
#[derive(Clone, Copy)]
pub struct PageCapabilities<'a> {
    pub control: &'a dyn PageControl,
    pub snapshots: &'a dyn SnapshotSource,
}

impl<'a> PageCapabilities<'a> {
    pub fn new(control: &'a dyn PageControl, snapshots: &'a dyn SnapshotSource) -> Self {
        Self { control, snapshots }
    }
}
