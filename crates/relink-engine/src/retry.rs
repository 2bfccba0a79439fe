//! The retry loop: attempt, classify, recover, rematch, retry.

use crate::backend::{DialogBuffer, ObservabilitySink, PageCapabilities};
use crate::classify::classify;
use crate::recovery::recover;
use crate::rematch::rematch;
use relink_common::failure::{DiagnosticError, ErrorContext, FailureKind};
use relink_common::refs::{ReferenceTable, SnapshotOptions, normalize_ref};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_CONSOLE_ERROR_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub delay: Duration,
    /// How many recent console errors a DiagnosticError carries.
    pub console_error_limit: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
            console_error_limit: DEFAULT_CONSOLE_ERROR_LIMIT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            ..Default::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// The element an operation acts on, remembered by role and name so it can be
/// found again in a fresh table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefTarget {
    pub token: String,
    pub role: String,
    pub name: Option<String>,
}

impl RefTarget {
    pub fn new(token: impl Into<String>, role: impl Into<String>, name: Option<String>) -> Self {
        Self {
            token: token.into(),
            role: role.into(),
            name,
        }
    }

    /// Look a raw token up in `table`. `None` when the table doesn't know it.
    pub fn from_table(raw: &str, table: &ReferenceTable) -> Option<Self> {
        let token = normalize_ref(raw);
        let role_ref = table.get(token)?;
        Some(Self::new(token, role_ref.role.clone(), role_ref.name.clone()))
    }
}

/// Handed to the operation on every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based.
    pub number: u32,
    /// Token to act on this time; `None` when no target was bound.
    pub ref_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome<T> {
    pub result: T,
    pub attempts: u32,
    /// Recovery tags in the order they ran.
    pub recoveries: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Terminal failure, or nothing to recover with. Carries the original error.
    #[error("{error}")]
    Aborted {
        kind: FailureKind,
        error: E,
        attempts: u32,
    },

    #[error("{0}")]
    Exhausted(DiagnosticError),
}

impl<E> RetryError<E> {
    pub fn kind(&self) -> FailureKind {
        match self {
            RetryError::Aborted { kind, .. } => *kind,
            RetryError::Exhausted(diag) => diag.kind,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Aborted { attempts, .. } => *attempts,
            RetryError::Exhausted(diag) => diag.attempts,
        }
    }

    pub fn diagnostic(&self) -> Option<&DiagnosticError> {
        match self {
            RetryError::Exhausted(diag) => Some(diag),
            RetryError::Aborted { .. } => None,
        }
    }
}

/// Runs one operation under the retry policy.
///
/// Capabilities are borrowed; without [`PageCapabilities`] every failure is
/// re-raised after the first attempt since there is nothing to recover with.
/// The orchestrator holds no state between runs.
pub struct RetryOrchestrator<'a> {
    policy: RetryPolicy,
    snapshot_options: SnapshotOptions,
    label: String,
    page: Option<PageCapabilities<'a>>,
    dialogs: Option<&'a dyn DialogBuffer>,
    sink: Option<&'a dyn ObservabilitySink>,
    target: Option<RefTarget>,
}

impl<'a> RetryOrchestrator<'a> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            snapshot_options: SnapshotOptions {
                interactive_only: false,
                max_depth: None,
                compact: true,
            },
            label: "Action".to_string(),
            page: None,
            dialogs: None,
            sink: None,
            target: None,
        }
    }

    pub fn with_page(mut self, page: PageCapabilities<'a>) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_dialogs(mut self, dialogs: &'a dyn DialogBuffer) -> Self {
        self.dialogs = Some(dialogs);
        self
    }

    pub fn with_observability(mut self, sink: &'a dyn ObservabilitySink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_target(mut self, target: RefTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Options used by re-snapshotting recoveries.
    pub fn with_snapshot_options(mut self, options: SnapshotOptions) -> Self {
        self.snapshot_options = options;
        self
    }

    /// Name of the operation, used in the exhaustion message.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        E: Display,
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut pre_action_url = self.current_url().await;
        let mut target = self.target.clone();
        let mut recoveries: Vec<String> = Vec::new();
        let mut not_interactable_count = 0u32;
        let mut number = 0u32;

        loop {
            number += 1;
            let attempt = Attempt {
                number,
                ref_token: target.as_ref().map(|t| t.token.clone()),
            };
            debug!(
                "{} attempt {}/{} (ref: {:?})",
                self.label, number, max_attempts, attempt.ref_token
            );

            let error = match operation(attempt).await {
                Ok(result) => {
                    self.record_outcome(true);
                    if number > 1 {
                        info!(
                            "{} succeeded on attempt {} after {:?}",
                            self.label, number, recoveries
                        );
                    }
                    return Ok(RetryOutcome {
                        result,
                        attempts: number,
                        recoveries,
                    });
                }
                Err(e) => e,
            };

            let message = error.to_string();
            let ctx = ErrorContext {
                has_unhandled_dialog: self.has_pending_dialog().await,
                pre_action_url: pre_action_url.clone(),
                current_url: self.current_url().await,
                not_interactable_count,
            };
            let kind = classify(&message, &ctx);
            debug!("{} attempt {} failed as {}: {}", self.label, number, kind, message);

            if let Some(sink) = self.sink {
                sink.record_attempt(kind);
            }
            if kind.is_blockage() {
                not_interactable_count += 1;
            } else {
                not_interactable_count = 0;
            }

            let Some(page) = self.page.filter(|_| !kind.is_terminal()) else {
                debug!("{} failed fast ({})", self.label, kind);
                self.record_outcome(false);
                return Err(RetryError::Aborted {
                    kind,
                    error,
                    attempts: number,
                });
            };

            if number >= max_attempts {
                let diag = self.diagnostic(kind, &message, number, target.as_ref(), recoveries);
                warn!("{} exhausted after {} attempts ({})", self.label, number, kind);
                self.record_outcome(false);
                return Err(RetryError::Exhausted(diag));
            }

            if let Some(recovery) = recover(kind, page, self.dialogs, self.snapshot_options).await
            {
                recoveries.push(recovery.tag.to_string());

                if let Some(snapshot) = recovery.snapshot
                    && let Some(target) = target.as_mut()
                {
                    match rematch(&snapshot.refs, &target.role, target.name.as_deref()) {
                        Some(token) => {
                            if token != target.token {
                                debug!("ref {} rematched to {}", target.token, token);
                            }
                            target.token = token;
                        }
                        None => debug!(
                            "no match for {} {:?} in fresh snapshot",
                            target.role, target.name
                        ),
                    }
                }

                if kind == FailureKind::NavigationChanged && ctx.current_url.is_some() {
                    pre_action_url = ctx.current_url;
                }
            }

            tokio::time::sleep(self.policy.delay).await;
        }
    }

    fn diagnostic(
        &self,
        kind: FailureKind,
        last_message: &str,
        attempts: u32,
        target: Option<&RefTarget>,
        retry_log: Vec<String>,
    ) -> DiagnosticError {
        let console_errors = self
            .sink
            .map(|sink| sink.recent_console_errors(self.policy.console_error_limit))
            .unwrap_or_default();

        DiagnosticError {
            message: format!(
                "{} failed after {} attempts: {}",
                self.label, attempts, last_message
            ),
            ref_token: target.map(|t| t.token.clone()),
            kind,
            attempts,
            retry_log,
            console_errors,
            suggestion: kind.suggestion().to_string(),
        }
    }

    async fn current_url(&self) -> Option<String> {
        let page = self.page?;
        match page.control.current_url().await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("could not read current URL: {}", e);
                None
            }
        }
    }

    async fn has_pending_dialog(&self) -> bool {
        match self.dialogs {
            Some(dialogs) => dialogs.has_pending().await,
            None => false,
        }
    }

    fn record_outcome(&self, succeeded: bool) {
        if let Some(sink) = self.sink {
            sink.record_outcome(succeeded);
        }
    }
}

/// Run `operation` with no ref binding and no capabilities beyond `page`.
pub async fn with_retry<T, E, F, Fut>(
    policy: RetryPolicy,
    page: Option<PageCapabilities<'_>>,
    mut operation: F,
) -> Result<RetryOutcome<T>, RetryError<E>>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut orchestrator = RetryOrchestrator::new(policy);
    if let Some(page) = page {
        orchestrator = orchestrator.with_page(page);
    }
    orchestrator.run(|_| operation()).await
}
