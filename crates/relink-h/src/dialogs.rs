//! JavaScript dialogs of one page, handled per [`DialogPolicy`].

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use futures::StreamExt;
use relink_common::error::BackendError;
use relink_engine::backend::{DialogAction, DialogBuffer, DialogPolicy};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDialog {
    pub kind: String,
    pub message: String,
    pub default_prompt: Option<String>,
}

#[derive(Debug, Default)]
struct DialogState {
    policy: DialogPolicy,
    pending: VecDeque<PendingDialog>,
}

/// Shared between the page's event listener and whoever resolves dialogs.
#[derive(Clone)]
pub struct DialogQueue {
    page: Page,
    state: Arc<Mutex<DialogState>>,
}

impl DialogQueue {
    /// Subscribe to the page's dialog events.
    pub async fn attach(page: &Page, policy: DialogPolicy) -> Result<Self, BackendError> {
        let queue = Self {
            page: page.clone(),
            state: Arc::new(Mutex::new(DialogState {
                policy,
                pending: VecDeque::new(),
            })),
        };

        let mut opening = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(|e| BackendError::Browser(format!("Failed to subscribe to dialog events: {}", e)))?;

        let listener = queue.clone();
        tokio::spawn(async move {
            while let Some(event) = opening.next().await {
                let dialog = PendingDialog {
                    kind: format!("{:?}", event.r#type).to_lowercase(),
                    message: event.message.clone(),
                    default_prompt: event.default_prompt.clone(),
                };
                listener.on_opened(dialog).await;
            }
        });

        Ok(queue)
    }

    async fn on_opened(&self, dialog: PendingDialog) {
        let policy = self.policy();
        tracing::info!(
            "JavaScript {} dialog: {} (policy {:?})",
            dialog.kind,
            dialog.message,
            policy
        );

        let action = match policy {
            DialogPolicy::Accept => DialogAction::Accept,
            DialogPolicy::Dismiss => DialogAction::Dismiss,
            DialogPolicy::Queue => {
                self.lock().pending.push_back(dialog);
                return;
            }
        };

        if let Err(e) = self.handle(action, None).await {
            tracing::error!("Failed to handle dialog: {}", e);
        }
    }

    async fn handle(&self, action: DialogAction, text: Option<&str>) -> Result<(), BackendError> {
        let mut params = HandleJavaScriptDialogParams::new(action == DialogAction::Accept);
        params.prompt_text = text.map(str::to_string);
        self.page
            .execute(params)
            .await
            .map_err(|e| BackendError::Dialog(e.to_string()))?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DialogState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn pending(&self) -> Vec<PendingDialog> {
        self.lock().pending.iter().cloned().collect()
    }
}

#[async_trait]
impl DialogBuffer for DialogQueue {
    async fn has_pending(&self) -> bool {
        !self.lock().pending.is_empty()
    }

    async fn resolve_oldest(
        &self,
        action: DialogAction,
        text: Option<&str>,
    ) -> Result<(), BackendError> {
        let dialog = self
            .lock()
            .pending
            .pop_front()
            .ok_or_else(|| BackendError::Dialog("no pending dialog".to_string()))?;
        tracing::info!("Resolving {} dialog ({:?}): {}", dialog.kind, action, dialog.message);
        let text = text.or(dialog.default_prompt.as_deref());
        self.handle(action, text).await
    }

    fn policy(&self) -> DialogPolicy {
        self.lock().policy
    }

    fn set_policy(&self, policy: DialogPolicy) {
        self.lock().policy = policy;
    }
}
