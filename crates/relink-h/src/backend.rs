use crate::ax_dump::{AxTree, DumpNode, candidates, render_dump};
use crate::cdp::CdpClient;
use crate::dialogs::DialogQueue;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::accessibility::GetFullAxTreeParams;
use chromiumoxide::cdp::browser_protocol::dom::{BackendNodeId, ResolveNodeParams};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::js_protocol::runtime::{CallFunctionOnParams, EvaluateParams, RemoteObjectId};
use relink_common::error::BackendError;
use relink_common::formatter::format_ref_table;
use relink_common::refs::{ReferenceTable, Snapshot, SnapshotOptions, normalize_ref};
use relink_engine::backend::{
    DialogPolicy, ElementHandle, PageCapabilities, PageControl, SnapshotSource,
};
use relink_engine::config::RelinkConfig;
use relink_engine::locator::{Locator, resolve};
use relink_engine::observability::InMemoryObservability;
use relink_engine::retry::{RefTarget, RetryError, RetryOrchestrator, RetryOutcome, RetryPolicy};
use relink_engine::formatter::format_snapshot_stats;
use relink_engine::snapshot::{compact_snapshot, snapshot_stats};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const VISIBLE_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
}"#;

/// Scrolls the element into view, then clicks it unless something is in the
/// way. Returns `"ok"` or the reason the click was refused.
const CLICK_JS: &str = r#"function() {
    this.scrollIntoView({ block: 'center', inline: 'center' });
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    if (rect.width === 0 || rect.height === 0 || style.visibility === 'hidden') {
        return 'element is not visible';
    }
    if (this.disabled) {
        return 'element is disabled';
    }
    const x = rect.left + rect.width / 2;
    const y = rect.top + rect.height / 2;
    const top = document.elementFromPoint(x, y);
    if (top && top !== this && !this.contains(top)) {
        const desc = top.tagName.toLowerCase()
            + (top.id ? '#' + top.id : '')
            + (typeof top.className === 'string' && top.className ? '.' + top.className.split(' ')[0] : '');
        return '<' + desc + '> intercepts pointer events';
    }
    this.click();
    return 'ok';
}"#;

/// One Chromium tab with the self-healing capabilities attached.
pub struct HeadlessPage {
    client: CdpClient,
    table: Mutex<ReferenceTable>,
    last_options: Mutex<Option<SnapshotOptions>>,
    dialogs: DialogQueue,
    observability: Arc<InMemoryObservability>,
    config: RelinkConfig,
}

impl HeadlessPage {
    pub async fn launch(visible: bool, config: RelinkConfig) -> Result<Self, BackendError> {
        info!("Launching headless page (Chromium)...");
        let client = CdpClient::launch(visible).await?;
        let observability = Arc::new(InMemoryObservability::default());
        client.capture_console(observability.clone()).await?;
        let dialogs = DialogQueue::attach(&client.page, DialogPolicy::Queue).await?;

        Ok(Self {
            client,
            table: Mutex::new(ReferenceTable::default()),
            last_options: Mutex::new(None),
            dialogs,
            observability,
            config,
        })
    }

    pub async fn close(self) -> Result<(), BackendError> {
        self.client.close().await
    }

    pub fn client(&self) -> &CdpClient {
        &self.client
    }

    pub fn dialogs(&self) -> &DialogQueue {
        &self.dialogs
    }

    pub fn observability(&self) -> &InMemoryObservability {
        &self.observability
    }

    pub fn capabilities(&self) -> PageCapabilities<'_> {
        PageCapabilities::new(self, self)
    }

    /// The table produced by the most recent snapshot.
    pub fn ref_table(&self) -> ReferenceTable {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub async fn navigate(&self, url: &str) -> Result<(), BackendError> {
        info!("Navigating to: {}", url);
        self.client
            .page
            .goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;
        Ok(())
    }

    /// Snapshot with the configured defaults.
    pub async fn snapshot(&self) -> Result<Snapshot, BackendError> {
        self.take_snapshot(&self.config.snapshot.options()).await
    }

    async fn dump_nodes(&self) -> Result<Vec<DumpNode>, BackendError> {
        let resp = self
            .client
            .page
            .execute(GetFullAxTreeParams::default())
            .await
            .map_err(|e| BackendError::Browser(format!("Failed to get accessibility tree: {}", e)))?;
        let tree = AxTree::from_nodes(&resp.result.nodes);
        debug!("accessibility tree has {} nodes", tree.len());
        Ok(tree.flatten())
    }

    /// Find the live element behind a ref of the current table.
    pub async fn resolve_ref(&self, raw: &str) -> Result<ElementHandle, BackendError> {
        let locator = resolve(raw, &self.ref_table())?;
        let (role, name, nth) = match &locator {
            Locator::Role {
                frame: Some(_), ..
            } => return Err(BackendError::NotSupported("frame-scoped locators".into())),
            Locator::Role { role, name, nth, .. } => (role, name, nth),
            Locator::AriaRef { .. } => {
                return Err(BackendError::NotSupported(format!(
                    "native ref locator {}",
                    locator.selector()
                )));
            }
        };

        let max_depth = self
            .last_options
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .and_then(|o| o.max_depth);
        let nodes = self.dump_nodes().await?;
        let matches = candidates(&nodes, role, name.as_deref(), max_depth);
        let token = normalize_ref(raw).to_string();

        let node = match (nth, matches.len()) {
            (_, 0) => {
                return Err(BackendError::ElementNotFound {
                    token,
                    reason: format!("{} is no longer on the page", locator.selector()),
                });
            }
            (None, 1) => matches[0],
            (None, count) => {
                return Err(BackendError::Ambiguous {
                    locator: locator.selector(),
                    count,
                });
            }
            (Some(n), count) => *matches.get(*n).ok_or_else(|| BackendError::ElementNotFound {
                token: token.clone(),
                reason: format!("{} matched only {} elements", locator.selector(), count),
            })?,
        };

        let backend_node_id = node.backend_node_id.ok_or_else(|| BackendError::ElementNotFound {
            token: token.clone(),
            reason: "accessibility node has no DOM node".into(),
        })?;
        let resp = self
            .client
            .page
            .execute(
                ResolveNodeParams::builder()
                    .backend_node_id(BackendNodeId::new(backend_node_id))
                    .build(),
            )
            .await
            .map_err(|e| BackendError::ElementNotFound {
                token: token.clone(),
                reason: e.to_string(),
            })?;
        let object_id = resp.result.object.object_id.ok_or(BackendError::ElementNotFound {
            token,
            reason: "could not resolve element".into(),
        })?;
        Ok(ElementHandle::new(object_id.inner().clone()))
    }

    /// Click a ref once, without healing.
    pub async fn click_ref(&self, raw: &str) -> Result<(), BackendError> {
        let handle = self.resolve_ref(raw).await?;
        self.click_handle(&handle, &format!("@{}", normalize_ref(raw)))
            .await
    }

    async fn click_handle(&self, handle: &ElementHandle, target: &str) -> Result<(), BackendError> {
        let status = self.call_on(handle, CLICK_JS).await?;
        match status.as_str() {
            Some("ok") => Ok(()),
            Some(reason) => Err(BackendError::ElementNotInteractable {
                target: target.to_string(),
                reason: reason.to_string(),
            }),
            None => Err(BackendError::Script(format!("unexpected click result {}", status))),
        }
    }

    /// An orchestrator wired to this page, bound to `raw` when it is a known ref.
    pub fn orchestrator(&self, policy: RetryPolicy, raw: Option<&str>) -> RetryOrchestrator<'_> {
        let mut orchestrator = RetryOrchestrator::new(policy)
            .with_page(self.capabilities())
            .with_dialogs(&self.dialogs)
            .with_observability(self.observability.as_ref())
            .with_snapshot_options(self.config.snapshot.options());
        if let Some(target) = raw.and_then(|r| RefTarget::from_table(r, &self.ref_table())) {
            orchestrator = orchestrator.with_target(target);
        }
        orchestrator
    }

    /// Click a ref, healing it through the configured retry policy.
    pub async fn click_with_retry(
        &self,
        raw: &str,
    ) -> Result<RetryOutcome<()>, RetryError<BackendError>> {
        self.orchestrator(self.config.retry.policy(), Some(raw))
            .with_label(format!("click @{}", normalize_ref(raw)))
            .run(move |attempt| async move {
                let token = attempt.ref_token.unwrap_or_else(|| raw.to_string());
                self.click_ref(&token).await
            })
            .await
    }

    async fn call_on(
        &self,
        handle: &ElementHandle,
        function: &str,
    ) -> Result<serde_json::Value, BackendError> {
        let params = CallFunctionOnParams::builder()
            .function_declaration(function)
            .object_id(RemoteObjectId::new(handle.as_str()))
            .return_by_value(true)
            .build()
            .map_err(BackendError::Script)?;
        let resp = self
            .client
            .page
            .execute(params)
            .await
            .map_err(|e| BackendError::Script(e.to_string()))?;
        if let Some(details) = resp.result.exception_details {
            return Err(BackendError::Script(details.text));
        }
        Ok(resp.result.result.value.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl PageControl for HeadlessPage {
    async fn current_url(&self) -> Result<String, BackendError> {
        let url = self
            .client
            .page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn scroll(&self, dx: i64, dy: i64) -> Result<(), BackendError> {
        self.client
            .page
            .evaluate(format!("window.scrollBy({}, {})", dx, dy))
            .await
            .map_err(|e| BackendError::Script(e.to_string()))?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), BackendError> {
        for event_type in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let event = DispatchKeyEventParams::builder()
                .r#type(event_type)
                .key(key)
                .build()
                .map_err(|e| BackendError::Script(format!("failed to build key event: {}", e)))?;
            self.client
                .page
                .execute(event)
                .await
                .map_err(|e| BackendError::Script(format!("key {} failed: {}", key, e)))?;
        }
        Ok(())
    }

    async fn locate_by_selector(&self, css: &str) -> Result<Option<ElementHandle>, BackendError> {
        let expression = format!("document.querySelector({})", serde_json::to_string(css)?);
        let resp = self
            .client
            .page
            .execute(EvaluateParams::new(expression))
            .await
            .map_err(|e| BackendError::Script(e.to_string()))?;
        if resp.result.exception_details.is_some() {
            return Err(BackendError::SelectorInvalid {
                selector: css.to_string(),
            });
        }
        Ok(resp
            .result
            .result
            .object_id
            .map(|id| ElementHandle::new(id.inner().clone())))
    }

    async fn locate_within(
        &self,
        scope: &ElementHandle,
        css: &str,
    ) -> Result<Option<ElementHandle>, BackendError> {
        let function = format!(
            "function() {{ return this.querySelector({}); }}",
            serde_json::to_string(css)?
        );
        let params = CallFunctionOnParams::builder()
            .function_declaration(function)
            .object_id(RemoteObjectId::new(scope.as_str()))
            .build()
            .map_err(BackendError::Script)?;
        let resp = self
            .client
            .page
            .execute(params)
            .await
            .map_err(|e| BackendError::Script(e.to_string()))?;
        if resp.result.exception_details.is_some() {
            return Err(BackendError::SelectorInvalid {
                selector: css.to_string(),
            });
        }
        Ok(resp
            .result
            .result
            .object_id
            .map(|id| ElementHandle::new(id.inner().clone())))
    }

    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool, BackendError> {
        let value = self.call_on(handle, VISIBLE_JS).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), BackendError> {
        self.click_handle(handle, handle.as_str()).await
    }
}

#[async_trait]
impl SnapshotSource for HeadlessPage {
    async fn take_snapshot(&self, options: &SnapshotOptions) -> Result<Snapshot, BackendError> {
        let nodes = self.dump_nodes().await?;
        let snapshot = compact_snapshot(&render_dump(&nodes), options);
        debug!(
            "snapshot: {}\n{}",
            format_snapshot_stats(&snapshot_stats(&snapshot)),
            format_ref_table(&snapshot.refs)
        );

        *self.table.lock().unwrap_or_else(|e| e.into_inner()) = snapshot.refs.clone();
        *self.last_options.lock().unwrap_or_else(|e| e.into_inner()) = Some(*options);
        Ok(snapshot)
    }
}
