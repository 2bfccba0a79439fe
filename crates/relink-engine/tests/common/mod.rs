#![allow(dead_code)]

use async_trait::async_trait;
use relink_engine::backend::{
    BackendError, DialogAction, DialogBuffer, DialogPolicy, ElementHandle, PageCapabilities,
    PageControl, SnapshotSource,
};
use relink_engine::refs::{ReferenceTable, Snapshot, SnapshotOptions};
use relink_engine::snapshot::compact_snapshot;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// Route engine logs to the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scripted page: every snapshot consumes the next dump (the last one
/// repeats), every control call is appended to `actions`.
#[derive(Default)]
pub struct MockPage {
    pub url: Mutex<String>,
    dumps: Mutex<VecDeque<String>>,
    selectors: Mutex<HashSet<String>>,
    pub table: Mutex<ReferenceTable>,
    pub actions: Mutex<Vec<String>>,
}

impl MockPage {
    pub fn new(url: &str, dumps: &[&str]) -> Self {
        Self {
            url: Mutex::new(url.to_string()),
            dumps: Mutex::new(dumps.iter().map(|d| d.to_string()).collect()),
            ..Default::default()
        }
    }

    /// Make `css` resolve to a visible element.
    pub fn with_selector(self, css: &str) -> Self {
        self.selectors.lock().unwrap().insert(css.to_string());
        self
    }

    pub fn caps(&self) -> PageCapabilities<'_> {
        PageCapabilities::new(self, self)
    }

    pub fn navigate(&self, url: &str) {
        *self.url.lock().unwrap() = url.to_string();
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.actions.lock().unwrap().iter().any(|a| a == action)
    }

    fn log(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl PageControl for MockPage {
    async fn current_url(&self) -> Result<String, BackendError> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn scroll(&self, dx: i64, dy: i64) -> Result<(), BackendError> {
        self.log(format!("scroll {} {}", dx, dy));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), BackendError> {
        self.log(format!("key {}", key));
        Ok(())
    }

    async fn locate_by_selector(&self, css: &str) -> Result<Option<ElementHandle>, BackendError> {
        let found = self.selectors.lock().unwrap().contains(css);
        Ok(found.then(|| ElementHandle::new(css)))
    }

    /// Scoped lookups match a registered `"<scope> <css>"` selector.
    async fn locate_within(
        &self,
        scope: &ElementHandle,
        css: &str,
    ) -> Result<Option<ElementHandle>, BackendError> {
        self.locate_by_selector(&format!("{} {}", scope.as_str(), css))
            .await
    }

    async fn is_visible(&self, _handle: &ElementHandle) -> Result<bool, BackendError> {
        Ok(true)
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), BackendError> {
        self.log(format!("click {}", handle.as_str()));
        Ok(())
    }
}

#[async_trait]
impl SnapshotSource for MockPage {
    async fn take_snapshot(&self, options: &SnapshotOptions) -> Result<Snapshot, BackendError> {
        let dump = {
            let mut dumps = self.dumps.lock().unwrap();
            if dumps.len() > 1 {
                dumps.pop_front()
            } else {
                dumps.front().cloned()
            }
        }
        .ok_or(BackendError::NotReady)?;

        let snapshot = compact_snapshot(&dump, options);
        *self.table.lock().unwrap() = snapshot.refs.clone();
        self.log(format!("snapshot compact={}", options.compact));
        Ok(snapshot)
    }
}

/// Dialog buffer that remembers the policy in force when each dialog was resolved.
#[derive(Default)]
pub struct MockDialogs {
    pending: Mutex<VecDeque<String>>,
    policy: Mutex<DialogPolicy>,
    pub resolved: Mutex<Vec<(String, DialogAction, DialogPolicy)>>,
}

impl MockDialogs {
    pub fn open(&self, message: &str) {
        self.pending.lock().unwrap().push_back(message.to_string());
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

#[async_trait]
impl DialogBuffer for MockDialogs {
    async fn has_pending(&self) -> bool {
        !self.pending.lock().unwrap().is_empty()
    }

    async fn resolve_oldest(
        &self,
        action: DialogAction,
        _text: Option<&str>,
    ) -> Result<(), BackendError> {
        let message = self
            .pending
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BackendError::Dialog("no pending dialog".into()))?;
        let policy = self.policy();
        self.resolved.lock().unwrap().push((message, action, policy));
        Ok(())
    }

    fn policy(&self) -> DialogPolicy {
        *self.policy.lock().unwrap()
    }

    fn set_policy(&self, policy: DialogPolicy) {
        *self.policy.lock().unwrap() = policy;
    }
}
