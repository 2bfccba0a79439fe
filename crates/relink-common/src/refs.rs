//! Reference model shared by the compactor, the locator and rematch.
//!
//! A [`ReferenceTable`] is produced by one snapshot and fully replaced by the
//! next one. Tokens are only meaningful against the table that issued them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One resolved element: accessibility role, accessible name and, for
/// duplicated `(role, name)` pairs only, a zero-based disambiguation index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
}

impl RoleRef {
    pub fn new(role: impl Into<String>, name: Option<String>) -> Self {
        Self {
            role: role.into(),
            name,
            nth: None,
        }
    }

    /// Key used for duplicate detection.
    pub fn key(&self) -> (&str, Option<&str>) {
        (self.role.as_str(), self.name.as_deref())
    }
}

/// How tokens of a table are addressed by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefMode {
    /// Tokens were minted by the compactor; resolve through role + name queries.
    #[default]
    Role,
    /// Tokens came from the driver itself; pass them through untouched.
    Aria,
}

/// Token -> [`RoleRef`] mapping for the current snapshot of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTable {
    pub mode: RefMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    refs: HashMap<String, RoleRef>,
    order: Vec<String>,
}

impl ReferenceTable {
    pub fn new(mode: RefMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Scope every locator produced from this table to a frame selector.
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }

    pub fn insert(&mut self, token: impl Into<String>, role_ref: RoleRef) {
        let token = token.into();
        if self.refs.insert(token.clone(), role_ref).is_none() {
            self.order.push(token);
        }
    }

    pub fn get(&self, token: &str) -> Option<&RoleRef> {
        self.refs.get(token)
    }

    pub fn get_mut(&mut self, token: &str) -> Option<&mut RoleRef> {
        self.refs.get_mut(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.refs.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in the order the snapshot assigned them.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoleRef)> {
        self.order
            .iter()
            .filter_map(|token| self.refs.get(token).map(|r| (token.as_str(), r)))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// Compaction knobs. Callers always pass these explicitly; defaults live in
/// the engine's configuration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    pub interactive_only: bool,
    pub max_depth: Option<usize>,
    pub compact: bool,
}

/// Pruned tree text plus the table that resolves its `[ref=..]` markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub text: String,
    pub refs: ReferenceTable,
}

/// Strip the `@` or `ref=` prefix agents may put in front of a token.
///
/// `e5`, `@e5` and `ref=e5` all normalize to `e5`.
pub fn normalize_ref(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('@') {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("ref=") {
        rest
    } else {
        trimmed
    }
}

/// Whether a token has the `e<digits>` shape the compactor mints.
pub fn is_generated_ref(token: &str) -> bool {
    token
        .strip_prefix('e')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
