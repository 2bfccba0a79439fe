//! Turn a ref token into something the driver can address.

use relink_common::error::BackendError;
use relink_common::refs::{RefMode, ReferenceTable, is_generated_ref, normalize_ref};
use thiserror::Error;

/// How the next driver call should find the element behind a ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Accessible role + exact name query, indexed when the pair is duplicated.
    Role {
        role: String,
        name: Option<String>,
        exact: bool,
        nth: Option<usize>,
        frame: Option<String>,
    },
    /// Driver-native ref, passed through untouched.
    AriaRef {
        token: String,
        frame: Option<String>,
    },
}

impl Locator {
    pub fn frame(&self) -> Option<&str> {
        match self {
            Locator::Role { frame, .. } | Locator::AriaRef { frame, .. } => frame.as_deref(),
        }
    }

    /// Driver-neutral selector text, e.g. `role=button[name="Save"] >> nth=1`.
    pub fn selector(&self) -> String {
        let body = match self {
            Locator::Role {
                role, name, nth, ..
            } => {
                let mut s = format!("role={}", role);
                if let Some(name) = name {
                    s.push_str(&format!("[name={:?}]", name));
                }
                if let Some(nth) = nth {
                    s.push_str(&format!(" >> nth={}", nth));
                }
                s
            }
            Locator::AriaRef { token, .. } => format!("aria-ref={}", token),
        };

        match self.frame() {
            Some(frame) => format!("{} >>> {}", frame, body),
            None => body,
        }
    }
}

/// Text after `Unknown ref: `. Shared by [`LocatorError`] and the
/// [`BackendError`] it converts into, since the classifier keys on it.
fn unknown_ref_detail(token: &str, available: &usize) -> String {
    format!(
        "{} (current snapshot has {} refs). Run a new snapshot to get fresh refs.",
        token, available
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    /// Always describes the table the lookup ran against, never the one
    /// that issued the token.
    #[error("Unknown ref: {}", unknown_ref_detail(.token, .available))]
    RefNotFound { token: String, available: usize },
}

impl From<LocatorError> for BackendError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::RefNotFound { token, available } => {
                BackendError::UnknownRef(unknown_ref_detail(&token, &available))
            }
        }
    }
}

/// Resolve a raw token (`e5`, `@e5` or `ref=e5`) against the current table.
pub fn resolve(raw: &str, table: &ReferenceTable) -> Result<Locator, LocatorError> {
    let token = normalize_ref(raw);
    let frame = table.frame.clone();

    if table.mode == RefMode::Aria {
        return Ok(Locator::AriaRef {
            token: token.to_string(),
            frame,
        });
    }

    if let Some(role_ref) = table.get(token) {
        return Ok(Locator::Role {
            role: role_ref.role.clone(),
            name: role_ref.name.clone(),
            exact: true,
            nth: role_ref.nth,
            frame,
        });
    }

    if is_generated_ref(token) {
        return Err(LocatorError::RefNotFound {
            token: token.to_string(),
            available: table.len(),
        });
    }

    // Not one of ours at all: let the driver try it as a raw native ref.
    Ok(Locator::AriaRef {
        token: token.to_string(),
        frame,
    })
}
