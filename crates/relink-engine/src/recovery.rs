//! One remediation procedure per [`FailureKind`].
//!
//! Strategies never fail: capability errors are logged and swallowed, and
//! the only visible result is the tag appended to the retry log plus, when
//! the strategy re-snapshotted, the fresh snapshot.

use crate::backend::{
    DialogAction, DialogBuffer, DialogPolicy, ElementHandle, PageCapabilities, PageControl,
    SnapshotSource,
};
use relink_common::failure::FailureKind;
use relink_common::refs::{Snapshot, SnapshotOptions};
use tracing::{debug, info, warn};

pub const TAG_RESNAP: &str = "resnap";
pub const TAG_RESNAP_NTH: &str = "resnap-nth";
pub const TAG_SCROLL_DISMISS: &str = "scroll-dismiss";
pub const TAG_DIALOG_ACCEPTED: &str = "dialog-accepted";
pub const TAG_RESNAP_NEW_PAGE: &str = "resnap-new-page";
pub const TAG_OVERLAY_DISMISSED: &str = "overlay-dismissed";

/// Vertical scroll applied when an element may be off-screen or covered.
pub const RECOVERY_SCROLL_PX: i64 = 300;

pub const ESCAPE_KEY: &str = "Escape";

/// Containers commonly used for modals and consent banners. Best-effort.
pub const OVERLAY_SELECTORS: &[&str] = &[
    "[role=\"dialog\"]",
    "[role=\"alertdialog\"]",
    "[aria-modal=\"true\"]",
    ".modal",
    "[class*=\"cookie-banner\"]",
    "[id*=\"cookie-banner\"]",
    "[class*=\"cookie-consent\"]",
    "[id*=\"onetrust\"]",
    "[class*=\"overlay\"]",
];

/// Controls inside an overlay that close it, tried in order.
pub const DISMISS_CONTROL_SELECTORS: &[&str] = &[
    "button[aria-label*=\"close\" i]",
    "[aria-label*=\"dismiss\" i]",
    "[data-dismiss]",
    "button[class*=\"close\" i]",
    "button[id*=\"close\" i]",
    "button[aria-label*=\"accept\" i]",
    "button[class*=\"accept\" i]",
    "button[id*=\"accept\" i]",
    ".close",
];

/// What a strategy did.
#[derive(Debug, Clone)]
pub struct Recovery {
    pub tag: &'static str,
    pub snapshot: Option<Snapshot>,
}

impl Recovery {
    fn new(tag: &'static str, snapshot: Option<Snapshot>) -> Self {
        Self { tag, snapshot }
    }
}

/// Run the strategy for `kind`.
///
/// `base` supplies the snapshot options used for re-snapshots; each strategy
/// decides whether the snapshot is compact. Terminal kinds have no strategy
/// and return `None`.
pub async fn recover(
    kind: FailureKind,
    page: PageCapabilities<'_>,
    dialogs: Option<&dyn DialogBuffer>,
    base: SnapshotOptions,
) -> Option<Recovery> {
    let compact = SnapshotOptions {
        compact: true,
        ..base
    };

    let recovery = match kind {
        FailureKind::StaleRef => Recovery::new(TAG_RESNAP, resnap(page.snapshots, compact).await),
        FailureKind::StrictMode => {
            let full = SnapshotOptions {
                compact: false,
                ..base
            };
            Recovery::new(TAG_RESNAP_NTH, resnap(page.snapshots, full).await)
        }
        FailureKind::NotInteractable => {
            scroll_and_escape(page.control).await;
            Recovery::new(TAG_SCROLL_DISMISS, None)
        }
        FailureKind::DialogBlocking => {
            if let Some(dialogs) = dialogs {
                accept_oldest_dialog(dialogs).await;
            } else {
                warn!("dialog blocking but no dialog buffer supplied");
            }
            Recovery::new(TAG_DIALOG_ACCEPTED, resnap(page.snapshots, compact).await)
        }
        FailureKind::NavigationChanged => {
            Recovery::new(TAG_RESNAP_NEW_PAGE, resnap(page.snapshots, compact).await)
        }
        FailureKind::OverlayInterference => {
            if !dismiss_overlay(page.control).await {
                scroll_and_escape(page.control).await;
            }
            Recovery::new(TAG_OVERLAY_DISMISSED, resnap(page.snapshots, compact).await)
        }
        FailureKind::CaptchaDetected | FailureKind::Unknown => return None,
    };

    info!(
        "Recovery for {}: {} (resnapped: {})",
        kind,
        recovery.tag,
        recovery.snapshot.is_some()
    );
    Some(recovery)
}

async fn resnap(snapshots: &dyn SnapshotSource, options: SnapshotOptions) -> Option<Snapshot> {
    match snapshots.take_snapshot(&options).await {
        Ok(snapshot) => {
            debug!("re-snapshot taken: {} refs", snapshot.refs.len());
            Some(snapshot)
        }
        Err(e) => {
            warn!("re-snapshot failed: {}", e);
            None
        }
    }
}

async fn scroll_and_escape(control: &dyn PageControl) {
    if let Err(e) = control.scroll(0, RECOVERY_SCROLL_PX).await {
        warn!("scroll failed: {}", e);
    }
    press_escape(control).await;
}

async fn press_escape(control: &dyn PageControl) {
    if let Err(e) = control.press_key(ESCAPE_KEY).await {
        warn!("pressing {} failed: {}", ESCAPE_KEY, e);
    }
}

/// Accept the oldest pending dialog. A queue policy is switched to accept
/// for the duration of the call and restored afterwards.
async fn accept_oldest_dialog(dialogs: &dyn DialogBuffer) {
    let prior = dialogs.policy();
    if prior == DialogPolicy::Queue {
        dialogs.set_policy(DialogPolicy::Accept);
    }

    if let Err(e) = dialogs.resolve_oldest(DialogAction::Accept, None).await {
        warn!("resolving pending dialog failed: {}", e);
    }

    if prior == DialogPolicy::Queue {
        dialogs.set_policy(prior);
    }
}

/// First overlay container that exists and is visible, with its selector.
async fn find_visible_overlay(control: &dyn PageControl) -> Option<(&'static str, ElementHandle)> {
    for selector in OVERLAY_SELECTORS {
        let handle = match control.locate_by_selector(selector).await {
            Ok(Some(handle)) => handle,
            Ok(None) => continue,
            Err(e) => {
                debug!("selector {} not usable: {}", selector, e);
                continue;
            }
        };
        match control.is_visible(&handle).await {
            Ok(true) => return Some((*selector, handle)),
            Ok(false) => {}
            Err(e) => debug!("visibility check for {} failed: {}", selector, e),
        }
    }
    None
}

/// Close the first visible overlay by clicking a dismiss control inside it,
/// falling back to Escape. Returns `false` when no overlay matched.
async fn dismiss_overlay(control: &dyn PageControl) -> bool {
    let Some((overlay, overlay_handle)) = find_visible_overlay(control).await else {
        debug!("no known overlay visible");
        return false;
    };

    for control_selector in DISMISS_CONTROL_SELECTORS {
        let handle = match control.locate_within(&overlay_handle, control_selector).await {
            Ok(Some(handle)) => handle,
            Ok(None) => continue,
            Err(e) => {
                debug!("dismiss control {} not usable: {}", control_selector, e);
                continue;
            }
        };
        if !control.is_visible(&handle).await.unwrap_or(false) {
            continue;
        }
        match control.click(&handle).await {
            Ok(()) => {
                info!("Overlay {} dismissed via {}", overlay, control_selector);
                return true;
            }
            Err(e) => warn!("clicking {} in {} failed: {}", control_selector, overlay, e),
        }
    }

    debug!("no dismiss control in {}, sending {}", overlay, ESCAPE_KEY);
    press_escape(control).await;
    true
}
