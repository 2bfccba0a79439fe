pub mod backend;
pub mod classify;
pub mod config;
pub mod formatter;
pub mod locator;
pub mod observability;
pub mod recovery;
pub mod rematch;
pub mod retry;
pub mod snapshot;

pub use relink_common::error;
pub use relink_common::failure;
pub use relink_common::refs;

pub use classify::classify;
pub use locator::{Locator, LocatorError, resolve};
pub use rematch::rematch;
pub use retry::{Attempt, RefTarget, RetryError, RetryOrchestrator, RetryOutcome, RetryPolicy};
pub use snapshot::compact_snapshot;
