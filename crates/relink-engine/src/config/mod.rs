pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader, ENV_MAX_RETRIES, ENV_RETRY_DELAY_MS};
pub use schema::{RelinkConfig, RetryConfig, SnapshotConfig};
