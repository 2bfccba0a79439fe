use chromiumoxide::cdp::browser_protocol::accessibility::EnableParams as AxEnableParams;
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EventConsoleApiCalled, EventExceptionThrown,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use relink_common::error::BackendError;
use relink_engine::observability::InMemoryObservability;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

pub const ENV_CHROME_BIN: &str = "CHROME_BIN";
pub const ENV_USER_DATA_DIR: &str = "RELINK_USER_DATA_DIR";

pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
    user_data_dir: Option<PathBuf>,
    cleanup_user_data_dir: bool,
}

impl CdpClient {
    pub async fn launch(visible: bool) -> Result<Self, BackendError> {
        let mut config_builder = BrowserConfig::builder();
        config_builder = config_builder.no_sandbox(); // Often needed in docker/CI/restricted envs
        let (user_data_dir, cleanup_user_data_dir) = resolve_user_data_dir()?;
        config_builder = config_builder.user_data_dir(&user_data_dir);

        if visible {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        } else {
            tracing::info!("Launching browser in headless mode");
        }

        if let Ok(chrome_bin) = std::env::var(ENV_CHROME_BIN) {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin);
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        let config = config_builder
            .build()
            .map_err(|e| BackendError::Browser(format!("Failed to build browser config: {}", e)))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BackendError::Browser(format!("Failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::error!("Browser handler error (ignoring): {}", e);
                    continue;
                }
            }
            tracing::info!("Browser handler task ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BackendError::Browser(format!("Failed to create page: {}", e)))?;

        page.execute(AxEnableParams::default())
            .await
            .map_err(|e| BackendError::Browser(format!("Failed to enable accessibility: {}", e)))?;

        Ok(Self {
            browser,
            handler_task,
            page,
            user_data_dir: Some(user_data_dir),
            cleanup_user_data_dir,
        })
    }

    /// Feed console errors and uncaught exceptions into `sink`.
    pub async fn capture_console(
        &self,
        sink: Arc<InMemoryObservability>,
    ) -> Result<(), BackendError> {
        let mut console_events = self
            .page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(|e| BackendError::Browser(format!("Failed to subscribe to console events: {}", e)))?;
        let mut exception_events = self
            .page
            .event_listener::<EventExceptionThrown>()
            .await
            .map_err(|e| {
                BackendError::Browser(format!("Failed to subscribe to exception events: {}", e))
            })?;

        let console_sink = sink.clone();
        tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                let args_str: Vec<String> = event
                    .args
                    .iter()
                    .map(|arg| {
                        arg.value
                            .as_ref()
                            .and_then(|v| v.as_str().map(str::to_string))
                            .or_else(|| arg.description.clone())
                            .unwrap_or_else(|| "unknown".to_string())
                    })
                    .collect();
                let text = args_str.join(" ");
                tracing::debug!("Browser Console [{:?}]: {}", event.r#type, text);
                if event.r#type == ConsoleApiCalledType::Error {
                    console_sink.push_console_error(text);
                }
            }
        });

        tokio::spawn(async move {
            while let Some(event) = exception_events.next().await {
                let details = &event.exception_details;
                let text = details
                    .exception
                    .as_ref()
                    .and_then(|e| e.description.clone())
                    .unwrap_or_else(|| details.text.clone());
                tracing::debug!("Uncaught exception: {}", text);
                sink.push_console_error(text);
            }
        });

        Ok(())
    }

    pub async fn close(mut self) -> Result<(), BackendError> {
        self.browser
            .close()
            .await
            .map_err(|e| BackendError::Browser(format!("Error closing browser: {}", e)))?;
        self.handler_task
            .await
            .map_err(|e| BackendError::Browser(format!("Error awaiting handler: {}", e)))?;

        if self.cleanup_user_data_dir
            && let Some(dir) = &self.user_data_dir
            && let Err(e) = std::fs::remove_dir_all(dir)
        {
            tracing::debug!("Failed to clean up user-data-dir {}: {}", dir.display(), e);
        }

        Ok(())
    }
}

fn resolve_user_data_dir() -> Result<(PathBuf, bool), BackendError> {
    if let Ok(dir) = std::env::var(ENV_USER_DATA_DIR) {
        let path = PathBuf::from(dir);
        std::fs::create_dir_all(&path).map_err(|e| BackendError::Browser(e.to_string()))?;
        tracing::info!(
            "Using user data dir from {}: {}",
            ENV_USER_DATA_DIR,
            path.display()
        );
        return Ok((path, false));
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BackendError::Other(format!("System clock error: {}", e)))?
        .as_nanos();
    let unique = format!("relink-chromium-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path).map_err(|e| BackendError::Browser(e.to_string()))?;
    tracing::info!("Using isolated user data dir: {}", path.display());
    Ok((path, true))
}
