use super::schema::RelinkConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_MAX_RETRIES: &str = "RELINK_MAX_RETRIES";
pub const ENV_RETRY_DELAY_MS: &str = "RELINK_RETRY_DELAY_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./relink.yaml
    /// 2. ~/.relink/config.yaml
    /// 3. Default configuration
    ///
    /// Environment overrides are applied on top of whichever was found.
    pub async fn load_default() -> Result<RelinkConfig, ConfigError> {
        let mut config = match Self::default_path() {
            Some(path) => Self::load_from(&path).await?,
            None => RelinkConfig::default(),
        };
        Self::apply_overrides(&mut config, |var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub async fn load_from(path: &Path) -> Result<RelinkConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: RelinkConfig = serde_yaml::from_str(&content)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// First existing config file, if any.
    pub fn default_path() -> Option<PathBuf> {
        let local_config = PathBuf::from("./relink.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        let home_config = dirs::home_dir()?.join(".relink").join("config.yaml");
        home_config.exists().then_some(home_config)
    }

    /// Apply `RELINK_*` overrides read through `lookup`.
    pub fn apply_overrides(
        config: &mut RelinkConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            config.retry.max_retries = parse_env(ENV_MAX_RETRIES, &value)?;
        }
        if let Some(value) = lookup(ENV_RETRY_DELAY_MS) {
            config.retry.retry_delay_ms = parse_env(ENV_RETRY_DELAY_MS, &value)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |var| {
            pairs
                .iter()
                .find(|(k, _)| *k == var)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = RelinkConfig::default();
        ConfigLoader::apply_overrides(
            &mut config,
            env(&[(ENV_MAX_RETRIES, "4"), (ENV_RETRY_DELAY_MS, " 50 ")]),
        )
        .unwrap();
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.retry_delay_ms, 50);
        assert_eq!(config.retry.console_error_limit, 5);
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = RelinkConfig::default();
        let err = ConfigLoader::apply_overrides(&mut config, env(&[(ENV_MAX_RETRIES, "many")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for RELINK_MAX_RETRIES: \"many\"");
        assert_eq!(config.retry.max_retries, 2);
    }
}
