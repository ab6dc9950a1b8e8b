//! Hub configuration.

use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, NotifyResult};

const MAX_INITIAL_CAPACITY: usize = 1 << 20;

/// Hub settings. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherHubConfig {
    /// Registry slots to preallocate.
    pub initial_capacity: usize,
    /// First dispatch key handed out.
    pub first_key: usize,
    /// Close watchers whose handle is dropped without an explicit close.
    pub close_on_drop: bool,
}

impl Default for WatcherHubConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            first_key: 0,
            close_on_drop: true,
        }
    }
}

impl WatcherHubConfig {
    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    /// - `Config` if the document is not valid JSON for this struct or the
    ///   parsed values fail [`WatcherHubConfig::validate`]
    pub fn from_json_str(json: &str) -> NotifyResult<Self> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| NotifyError::Config {
            reason: format!("invalid hub config: {e}"),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// - `Config` if `initial_capacity` is above the supported maximum
    pub fn validate(&self) -> NotifyResult<()> {
        if self.initial_capacity > MAX_INITIAL_CAPACITY {
            return Err(NotifyError::Config {
                reason: format!(
                    "initial_capacity {} exceeds maximum of {MAX_INITIAL_CAPACITY}",
                    self.initial_capacity
                ),
            });
        }
        Ok(())
    }
}
