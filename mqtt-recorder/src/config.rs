use serde::{Deserialize, Serialize};

use rmqtt::Result;

/// Recorder plugin configuration.
///
/// All paths are resolved relative to the process working directory; the
/// log directory is created lazily on first write.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginConfig {
    /// Directory holding both log files.
    #[serde(default = "PluginConfig::dir_default")]
    pub dir: String,
    /// CSV message log file name.
    #[serde(default = "PluginConfig::messages_file_default")]
    pub messages_file: String,
    /// Plaintext event log file name.
    #[serde(default = "PluginConfig::events_file_default")]
    pub events_file: String,
}

impl Default for PluginConfig {
    #[inline]
    fn default() -> Self {
        Self {
            dir: Self::dir_default(),
            messages_file: Self::messages_file_default(),
            events_file: Self::events_file_default(),
        }
    }
}

impl PluginConfig {
    fn dir_default() -> String {
        "Logs".into()
    }

    fn messages_file_default() -> String {
        "mqtt_messages.csv".into()
    }

    fn events_file_default() -> String {
        "mqtt_logs.txt".into()
    }

    #[inline]
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
