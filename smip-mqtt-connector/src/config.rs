// Copyright 2025 The SMIP MQTT Connector Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration types for the MQTT cache connector.
//!
//! Two layers: [`MqttConnectorConfig`] says where the cache lives and how to
//! cycle the gateway service, and is fixed when the connector is created.
//! [`ConnectSettings`] is parsed from the host's attribute map on every
//! connect.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConnectorError;

pub const DEFAULT_HIST_ROOT: &str = "MqttHist";
pub const DEFAULT_TOPIC_LIST_FILE: &str = "MqttTopicList.json";
pub const DEFAULT_SERVICE_NAME: &str = "SouthBridgeService";
pub const DEFAULT_RECOVERY_SCRIPT: &str = "/opt/thinkiq/restart-southbridge.sh";
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_millis(5000);

const WINDOWS_DATA_ROOT: &str = r"C:\ProgramData\ThinkIQ\DataRoot";
const UNIX_DATA_ROOT: &str = "/opt/thinkiq/dataroot";

static DATA_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// Data root shared with the subscriber process, resolved once per process.
pub fn platform_data_root() -> &'static Path {
    DATA_ROOT.get_or_init(|| {
        let root = if cfg!(windows) {
            WINDOWS_DATA_ROOT
        } else {
            UNIX_DATA_ROOT
        };
        info!("Resolved data root {root}");
        PathBuf::from(root)
    })
}

/// External action that restarts the gateway's host-facing service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryCommand {
    /// `<program> stop <service>` then `<program> start <service>`.
    ServiceControl { program: String, service: String },
    /// One script that restarts the service on its own.
    Script { path: PathBuf },
}

impl RecoveryCommand {
    /// Service control manager on Windows, a restart script elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            RecoveryCommand::ServiceControl {
                program: "sc.exe".to_string(),
                service: DEFAULT_SERVICE_NAME.to_string(),
            }
        } else {
            RecoveryCommand::Script {
                path: PathBuf::from(DEFAULT_RECOVERY_SCRIPT),
            }
        }
    }
}

/// Configuration for the MQTT cache connector.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConnectorConfig {
    /// Identifier used as the log prefix.
    pub id: String,
    /// Directory shared with the subscriber process.
    pub data_root: PathBuf,
    /// Cache directory name under `data_root` (default: `"MqttHist"`).
    pub hist_root: String,
    /// Topic list file name under `data_root` (default: `"MqttTopicList.json"`).
    pub topic_list_file: String,
    /// How to cycle the gateway service when it must re-pull tags.
    pub recovery: RecoveryCommand,
}

impl MqttConnectorConfig {
    /// Start building a config; everything else has platform defaults.
    pub fn builder(id: impl Into<String>) -> MqttConnectorConfigBuilder {
        MqttConnectorConfigBuilder {
            id: id.into(),
            data_root: None,
            hist_root: DEFAULT_HIST_ROOT.to_string(),
            topic_list_file: DEFAULT_TOPIC_LIST_FILE.to_string(),
            recovery: RecoveryCommand::platform_default(),
        }
    }

    pub fn topic_list_path(&self) -> PathBuf {
        self.data_root.join(&self.topic_list_file)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_root.join(&self.hist_root)
    }
}

/// Builder for [`MqttConnectorConfig`].
pub struct MqttConnectorConfigBuilder {
    id: String,
    data_root: Option<PathBuf>,
    hist_root: String,
    topic_list_file: String,
    recovery: RecoveryCommand,
}

impl MqttConnectorConfigBuilder {
    pub fn data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = Some(data_root.into());
        self
    }

    pub fn hist_root(mut self, hist_root: impl Into<String>) -> Self {
        self.hist_root = hist_root.into();
        self
    }

    pub fn topic_list_file(mut self, file_name: impl Into<String>) -> Self {
        self.topic_list_file = file_name.into();
        self
    }

    pub fn recovery(mut self, recovery: RecoveryCommand) -> Self {
        self.recovery = recovery;
        self
    }

    /// Build the config.
    pub fn build(self) -> MqttConnectorConfig {
        MqttConnectorConfig {
            id: self.id,
            data_root: self
                .data_root
                .unwrap_or_else(|| platform_data_root().to_path_buf()),
            hist_root: self.hist_root,
            topic_list_file: self.topic_list_file,
            recovery: self.recovery,
        }
    }
}

/// Connector description handed over by the gateway (`model.json`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectorInfo {
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form settings; absent means the gateway sent no configuration.
    #[serde(default)]
    pub attributes: Option<Map<String, Value>>,
}

impl ConnectorInfo {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_attributes(attributes: Map<String, Value>) -> Self {
        Self {
            name: None,
            attributes: Some(attributes),
        }
    }
}

pub const ATTR_TAG_COUNT: &str = "TagCount";
pub const ATTR_DATA_TIME_GAP_SECONDS: &str = "DataTimeGapSeconds";
pub const ATTR_CYCLE_ON_NEW_TAG: &str = "CycleOnNewTag";
pub const ATTR_CYCLE_TIME_MS: &str = "CycleTimeMs";
pub const ATTR_REAPER_ENABLED: &str = "ReaperEnabled";
pub const ATTR_MAX_LIFE: &str = "MaxLife";

/// Settings parsed from the connect attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSettings {
    /// Informational only.
    pub tag_count: Option<u32>,
    /// Informational only.
    pub data_time_gap_seconds: Option<u32>,
    /// Cycle the gateway service whenever discovery finds new tags.
    pub cycle_on_new_tag: bool,
    /// Base delay for recovery; stop and start are this far apart.
    pub cycle_time: Duration,
    /// Reads a reader serves before the reaper cycles the service.
    pub reaper_max_life: Option<u64>,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            tag_count: None,
            data_time_gap_seconds: None,
            cycle_on_new_tag: false,
            cycle_time: DEFAULT_CYCLE_TIME,
            reaper_max_life: None,
        }
    }
}

impl ConnectSettings {
    /// Parse the attribute map. Bad values are logged and leave the feature off.
    pub fn from_attributes(id: &str, attributes: &Map<String, Value>) -> Self {
        let mut settings = ConnectSettings::default();

        settings.tag_count = parse_or_warn(id, attributes, ATTR_TAG_COUNT);
        settings.data_time_gap_seconds = parse_or_warn(id, attributes, ATTR_DATA_TIME_GAP_SECONDS);

        let cycle_time_ms: Option<u64> = parse_or_warn(id, attributes, ATTR_CYCLE_TIME_MS);
        if let Some(ms) = cycle_time_ms {
            settings.cycle_time = Duration::from_millis(ms);
        }

        let cycle_requested = flag_or_warn(id, attributes, ATTR_CYCLE_ON_NEW_TAG);
        if cycle_requested && cycle_time_ms.is_none() {
            warn!("[{id}] {ATTR_CYCLE_ON_NEW_TAG} set without a usable {ATTR_CYCLE_TIME_MS}; cycling on new tags stays disabled");
        }
        settings.cycle_on_new_tag = cycle_requested && cycle_time_ms.is_some();

        if flag_or_warn(id, attributes, ATTR_REAPER_ENABLED) {
            match parse_or_warn::<u64>(id, attributes, ATTR_MAX_LIFE) {
                Some(max_life) if max_life > 0 => settings.reaper_max_life = Some(max_life),
                _ => warn!("[{id}] {ATTR_REAPER_ENABLED} set without a positive {ATTR_MAX_LIFE}; reaper stays disabled"),
            }
        }

        settings
    }
}

fn attribute_text(attributes: &Map<String, Value>, key: &str) -> Option<String> {
    attributes.get(key).map(|value| match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    })
}

fn parse_attribute<T: FromStr>(
    attributes: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<T>, ConnectorError> {
    match attribute_text(attributes, key) {
        None => Ok(None),
        Some(text) => text
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConnectorError::InvalidAttribute { key, value: text }),
    }
}

fn parse_or_warn<T: FromStr>(id: &str, attributes: &Map<String, Value>, key: &'static str) -> Option<T> {
    parse_attribute(attributes, key).unwrap_or_else(|e| {
        warn!("[{id}] {e}");
        None
    })
}

fn parse_flag(attributes: &Map<String, Value>, key: &'static str) -> Result<bool, ConnectorError> {
    match attribute_text(attributes, key) {
        None => Ok(false),
        Some(text) if text.eq_ignore_ascii_case("true") => Ok(true),
        Some(text) if text.eq_ignore_ascii_case("false") => Ok(false),
        Some(text) => Err(ConnectorError::InvalidAttribute { key, value: text }),
    }
}

fn flag_or_warn(id: &str, attributes: &Map<String, Value>, key: &'static str) -> bool {
    parse_flag(attributes, key).unwrap_or_else(|e| {
        warn!("[{id}] {e}");
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let config = MqttConnectorConfig::builder("mqtt").data_root("/tmp/root").build();
        assert_eq!(config.hist_root, DEFAULT_HIST_ROOT);
        assert_eq!(config.topic_list_path(), Path::new("/tmp/root/MqttTopicList.json"));
        assert_eq!(config.cache_dir(), Path::new("/tmp/root/MqttHist"));
        assert_eq!(config.recovery, RecoveryCommand::platform_default());
    }

    #[test]
    fn test_builder_without_data_root_uses_platform_root() {
        let config = MqttConnectorConfig::builder("mqtt").build();
        assert_eq!(config.data_root, platform_data_root());
        assert_eq!(platform_data_root(), platform_data_root());
    }

    #[test]
    fn test_config_deserializes() {
        let config: MqttConnectorConfig = serde_json::from_value(json!({
            "id": "mqtt",
            "data_root": "/data",
            "hist_root": "Hist",
            "topic_list_file": "topics.txt",
            "recovery": { "kind": "script", "path": "/usr/local/bin/cycle.sh" }
        }))
        .unwrap();
        assert_eq!(config.cache_dir(), Path::new("/data/Hist"));
        assert_eq!(
            config.recovery,
            RecoveryCommand::Script {
                path: PathBuf::from("/usr/local/bin/cycle.sh")
            }
        );
    }

    #[test]
    fn test_connector_info_from_model_json() {
        let info = ConnectorInfo::from_json(
            r#"{"Name": "mqtt", "Attributes": {"TagCount": "10", "ReaperEnabled": true}}"#,
        )
        .unwrap();
        assert_eq!(info.name.as_deref(), Some("mqtt"));
        assert_eq!(info.attributes.unwrap().len(), 2);

        let bare = ConnectorInfo::from_json("{}").unwrap();
        assert!(bare.attributes.is_none());
    }

    #[test]
    fn test_full_settings() {
        let settings = ConnectSettings::from_attributes(
            "t",
            &attrs(json!({
                "TagCount": "25",
                "DataTimeGapSeconds": 60,
                "CycleOnNewTag": "True",
                "CycleTimeMs": "1500",
                "ReaperEnabled": true,
                "MaxLife": 3
            })),
        );
        assert_eq!(settings.tag_count, Some(25));
        assert_eq!(settings.data_time_gap_seconds, Some(60));
        assert!(settings.cycle_on_new_tag);
        assert_eq!(settings.cycle_time, Duration::from_millis(1500));
        assert_eq!(settings.reaper_max_life, Some(3));
    }

    #[test]
    fn test_empty_attributes_disable_everything() {
        let settings = ConnectSettings::from_attributes("t", &Map::new());
        assert_eq!(settings, ConnectSettings::default());
    }

    #[test]
    fn test_unparseable_values_leave_features_disabled() {
        let settings = ConnectSettings::from_attributes(
            "t",
            &attrs(json!({
                "TagCount": "many",
                "CycleOnNewTag": "yes",
                "CycleTimeMs": "1000",
                "ReaperEnabled": "true",
                "MaxLife": "-1"
            })),
        );
        assert_eq!(settings.tag_count, None);
        assert!(!settings.cycle_on_new_tag);
        assert_eq!(settings.cycle_time, Duration::from_millis(1000));
        assert_eq!(settings.reaper_max_life, None);
    }

    #[test]
    fn test_cycle_requires_cycle_time() {
        let settings = ConnectSettings::from_attributes(
            "t",
            &attrs(json!({ "CycleOnNewTag": true, "CycleTimeMs": "soon" })),
        );
        assert!(!settings.cycle_on_new_tag);
        assert_eq!(settings.cycle_time, DEFAULT_CYCLE_TIME);
    }

    #[test]
    fn test_zero_max_life_disables_reaper() {
        let settings = ConnectSettings::from_attributes(
            "t",
            &attrs(json!({ "ReaperEnabled": true, "MaxLife": 0 })),
        );
        assert_eq!(settings.reaper_max_life, None);
    }
}
