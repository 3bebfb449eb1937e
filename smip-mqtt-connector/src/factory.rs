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

//! Factory the gateway uses to build MQTT cache connectors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use serde_json::{Map, Value};

use crate::config::{ConnectorInfo, MqttConnectorConfig, RecoveryCommand};
use crate::connector::MqttConnector;
use crate::error::{ConnectorError, Result};
use crate::host::{Connector, ConnectorFactory};
use crate::recovery::RecoveryAction;

pub const DEFAULT_CONNECTOR_ID: &str = "mqtt-cache";
pub const DEFAULT_MODEL_PATH: &str = "model.json";

pub const PARAM_ID: &str = "Id";
pub const PARAM_DATA_ROOT: &str = "DataRoot";
pub const PARAM_HIST_ROOT: &str = "HistRoot";
pub const PARAM_TOPIC_LIST_FILE: &str = "TopicListFile";
pub const PARAM_MODEL_PATH: &str = "ModelPath";
pub const PARAM_RECOVERY_SERVICE_NAME: &str = "RecoveryServiceName";
pub const PARAM_RECOVERY_SCRIPT: &str = "RecoveryScript";

/// Read the connector description the gateway installer wrote.
pub fn load_connector_info(path: &Path) -> Result<ConnectorInfo> {
    let to_error = |reason: String| ConnectorError::ModelFile {
        path: path.to_path_buf(),
        reason,
    };
    let contents = std::fs::read_to_string(path).map_err(|e| to_error(e.to_string()))?;
    ConnectorInfo::from_json(&contents).map_err(|e| to_error(e.to_string()))
}

/// Builds [`MqttConnector`]s from the gateway's parameters.
#[derive(Default)]
pub struct MqttConnectorFactory {
    parameters: Map<String, Value>,
    action: Option<Arc<dyn RecoveryAction>>,
}

impl MqttConnectorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connectors from this factory use `action` instead of the configured command.
    pub fn with_recovery_action(action: Arc<dyn RecoveryAction>) -> Self {
        Self {
            parameters: Map::new(),
            action: Some(action),
        }
    }

    fn parameter(&self, key: &str) -> Option<String> {
        match self.parameters.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Connector config with the gateway's overrides applied.
    pub fn config(&self) -> MqttConnectorConfig {
        let id = self
            .parameter(PARAM_ID)
            .unwrap_or_else(|| DEFAULT_CONNECTOR_ID.to_string());
        let mut builder = MqttConnectorConfig::builder(id);

        if let Some(data_root) = self.parameter(PARAM_DATA_ROOT) {
            builder = builder.data_root(data_root);
        }
        if let Some(hist_root) = self.parameter(PARAM_HIST_ROOT) {
            builder = builder.hist_root(hist_root);
        }
        if let Some(file_name) = self.parameter(PARAM_TOPIC_LIST_FILE) {
            builder = builder.topic_list_file(file_name);
        }
        if let Some(path) = self.parameter(PARAM_RECOVERY_SCRIPT) {
            builder = builder.recovery(RecoveryCommand::Script { path: path.into() });
        } else if let Some(service) = self.parameter(PARAM_RECOVERY_SERVICE_NAME) {
            builder = builder.recovery(RecoveryCommand::ServiceControl {
                program: "sc.exe".to_string(),
                service,
            });
        }
        builder.build()
    }

    pub fn model_path(&self) -> PathBuf {
        self.parameter(PARAM_MODEL_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH))
    }
}

impl ConnectorFactory for MqttConnectorFactory {
    fn initialize(&mut self, parameters: Map<String, Value>) {
        info!(
            "MQTT cache connector initialized with parameters {}",
            Value::Object(parameters.clone())
        );
        self.parameters = parameters;
    }

    fn create(&self) -> Box<dyn Connector> {
        let config = self.config();
        info!("[{}] Created by gateway", config.id);
        match &self.action {
            Some(action) => Box::new(MqttConnector::with_recovery_action(config, Arc::clone(action))),
            None => Box::new(MqttConnector::new(config)),
        }
    }

    fn connector_info(&self) -> anyhow::Result<ConnectorInfo> {
        let path = self.model_path();
        info!("Loading connector description from {}", path.display());
        Ok(load_connector_info(&path)?)
    }
}
