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

//! MQTT cache implementation of the [`Connector`] trait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::RwLock;

use crate::config::{ConnectSettings, ConnectorInfo, MqttConnectorConfig};
use crate::discovery::AdapterState;
use crate::host::{Connector, HistoryReader};
use crate::reader::MqttReader;
use crate::recovery::{CommandRecovery, RecoveryAction, RecoveryController};
use crate::tag::TagMap;

/// Connector serving tags from the subscriber's payload cache.
///
/// Nothing is opened on connect; every browse and read goes to the files the
/// subscriber process maintains under the data root.
pub struct MqttConnector {
    config: Arc<MqttConnectorConfig>,
    state: Arc<AdapterState>,
    action: Arc<dyn RecoveryAction>,
    /// Rebuilt on every connect from the connect attributes.
    recovery: RwLock<Arc<RecoveryController>>,
    connected: AtomicBool,
}

impl MqttConnector {
    /// Create a connector that cycles the gateway with the configured command.
    pub fn new(config: MqttConnectorConfig) -> Self {
        let action = Arc::new(CommandRecovery::new(config.recovery.clone()));
        Self::with_recovery_action(config, action)
    }

    /// Create a connector with a custom recovery action.
    pub fn with_recovery_action(config: MqttConnectorConfig, action: Arc<dyn RecoveryAction>) -> Self {
        let recovery = RecoveryController::new(&config.id, Arc::clone(&action), ConnectSettings::default());
        Self {
            config: Arc::new(config),
            state: Arc::new(AdapterState::new()),
            action,
            recovery: RwLock::new(Arc::new(recovery)),
            connected: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &MqttConnectorConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<AdapterState> {
        &self.state
    }

    /// Settings from the last connect.
    pub async fn settings(&self) -> ConnectSettings {
        self.recovery.read().await.settings().clone()
    }

    async fn recovery(&self) -> Arc<RecoveryController> {
        Arc::clone(&*self.recovery.read().await)
    }
}

#[async_trait]
impl Connector for MqttConnector {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self, info: &ConnectorInfo) -> bool {
        self.connected.store(false, Ordering::SeqCst);

        let Some(attributes) = &info.attributes else {
            warn!("[{}] Connect called without attributes", self.config.id);
            return false;
        };

        let settings = ConnectSettings::from_attributes(&self.config.id, attributes);
        info!(
            "[{}] Connected (data_root={}, tag_count={:?}, data_time_gap_seconds={:?}, cycle_on_new_tag={}, cycle_time_ms={}, reaper_max_life={:?})",
            self.config.id,
            self.config.data_root.display(),
            settings.tag_count,
            settings.data_time_gap_seconds,
            settings.cycle_on_new_tag,
            settings.cycle_time.as_millis(),
            settings.reaper_max_life,
        );

        let controller = RecoveryController::new(&self.config.id, Arc::clone(&self.action), settings);
        *self.recovery.write().await = Arc::new(controller);

        self.connected.store(true, Ordering::SeqCst);
        true
    }

    async fn browse(&self, new_tags_only: bool) -> TagMap {
        info!("[{}] Browsing, new_tags_only={new_tags_only}", self.config.id);
        let recovery = self.recovery().await;
        self.state
            .discover(&self.config.topic_list_path(), new_tags_only, &recovery)
            .await
    }

    async fn create_reader(&self, tags: TagMap, accept_start_bound: bool) -> Box<dyn HistoryReader> {
        info!(
            "[{}] Creating reader for {} tag(s), accept_start_bound={accept_start_bound}",
            self.config.id,
            tags.len()
        );
        Box::new(MqttReader::new(
            tags,
            accept_start_bound,
            Arc::clone(&self.config),
            Arc::clone(&self.state),
            self.recovery().await,
        ))
    }

    async fn set_acquired_tags(&self, tag_names: &[String], use_as_white_list: bool) {
        info!(
            "[{}] Acquired tags set (white_list={use_as_white_list}): {}",
            self.config.id,
            serde_json::to_string(tag_names).unwrap_or_default()
        );
    }

    async fn disconnect(&self) {
        info!("[{}] Asked to disconnect", self.config.id);
        self.connected.store(false, Ordering::SeqCst);
    }
}
