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

//! Reader serving samples from the payload cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::address::TagAddress;
use crate::catalog;
use crate::config::MqttConnectorConfig;
use crate::discovery::AdapterState;
use crate::error::{ConnectorError, Result};
use crate::host::{HistoryReader, Sample, TagSamples};
use crate::mapper;
use crate::recovery::{Reaper, RecoveryController};
use crate::tag::TagMap;

/// Reads beyond this adapter-wide count are logged without the tag list.
const VERBOSE_READS: u64 = 2;

/// Reader bound to one chunk of tags chosen by the gateway.
pub struct MqttReader {
    id: Uuid,
    tags: TagMap,
    accept_start_bound: bool,
    config: Arc<MqttConnectorConfig>,
    state: Arc<AdapterState>,
    recovery: Arc<RecoveryController>,
    reaper: Reaper,
    disposed: AtomicBool,
}

impl MqttReader {
    pub fn new(
        tags: TagMap,
        accept_start_bound: bool,
        config: Arc<MqttConnectorConfig>,
        state: Arc<AdapterState>,
        recovery: Arc<RecoveryController>,
    ) -> Self {
        let id = Uuid::new_v4();
        state.register_reader(id, tags.len());
        info!(
            "[reader {id}] Constructed for {}",
            serde_json::to_string(&tags.keys().collect::<Vec<_>>()).unwrap_or_default()
        );

        let reaper = Reaper::new(recovery.settings().reaper_max_life);
        Self {
            id,
            tags,
            accept_start_bound,
            config,
            state,
            recovery,
            reaper,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    pub fn accepts_start_bound(&self) -> bool {
        self.accept_start_bound
    }

    /// Reads served since the reaper last fired.
    pub fn reaper_count(&self) -> u64 {
        self.reaper.count()
    }

    async fn read_tag(&self, tag: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Sample> {
        let address = TagAddress::decode(tag)?;
        let file = address.cache_file(&self.config.cache_dir());

        match &address {
            TagAddress::Compound { topic, path } => {
                let payload = tokio::fs::read(&file)
                    .await
                    .map_err(|source| ConnectorError::CacheRead {
                        path: file.clone(),
                        source,
                    })?;
                let value = mapper::extract_field(&payload, path)
                    .map_err(|source| ConnectorError::PayloadParse {
                        path: file.clone(),
                        source,
                    })?
                    .ok_or_else(|| ConnectorError::FieldNotFound {
                        topic: topic.to_string(),
                        path: path.clone(),
                    })?;
                Ok(Sample::good(value, end))
            }
            TagAddress::Plain { .. } => {
                let payload = tokio::fs::read(&file)
                    .await
                    .map_err(|source| ConnectorError::CacheRead {
                        path: file.clone(),
                        source,
                    })?;
                // Payloads are not guaranteed to be UTF-8.
                let value = String::from_utf8_lossy(&payload).into_owned();
                Ok(Sample::good(value, start))
            }
        }
    }
}

#[async_trait]
impl HistoryReader for MqttReader {
    async fn read_raw(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TagSamples> {
        let id = self.id;
        if self.state.record_read() < VERBOSE_READS {
            info!(
                "[reader {id}] Reading raw {start}..{end} for {}",
                serde_json::to_string(&self.tags).unwrap_or_default()
            );
        } else {
            info!("[reader {id}] Reading raw {start}..{end}");
        }

        let mut results = Vec::with_capacity(self.tags.len());
        for tag in self.tags.keys() {
            match self.read_tag(tag, start, end).await {
                Ok(sample) => results.push(TagSamples {
                    tag: tag.clone(),
                    samples: vec![sample],
                }),
                Err(e) => warn!("[reader {id}] Skipping tag '{tag}': {e}"),
            }
        }
        debug!("[reader {id}] Resolved {}/{} tag(s)", results.len(), self.tags.len());

        if self.reaper.record_read() {
            self.recovery.reap(&id.to_string());
        }
        results
    }

    async fn contains_tag(&self, tag_name: &str) -> bool {
        info!("[reader {}] Asked whether it contains tag {tag_name}", self.id);
        catalog::topic_listed(&self.config.topic_list_path(), tag_name).await
    }

    /// Full browse, regardless of this reader's own tags.
    async fn current_tags(&self) -> TagMap {
        info!("[reader {}] Asked for current tags", self.id);
        self.state
            .discover(&self.config.topic_list_path(), false, &self.recovery)
            .await
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.reset_read_count();
        let remaining = self.state.deregister_reader(&self.id);
        info!("[reader {}] Disposed; {remaining} reader(s) still live", self.id);
    }
}

impl Drop for MqttReader {
    /// Drops the registry entry of a reader the host never disposed. The
    /// adapter read count is left alone.
    fn drop(&mut self) {
        if !*self.disposed.get_mut() {
            let remaining = self.state.deregister_reader(&self.id);
            debug!("[reader {}] Dropped undisposed; {remaining} reader(s) still live", self.id);
        }
    }
}
