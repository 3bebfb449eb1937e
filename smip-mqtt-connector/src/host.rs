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

//! Capability traits the historian gateway drives, and the values it exchanges
//! with a connector.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ConnectorInfo;
use crate::tag::TagMap;

/// Quality code the historian reads as "good".
pub const QUALITY_GOOD: u16 = 192;

/// One value of a tag at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub value: String,
    pub quality: u16,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn good(value: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            quality: QUALITY_GOOD,
            timestamp,
        }
    }
}

/// Samples read for one tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagSamples {
    pub tag: String,
    pub samples: Vec<Sample>,
}

/// A data source the gateway can browse and read from.
#[async_trait]
pub trait Connector: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Apply the connector description. Returns `false` only when the
    /// description carries no attributes at all.
    async fn connect(&self, info: &ConnectorInfo) -> bool;

    /// Tags the connector can service; with `new_tags_only`, only those not
    /// reported by the previous browse.
    async fn browse(&self, new_tags_only: bool) -> TagMap;

    /// Reader bound to a fixed subset of tags.
    async fn create_reader(&self, tags: TagMap, accept_start_bound: bool) -> Box<dyn HistoryReader>;

    /// Tags the cloud side configured for historization.
    async fn set_acquired_tags(&self, tag_names: &[String], use_as_white_list: bool);

    async fn disconnect(&self);
}

/// Reads samples for the tags it was created with.
#[async_trait]
pub trait HistoryReader: Send + Sync {
    /// Samples for the reader's tags between `start` and `end`. Tags that
    /// cannot be resolved are left out.
    async fn read_raw(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TagSamples>;

    async fn contains_tag(&self, tag_name: &str) -> bool;

    async fn current_tags(&self) -> TagMap;

    fn dispose(&self);
}

/// Builds connectors for the gateway.
pub trait ConnectorFactory: Send + Sync {
    /// Gateway-level parameters, given once before any `create`.
    fn initialize(&mut self, parameters: Map<String, Value>);

    fn create(&self) -> Box<dyn Connector>;

    /// Connector description to pass to [`Connector::connect`].
    fn connector_info(&self) -> anyhow::Result<ConnectorInfo>;
}
