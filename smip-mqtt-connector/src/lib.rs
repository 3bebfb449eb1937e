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

//! Historian connector serving tags from a file-based MQTT payload cache.
//!
//! A separate subscriber process keeps the last payload of every MQTT topic
//! in a cache directory and lists the topics it has seen in a topic list.
//! This crate exposes those topics to a pull-based historian gateway: browse
//! reports the listed topics as tags (optionally only the new ones), and
//! readers return each tag's cached value. A tag written as
//! `topic/:/path/to/field` reads one field out of the topic's JSON payload.
//!
//! # Example
//!
//! ```ignore
//! use smip_mqtt_connector::{Connector, ConnectorInfo, HistoryReader, MqttConnector, MqttConnectorConfig};
//!
//! let config = MqttConnectorConfig::builder("mqtt-cache")
//!     .data_root("/opt/thinkiq/dataroot")
//!     .build();
//!
//! let connector = MqttConnector::new(config);
//! connector.connect(&ConnectorInfo::from_json(&model_json)?).await;
//!
//! let tags = connector.browse(false).await;
//! let reader = connector.create_reader(tags, true).await;
//! let samples = reader.read_raw(start, end).await;
//! ```

pub mod address;
pub mod catalog;
pub mod config;
pub mod connector;
pub mod discovery;
pub mod error;
pub mod factory;
pub mod host;
pub mod mapper;
pub mod reader;
pub mod recovery;
pub mod tag;

pub use config::{
    ConnectSettings, ConnectorInfo, MqttConnectorConfig, MqttConnectorConfigBuilder,
    RecoveryCommand,
};
pub use connector::MqttConnector;
pub use error::ConnectorError;
pub use factory::MqttConnectorFactory;
pub use host::{Connector, ConnectorFactory, HistoryReader, Sample, TagSamples, QUALITY_GOOD};
pub use reader::MqttReader;
pub use recovery::{RecoveryAction, RecoveryStep};
pub use tag::{Tag, TagMap, TagType};
