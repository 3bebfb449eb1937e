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

//! Error types for the connector.
//!
//! Most of these never reach the host: per-tag failures are logged and the
//! tag is left out of the read result.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving tags, loading the catalog or parsing config.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Compound tag name did not split into a topic and a payload path.
    #[error("malformed compound tag '{0}'")]
    InvalidCompoundTag(String),

    /// Cache file for a topic could not be read.
    #[error("unable to read cache file {path}: {source}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache file did not hold a JSON document.
    #[error("unable to parse payload in {path}: {source}")]
    PayloadParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Payload path resolved to nothing.
    #[error("field '{path}' not found in payload of topic '{topic}'")]
    FieldNotFound { topic: String, path: String },

    /// Topic list could not be read.
    #[error("unable to read topic list {path}: {source}")]
    TopicList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connect attribute present but not parseable as the expected type.
    #[error("invalid value '{value}' for attribute {key}")]
    InvalidAttribute { key: &'static str, value: String },

    /// Connector description file (`model.json`) missing or malformed.
    #[error("unable to load connector model {path}: {reason}")]
    ModelFile { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
