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

//! Topic list loading.
//!
//! The subscriber process rewrites the topic list while we read it, and may
//! not have written it at all yet. Neither case is an error for discovery:
//! the loader hands back whatever it could read, or nothing.

use std::io::ErrorKind;
use std::path::Path;

use log::{debug, warn};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{ConnectorError, Result};
use crate::tag::{Tag, TagMap};

/// Read the topic list, one topic per line, in file order.
///
/// Missing or unreadable files yield an empty list.
pub async fn load_topics(path: &Path) -> Vec<String> {
    match read_topics(path).await {
        Ok(topics) => topics,
        Err(ConnectorError::TopicList { source, .. }) if source.kind() == ErrorKind::NotFound => {
            debug!("Topic list {} not written yet", path.display());
            Vec::new()
        }
        Err(e) => {
            warn!("{e}; continuing with an empty catalog");
            Vec::new()
        }
    }
}

async fn read_topics(path: &Path) -> Result<Vec<String>> {
    let to_error = |source: std::io::Error| ConnectorError::TopicList {
        path: path.to_path_buf(),
        source,
    };

    // Opened read-only; the writer keeps its handle.
    let file = File::open(path).await.map_err(to_error)?;
    let mut lines = BufReader::new(file).lines();

    let mut topics = Vec::new();
    while let Some(line) = lines.next_line().await.map_err(to_error)? {
        let topic = line.trim_end_matches('\r');
        if topic.trim().is_empty() {
            continue;
        }
        topics.push(topic.to_string());
    }
    Ok(topics)
}

/// One string tag per topic; repeated topics collapse into one entry.
pub fn build_catalog<I>(topics: I) -> TagMap
where
    I: IntoIterator<Item = String>,
{
    topics
        .into_iter()
        .map(|topic| (topic.clone(), Tag::string(topic)))
        .collect()
}

/// Whether `name` is literally one of the lines of the topic list.
///
/// Compound tag names are matched as written, so they only match if the
/// subscriber lists them verbatim.
pub async fn topic_listed(path: &Path, name: &str) -> bool {
    load_topics(path).await.iter().any(|topic| topic == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_loads_lines_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("topics");
        std::fs::write(&path, "b/2\r\na/1\n\nc/3/:/x\n\n").unwrap();

        assert_eq!(load_topics(&path).await, vec!["b/2", "a/1", "c/3/:/x"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(load_topics(&dir.path().join("absent")).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("topics");
        std::fs::write(&path, [0x61, 0xff, 0xfe, b'\n']).unwrap();

        assert!(load_topics(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_directory_instead_of_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(load_topics(dir.path()).await.is_empty());
    }

    #[test]
    fn test_catalog_deduplicates() {
        let catalog = build_catalog(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog["a"].name(), "a");
    }

    #[tokio::test]
    async fn test_topic_listed_matches_raw_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("topics");
        std::fs::write(&path, "sensor/2\nsensor/3/:/a/b\n").unwrap();

        assert!(topic_listed(&path, "sensor/2").await);
        assert!(topic_listed(&path, "sensor/3/:/a/b").await);
        assert!(!topic_listed(&path, "sensor/2/:/value").await);
        assert!(!topic_listed(&path, "sensor").await);
    }
}
