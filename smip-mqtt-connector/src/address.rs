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

//! Tag-name addressing into the payload cache.
//!
//! A tag is either a bare topic or `topic/:/path/into/payload`. Topics map to
//! cache files named by the base64 of the topic so that `/` and other
//! characters never reach the file system as separators.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{ConnectorError, Result};

/// Token joining a topic and a payload path in a compound tag name.
pub const COMPOUND_SEPARATOR: &str = "/:/";

/// Cache file suffix for plain topics (verbatim last payload).
pub const PLAIN_SUFFIX: &str = ".json";

/// Cache file suffix for topics read through a payload path (JSON document).
pub const COMPOUND_SUFFIX: &str = ".txt";

/// Where a tag's value lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagAddress<'a> {
    /// The whole last payload of a topic.
    Plain { topic: &'a str },
    /// One field of a topic's JSON payload, `path` in dot notation.
    Compound { topic: &'a str, path: String },
}

impl<'a> TagAddress<'a> {
    /// Decode a tag name.
    ///
    /// A name containing the separator must split into exactly one non-empty
    /// topic and one non-empty path.
    pub fn decode(tag_name: &'a str) -> Result<Self> {
        if !tag_name.contains(COMPOUND_SEPARATOR) {
            return Ok(TagAddress::Plain { topic: tag_name });
        }

        let parts: Vec<&str> = tag_name.split(COMPOUND_SEPARATOR).collect();
        match parts.as_slice() {
            [topic, path] if !topic.is_empty() && !path.is_empty() => Ok(TagAddress::Compound {
                topic: *topic,
                path: path.replace('/', "."),
            }),
            _ => Err(ConnectorError::InvalidCompoundTag(tag_name.to_string())),
        }
    }

    pub fn topic(&self) -> &'a str {
        match self {
            TagAddress::Plain { topic } | TagAddress::Compound { topic, .. } => topic,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, TagAddress::Compound { .. })
    }

    /// Cache file backing this address inside `cache_dir`.
    pub fn cache_file(&self, cache_dir: &Path) -> PathBuf {
        cache_file_for(cache_dir, self.topic(), self.is_compound())
    }
}

/// File-name-safe, reversible encoding of a topic.
///
/// Must agree byte for byte with the subscriber that writes the cache.
pub fn encode_topic(topic: &str) -> String {
    STANDARD.encode(topic.as_bytes())
}

/// Cache file for `topic`; compound readers use the JSON document variant.
pub fn cache_file_for(cache_dir: &Path, topic: &str, compound: bool) -> PathBuf {
    let suffix = if compound { COMPOUND_SUFFIX } else { PLAIN_SUFFIX };
    cache_dir.join(format!("{}{suffix}", encode_topic(topic)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_topic() {
        let address = TagAddress::decode("sensors/line1/temp").unwrap();
        assert_eq!(
            address,
            TagAddress::Plain {
                topic: "sensors/line1/temp"
            }
        );
        assert!(!address.is_compound());
    }

    #[test]
    fn test_compound_path_uses_dots() {
        let address = TagAddress::decode("abc/:/x/y/z").unwrap();
        assert_eq!(
            address,
            TagAddress::Compound {
                topic: "abc",
                path: "x.y.z".to_string()
            }
        );
        assert_eq!(address.topic(), "abc");
    }

    #[test]
    fn test_empty_path_is_invalid() {
        assert!(matches!(
            TagAddress::decode("abc/:/"),
            Err(ConnectorError::InvalidCompoundTag(_))
        ));
    }

    #[test]
    fn test_empty_topic_is_invalid() {
        assert!(TagAddress::decode("/:/x").is_err());
    }

    #[test]
    fn test_repeated_separator_is_invalid() {
        assert!(TagAddress::decode("a/:/b/:/c").is_err());
    }

    #[test]
    fn test_encode_topic_is_base64() {
        assert_eq!(encode_topic("sensor/1"), "c2Vuc29yLzE=");
        assert_eq!(encode_topic("sensor/1"), encode_topic("sensor/1"));
    }

    #[test]
    fn test_cache_file_suffix_depends_on_kind() {
        let dir = Path::new("/data/MqttHist");
        let plain = TagAddress::decode("sensor/1").unwrap().cache_file(dir);
        let compound = TagAddress::decode("sensor/1/:/v").unwrap().cache_file(dir);

        assert_eq!(plain, dir.join("c2Vuc29yLzE=.json"));
        assert_eq!(compound, dir.join("c2Vuc29yLzE=.txt"));
        assert_eq!(plain, cache_file_for(dir, "sensor/1", false));
    }
}
