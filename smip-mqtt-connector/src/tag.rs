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

//! Tag model exposed to the historian.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;

/// Attribute key carrying the source-side data type hint.
pub const DATA_TYPE_ATTRIBUTE: &str = "DataType";

/// Tags keyed by name.
pub type TagMap = BTreeMap<String, Tag>;

/// Value type the historian stores for a tag.
///
/// Mirrors the OPC UA scalar types the host understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TagType {
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    Boolean,
    DateTime,
    String,
}

impl TagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::SByte => "SByte",
            TagType::Byte => "Byte",
            TagType::Int16 => "Int16",
            TagType::UInt16 => "UInt16",
            TagType::Int32 => "Int32",
            TagType::UInt32 => "UInt32",
            TagType::Int64 => "Int64",
            TagType::UInt64 => "UInt64",
            TagType::Float => "Float",
            TagType::Double => "Double",
            TagType::Boolean => "Boolean",
            TagType::DateTime => "DateTime",
            TagType::String => "String",
        }
    }
}

/// A data point the connector can service.
///
/// Immutable once built; identity is the name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    name: String,
    tag_type: TagType,
    attributes: HashMap<String, Value>,
}

impl Tag {
    /// Build a tag of the given type with its `DataType` attribute set.
    pub fn new(name: impl Into<String>, tag_type: TagType) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert(
            DATA_TYPE_ATTRIBUTE.to_string(),
            Value::String(tag_type.as_str().to_string()),
        );
        Self {
            name: name.into(),
            tag_type,
            attributes,
        }
    }

    /// Every cached topic is served as text.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, TagType::String)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag_type(&self) -> TagType {
        self.tag_type
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_tag_carries_data_type() {
        let tag = Tag::string("sensor/1");
        assert_eq!(tag.name(), "sensor/1");
        assert_eq!(tag.tag_type(), TagType::String);
        assert_eq!(tag.attribute(DATA_TYPE_ATTRIBUTE), Some(&Value::from("String")));
    }

    #[test]
    fn test_typed_tag_attribute_matches_type() {
        let tag = Tag::new("temperature", TagType::Double);
        assert_eq!(tag.attribute(DATA_TYPE_ATTRIBUTE), Some(&Value::from("Double")));
        assert_eq!(tag.attributes().len(), 1);
    }

    #[test]
    fn test_tag_serializes_for_logging() {
        let json = serde_json::to_value(Tag::string("a")).unwrap();
        assert_eq!(json["name"], "a");
        assert_eq!(json["tag_type"], "String");
        assert_eq!(json["attributes"]["DataType"], "String");
    }
}
