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

//! Payload mapping utilities for pulling one field out of a cached JSON payload.

use serde_json::Value;

/// Parses `payload` as JSON and renders the value at `path`.
///
/// `path` is dot separated; a segment may index arrays either as a bare
/// number (`items.0`) or with brackets (`items[0]`). Returns `Ok(None)` when
/// the path resolves to nothing or to `null`.
///
/// # Arguments
/// * `payload` - Raw JSON bytes from the cache file.
/// * `path` - Dot path into the document (e.g. `"ts.value"`).
pub fn extract_field(payload: &[u8], path: &str) -> Result<Option<String>, serde_json::Error> {
    let json: Value = serde_json::from_slice(payload)?;
    Ok(select_path(&json, path).and_then(render))
}

/// Walk `root` along a dot path.
pub fn select_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    root.pointer(&to_pointer(path)?)
}

/// Rewrites a dot path (`items[0].v`) as a JSON pointer (`/items/0/v`).
fn to_pointer(path: &str) -> Option<String> {
    let mut pointer = String::new();
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }

        let (name, mut indices) = match segment.find('[') {
            Some(i) => segment.split_at(i),
            None => (segment, ""),
        };
        if !name.is_empty() {
            pointer.push('/');
            pointer.push_str(&name.replace('~', "~0").replace('/', "~1"));
        }

        while let Some(rest) = indices.strip_prefix('[') {
            let close = rest.find(']')?;
            let index: usize = rest[..close].trim().parse().ok()?;
            pointer.push('/');
            pointer.push_str(&index.to_string());
            indices = &rest[close + 1..];
        }

        // Anything left over is not an index expression.
        if !indices.is_empty() {
            return None;
        }
    }
    Some(pointer)
}

/// Text sent to the historian for a JSON value.
fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_string_field() {
        let payload = br#"{"ts": {"value": "7"}}"#;
        assert_eq!(extract_field(payload, "ts.value").unwrap().as_deref(), Some("7"));
    }

    #[test]
    fn test_numeric_and_bool_fields_render_as_json_text() {
        let payload = br#"{"temp": 25.5, "on": true, "count": 3}"#;
        assert_eq!(extract_field(payload, "temp").unwrap().as_deref(), Some("25.5"));
        assert_eq!(extract_field(payload, "on").unwrap().as_deref(), Some("true"));
        assert_eq!(extract_field(payload, "count").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_object_field_renders_compact_json() {
        let payload = br#"{"a": {"b": [1, 2]}}"#;
        assert_eq!(extract_field(payload, "a").unwrap().as_deref(), Some(r#"{"b":[1,2]}"#));
    }

    #[test]
    fn test_array_indexing() {
        let payload = br#"{"items": [{"v": "x"}, {"v": "y"}], "grid": [[1, 2], [3, 4]]}"#;
        assert_eq!(extract_field(payload, "items.1.v").unwrap().as_deref(), Some("y"));
        assert_eq!(extract_field(payload, "items[0].v").unwrap().as_deref(), Some("x"));
        assert_eq!(extract_field(payload, "grid[1][0]").unwrap().as_deref(), Some("3"));
        assert_eq!(extract_field(payload, "items[5].v").unwrap(), None);
    }

    #[test]
    fn test_missing_or_null_field_is_none() {
        let payload = br#"{"a": null, "b": 1}"#;
        assert_eq!(extract_field(payload, "a").unwrap(), None);
        assert_eq!(extract_field(payload, "c").unwrap(), None);
        assert_eq!(extract_field(payload, "b.c").unwrap(), None);
        assert_eq!(extract_field(payload, "b..c").unwrap(), None);
        assert_eq!(extract_field(payload, "b[0]x").unwrap(), None);
    }

    #[test]
    fn test_pointer_tokens_are_escaped() {
        assert_eq!(to_pointer("a~b.c[2]").as_deref(), Some("/a~0b/c/2"));
        let payload = br#"{"a~b": {"c": [0, 0, "z"]}}"#;
        assert_eq!(extract_field(payload, "a~b.c[2]").unwrap().as_deref(), Some("z"));
    }

    #[test]
    fn test_invalid_json() {
        let payload = b"not json";
        assert!(extract_field(payload, "a").is_err());
    }
}
