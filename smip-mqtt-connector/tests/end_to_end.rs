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

//! End-to-end run against a data root laid out the way the subscriber writes it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use smip_mqtt_connector::address::cache_file_for;
use smip_mqtt_connector::{
    Connector, ConnectorInfo, HistoryReader, MqttConnector, MqttConnectorConfig, RecoveryAction, RecoveryStep,
    Sample,
};
use tempfile::tempdir;

struct NoopRecovery;

#[async_trait]
impl RecoveryAction for NoopRecovery {
    fn steps(&self) -> &'static [RecoveryStep] {
        &[RecoveryStep::Restart]
    }

    async fn invoke(&self, _step: RecoveryStep) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_browse_then_read_plain_and_compound_tags() {
    let dir = tempdir().unwrap();
    let config = MqttConnectorConfig::builder("e2e").data_root(dir.path()).build();
    let cache_dir = config.cache_dir();
    std::fs::create_dir_all(&cache_dir).unwrap();
    std::fs::write(config.topic_list_path(), "sensor/1\nsensor/2/:/ts/value\n").unwrap();
    std::fs::write(cache_file_for(&cache_dir, "sensor/1", false), "42.0").unwrap();
    std::fs::write(
        cache_file_for(&cache_dir, "sensor/2", true),
        r#"{"ts":{"value":"7"}}"#,
    )
    .unwrap();

    let connector = MqttConnector::with_recovery_action(config, Arc::new(NoopRecovery));
    let info = ConnectorInfo::with_attributes(json!({ "TagCount": 2 }).as_object().cloned().unwrap());
    assert!(connector.connect(&info).await);

    let tags = connector.browse(false).await;
    assert_eq!(tags.len(), 2);

    let reader = connector.create_reader(tags, true).await;
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = start + Duration::seconds(10);
    let results = reader.read_raw(start, end).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].tag, "sensor/1");
    assert_eq!(results[0].samples, vec![Sample::good("42.0", start)]);
    assert_eq!(results[1].tag, "sensor/2/:/ts/value");
    assert_eq!(results[1].samples, vec![Sample::good("7", end)]);

    // Nothing changed, so a filtered browse has nothing new.
    assert!(connector.browse(true).await.is_empty());

    std::fs::write(
        connector.config().topic_list_path(),
        "sensor/1\nsensor/2/:/ts/value\nsensor/3\n",
    )
    .unwrap();
    let new = connector.browse(true).await;
    assert_eq!(new.keys().collect::<Vec<_>>(), vec!["sensor/3"]);

    reader.dispose();
    connector.disconnect().await;
}
