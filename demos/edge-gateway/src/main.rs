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

//! Plays the historian gateway against a local data root: browse, read on a
//! fixed cadence, pick up new tags, and shut down cleanly on Ctrl-C.

use std::env;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use serde_json::{Map, Value};
use smip_mqtt_connector::factory::{PARAM_DATA_ROOT, PARAM_MODEL_PATH};
use smip_mqtt_connector::{
    ConnectSettings, Connector, ConnectorFactory, HistoryReader, MqttConnectorFactory,
};

const DEFAULT_POLL_SECONDS: u64 = 10;

/// Gateway parameters taken from the environment.
fn parameters_from_env() -> Map<String, Value> {
    let mut parameters = Map::new();
    if let Ok(data_root) = env::var("SMIP_DATA_ROOT") {
        parameters.insert(PARAM_DATA_ROOT.to_string(), Value::String(data_root));
    }
    if let Ok(model_path) = env::var("SMIP_MODEL_PATH") {
        parameters.insert(PARAM_MODEL_PATH.to_string(), Value::String(model_path));
    }
    parameters
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting edge gateway...");

    // 1. Build the connector from gateway parameters
    let mut factory = MqttConnectorFactory::new();
    factory.initialize(parameters_from_env());
    let connector = factory.create();

    // 2. Connect with the installer's connector description
    let connector_info = factory.connector_info()?;
    if !connector.connect(&connector_info).await {
        anyhow::bail!("connector rejected its configuration");
    }

    let poll = connector_info
        .attributes
        .as_ref()
        .and_then(|attributes| {
            let id = connector_info.name.as_deref().unwrap_or("edge-gateway");
            ConnectSettings::from_attributes(id, attributes).data_time_gap_seconds
        })
        .map(|seconds| Duration::from_secs(seconds.into()))
        .unwrap_or(Duration::from_secs(DEFAULT_POLL_SECONDS));

    // 3. Initial browse and one reader over everything
    let tags = connector.browse(false).await;
    info!("Browsed {} tag(s)", tags.len());
    let mut reader = connector.create_reader(tags, true).await;

    let mut ticker = tokio::time::interval(poll);
    let mut last_read = Utc::now();

    // 4. Poll until Ctrl-C
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                let now = Utc::now();
                for result in reader.read_raw(last_read, now).await {
                    for sample in &result.samples {
                        info!("{} = {} @ {}", result.tag, sample.value.trim(), sample.timestamp);
                    }
                }
                last_read = now;

                let new_tags = connector.browse(true).await;
                if !new_tags.is_empty() {
                    warn!("{} new tag(s) discovered; recreating reader", new_tags.len());
                    reader.dispose();
                    reader = connector.create_reader(connector.browse(false).await, true).await;
                }
            }
        }
    }

    reader.dispose();
    connector.disconnect().await;
    Ok(())
}
