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

//! Tag discovery and the adapter-wide state it shares with readers.
//!
//! The gateway asks either for every tag or only for tags it has not seen.
//! "Seen" means reported by the previous browse of this connector, so the
//! previous catalog is kept here and swapped whole on every browse.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog;
use crate::recovery::RecoveryController;
use crate::tag::TagMap;

/// Tags in `current` that `previous` does not have. Removals are not reported.
pub fn diff_catalogs(previous: &TagMap, current: &TagMap) -> TagMap {
    current
        .iter()
        .filter(|(name, _)| !previous.contains_key(*name))
        .map(|(name, tag)| (name.clone(), tag.clone()))
        .collect()
}

/// Which branch a browse took.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Whole current catalog.
    Full(TagMap),
    /// Only tags absent from the previous catalog.
    New(TagMap),
}

impl Selection {
    pub fn into_tags(self) -> TagMap {
        match self {
            Selection::Full(tags) | Selection::New(tags) => tags,
        }
    }
}

/// State shared by a connector and every reader it creates.
pub struct AdapterState {
    previous: RwLock<Arc<TagMap>>,
    read_count: AtomicU64,
    readers: DashMap<Uuid, usize>,
}

impl Default for AdapterState {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterState {
    pub fn new() -> Self {
        Self {
            previous: RwLock::new(Arc::new(TagMap::new())),
            read_count: AtomicU64::new(0),
            readers: DashMap::new(),
        }
    }

    /// Catalog reported by the last browse.
    pub async fn previous_catalog(&self) -> Arc<TagMap> {
        self.previous.read().await.clone()
    }

    /// Make `current` the previous catalog and select what to report.
    ///
    /// The swap and the comparison happen under one write lock, so concurrent
    /// browses each diff against a whole catalog.
    pub async fn select(&self, current: TagMap, new_tags_only: bool) -> Selection {
        let current = Arc::new(current);
        let last = {
            let mut previous = self.previous.write().await;
            std::mem::replace(&mut *previous, Arc::clone(&current))
        };

        if !new_tags_only || current.is_empty() || last.is_empty() {
            return Selection::Full(current.as_ref().clone());
        }
        Selection::New(diff_catalogs(&last, &current))
    }

    /// Browse the topic list at `topic_list`.
    ///
    /// New tags found in `new_tags_only` mode schedule a service cycle; the
    /// call does not wait for it.
    pub async fn discover(
        &self,
        topic_list: &Path,
        new_tags_only: bool,
        recovery: &Arc<RecoveryController>,
    ) -> TagMap {
        let current = current_catalog(topic_list).await;
        match self.select(current, new_tags_only).await {
            Selection::Full(tags) => {
                debug!("Reporting full catalog of {} tag(s)", tags.len());
                tags
            }
            Selection::New(tags) => {
                info!(
                    "New tags are: {}",
                    serde_json::to_string(&tags).unwrap_or_else(|_| format!("{:?}", tags.keys()))
                );
                recovery.cycle_on_new_tags(tags.len());
                tags
            }
        }
    }

    pub fn read_count(&self) -> u64 {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Count one read call; returns the count before it.
    pub fn record_read(&self) -> u64 {
        self.read_count.fetch_add(1, Ordering::SeqCst)
    }

    pub fn reset_read_count(&self) {
        self.read_count.store(0, Ordering::SeqCst);
    }

    pub fn register_reader(&self, id: Uuid, tag_count: usize) {
        self.readers.insert(id, tag_count);
    }

    /// Forget a reader; returns how many are still live.
    pub fn deregister_reader(&self, id: &Uuid) -> usize {
        self.readers.remove(id);
        self.readers.len()
    }

    pub fn active_readers(&self) -> usize {
        self.readers.len()
    }
}

/// Full catalog as currently listed by the subscriber.
pub async fn current_catalog(topic_list: &Path) -> TagMap {
    catalog::build_catalog(catalog::load_topics(topic_list).await)
}
