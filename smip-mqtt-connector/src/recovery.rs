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

//! Gateway service recovery.
//!
//! The gateway only re-reads the tag list when its host-facing service is
//! restarted. Two triggers restart it: discovery finding new tags, and the
//! reaper after a reader has served its configured number of reads. Both run
//! the recovery action on a detached task; the outcome is only logged.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use log::{error, info};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::config::{ConnectSettings, RecoveryCommand};

/// One invocation of a recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    Stop,
    Start,
    Restart,
}

const STOP_START: &[RecoveryStep] = &[RecoveryStep::Stop, RecoveryStep::Start];
const RESTART: &[RecoveryStep] = &[RecoveryStep::Restart];

/// External action that cycles the gateway service.
#[async_trait]
pub trait RecoveryAction: Send + Sync {
    /// Steps in order; consecutive steps are one cycle time apart.
    fn steps(&self) -> &'static [RecoveryStep];

    async fn invoke(&self, step: RecoveryStep) -> anyhow::Result<()>;
}

/// Runs the configured [`RecoveryCommand`] as a child process.
pub struct CommandRecovery {
    command: RecoveryCommand,
}

impl CommandRecovery {
    pub fn new(command: RecoveryCommand) -> Self {
        Self { command }
    }

    fn command_line(&self, step: RecoveryStep) -> (String, Vec<String>) {
        match &self.command {
            RecoveryCommand::ServiceControl { program, service } => {
                let verb = match step {
                    RecoveryStep::Stop => "stop",
                    RecoveryStep::Start | RecoveryStep::Restart => "start",
                };
                (program.clone(), vec![verb.to_string(), service.clone()])
            }
            RecoveryCommand::Script { path } => (path.display().to_string(), Vec::new()),
        }
    }
}

#[async_trait]
impl RecoveryAction for CommandRecovery {
    fn steps(&self) -> &'static [RecoveryStep] {
        match self.command {
            RecoveryCommand::ServiceControl { .. } => STOP_START,
            RecoveryCommand::Script { .. } => RESTART,
        }
    }

    async fn invoke(&self, step: RecoveryStep) -> anyhow::Result<()> {
        let (program, args) = self.command_line(step);
        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run {program} {}", args.join(" ")))?;

        if !output.status.success() {
            bail!(
                "{program} {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Decides when to cycle the gateway service and runs the action.
pub struct RecoveryController {
    id: String,
    action: Arc<dyn RecoveryAction>,
    settings: ConnectSettings,
    fired: AtomicU64,
}

impl RecoveryController {
    pub fn new(
        id: impl Into<String>,
        action: Arc<dyn RecoveryAction>,
        settings: ConnectSettings,
    ) -> Self {
        Self {
            id: id.into(),
            action,
            settings,
            fired: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &ConnectSettings {
        &self.settings
    }

    /// Number of recoveries started so far.
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::SeqCst)
    }

    /// Schedule a recovery after discovery reported `new_tags` new tags.
    ///
    /// Every call schedules its own recovery; overlapping ones are not merged.
    pub fn cycle_on_new_tags(self: &Arc<Self>, new_tags: usize) -> Option<JoinHandle<()>> {
        if !self.settings.cycle_on_new_tag || new_tags == 0 {
            return None;
        }

        let delay = self.settings.cycle_time * 2;
        info!(
            "[{}] {new_tags} new tag(s); cycling gateway service in {} ms",
            self.id,
            delay.as_millis()
        );
        let controller = Arc::clone(self);
        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.run("new tags").await;
        }))
    }

    /// Cycle the service now on behalf of the reaper.
    pub fn reap(self: &Arc<Self>, reader: &str) -> JoinHandle<()> {
        info!("[{}] Reader {reader} reached its max life; cycling gateway service", self.id);
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.run("reaper").await })
    }

    async fn run(&self, reason: &str) {
        self.fired.fetch_add(1, Ordering::SeqCst);
        for (i, step) in self.action.steps().iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.settings.cycle_time).await;
            }
            match self.action.invoke(*step).await {
                Ok(()) => info!("[{}] Recovery step {step:?} ({reason}) done", self.id),
                Err(e) => error!("[{}] Recovery step {step:?} ({reason}) failed: {e:#}", self.id),
            }
        }
    }
}

/// Per-reader read counter driving the reaper.
pub struct Reaper {
    max_life: Option<u64>,
    count: AtomicU64,
}

impl Reaper {
    pub fn new(max_life: Option<u64>) -> Self {
        Self {
            max_life,
            count: AtomicU64::new(0),
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Count one read. Returns `true` when this read reached the max life; the
    /// counter is back at zero in that case.
    pub fn record_read(&self) -> bool {
        let Some(max_life) = self.max_life else {
            return false;
        };

        let mut reached = false;
        let updated = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                let next = count + 1;
                reached = next >= max_life;
                Some(if reached { 0 } else { next })
            })
            .is_ok();
        updated && reached
    }
}
