//! Scripted collaborators for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use url::Url;

use rollout_core::health::{HttpProbe, ProbeOutcome};
use rollout_core::notify::{Notification, Notifier};
use rollout_core::steps::{StepCommand, StepOutput, StepRunner};

/// Answers every command successfully unless told otherwise for its
/// program. `systemctl` reports `active` and `journalctl` returns two lines.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, StepOutput>,
    spawn_errors: Vec<String>,
    calls: Mutex<Vec<StepCommand>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert("systemctl".to_string(), StepOutput::ok("active\n"));
        responses.insert(
            "journalctl".to_string(),
            StepOutput::ok("Started app.\nListening on 0.0.0.0:7868\n"),
        );
        Self {
            responses,
            ..Self::default()
        }
    }

    pub fn respond(mut self, program: &str, output: StepOutput) -> Self {
        self.responses.insert(program.to_string(), output);
        self
    }

    /// Make `program` fail to start.
    pub fn missing(mut self, program: &str) -> Self {
        self.spawn_errors.push(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<StepCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.program).collect()
    }

    pub fn call_for(&self, program: &str) -> Option<StepCommand> {
        self.calls().into_iter().find(|c| c.program == program)
    }
}

impl StepRunner for ScriptedRunner {
    fn run(&self, command: &StepCommand) -> anyhow::Result<StepOutput> {
        self.calls.lock().unwrap().push(command.clone());
        if self.spawn_errors.contains(&command.program) {
            anyhow::bail!("Failed to start '{}'", command.program);
        }
        Ok(self
            .responses
            .get(&command.program)
            .cloned()
            .unwrap_or_else(|| StepOutput::ok("")))
    }
}

/// Returns a fixed verdict and records probed URLs.
pub struct FixedProbe {
    status: u16,
    urls: Mutex<Vec<String>>,
}

impl FixedProbe {
    pub fn healthy() -> Self {
        Self::status(200)
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl HttpProbe for FixedProbe {
    fn probe(&self, url: &Url) -> ProbeOutcome {
        self.urls.lock().unwrap().push(url.to_string());
        ProbeOutcome {
            url: url.to_string(),
            status: Some(self.status),
            passed: (200..300).contains(&self.status),
            detail: format!("HTTP {}", self.status),
        }
    }
}

/// Captures notifications; optionally fails delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            anyhow::bail!("webhook returned HTTP 500");
        }
        Ok(())
    }
}
