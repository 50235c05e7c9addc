//! Rollout Core Library
//!
//! Branch-driven deployment gating: maps a branch to a target environment,
//! runs checks, waits for approval where required, deploys with Ansible,
//! verifies the service and reports to Slack.

pub mod config;
pub mod context;
pub mod deploy;
pub mod environment;
pub mod health;
pub mod inputs;
pub mod notify;
pub mod pipeline;
pub mod steps;
pub mod trigger;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigScope, ConfigStore, RolloutConfig};
    pub use crate::context::AppContext;

    // Environment resolution
    pub use crate::environment::{
        DeploymentDecision, EnvironmentResolver, EnvironmentSelection, HostnameOverrides,
        resolve_environment,
    };
    pub use crate::types::{Environment, TriggerEvent};

    // Pipeline
    pub use crate::inputs::{InputOverrides, PipelineInputs};
    pub use crate::pipeline::{
        ApprovalGate, Pipeline, PipelineError, PipelineReport, PipelineSettings, Stage,
    };
    pub use crate::steps::{ProcessRunner, StepCommand, StepRunner};
    pub use crate::trigger::RunMetadata;

    // Checks and notifications
    pub use crate::health::{HttpProbe, ReqwestProbe};
    pub use crate::notify::{Notifier, SlackNotifier};
}
