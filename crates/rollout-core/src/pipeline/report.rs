//! Stage and run reports.

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::environment::DeploymentDecision;
use crate::trigger::RunMetadata;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lint,
    Test,
    Resolve,
    Approval,
    Deploy,
    ServiceCheck,
    Logs,
    HttpCheck,
    Notify,
}

impl Stage {
    pub const ORDER: [Stage; 9] = [
        Stage::Lint,
        Stage::Test,
        Stage::Resolve,
        Stage::Approval,
        Stage::Deploy,
        Stage::ServiceCheck,
        Stage::Logs,
        Stage::HttpCheck,
        Stage::Notify,
    ];

    /// Stages that only run when a deploy happens.
    pub fn is_deploy_stage(self) -> bool {
        matches!(
            self,
            Stage::Approval | Stage::Deploy | Stage::ServiceCheck | Stage::Logs | Stage::HttpCheck
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lint => "lint",
            Stage::Test => "test",
            Stage::Resolve => "resolve",
            Stage::Approval => "approval",
            Stage::Deploy => "deploy",
            Stage::ServiceCheck => "service check",
            Stage::Logs => "logs",
            Stage::HttpCheck => "http check",
            Stage::Notify => "notify",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    pub detail: String,
    pub duration_ms: u64,
}

/// Everything that happened in one run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub app_name: String,
    pub run: RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DeploymentDecision>,
    pub stages: Vec<StageReport>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineReport {
    pub fn new(app_name: &str, run: RunMetadata) -> Self {
        Self {
            app_name: app_name.to_string(),
            run,
            decision: None,
            stages: Vec::new(),
            success: false,
            error: None,
            logs: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(
        &mut self,
        stage: Stage,
        status: StageStatus,
        detail: impl Into<String>,
        started: Instant,
    ) {
        self.stages.push(StageReport {
            stage,
            status,
            detail: detail.into(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    pub fn skip(&mut self, stage: Stage, detail: impl Into<String>) {
        self.stages.push(StageReport {
            stage,
            status: StageStatus::Skipped,
            detail: detail.into(),
            duration_ms: 0,
        });
    }

    /// Mark every stage before `until` that has no report yet as skipped.
    pub fn skip_unreached(&mut self, until: Stage, detail: &str) {
        for stage in Stage::ORDER {
            if stage == until {
                break;
            }
            if self.stage(stage).is_none() {
                self.skip(stage, detail);
            }
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    pub fn status_of(&self, stage: Stage) -> Option<StageStatus> {
        self.stage(stage).map(|r| r.status)
    }

    /// First stage that failed, ignoring notification delivery.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.stages
            .iter()
            .find(|r| r.status == StageStatus::Failed && r.stage != Stage::Notify)
            .map(|r| r.stage)
    }

    pub fn deployed(&self) -> bool {
        self.status_of(Stage::Deploy) == Some(StageStatus::Passed)
    }
}

/// A stage as it would run, without running it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStage {
    pub stage: Stage,
    pub runs: bool,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelinePlan {
    pub app_name: String,
    pub run: RunMetadata,
    pub decision: DeploymentDecision,
    pub stages: Vec<PlannedStage>,
}

impl PipelinePlan {
    pub fn runs(&self, stage: Stage) -> bool {
        self.stages.iter().any(|s| s.stage == stage && s.runs)
    }
}
