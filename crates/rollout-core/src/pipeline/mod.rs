//! Sequential pipeline: lint, test, resolve, approve, deploy, check, notify.
//!
//! A failing stage halts every later stage except notification. There is no
//! retry and no rollback; rolling back is the playbook's job.

pub mod approval;
pub mod error;
pub mod lock;
pub mod report;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::RolloutConfig;
use crate::config::schema::{DEFAULT_LOCK_WAIT_SECS, DEFAULT_LOG_LINES, NotifyPolicy};
use crate::deploy::{AnsibleDeploy, run_deploy};
use crate::environment::{DeploymentDecision, EnvironmentResolver, EnvironmentSelection};
use crate::health::{HttpProbe, ServiceState, health_url, recent_logs, service_status};
use crate::inputs::PipelineInputs;
use crate::notify::{Notification, Notifier, NotifyStatus};
use crate::steps::{DEFAULT_LINT, DEFAULT_TEST, StepCommand, StepRunner};
use crate::trigger::RunMetadata;

pub use approval::{
    ApprovalDecision, ApprovalGate, ApprovalHandle, ApprovalRequest, AutoApprove,
    ChannelApproval, DenyApproval,
};
pub use error::{ApprovalError, PipelineError};
pub use lock::{BranchLock, LockInfo, force_unlock, lock_dir};
pub use report::{PipelinePlan, PipelineReport, PlannedStage, Stage, StageReport, StageStatus};

/// Configuration-derived settings for a run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub lint: StepCommand,
    pub test: StepCommand,
    pub deploy: AnsibleDeploy,
    pub resolver: EnvironmentResolver,
    pub log_lines: u32,
    pub lock_dir: PathBuf,
    pub lock_wait: Duration,
    pub notify_policy: NotifyPolicy,
}

impl PipelineSettings {
    pub fn from_config(
        config: &RolloutConfig,
        project_root: &Path,
        state_dir: &Path,
    ) -> anyhow::Result<Self> {
        let lint = match &config.commands.lint {
            Some(argv) => StepCommand::from_argv(argv)?,
            None => StepCommand::from_argv(&DEFAULT_LINT)?,
        };
        let test = match &config.commands.test {
            Some(argv) => StepCommand::from_argv(argv)?,
            None => StepCommand::from_argv(&DEFAULT_TEST)?,
        };

        Ok(Self {
            lint,
            test,
            deploy: AnsibleDeploy::from_config(config, project_root),
            resolver: EnvironmentResolver::new(config.environment_table()),
            log_lines: config.health.log_lines.unwrap_or(DEFAULT_LOG_LINES),
            lock_dir: lock_dir(state_dir),
            lock_wait: Duration::from_secs(
                config
                    .concurrency
                    .lock_wait_secs
                    .unwrap_or(DEFAULT_LOCK_WAIT_SECS),
            ),
            notify_policy: config.notify.on.unwrap_or_default(),
        })
    }
}

/// One pipeline run over borrowed collaborators.
pub struct Pipeline<'a> {
    settings: PipelineSettings,
    inputs: PipelineInputs,
    run: RunMetadata,
    runner: &'a dyn StepRunner,
    approval: &'a dyn ApprovalGate,
    probe: &'a dyn HttpProbe,
    notifier: Option<&'a dyn Notifier>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        settings: PipelineSettings,
        inputs: PipelineInputs,
        run: RunMetadata,
        runner: &'a dyn StepRunner,
        approval: &'a dyn ApprovalGate,
        probe: &'a dyn HttpProbe,
    ) -> Self {
        Self {
            settings,
            inputs,
            run,
            runner,
            approval,
            probe,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Resolve the branch and decide whether this trigger deploys.
    pub fn decide(&self) -> DeploymentDecision {
        let selection = self
            .settings
            .resolver
            .resolve(&self.run.branch, &self.inputs.environment_hostnames);
        DeploymentDecision::decide(selection, self.run.event)
    }

    /// The stages a run would execute, without side effects.
    pub fn plan(&self) -> PipelinePlan {
        let decision = self.decide();
        let selection = decision.selection();

        let stages = Stage::ORDER
            .into_iter()
            .map(|stage| {
                let (runs, note) = match (stage, selection) {
                    (Stage::Lint, _) => (true, self.settings.lint.display()),
                    (Stage::Test, _) => (true, self.settings.test.display()),
                    (Stage::Resolve, _) => (true, describe_decision(&decision)),
                    (Stage::Approval, Some(sel)) if sel.approval_required => {
                        (true, format!("manual approval required for {}", sel.environment))
                    }
                    (Stage::Approval, Some(_)) => (false, "not required".to_string()),
                    (Stage::Deploy, Some(sel)) => (
                        true,
                        self.settings.deploy.command(sel, &self.inputs).display(),
                    ),
                    (Stage::ServiceCheck, Some(_)) => {
                        (true, format!("systemctl is-active {}", self.inputs.app_name))
                    }
                    (Stage::Logs, Some(_)) => (
                        true,
                        format!(
                            "journalctl -u {} -n {}",
                            self.inputs.app_name, self.settings.log_lines
                        ),
                    ),
                    (Stage::HttpCheck, Some(sel)) => (
                        true,
                        health_url(
                            &sel.hostname,
                            self.inputs.app_port,
                            &self.inputs.health_check_path,
                        )
                        .map(|url| format!("GET {url}"))
                        .unwrap_or_else(|e| e.to_string()),
                    ),
                    (_, None) if stage.is_deploy_stage() => (false, describe_decision(&decision)),
                    (Stage::Notify, _) => self.notify_plan(),
                    _ => (false, String::new()),
                };
                PlannedStage { stage, runs, note }
            })
            .collect();

        PipelinePlan {
            app_name: self.inputs.app_name.clone(),
            run: self.run.clone(),
            decision,
            stages,
        }
    }

    fn notify_plan(&self) -> (bool, String) {
        match (self.notifier, self.settings.notify_policy) {
            (None, _) => (false, "no webhook configured".to_string()),
            (Some(_), NotifyPolicy::Always) => (true, "always".to_string()),
            (Some(_), NotifyPolicy::Failure) => (true, "on failure only".to_string()),
        }
    }

    /// Execute the pipeline. Never returns early: the report always covers
    /// every stage and the notification always reflects the outcome.
    pub fn run(&self) -> PipelineReport {
        let mut report = PipelineReport::new(&self.inputs.app_name, self.run.clone());
        info!(
            app = %self.inputs.app_name,
            branch = %self.run.branch,
            event = %self.run.event,
            "starting pipeline"
        );

        match self.execute(&mut report) {
            Ok(()) => {
                report.success = true;
                info!(branch = %self.run.branch, "pipeline succeeded");
            }
            Err(e) => {
                warn!(branch = %self.run.branch, error = %e, "pipeline failed");
                report.error = Some(e.to_string());
                report.skip_unreached(Stage::Notify, "halted after failure");
            }
        }

        self.notify(&mut report);
        report.finished_at = Some(chrono::Utc::now());
        report
    }

    fn execute(&self, report: &mut PipelineReport) -> Result<(), PipelineError> {
        self.run_check(Stage::Lint, &self.settings.lint, report)?;
        self.run_check(Stage::Test, &self.settings.test, report)?;

        let started = Instant::now();
        let decision = self.decide();
        report.record(
            Stage::Resolve,
            StageStatus::Passed,
            describe_decision(&decision),
            started,
        );
        report.decision = Some(decision.clone());

        let selection = match decision {
            DeploymentDecision::Deploy(selection) => selection,
            skip @ DeploymentDecision::Skip { .. } => {
                info!(branch = %self.run.branch, "no deployment for this run");
                report.skip_unreached(Stage::Notify, &describe_decision(&skip));
                return Ok(());
            }
        };

        self.approve(&selection, report)?;

        let started = Instant::now();
        let _lock = BranchLock::acquire(
            &self.settings.lock_dir,
            &self.run.branch,
            self.settings.lock_wait,
        )
        .inspect_err(|e| {
            report.record(Stage::Deploy, StageStatus::Failed, e.to_string(), started);
        })?;

        match run_deploy(&self.settings.deploy, self.runner, &selection, &self.inputs) {
            Ok(deploy) => report.record(
                Stage::Deploy,
                StageStatus::Passed,
                format!("{} ({})", deploy.hostname, deploy.command),
                started,
            ),
            Err(e) => {
                let reason = format!("{e:#}");
                report.record(Stage::Deploy, StageStatus::Failed, reason.clone(), started);
                return Err(PipelineError::StageFailed {
                    stage: Stage::Deploy,
                    reason,
                });
            }
        }

        self.check_service(report)?;
        self.collect_logs(report);
        self.check_http(&selection, report)?;
        Ok(())
    }

    fn run_check(
        &self,
        stage: Stage,
        command: &StepCommand,
        report: &mut PipelineReport,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        info!(%stage, command = %command.display(), "running");

        let failure = match self.runner.run(command) {
            Ok(output) if output.success => {
                report.record(stage, StageStatus::Passed, command.display(), started);
                return Ok(());
            }
            Ok(output) => output.summary(),
            Err(e) => format!("{e:#}"),
        };

        report.record(stage, StageStatus::Failed, failure.clone(), started);
        Err(PipelineError::StageFailed {
            stage,
            reason: failure,
        })
    }

    fn approve(
        &self,
        selection: &EnvironmentSelection,
        report: &mut PipelineReport,
    ) -> Result<(), PipelineError> {
        if !selection.approval_required {
            report.skip(Stage::Approval, "not required");
            return Ok(());
        }

        let started = Instant::now();
        let request = ApprovalRequest::new(&self.inputs.app_name, selection, &self.run);
        info!(environment = %selection.environment, "waiting for approval");

        let decision = self.approval.wait(&request).inspect_err(|e| {
            report.record(Stage::Approval, StageStatus::Failed, e.to_string(), started);
        })?;

        match decision {
            ApprovalDecision::Approved { approver } => {
                info!(%approver, environment = %selection.environment, "deployment approved");
                report.record(
                    Stage::Approval,
                    StageStatus::Passed,
                    format!("approved by {approver}"),
                    started,
                );
                Ok(())
            }
            ApprovalDecision::Rejected { approver, reason } => {
                let err = PipelineError::ApprovalRejected {
                    environment: selection.environment.to_string(),
                    approver,
                    reason,
                };
                report.record(Stage::Approval, StageStatus::Failed, err.to_string(), started);
                Err(err)
            }
        }
    }

    fn check_service(&self, report: &mut PipelineReport) -> Result<(), PipelineError> {
        let started = Instant::now();
        let reason = match service_status(self.runner, &self.inputs.app_name) {
            Ok(ServiceState::Active) => {
                report.record(Stage::ServiceCheck, StageStatus::Passed, "active", started);
                return Ok(());
            }
            Ok(ServiceState::Inactive(detail)) => {
                format!("{} is not active: {detail}", self.inputs.app_name)
            }
            Err(e) => format!("{e:#}"),
        };

        report.record(Stage::ServiceCheck, StageStatus::Failed, reason.clone(), started);
        Err(PipelineError::StageFailed {
            stage: Stage::ServiceCheck,
            reason,
        })
    }

    fn collect_logs(&self, report: &mut PipelineReport) {
        let started = Instant::now();
        match recent_logs(self.runner, &self.inputs.app_name, self.settings.log_lines) {
            Ok(logs) => {
                let lines = logs.lines().count();
                report.logs = Some(logs);
                report.record(
                    Stage::Logs,
                    StageStatus::Passed,
                    format!("{lines} lines"),
                    started,
                );
            }
            Err(e) => {
                warn!(error = %e, "could not read service logs");
                report.record(
                    Stage::Logs,
                    StageStatus::Skipped,
                    format!("unavailable: {e:#}"),
                    started,
                );
            }
        }
    }

    fn check_http(
        &self,
        selection: &EnvironmentSelection,
        report: &mut PipelineReport,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        let url = health_url(
            &selection.hostname,
            self.inputs.app_port,
            &self.inputs.health_check_path,
        )
        .inspect_err(|e| {
            report.record(Stage::HttpCheck, StageStatus::Failed, format!("{e:#}"), started);
        })?;

        let outcome = self.probe.probe(&url);
        let detail = format!("{} {}", outcome.url, outcome.detail);
        if outcome.passed {
            report.record(Stage::HttpCheck, StageStatus::Passed, detail, started);
            Ok(())
        } else {
            report.record(Stage::HttpCheck, StageStatus::Failed, detail.clone(), started);
            Err(PipelineError::StageFailed {
                stage: Stage::HttpCheck,
                reason: detail,
            })
        }
    }

    fn notify(&self, report: &mut PipelineReport) {
        let Some(notifier) = self.notifier else {
            report.skip(Stage::Notify, "no webhook configured");
            return;
        };

        let status = if report.success {
            NotifyStatus::Success
        } else {
            NotifyStatus::Failure
        };
        if status == NotifyStatus::Success && self.settings.notify_policy == NotifyPolicy::Failure {
            report.skip(Stage::Notify, "notify.on = failure");
            return;
        }

        let selection = report.decision.as_ref().and_then(DeploymentDecision::selection);
        let mut notification =
            Notification::new(status, &self.inputs.app_name, &self.run, selection);
        if let Some(stage) = report.failed_stage() {
            notification = notification.with_failed_stage(stage.to_string());
        }

        let started = Instant::now();
        match notifier.notify(&notification) {
            Ok(()) => report.record(
                Stage::Notify,
                StageStatus::Passed,
                status.to_string(),
                started,
            ),
            Err(e) => {
                warn!(error = %e, "notification delivery failed");
                report.record(Stage::Notify, StageStatus::Failed, format!("{e:#}"), started);
            }
        }
    }
}

fn describe_decision(decision: &DeploymentDecision) -> String {
    match decision {
        DeploymentDecision::Deploy(sel) => format!(
            "{} -> {} ({}){}",
            sel.rule,
            sel.environment,
            sel.hostname,
            if sel.approval_required {
                ", approval required"
            } else {
                ""
            }
        ),
        DeploymentDecision::Skip { reason } => format!("no deploy: {reason}"),
    }
}
