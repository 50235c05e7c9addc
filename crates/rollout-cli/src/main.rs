//! Rollout - branch-gated deployment pipeline
//!
//! Usage:
//!   rollout resolve main     # Which environment would this branch deploy to?
//!   rollout plan             # Stages a run would execute
//!   rollout run              # Lint, test, deploy, check, notify
//!   rollout init             # Write a starter rollout.toml
//!   rollout unlock <branch>  # Remove a stale branch lock

mod interactive;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollout_core::config::schema::{ConcurrencySection, NotifySection};
use rollout_core::config::{NotifyPolicy, RolloutConfig};
use rollout_core::context::AppContext;
use rollout_core::environment::{DeploymentDecision, EnvironmentResolver, HostnameOverrides};
use rollout_core::health::ReqwestProbe;
use rollout_core::inputs::{InputOverrides, PipelineInputs};
use rollout_core::notify::SlackNotifier;
use rollout_core::pipeline::{
    ApprovalGate, AutoApprove, DenyApproval, Pipeline, PipelinePlan, PipelineReport, StageStatus,
    force_unlock,
};
use rollout_core::trigger::{RunMetadata, metadata_from_repository};
use rollout_core::types::{ConfigScope, TriggerEvent};

use crate::interactive::{PromptApproval, local_approver};

#[derive(Parser)]
#[command(name = "rollout")]
#[command(about = "Branch-gated deployment pipeline", long_about = None)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which environment a branch deploys to
    Resolve {
        /// Branch name (`refs/heads/` prefix allowed)
        branch: String,

        /// Triggering event (push or pull-request)
        #[arg(long, default_value = "push")]
        event: String,

        /// Hostname overrides, e.g. dev=custom-dev01,prod=custom-prod01
        #[arg(long)]
        hostnames: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the stages a run would execute without running them
    Plan(RunArgs),

    /// Run the pipeline
    Run {
        #[command(flatten)]
        args: RunArgs,

        /// Approve gated deployments without prompting
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Write a starter rollout.toml
    Init {
        /// Application name (defaults to the project directory name)
        #[arg(long)]
        app_name: Option<String>,

        /// Write the global config instead of the project config
        #[arg(short = 'g', long)]
        global: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove a stale lock left by an interrupted deploy
    Unlock {
        /// Branch whose lock to remove
        branch: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Branch to resolve (defaults to GitHub Actions or the git checkout)
    #[arg(long)]
    branch: Option<String>,

    /// Triggering event (push or pull-request)
    #[arg(long)]
    event: Option<String>,

    /// Commit id reported in notifications
    #[arg(long)]
    commit: Option<String>,

    /// Who triggered the run
    #[arg(long)]
    actor: Option<String>,

    /// Repository reported in notifications (owner/name)
    #[arg(long)]
    repository: Option<String>,

    /// Application name (systemd unit and Ansible app_name)
    #[arg(long)]
    app_name: Option<String>,

    /// Application port
    #[arg(long)]
    app_port: Option<String>,

    /// Python version passed to the playbook
    #[arg(long)]
    python_version: Option<String>,

    /// Hostname overrides, e.g. dev=custom-dev01,prod=custom-prod01
    #[arg(long)]
    hostnames: Option<String>,

    /// Health endpoint path
    #[arg(long)]
    health_check_path: Option<String>,

    /// Slack incoming webhook URL
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    slack_webhook_url: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

impl RunArgs {
    fn overrides(&self) -> InputOverrides {
        InputOverrides {
            app_name: self.app_name.clone(),
            app_port: self.app_port.clone(),
            python_version: self.python_version.clone(),
            environment_hostnames: self.hostnames.clone(),
            health_check_path: self.health_check_path.clone(),
            slack_webhook_url: self.slack_webhook_url.clone(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only show failures (non-zero exit if the run fails)
    Quiet,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollout=info,rollout_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let project_root = match cli.project {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let ctx = AppContext::new(project_root)?;

    let success = match cli.command {
        Commands::Resolve {
            branch,
            event,
            hostnames,
            format,
        } => run_resolve(&ctx, &branch, &event, hostnames.as_deref(), format)?,
        Commands::Plan(args) => run_plan(&ctx, &args)?,
        Commands::Run { args, yes } => run_pipeline(&ctx, &args, yes)?,
        Commands::Init {
            app_name,
            global,
            force,
            format,
        } => run_init(&ctx, app_name, global, force, format)?,
        Commands::Unlock { branch, format } => run_unlock(&ctx, &branch, format)?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_event(raw: &str) -> Result<TriggerEvent> {
    TriggerEvent::parse(raw)
        .ok_or_else(|| anyhow::anyhow!("Unknown event '{raw}'. Use push or pull-request"))
}

fn run_resolve(
    ctx: &AppContext,
    branch: &str,
    event: &str,
    hostnames: Option<&str>,
    format: OutputFormat,
) -> Result<bool> {
    let event = parse_event(event)?;
    let config = ctx.load_merged_config()?;
    let overrides =
        HostnameOverrides::parse_opt(hostnames.or(config.app.environment_hostnames.as_deref()))?;

    let resolver = EnvironmentResolver::new(config.environment_table());
    let decision = DeploymentDecision::decide(resolver.resolve(branch, &overrides), event);

    match format {
        OutputFormat::Table => match &decision {
            DeploymentDecision::Deploy(sel) => {
                println!("Branch:      {branch}");
                println!("Rule:        {}", sel.rule);
                println!("Environment: {} ({})", sel.environment, sel.key);
                println!("Hostname:    {}", sel.hostname);
                println!("Runner:      {}", sel.runner);
                if let Some(inventory) = &sel.inventory {
                    println!("Inventory:   {}", inventory.display());
                }
                println!(
                    "Approval:    {}",
                    if sel.approval_required {
                        "required"
                    } else {
                        "not required"
                    }
                );
            }
            DeploymentDecision::Skip { reason } => {
                println!("Branch '{branch}' does not deploy: {reason}");
            }
        },
        OutputFormat::Json => {
            let output = serde_json::json!({
                "branch": branch,
                "event": event,
                "decision": decision,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => {
            if let Some(sel) = decision.selection() {
                println!("{}", sel.key);
            }
        }
    }

    Ok(true)
}

/// Run metadata: GitHub Actions variables, else the local checkout, then
/// command-line flags on top.
fn run_metadata(ctx: &AppContext, args: &RunArgs) -> Result<RunMetadata> {
    let discovered = match RunMetadata::from_process_env() {
        Some(run) => Ok(run),
        None => metadata_from_repository(ctx.project_root()),
    };

    let mut run = match (discovered, &args.branch) {
        (Ok(run), _) => run,
        (Err(e), Some(_)) => {
            debug!(error = %e, "no git metadata; using flags only");
            RunMetadata::new("", TriggerEvent::Push)
        }
        (Err(e), None) => {
            return Err(e.context("Could not determine the branch. Pass --branch"));
        }
    };

    if let Some(branch) = &args.branch {
        run.branch = branch.clone();
    }
    if let Some(event) = &args.event {
        run.event = parse_event(event)?;
    }
    if let Some(commit) = &args.commit {
        run = run.with_commit(commit.clone());
    }
    if let Some(actor) = &args.actor {
        run = run.with_actor(actor.clone());
    }
    if let Some(repository) = &args.repository {
        run = run.with_repository(repository.clone());
    }
    Ok(run)
}

fn run_plan(ctx: &AppContext, args: &RunArgs) -> Result<bool> {
    let config = ctx.load_merged_config()?;
    let inputs = PipelineInputs::resolve(&config, &args.overrides())?;
    let run = run_metadata(ctx, args)?;
    let settings = ctx.pipeline_settings(&config)?;

    let runner = ctx.process_runner();
    let approval = DenyApproval::new("plan does not deploy");
    let probe = ReqwestProbe::from_config(&config);
    let notifier = inputs.slack_webhook_url.clone().map(SlackNotifier::new);

    let mut pipeline = Pipeline::new(settings, inputs, run, &runner, &approval, &probe);
    if let Some(notifier) = &notifier {
        pipeline = pipeline.with_notifier(notifier);
    }

    print_plan(&pipeline.plan(), args.format)?;
    Ok(true)
}

fn print_plan(plan: &PipelinePlan, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!(
                "{} on '{}' ({})",
                plan.app_name, plan.run.branch, plan.run.event
            );
            println!();
            println!("{:<14} {:<5} Detail", "Stage", "Runs");
            println!("{}", "-".repeat(70));
            for stage in &plan.stages {
                println!(
                    "{:<14} {:<5} {}",
                    stage.stage.to_string(),
                    if stage.runs { "yes" } else { "no" },
                    stage.note
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(plan)?);
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

fn run_pipeline(ctx: &AppContext, args: &RunArgs, yes: bool) -> Result<bool> {
    let config = ctx.load_merged_config()?;
    let inputs = PipelineInputs::resolve(&config, &args.overrides())?;
    let run = run_metadata(ctx, args)?;
    let settings = ctx.pipeline_settings(&config)?;

    let runner = ctx.process_runner();
    let probe = ReqwestProbe::from_config(&config);
    let timeout = config.approval.timeout_secs.map(Duration::from_secs);
    let approval: Box<dyn ApprovalGate> = if yes {
        Box::new(AutoApprove::new(local_approver()))
    } else if PromptApproval::available() {
        Box::new(PromptApproval::new(local_approver(), timeout))
    } else {
        Box::new(DenyApproval::new(
            "no terminal to prompt for approval; pass --yes to approve",
        ))
    };
    let notifier = inputs.slack_webhook_url.clone().map(SlackNotifier::new);

    let mut pipeline = Pipeline::new(settings, inputs, run, &runner, approval.as_ref(), &probe);
    if let Some(notifier) = &notifier {
        pipeline = pipeline.with_notifier(notifier);
    }

    let report = pipeline.run();
    print_report(&report, args.format)?;
    Ok(report.success)
}

fn print_report(report: &PipelineReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            for stage in &report.stages {
                let mark = match stage.status {
                    StageStatus::Passed => "✓",
                    StageStatus::Failed => "✗",
                    StageStatus::Skipped => "-",
                };
                println!(
                    "{mark} {:<14} {} ({}ms)",
                    stage.stage.to_string(),
                    stage.detail,
                    stage.duration_ms
                );
            }
            if let Some(logs) = &report.logs
                && !logs.trim().is_empty()
            {
                println!();
                println!("Recent logs:");
                for line in logs.lines() {
                    println!("  {line}");
                }
            }
            println!();
            match &report.error {
                None if report.deployed() => println!("✓ Pipeline succeeded"),
                None => println!("✓ Pipeline succeeded (no deployment)"),
                Some(error) => println!("✗ Pipeline failed: {error}"),
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Quiet => {
            if let Some(error) = &report.error {
                eprintln!("{error}");
            }
        }
    }
    Ok(())
}

fn run_init(
    ctx: &AppContext,
    app_name: Option<String>,
    global: bool,
    force: bool,
    format: OutputFormat,
) -> Result<bool> {
    let scope = if global {
        ConfigScope::Global
    } else {
        ConfigScope::Project
    };
    let store = ctx.config_store(scope);
    if store.exists() && !force {
        anyhow::bail!(
            "{} already exists. Pass --force to overwrite",
            store.config_path().display()
        );
    }

    let config = match scope {
        ConfigScope::Global => RolloutConfig {
            notify: NotifySection {
                slack_webhook_url: None,
                on: Some(NotifyPolicy::Always),
            },
            concurrency: ConcurrencySection {
                lock_wait_secs: Some(rollout_core::config::schema::DEFAULT_LOCK_WAIT_SECS),
            },
            ..RolloutConfig::default()
        },
        ConfigScope::Project => {
            let app_name = app_name
                .or_else(|| {
                    ctx.project_root()
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string())
                })
                .unwrap_or_else(|| "app".to_string());
            RolloutConfig::starter(&app_name)
        }
    };
    store.save(&config)?;

    match format {
        OutputFormat::Table => {
            println!("✓ Wrote {}", store.config_path().display());
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": store.config_path(),
                "scope": scope,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => {}
    }
    Ok(true)
}

fn run_unlock(ctx: &AppContext, branch: &str, format: OutputFormat) -> Result<bool> {
    let removed = force_unlock(&ctx.lock_dir(), branch)?;

    match format {
        OutputFormat::Table => {
            if removed {
                println!("✓ Removed lock for branch '{branch}'");
            } else {
                println!("• No lock held for branch '{branch}'");
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "branch": branch,
                "removed": removed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => {}
    }
    Ok(true)
}
