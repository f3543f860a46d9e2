//! deferack CLI: run the acknowledgment poller or inspect the list.

use clap::{Args, Parser, Subcommand};
use deferack::clock::SystemClock;
use deferack::config::Config;
use deferack::scheduler::DeferredScheduler;
use deferack::source::{ClickUpClient, DryRunSource, TaskSource};
use deferack::telemetry::{TelemetryConfig, init_telemetry};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "deferack",
    about = "Acknowledge ClickUp tasks after a randomized, re-verified delay"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the poller until interrupted
    Run {
        #[command(flatten)]
        common: CommonArgs,
        /// Verify and log, but never change task status
        #[arg(long)]
        dry_run: bool,
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
        /// Minimum deferral in minutes
        #[arg(long)]
        min_delay: Option<u64>,
        /// Maximum deferral in minutes
        #[arg(long)]
        max_delay: Option<u64>,
        /// Seconds between polls
        #[arg(long)]
        poll_interval: Option<u64>,
    },
    /// List tasks currently in the target status
    Check {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// TOML file with a [workflow] table
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            common,
            dry_run,
            once,
            min_delay,
            max_delay,
            poll_interval,
        } => {
            let mut config = Config::load(common.config.as_deref())?;
            if let Some(m) = min_delay {
                config.workflow.min_delay_minutes = m;
            }
            if let Some(m) = max_delay {
                config.workflow.max_delay_minutes = m;
            }
            if let Some(s) = poll_interval {
                config.workflow.poll_interval_secs = s;
            }
            cmd_run(config, dry_run, once).await
        }
        Command::Check { common } => {
            let config = Config::load(common.config.as_deref())?;
            cmd_check(config).await
        }
    }
}

fn client(config: &Config) -> anyhow::Result<ClickUpClient> {
    Ok(ClickUpClient::new(
        &config.api_token,
        config.list_id.clone(),
        config.base_url.as_deref(),
        config.http_timeout,
    )?)
}

async fn cmd_run(config: Config, dry_run: bool, once: bool) -> anyhow::Result<()> {
    let scheduler_config = config.workflow.scheduler_config()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "deferack".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let mut source: Arc<dyn TaskSource> = Arc::new(client(&config)?);
    if dry_run {
        tracing::warn!("dry run: task statuses will not be changed");
        source = Arc::new(DryRunSource::new(source));
    }

    let mut scheduler = DeferredScheduler::new(source, Arc::new(SystemClock), scheduler_config);

    if once {
        let report = scheduler.run_once().await;
        tracing::info!(?report, "single cycle complete");
        return Ok(());
    }

    let shutdown = scheduler.shutdown_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        shutdown.trigger();
    });

    scheduler.run_forever().await;
    Ok(())
}

async fn cmd_check(config: Config) -> anyhow::Result<()> {
    config.workflow.validate()?;
    let client = client(&config)?;
    let status = &config.workflow.target_status;
    let tasks = client.list_tasks(status).await?;

    if tasks.is_empty() {
        println!("No tasks in '{status}' on list {}.", client.list_id());
        return Ok(());
    }

    println!("{:<12}  {:<20}  NAME", "ID", "STATUS");
    println!("{}", "-".repeat(72));
    for task in &tasks {
        println!(
            "{:<12}  {:<20}  {}",
            task.id,
            task.status.status,
            task.name.as_deref().unwrap_or("-")
        );
    }
    println!("\n{} task(s)", tasks.len());
    Ok(())
}
