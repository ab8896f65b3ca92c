use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use conductor::agent::HttpAgentService;
use conductor::breakpoint::{AutoContinueHandler, BreakpointHandler, ConsoleBreakpointHandler};
use conductor::config::Config;
use conductor::gates::CommandGateRunner;
use conductor::git::GitWorkspace;
use conductor::issues::GhIssueMapper;
use conductor::orchestrator::{JsonStateStore, OrchestratorConfig, StateStore};
use conductor::pipeline::{PipelineConfig, PipelineController};
use conductor::report::PullRequestReporter;
use conductor::template::Template;
use conductor::ui;

#[derive(Parser)]
#[command(name = "conductor", about = "Dependency-aware task runs against an agent service")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Skip interactive prompts (manual gates pass, breakpoints continue)
    #[arg(short, long, global = true)]
    yes: bool,

    /// Project directory (defaults to the current directory)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a template through execution and validation cycles
    Run {
        /// Path to the template file
        template: PathBuf,

        /// Override the concurrency ceiling
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Override the template's cycle budget
        #[arg(long)]
        max_cycles: Option<usize>,

        /// Skip the end-of-run pull request
        #[arg(long)]
        no_report: bool,
    },
    /// Validate a template without running it
    Check {
        /// Path to the template file
        template: PathBuf,
    },
    /// Show the persisted state of an interrupted run
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.verbose { "conductor=debug" } else { "conductor=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_target(false)
        .init();

    let project_dir = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    match cli.command {
        Commands::Run {
            template,
            max_concurrent,
            max_cycles,
            no_report,
        } => run(project_dir, template, max_concurrent, max_cycles, no_report, cli.yes).await,
        Commands::Check { template } => check(&template),
        Commands::Status => status(&project_dir),
    }
}

async fn run(
    project_dir: PathBuf,
    template_path: PathBuf,
    max_concurrent: Option<usize>,
    max_cycles: Option<usize>,
    no_report: bool,
    assume_yes: bool,
) -> Result<()> {
    let config = Config::load(project_dir.clone(), max_concurrent)?;
    let template = Template::load(&template_path)?;

    let agent = Arc::new(HttpAgentService::new(
        &config.agent_base_url,
        config.agent_token.clone(),
    )?);
    let gates = Arc::new(CommandGateRunner::new(project_dir.clone()).with_assume_yes(assume_yes));
    let issues = Arc::new(GhIssueMapper::new(project_dir.clone()));
    let reporter = Arc::new(PullRequestReporter::new(
        project_dir.clone(),
        template.base_branch.clone(),
    ));
    let workspace = Arc::new(GitWorkspace::new(project_dir.clone()));
    let store: Arc<dyn StateStore> = Arc::new(JsonStateStore::new(config.state_file.clone()));
    let breakpoints: Arc<dyn BreakpointHandler> = if assume_yes {
        Arc::new(AutoContinueHandler)
    } else {
        Arc::new(ConsoleBreakpointHandler)
    };

    let pipeline_config = PipelineConfig {
        max_cycles: max_cycles.unwrap_or(template.max_cycles),
        generate_report: !no_report,
        orchestrator: OrchestratorConfig::default()
            .with_max_concurrent(config.max_concurrent)
            .with_default_timeout(config.default_timeout)
            .with_default_retries(config.default_retries)
            .with_poll_interval(config.poll_interval),
    };

    let pipeline = PipelineController::new(
        agent, gates, issues, reporter, workspace, store, breakpoints, pipeline_config,
    );
    let result = pipeline.run(&template).await?;

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn check(template_path: &PathBuf) -> Result<()> {
    let template = Template::load(template_path)?;
    ui::template_overview(&template);
    Ok(())
}

fn status(project_dir: &PathBuf) -> Result<()> {
    let store = JsonStateStore::new(project_dir.join(".conductor").join("state.json"));
    match store.load()? {
        None => println!("no run in progress"),
        Some(snapshot) => {
            println!(
                "run {} of template {} started {}",
                snapshot.run_id,
                style(&snapshot.template).bold(),
                snapshot.started_at.format("%Y-%m-%d %H:%M UTC"),
            );
            println!("last update {}", snapshot.updated_at.format("%Y-%m-%d %H:%M UTC"));
            ui::task_summary(&snapshot.tasks);
            if !snapshot.active_agents.is_empty() {
                println!("jobs in flight at last snapshot:");
                for (task, job) in &snapshot.active_agents {
                    println!("  {task} -> {job}");
                }
            }
        }
    }
    Ok(())
}
