//! `steplog`: watch and print pipeline step logs.

mod logs;
mod render;

use clap::Parser;
use clap::Subcommand;
use color_eyre::eyre::Context;
use color_eyre::Result;
use sl_core::config::load_config;
use sl_core::config::load_config_file;
use sl_protocol::ExecutionRef;
use sl_protocol::GlobalConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "steplog", version, about = "Watch pipeline step logs live")]
struct Cli {
    /// Base URL of the server; overrides the config file.
    #[arg(long, global = true)]
    server: Option<String>,

    /// Bearer token; overrides the config file.
    #[arg(long, global = true)]
    token: Option<String>,

    /// Config file to use instead of `.steplog/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Identifies a pipeline execution on the server.
#[derive(Debug, clap::Args)]
struct ExecutionArgs {
    /// Repository path, e.g. `space/repo`.
    repo: String,
    /// Pipeline identifier.
    pipeline: String,
    /// Execution number.
    execution: i64,
}

impl ExecutionArgs {
    fn to_ref(&self) -> ExecutionRef {
        ExecutionRef::new(self.repo.clone(), self.pipeline.clone(), self.execution)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive view of an execution's steps and their logs.
    Watch {
        #[command(flatten)]
        execution: ExecutionArgs,
        /// Stage to show; defaults to the running one.
        #[arg(long)]
        stage: Option<i64>,
    },
    /// Print one step's log.
    Logs {
        #[command(flatten)]
        execution: ExecutionArgs,
        /// Stage number.
        stage: i64,
        /// Step number.
        step: i64,
        /// Keep printing while the step runs.
        #[arg(long, short)]
        follow: bool,
        /// Print HTML markup instead of plain text.
        #[arg(long)]
        html: bool,
    },
    /// Sanitize raw log lines from stdin.
    Render {
        /// Print HTML markup instead of plain text.
        #[arg(long)]
        html: bool,
    },
}

async fn resolve_config(cli: &Cli) -> Result<GlobalConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_file(path).await?,
        None => {
            let cwd = std::env::current_dir().wrap_err("Failed to read current directory")?;
            load_config(&cwd).await?
        }
    };

    if let Some(server) = &cli.server {
        config.server = server.clone();
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match &cli.command {
        Command::Render { html } => {
            sl_core::logging::init_stderr_logging(cli.debug);
            render::run(*html)
        }
        Command::Logs {
            execution,
            stage,
            step,
            follow,
            html,
        } => {
            sl_core::logging::init_stderr_logging(cli.debug);
            let config = resolve_config(&cli).await?;
            let path = execution.to_ref().step(*stage, *step);
            logs::run(&config, path, *follow, *html).await
        }
        Command::Watch { execution, stage } => {
            let config = resolve_config(&cli).await?;
            sl_tui::run_app(config, execution.to_ref(), *stage, cli.debug)
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e))
        }
    }
}
