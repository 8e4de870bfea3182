// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! kiln: provision and supervise game servers.

mod commands;
mod context;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kiln_config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::{ProvisionArgs, RunArgs, RuntimesCommand, TasksArgs, VersionsArgs};
use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "kiln", about = "Provision and supervise game servers", version)]
struct Args {
	/// Config file (defaults to ~/.config/kiln/config.toml)
	#[arg(long, global = true, env = "KILN_CONFIG")]
	config: Option<PathBuf>,

	/// Emit logs as JSON
	#[arg(long, global = true)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// List software sources
	Sources,
	/// List versions offered by a software source
	Versions(VersionsArgs),
	/// Query runtimes
	#[command(subcommand)]
	Runtimes(RuntimesCommand),
	/// Provision a server instance
	Provision(ProvisionArgs),
	/// Run a provisioned instance in the foreground
	Run(RunArgs),
	/// Show download and unpack tasks
	Tasks(TasksArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let config = kiln_config::load_config(args.config.clone())?;
	init_tracing(&config.logging, args.json_logs);
	config.log_summary();

	tracing::debug!(command = ?args.command, "starting kiln");

	let ctx = AppContext::build(config).await?;
	let result = dispatch(args.command, &ctx).await;
	ctx.supervisor.shutdown().await;
	result
}

async fn dispatch(command: Command, ctx: &AppContext) -> anyhow::Result<()> {
	match command {
		Command::Sources => commands::sources::handle_sources(ctx),
		Command::Versions(args) => commands::sources::handle_versions(args, ctx).await,
		Command::Runtimes(command) => commands::runtimes::handle_runtimes(command, ctx).await,
		Command::Provision(args) => commands::provision::handle_provision(args, ctx).await,
		Command::Run(args) => commands::run::handle_run(args, ctx).await,
		Command::Tasks(args) => commands::tasks::handle_tasks(args, ctx).await,
	}
}

/// Logs go to stderr. Instance output is printed directly by `kiln run`, so
/// its tracing echo is quiet unless RUST_LOG asks for it.
fn init_tracing(logging: &LoggingConfig, json: bool) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("{},kiln::instance=warn", logging.level)));

	let registry = tracing_subscriber::registry().with(filter);
	if json || logging.json {
		registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init();
	}
}
