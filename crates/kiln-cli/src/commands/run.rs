// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Foreground supervision: output to the terminal, terminal lines to the
//! server's stdin.

use std::time::Duration;

use anyhow::bail;
use clap::Args;
use kiln_supervisor::{InstanceStatus, LogLine, LogStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::context::AppContext;

const STATUS_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
	/// Name of a provisioned instance
	pub name: String,
}

#[instrument(skip(ctx))]
pub async fn handle_run(args: RunArgs, ctx: &AppContext) -> anyhow::Result<()> {
	let name = args.name.as_str();
	let dir = ctx.provisioner.instance_dir(name);
	if !dir.is_dir() {
		bail!("instance {name} is not provisioned ({} does not exist)", dir.display());
	}

	let supervisor = &ctx.supervisor;
	supervisor.add_instance(name, &dir, ctx.instance_config()).await?;
	let mut output = supervisor.subscribe(name).await?;
	supervisor.start(name).await?;

	let mut input = spawn_stdin_reader();
	let mut input_open = true;
	let mut interrupts = 0u32;
	let mut kill_deadline: Option<Instant> = None;
	let mut poll = tokio::time::interval(STATUS_POLL);

	loop {
		tokio::select! {
			line = output.recv() => match line {
				Ok(line) => print_line(&line),
				Err(RecvError::Lagged(skipped)) => warn!(skipped, "terminal fell behind instance output"),
				Err(RecvError::Closed) => break,
			},
			command = input.recv(), if input_open => match command {
				Some(command) => {
					if let Err(err) = supervisor.send_command(name, &command).await {
						warn!(error = %err, "failed to forward command");
					}
				}
				None => input_open = false,
			},
			_ = tokio::signal::ctrl_c() => {
				interrupts += 1;
				if interrupts == 1 {
					eprintln!("stopping {name} (Ctrl+C again to kill)");
					if let Err(err) = supervisor.stop(name).await {
						warn!(error = %err, "stop failed");
					}
					kill_deadline = Some(Instant::now() + ctx.config.supervisor.stop_timeout);
				} else {
					supervisor.kill(name).await?;
				}
			}
			_ = poll.tick() => {
				if supervisor.status(name).await? == InstanceStatus::Stopped {
					break;
				}
				if kill_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
					warn!(timeout = ?ctx.config.supervisor.stop_timeout, "instance did not stop in time, killing");
					kill_deadline = None;
					supervisor.kill(name).await?;
				}
			}
		}
	}

	while let Ok(line) = output.try_recv() {
		print_line(&line);
	}

	let info = supervisor.info(name).await?;
	supervisor.remove_instance(name).await?;
	info!(exit_code = ?info.last_exit_code, "instance exited");
	match info.last_exit_code {
		Some(0) | None => Ok(()),
		Some(code) => bail!("instance {name} exited with status {code}"),
	}
}

fn print_line(line: &LogLine) {
	match line.stream {
		LogStream::Stdout => println!("{}", line.line),
		LogStream::Stderr => eprintln!("{}", line.line),
	}
}

/// Terminal input on a plain thread: a blocking stdin read cannot be
/// cancelled and would hold up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
	let (tx, rx) = mpsc::unbounded_channel();
	std::thread::spawn(move || {
		for line in std::io::stdin().lines() {
			let Ok(line) = line else { break };
			if tx.send(line).is_err() {
				break;
			}
		}
	});
	rx
}
