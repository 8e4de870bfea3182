// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::time::Duration;

use clap::Args;
use kiln_provisioning::{ProvisionSpec, DEFAULT_LAUNCH_FLAGS, DEFAULT_PORT};
use kiln_tasks::TaskId;
use tracing::instrument;

use super::tasks::describe;
use crate::context::AppContext;

const PROGRESS_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Args)]
pub struct ProvisionArgs {
	/// Instance name; also the directory name under the servers directory
	pub name: String,

	/// Software source, e.g. `paper`
	pub source: String,

	/// Software version, e.g. `1.20.1`
	pub software_version: String,

	/// Runtime major version (defaults to what the software version needs)
	#[arg(long)]
	pub runtime: Option<u32>,

	/// JVM flags written into the launch script
	#[arg(long, default_value = DEFAULT_LAUNCH_FLAGS, allow_hyphen_values = true)]
	pub flags: String,

	/// Server port
	#[arg(long, default_value_t = DEFAULT_PORT)]
	pub port: u16,
}

impl ProvisionArgs {
	pub fn to_spec(&self) -> ProvisionSpec {
		let spec = ProvisionSpec::new(&self.name, &self.source, &self.software_version)
			.with_launch_flags(&self.flags)
			.with_port(self.port);
		match self.runtime {
			Some(version) => spec.with_runtime_version(version),
			None => spec,
		}
	}
}

#[instrument(skip(ctx), fields(instance = %args.name))]
pub async fn handle_provision(args: ProvisionArgs, ctx: &AppContext) -> anyhow::Result<()> {
	let handle = ctx.provisioner.spawn(args.to_spec())?;

	let mut reported: HashMap<TaskId, u8> = HashMap::new();
	loop {
		let finished = handle.is_finished();
		for id in handle.task_ids() {
			let Some(task) = ctx.tasks.get(id).await else {
				continue;
			};
			if reported.get(&id) != Some(&task.progress) {
				reported.insert(id, task.progress);
				println!("{}", describe(&task));
			}
		}
		if finished {
			break;
		}
		tokio::time::sleep(PROGRESS_POLL).await;
	}

	let instance = handle.join().await?;
	println!("provisioned {} in {}", instance.name, instance.directory.display());
	println!("  runtime: {}", instance.runtime_executable.display());
	println!("  script:  {}", instance.script.display());
	Ok(())
}
