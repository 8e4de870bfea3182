// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use clap::Args;
use kiln_tasks::{Task, TaskStatus};

use crate::context::AppContext;

#[derive(Debug, Clone, Args)]
pub struct TasksArgs {
	/// Show archived (completed) tasks instead of live ones
	#[arg(long, conflicts_with = "status")]
	pub archived: bool,

	/// Only live tasks with this status (in_progress, failed)
	#[arg(long)]
	pub status: Option<TaskStatus>,

	/// Print tasks as JSON
	#[arg(long)]
	pub json: bool,
}

pub async fn handle_tasks(args: TasksArgs, ctx: &AppContext) -> anyhow::Result<()> {
	let tasks = if args.archived {
		ctx.tasks.list_archived().await
	} else if let Some(status) = args.status {
		ctx.tasks.list_by_status(status).await
	} else {
		let mut live = ctx.tasks.list_by_status(TaskStatus::InProgress).await;
		live.extend(ctx.tasks.list_by_status(TaskStatus::Failed).await);
		live
	};

	if args.json {
		println!("{}", serde_json::to_string_pretty(&tasks)?);
		return Ok(());
	}

	for task in &tasks {
		println!("{}", describe(task));
	}
	Ok(())
}

pub(crate) fn describe(task: &Task) -> String {
	let mut line = format!(
		"{}  {:<8} {:<11} {:>3}%  {}",
		task.id,
		task.task_type.as_str(),
		task.status.as_str(),
		task.progress,
		task.filename
	);
	if let Some(error) = &task.error {
		line.push_str(&format!("  ({error})"));
	}
	line
}
