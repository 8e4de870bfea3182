// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use anyhow::Context;
use clap::Args;
use tracing::instrument;

use crate::context::AppContext;

#[derive(Debug, Clone, Args)]
pub struct VersionsArgs {
	/// Software source name, e.g. `paper`
	pub source: String,

	/// Show at most this many versions
	#[arg(long)]
	pub limit: Option<usize>,
}

pub fn handle_sources(ctx: &AppContext) -> anyhow::Result<()> {
	for source in ctx.sources.registry().list() {
		println!("{:<12} {}", source.name, source.display_name);
	}
	Ok(())
}

#[instrument(skip(ctx))]
pub async fn handle_versions(args: VersionsArgs, ctx: &AppContext) -> anyhow::Result<()> {
	let versions = ctx
		.sources
		.list_versions(&args.source)
		.await
		.with_context(|| format!("failed to list versions for {}", args.source))?;

	let limit = args.limit.unwrap_or(versions.len());
	for version in versions.iter().take(limit) {
		println!("{version}");
	}
	Ok(())
}
