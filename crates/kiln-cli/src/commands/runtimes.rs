// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use anyhow::Context;
use clap::Subcommand;
use kiln_runtime::required_runtime;

use crate::context::AppContext;

#[derive(Debug, Clone, Subcommand)]
pub enum RuntimesCommand {
	/// Runtime major versions available for download
	Available,
	/// Runtimes already installed under the binaries directory
	Installed,
	/// Runtime major version a software version needs
	Required {
		/// Software version, e.g. `1.20.1`
		version: String,
	},
}

pub async fn handle_runtimes(command: RuntimesCommand, ctx: &AppContext) -> anyhow::Result<()> {
	match command {
		RuntimesCommand::Available => {
			let versions = ctx
				.runtimes
				.list_installable()
				.await
				.context("failed to list installable runtimes")?;
			for version in versions {
				println!("{version}");
			}
		}
		RuntimesCommand::Installed => {
			let installed = ctx.runtimes.list_local().await;
			if installed.is_empty() {
				println!("no runtimes installed in {}", ctx.runtimes.java_dir().display());
			}
			for version in installed {
				println!("{version}");
			}
		}
		RuntimesCommand::Required { version } => {
			println!("{}", required_runtime(&version));
		}
	}
	Ok(())
}
