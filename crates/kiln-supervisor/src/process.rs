// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Platform-specific spawning and tree termination.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

#[cfg(windows)]
pub const LAUNCH_SCRIPT: &str = "start.bat";
#[cfg(not(windows))]
pub const LAUNCH_SCRIPT: &str = "start.sh";

/// Build the command that runs the launch script in `dir`, with all three
/// standard streams piped.
pub(crate) fn launch_command(dir: &Path) -> Command {
	let mut cmd = shell_command();
	cmd.current_dir(dir)
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(false);
	cmd
}

#[cfg(unix)]
fn shell_command() -> Command {
	let mut cmd = Command::new("sh");
	cmd.arg(LAUNCH_SCRIPT);
	// New session so the whole tree shares one process group.
	unsafe {
		cmd.pre_exec(|| {
			if libc::setsid() == -1 {
				return Err(std::io::Error::last_os_error());
			}
			Ok(())
		});
	}
	cmd
}

#[cfg(windows)]
fn shell_command() -> Command {
	let mut cmd = Command::new("cmd");
	cmd.args(["/C", LAUNCH_SCRIPT]);
	cmd
}

#[cfg(unix)]
pub(crate) async fn kill_tree(pid: u32) -> std::io::Result<()> {
	let pgid = pid as libc::pid_t;
	let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
	if rc == -1 {
		let err = std::io::Error::last_os_error();
		// Group already gone.
		if err.raw_os_error() == Some(libc::ESRCH) {
			return Ok(());
		}
		return Err(err);
	}
	Ok(())
}

#[cfg(windows)]
pub(crate) async fn kill_tree(pid: u32) -> std::io::Result<()> {
	let status = Command::new("taskkill")
		.args(["/PID", &pid.to_string(), "/T", "/F"])
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.await?;
	if !status.success() {
		tracing::debug!(pid, ?status, "taskkill reported failure");
	}
	Ok(())
}
