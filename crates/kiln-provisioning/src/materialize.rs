// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Instance directory contents: EULA, launch script and server properties.

use std::path::{Path, PathBuf};

use kiln_runtime::ScriptDialect;
use tracing::debug;

/// Inputs for writing a runnable instance directory.
#[derive(Debug, Clone)]
pub struct LaunchSettings<'a> {
	pub dialect: ScriptDialect,
	pub java: &'a Path,
	pub flags: &'a str,
	pub artifact: &'a str,
	pub instance_name: &'a str,
	pub port: u16,
}

pub fn render_launch_script(dialect: ScriptDialect, java: &Path, flags: &str, artifact: &str) -> String {
	let mut command = format!("\"{}\"", java.display());
	if !flags.trim().is_empty() {
		command.push(' ');
		command.push_str(flags.trim());
	}
	command.push_str(&format!(" -jar \"{artifact}\" nogui"));

	match dialect {
		ScriptDialect::Unix => format!("#!/bin/bash\n{command}\n"),
		ScriptDialect::Constrained => format!("#!/bin/bash\ncd \"$(dirname \"$0\")\"\n{command}\n"),
		ScriptDialect::Batch => format!("@echo off\r\n{command}\r\n"),
	}
}

pub fn render_server_properties(instance_name: &str, port: u16) -> String {
	format!("server-port={port}\nquery.port={port}\nmotd={instance_name}\noffline-mode=false\n")
}

/// Write all instance files into `dir`, replacing earlier versions. Returns
/// the launch script path.
pub async fn materialize(dir: &Path, settings: &LaunchSettings<'_>) -> std::io::Result<PathBuf> {
	tokio::fs::create_dir_all(dir).await?;

	tokio::fs::write(dir.join("eula.txt"), "eula=true\n").await?;

	let script = dir.join(settings.dialect.script_name());
	let body = render_launch_script(settings.dialect, settings.java, settings.flags, settings.artifact);
	tokio::fs::write(&script, body).await?;
	make_executable(&script).await?;

	tokio::fs::write(
		dir.join("server.properties"),
		render_server_properties(settings.instance_name, settings.port),
	)
	.await?;

	debug!(dir = %dir.display(), script = %script.display(), "instance files written");
	Ok(script)
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> std::io::Result<()> {
	use std::os::unix::fs::PermissionsExt;
	tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> std::io::Result<()> {
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn unix_script_runs_java_with_flags() {
		let script = render_launch_script(
			ScriptDialect::Unix,
			Path::new("/srv/java/17/bin/java"),
			"-Xms1G -Xmx2G",
			"paper-1.20.1.jar",
		);
		assert_eq!(
			script,
			"#!/bin/bash\n\"/srv/java/17/bin/java\" -Xms1G -Xmx2G -jar \"paper-1.20.1.jar\" nogui\n"
		);
	}

	#[test]
	fn constrained_script_changes_into_its_directory() {
		let script = render_launch_script(
			ScriptDialect::Constrained,
			Path::new("/data/data/com.termux/files/usr/bin/java"),
			"",
			"vanilla-1.20.1.jar",
		);
		assert!(script.starts_with("#!/bin/bash\ncd \"$(dirname \"$0\")\"\n"));
		assert!(script.contains("\"/data/data/com.termux/files/usr/bin/java\" -jar"));
	}

	#[test]
	fn batch_script_uses_crlf() {
		let script = render_launch_script(
			ScriptDialect::Batch,
			Path::new("C:\\kiln\\java\\17\\bin\\java.exe"),
			"-Xmx4G",
			"purpur-1.20.1.jar",
		);
		assert!(script.starts_with("@echo off\r\n"));
		assert!(script.ends_with("nogui\r\n"));
	}

	#[test]
	fn properties_carry_port_and_motd() {
		let props = render_server_properties("lobby", 25570);
		assert!(props.contains("server-port=25570\n"));
		assert!(props.contains("query.port=25570\n"));
		assert!(props.contains("motd=lobby\n"));
	}

	#[tokio::test]
	async fn writes_all_files_and_overwrites() {
		let tmp = TempDir::new().unwrap();
		let dir = tmp.path().join("lobby");
		let java = Path::new("/srv/java/17/bin/java");

		for port in [25565, 25566] {
			let settings = LaunchSettings {
				dialect: ScriptDialect::Unix,
				java,
				flags: "-Xmx1G",
				artifact: "paper-1.20.1.jar",
				instance_name: "lobby",
				port,
			};
			let script = materialize(&dir, &settings).await.unwrap();
			assert_eq!(script, dir.join("start.sh"));
		}

		assert_eq!(std::fs::read_to_string(dir.join("eula.txt")).unwrap(), "eula=true\n");
		let props = std::fs::read_to_string(dir.join("server.properties")).unwrap();
		assert!(props.contains("server-port=25566"));
		assert!(!props.contains("25565"));

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let mode = std::fs::metadata(dir.join("start.sh")).unwrap().permissions().mode();
			assert_eq!(mode & 0o111, 0o111);
		}
	}
}
