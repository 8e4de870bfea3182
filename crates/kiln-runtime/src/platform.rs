// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Host platform mapping onto runtime distribution names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

/// Termux ships its own JDK package; nothing is ever downloaded there.
pub const CONSTRAINED_JAVA_PATH: &str = "/data/data/com.termux/files/usr/bin/java";
const CONSTRAINED_ROOT: &str = "/data/data/com.termux";

/// Which launch-script template a platform uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptDialect {
	Unix,
	Batch,
	Constrained,
}

impl ScriptDialect {
	pub fn script_name(&self) -> &'static str {
		match self {
			ScriptDialect::Unix | ScriptDialect::Constrained => "start.sh",
			ScriptDialect::Batch => "start.bat",
		}
	}

	/// Dialect for the host this process runs on.
	pub fn host() -> Self {
		if is_constrained_host() {
			ScriptDialect::Constrained
		} else if cfg!(windows) {
			ScriptDialect::Batch
		} else {
			ScriptDialect::Unix
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
	/// OS token used by the distribution API.
	pub name: &'static str,
	/// Architecture token used by the distribution API.
	pub arch: &'static str,
	pub archive_ext: &'static str,
	pub dialect: ScriptDialect,
}

impl Platform {
	/// Map a Rust `(os, arch)` pair. Both halves must be known.
	pub fn resolve(os: &str, arch: &str) -> Result<Self> {
		let unsupported = || RuntimeError::UnsupportedPlatform {
			os: os.to_string(),
			arch: arch.to_string(),
		};

		let (name, archive_ext, dialect) = match os {
			"windows" => ("windows", ".zip", ScriptDialect::Batch),
			"linux" => ("linux", ".tar.gz", ScriptDialect::Unix),
			"macos" => ("mac", ".tar.gz", ScriptDialect::Unix),
			_ => return Err(unsupported()),
		};

		let arch = match arch {
			"x86_64" => "x64",
			"x86" => "x86",
			"aarch64" => "aarch64",
			"arm" => "arm",
			_ => return Err(unsupported()),
		};

		Ok(Self {
			name,
			arch,
			archive_ext,
			dialect,
		})
	}

	pub fn host() -> Result<Self> {
		Self::resolve(std::env::consts::OS, std::env::consts::ARCH)
	}

	pub fn executable_name(&self) -> &'static str {
		if self.name == "windows" {
			"java.exe"
		} else {
			"java"
		}
	}
}

/// True when running inside Termux on Android.
pub fn is_constrained_host() -> bool {
	std::env::consts::OS == "android" || Path::new(CONSTRAINED_ROOT).exists()
}
