// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

/// Runtime major version a game version needs.
///
/// Only the minor and patch components of `1.<minor>.<patch>` matter. A
/// version that cannot be parsed gets the oldest runtime.
pub fn required_runtime(game_version: &str) -> u32 {
	let mut parts = game_version.trim().split('.').skip(1);
	let Some(minor) = parts.next().and_then(|p| p.parse::<u32>().ok()) else {
		return 8;
	};
	let patch = parts.next().and_then(|p| p.parse::<u32>().ok());

	match minor {
		0..=8 => 8,
		9..=15 => 11,
		// 1.16 without a patch counts as a late 1.16 release.
		16 => match patch {
			Some(p) if p <= 4 => 11,
			_ => 16,
		},
		17..=19 => 18,
		_ => 20,
	}
}
