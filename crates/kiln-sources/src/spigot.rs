// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Extraction of Spigot builds from the getbukkit download listing.

use std::sync::LazyLock;

use regex::Regex;

/// One row of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpigotRelease {
	pub version: String,
	pub download_link: String,
}

static HEADING: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?s)<h2[^>]*>\s*([^<]+?)\s*</h2>").unwrap());
static ANCHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<a\b[^>]*>").unwrap());
static HREF: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).unwrap());

/// Parse every `download-pane` block that carries both a version heading
/// and a `btn-download` link. Page order is preserved.
pub fn parse_listing(html: &str) -> Vec<SpigotRelease> {
	html.split("download-pane")
		.skip(1)
		.filter_map(parse_pane)
		.collect()
}

fn parse_pane(pane: &str) -> Option<SpigotRelease> {
	let version = HEADING.captures(pane)?.get(1)?.as_str().trim().to_string();

	let download_link = ANCHOR
		.find_iter(pane)
		.map(|m| m.as_str())
		.find(|tag| tag.contains("btn-download"))
		.and_then(|tag| HREF.captures(tag))
		.and_then(|c| c.get(1))
		.map(|m| m.as_str().to_string())?;

	if version.is_empty() {
		return None;
	}

	Some(SpigotRelease {
		version,
		download_link,
	})
}
