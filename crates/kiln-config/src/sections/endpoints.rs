// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Upstream base URL overrides. Unset fields keep the built-in upstreams.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointsConfig {
	pub adoptium: Option<String>,
	pub mojang_manifest: Option<String>,
	pub papermc: Option<String>,
	pub purpur: Option<String>,
	pub magma: Option<String>,
	pub spigot_listing: Option<String>,
}

impl EndpointsConfig {
	pub fn overrides(&self) -> impl Iterator<Item = (&'static str, &str)> {
		[
			("adoptium", &self.adoptium),
			("mojang_manifest", &self.mojang_manifest),
			("papermc", &self.papermc),
			("purpur", &self.purpur),
			("magma", &self.magma),
			("spigot_listing", &self.spigot_listing),
		]
		.into_iter()
		.filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EndpointsConfigLayer {
	#[serde(default)]
	pub adoptium: Option<String>,
	#[serde(default)]
	pub mojang_manifest: Option<String>,
	#[serde(default)]
	pub papermc: Option<String>,
	#[serde(default)]
	pub purpur: Option<String>,
	#[serde(default)]
	pub magma: Option<String>,
	#[serde(default)]
	pub spigot_listing: Option<String>,
}

impl EndpointsConfigLayer {
	pub fn merge(&mut self, other: EndpointsConfigLayer) {
		if other.adoptium.is_some() {
			self.adoptium = other.adoptium;
		}
		if other.mojang_manifest.is_some() {
			self.mojang_manifest = other.mojang_manifest;
		}
		if other.papermc.is_some() {
			self.papermc = other.papermc;
		}
		if other.purpur.is_some() {
			self.purpur = other.purpur;
		}
		if other.magma.is_some() {
			self.magma = other.magma;
		}
		if other.spigot_listing.is_some() {
			self.spigot_listing = other.spigot_listing;
		}
	}

	pub fn finalize(self) -> EndpointsConfig {
		let trim = |url: Option<String>| url.map(|u| u.trim_end_matches('/').to_string());
		EndpointsConfig {
			adoptium: trim(self.adoptium),
			mojang_manifest: trim(self.mojang_manifest),
			papermc: trim(self.papermc),
			purpur: trim(self.purpur),
			magma: trim(self.magma),
			spigot_listing: trim(self.spigot_listing),
		}
	}
}
