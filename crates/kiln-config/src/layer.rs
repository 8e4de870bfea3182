// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{
	CatalogConfigLayer, EndpointsConfigLayer, ExternalSourceConfig, HttpConfigLayer,
	LoggingConfigLayer, PathsConfigLayer, SupervisorConfigLayer,
};

/// One partial configuration, as produced by a single source.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct KilnConfigLayer {
	#[serde(default)]
	pub paths: Option<PathsConfigLayer>,
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub catalog: Option<CatalogConfigLayer>,
	#[serde(default)]
	pub supervisor: Option<SupervisorConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	/// Replaces, never extends, the list from lower layers.
	#[serde(default)]
	pub sources: Option<Vec<ExternalSourceConfig>>,
	#[serde(default)]
	pub endpoints: Option<EndpointsConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(existing), Some(overlay)) => merge(existing, overlay),
		(None, Some(overlay)) => *base = Some(overlay),
		(_, None) => {}
	}
}

impl KilnConfigLayer {
	pub fn merge(&mut self, other: KilnConfigLayer) {
		merge_section(&mut self.paths, other.paths, PathsConfigLayer::merge);
		merge_section(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_section(&mut self.catalog, other.catalog, CatalogConfigLayer::merge);
		merge_section(&mut self.supervisor, other.supervisor, SupervisorConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.endpoints, other.endpoints, EndpointsConfigLayer::merge);
		if other.sources.is_some() {
			self.sources = other.sources;
		}
	}
}
