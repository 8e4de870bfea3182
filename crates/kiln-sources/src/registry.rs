// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use serde::Serialize;

use crate::error::{Result, SourceError};

/// How a source lists versions and resolves artifact URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SourceKind {
	Vanilla,
	PaperFamily { project: String },
	Purpur,
	Magma,
	Spigot,
	External { versions_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareSourceDescriptor {
	pub name: String,
	pub display_name: String,
	pub kind: SourceKind,
}

impl SoftwareSourceDescriptor {
	fn new(name: &str, display_name: &str, kind: SourceKind) -> Self {
		Self {
			name: name.to_string(),
			display_name: display_name.to_string(),
			kind,
		}
	}

	fn paper(project: &str, display_name: &str) -> Self {
		Self::new(
			project,
			display_name,
			SourceKind::PaperFamily {
				project: project.to_string(),
			},
		)
	}
}

/// Immutable set of known sources, in registration order.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
	sources: Vec<SoftwareSourceDescriptor>,
}

impl SourceRegistry {
	pub fn builtin() -> Self {
		Self {
			sources: vec![
				SoftwareSourceDescriptor::new("vanilla", "Vanilla", SourceKind::Vanilla),
				SoftwareSourceDescriptor::paper("paper", "PaperMC"),
				SoftwareSourceDescriptor::paper("folia", "Folia"),
				SoftwareSourceDescriptor::paper("waterfall", "Waterfall (Proxy)"),
				SoftwareSourceDescriptor::paper("velocity", "Velocity (Proxy)"),
				SoftwareSourceDescriptor::new("purpur", "PurpurMC", SourceKind::Purpur),
				SoftwareSourceDescriptor::new("magma", "Magma", SourceKind::Magma),
				SoftwareSourceDescriptor::new("spigot", "Spigot", SourceKind::Spigot),
			],
		}
	}

	/// Register a source that serves a `{version: url}` map. A name that is
	/// already registered is replaced.
	pub fn with_external(
		mut self,
		name: impl Into<String>,
		display_name: impl Into<String>,
		versions_url: impl Into<String>,
	) -> Self {
		let descriptor = SoftwareSourceDescriptor {
			name: name.into(),
			display_name: display_name.into(),
			kind: SourceKind::External {
				versions_url: versions_url.into(),
			},
		};
		self.sources.retain(|s| s.name != descriptor.name);
		self.sources.push(descriptor);
		self
	}

	pub fn get(&self, name: &str) -> Result<&SoftwareSourceDescriptor> {
		self.sources
			.iter()
			.find(|s| s.name == name)
			.ok_or_else(|| SourceError::UnknownSource(name.to_string()))
	}

	pub fn list(&self) -> &[SoftwareSourceDescriptor] {
		&self.sources
	}
}

impl Default for SourceRegistry {
	fn default() -> Self {
		Self::builtin()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builtin_sources_are_registered() {
		let registry = SourceRegistry::builtin();
		let names: Vec<_> = registry.list().iter().map(|s| s.name.as_str()).collect();
		assert_eq!(
			names,
			vec!["vanilla", "paper", "folia", "waterfall", "velocity", "purpur", "magma", "spigot"]
		);
		assert_eq!(
			registry.get("velocity").unwrap().kind,
			SourceKind::PaperFamily {
				project: "velocity".to_string()
			}
		);
	}

	#[test]
	fn unknown_names_are_rejected() {
		let err = SourceRegistry::builtin().get("bukkit").unwrap_err();
		assert!(matches!(err, SourceError::UnknownSource(name) if name == "bukkit"));
	}

	#[test]
	fn externals_can_be_added_and_replaced() {
		let registry = SourceRegistry::builtin()
			.with_external("forge", "Forge", "https://a.invalid/forge.json")
			.with_external("forge", "Forge", "https://b.invalid/forge.json");

		let forge = registry.get("forge").unwrap();
		assert_eq!(
			forge.kind,
			SourceKind::External {
				versions_url: "https://b.invalid/forge.json".to_string()
			}
		);
		assert_eq!(registry.list().len(), 9);
	}
}
