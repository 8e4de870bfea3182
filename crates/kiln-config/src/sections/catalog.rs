// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
	/// How long a cached version list is served without refetching.
	pub ttl: Duration,
}

impl Default for CatalogConfig {
	fn default() -> Self {
		CatalogConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CatalogConfigLayer {
	#[serde(default)]
	pub ttl_hours: Option<u64>,
}

impl CatalogConfigLayer {
	pub fn merge(&mut self, other: CatalogConfigLayer) {
		if other.ttl_hours.is_some() {
			self.ttl_hours = other.ttl_hours;
		}
	}

	pub fn finalize(self) -> CatalogConfig {
		CatalogConfig {
			ttl: Duration::from_secs(self.ttl_hours.unwrap_or(24) * 3600),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ttl_defaults_to_a_day() {
		assert_eq!(CatalogConfig::default().ttl, Duration::from_secs(86400));
	}

	#[test]
	fn zero_disables_caching() {
		let config = CatalogConfigLayer { ttl_hours: Some(0) }.finalize();
		assert_eq!(config.ttl, Duration::ZERO);
	}
}
