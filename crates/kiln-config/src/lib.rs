// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Layered configuration for kiln.
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - a TOML file (`~/.config/kiln/config.toml` unless a path is given)
//! - `KILN_*` environment variables
//!
//! ```ignore
//! let config = kiln_config::load_config(None)?;
//! println!("servers live in {}", config.paths.servers_dir.display());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::KilnConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct KilnConfig {
	pub paths: PathsConfig,
	pub http: HttpConfig,
	pub catalog: CatalogConfig,
	pub supervisor: SupervisorConfig,
	pub logging: LoggingConfig,
	pub sources: Vec<ExternalSourceConfig>,
	pub endpoints: EndpointsConfig,
}

impl KilnConfig {
	/// Configuration is loaded before logging is set up, so callers report
	/// it once their subscriber is installed.
	pub fn log_summary(&self) {
		info!(
			data_dir = %self.paths.data_dir.display(),
			retry_attempts = self.http.retry_attempts,
			catalog_ttl_secs = self.catalog.ttl.as_secs(),
			external_sources = self.sources.len(),
			"configuration loaded"
		);
	}
}

/// Load from defaults, the TOML file at `config_path` (or the user config
/// file) and the environment.
pub fn load_config(config_path: Option<PathBuf>) -> Result<KilnConfig, ConfigError> {
	let toml = match config_path {
		Some(path) => TomlSource::new(path),
		None => TomlSource::user(),
	};
	let mut sources: Vec<Box<dyn ConfigSource>> =
		vec![Box::new(DefaultsSource), Box::new(toml), Box::new(EnvSource)];

	sources.sort_by_key(|s| s.precedence());

	let mut merged = KilnConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer into a validated configuration.
pub fn finalize(layer: KilnConfigLayer) -> Result<KilnConfig, ConfigError> {
	let paths = layer.paths.unwrap_or_default().finalize()?;
	let http = layer.http.unwrap_or_default().finalize();
	let catalog = layer.catalog.unwrap_or_default().finalize();
	let supervisor = layer.supervisor.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let sources = layer.sources.unwrap_or_default();
	let endpoints = layer.endpoints.unwrap_or_default().finalize();

	validate(&http, &supervisor, &sources, &endpoints)?;
	debug!(data_dir = %paths.data_dir.display(), "configuration finalized");

	Ok(KilnConfig {
		paths,
		http,
		catalog,
		supervisor,
		logging,
		sources,
		endpoints,
	})
}

fn validate(
	http: &HttpConfig,
	supervisor: &SupervisorConfig,
	sources: &[ExternalSourceConfig],
	endpoints: &EndpointsConfig,
) -> Result<(), ConfigError> {
	if http.retry_attempts == 0 {
		return Err(ConfigError::validation("http.retry_attempts must be at least 1"));
	}
	if supervisor.log_lines == 0 {
		return Err(ConfigError::validation("supervisor.log_lines must be at least 1"));
	}
	if supervisor.stop_command.trim().is_empty() {
		return Err(ConfigError::validation("supervisor.stop_command must not be empty"));
	}

	let mut seen = HashSet::new();
	for source in sources {
		if source.name.trim().is_empty() {
			return Err(ConfigError::validation("external source name must not be empty"));
		}
		if !seen.insert(source.name.as_str()) {
			return Err(ConfigError::validation(format!(
				"external source {} is defined more than once",
				source.name
			)));
		}
		check_url(&format!("sources.{}.versions_url", source.name), &source.versions_url)?;
	}

	for (key, url) in endpoints.overrides() {
		check_url(&format!("endpoints.{key}"), url)?;
	}
	Ok(())
}

fn check_url(key: &str, url: &str) -> Result<(), ConfigError> {
	if url.starts_with("http://") || url.starts_with("https://") {
		Ok(())
	} else {
		Err(ConfigError::invalid_value(key, format!("'{url}' is not an http(s) URL")))
	}
}
