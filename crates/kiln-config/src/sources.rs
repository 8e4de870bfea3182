// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file and `KILN_*`
//! environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::KilnConfigLayer;
use crate::sections::{
	CatalogConfigLayer, EndpointsConfigLayer, ExternalSourceConfig, HttpConfigLayer,
	LoggingConfigLayer, PathsConfigLayer, SupervisorConfigLayer,
};

/// Source precedence levels (higher overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<KilnConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<KilnConfigLayer, ConfigError> {
		Ok(KilnConfigLayer::default())
	}
}

pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// `~/.config/kiln/config.toml`, or a relative `kiln.toml` when no
	/// config directory is known.
	pub fn user() -> Self {
		let path = dirs::config_dir()
			.map(|d| d.join("kiln").join("config.toml"))
			.unwrap_or_else(|| PathBuf::from("kiln.toml"));
		Self::new(path)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<KilnConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(KilnConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: KilnConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: KILN_<SECTION>_<FIELD>, with `KILN_SOURCES` holding a JSON
/// array of external sources.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<KilnConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from_env(&|name: &str| std::env::var(name).ok())
	}
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_var(lookup: Lookup<'_>, name: &str) -> Option<String> {
	lookup(name).filter(|s| !s.is_empty())
}

fn env_bool(lookup: Lookup<'_>, name: &str) -> Option<bool> {
	env_var(lookup, name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: std::str::FromStr>(lookup: Lookup<'_>, name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(lookup, name) {
		Some(v) => v
			.parse()
			.map(Some)
			.map_err(|_| ConfigError::invalid_value(name, format!("invalid {} value '{v}'", std::any::type_name::<T>()))),
		None => Ok(None),
	}
}

fn layer_from_env(lookup: Lookup<'_>) -> Result<KilnConfigLayer, ConfigError> {
	let sources = match env_var(lookup, "KILN_SOURCES") {
		Some(json) => Some(
			serde_json::from_str::<Vec<ExternalSourceConfig>>(&json)
				.map_err(|e| ConfigError::invalid_value("KILN_SOURCES", e.to_string()))?,
		),
		None => None,
	};

	Ok(KilnConfigLayer {
		paths: Some(PathsConfigLayer {
			data_dir: env_var(lookup, "KILN_DATA_DIR"),
			servers_dir: env_var(lookup, "KILN_SERVERS_DIR"),
			binaries_dir: env_var(lookup, "KILN_BINARIES_DIR"),
		}),
		http: Some(HttpConfigLayer {
			request_timeout_secs: env_parse(lookup, "KILN_HTTP_REQUEST_TIMEOUT_SECS")?,
			header_timeout_secs: env_parse(lookup, "KILN_HTTP_HEADER_TIMEOUT_SECS")?,
			download_idle_timeout_secs: env_parse(lookup, "KILN_HTTP_DOWNLOAD_IDLE_TIMEOUT_SECS")?,
			retry_attempts: env_parse(lookup, "KILN_HTTP_RETRY_ATTEMPTS")?,
		}),
		catalog: Some(CatalogConfigLayer {
			ttl_hours: env_parse(lookup, "KILN_CATALOG_TTL_HOURS")?,
		}),
		supervisor: Some(SupervisorConfigLayer {
			log_lines: env_parse(lookup, "KILN_SUPERVISOR_LOG_LINES")?,
			stop_command: env_var(lookup, "KILN_SUPERVISOR_STOP_COMMAND"),
			stop_timeout_secs: env_parse(lookup, "KILN_SUPERVISOR_STOP_TIMEOUT_SECS")?,
		}),
		logging: Some(LoggingConfigLayer {
			level: env_var(lookup, "KILN_LOG_LEVEL"),
			json: env_bool(lookup, "KILN_LOG_JSON"),
		}),
		sources,
		endpoints: Some(EndpointsConfigLayer {
			adoptium: env_var(lookup, "KILN_ENDPOINT_ADOPTIUM"),
			mojang_manifest: env_var(lookup, "KILN_ENDPOINT_MOJANG_MANIFEST"),
			papermc: env_var(lookup, "KILN_ENDPOINT_PAPERMC"),
			purpur: env_var(lookup, "KILN_ENDPOINT_PURPUR"),
			magma: env_var(lookup, "KILN_ENDPOINT_MAGMA"),
			spigot_listing: env_var(lookup, "KILN_ENDPOINT_SPIGOT_LISTING"),
		}),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn from_vars(vars: &[(&str, &str)]) -> Result<KilnConfigLayer, ConfigError> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		layer_from_env(&|name: &str| vars.get(name).cloned())
	}

	#[test]
	fn precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn missing_toml_file_is_an_empty_layer() {
		let layer = TomlSource::new("/nonexistent/kiln.toml").load().unwrap();
		assert_eq!(layer, KilnConfigLayer::default());
	}

	#[test]
	fn malformed_toml_reports_path() {
		let tmp = tempfile::NamedTempFile::new().unwrap();
		std::fs::write(tmp.path(), "[http\nretry_attempts = ").unwrap();
		let err = TomlSource::new(tmp.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn env_values_are_parsed() {
		let layer = from_vars(&[
			("KILN_DATA_DIR", "/srv/kiln"),
			("KILN_HTTP_RETRY_ATTEMPTS", "5"),
			("KILN_LOG_JSON", "true"),
			("KILN_SUPERVISOR_STOP_COMMAND", "end"),
			("KILN_CATALOG_TTL_HOURS", ""),
		])
		.unwrap();

		assert_eq!(layer.paths.unwrap().data_dir.as_deref(), Some("/srv/kiln"));
		assert_eq!(layer.http.unwrap().retry_attempts, Some(5));
		assert_eq!(layer.logging.unwrap().json, Some(true));
		assert_eq!(layer.supervisor.unwrap().stop_command.as_deref(), Some("end"));
		assert_eq!(layer.catalog.unwrap().ttl_hours, None);
	}

	#[test]
	fn bad_number_names_the_variable() {
		let err = from_vars(&[("KILN_HTTP_RETRY_ATTEMPTS", "lots")]).unwrap_err();
		match err {
			ConfigError::InvalidValue { key, .. } => assert_eq!(key, "KILN_HTTP_RETRY_ATTEMPTS"),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn external_sources_from_json() {
		let layer = from_vars(&[(
			"KILN_SOURCES",
			r#"[{"name":"fabric","versions_url":"http://mirror/fabric.json"}]"#,
		)])
		.unwrap();
		let sources = layer.sources.unwrap();
		assert_eq!(sources.len(), 1);
		assert_eq!(sources[0].display_name(), "fabric");
	}
}
