use crate::reservation::retry::RetryPolicy;
use crate::room::key::Tenant;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
	pub tenant: Tenant,
	pub log_filters: String,
	/// Rooms written by the `seed` command, and at startup of an in-memory backend.
	#[serde(default)]
	pub seed_file: Option<PathBuf>,
	pub backend: BackendConfiguration,
	#[serde(default)]
	pub retry: RetryPolicy,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfiguration {
	Memory,
	Libsql {
		path: PathBuf,
		#[serde(default = "default_pool_size")]
		pool_size: usize,
	},
}

fn default_pool_size() -> usize {
	4
}

impl Configuration {
	pub fn from_file(path: impl AsRef<Path>) -> Result<Configuration, ConfigurationError> {
		let text = read_to_string(path)?;

		Ok(Configuration::try_from(text.as_str())?)
	}
}

impl TryFrom<&str> for Configuration {
	type Error = toml::de::Error;

	fn try_from(text: &str) -> Result<Self, Self::Error> {
		toml::from_str(text)
	}
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
	#[error("Failed to deserialize with error: {0}")]
	DeserializationError(#[from] toml::de::Error),
	#[error("IO operation failed: {0}")]
	IoError(#[from] std::io::Error),
}
