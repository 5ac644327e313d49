// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for credential encryption.

use mercado_common_secret::{load_secret_env, SecretString};
use tracing::{instrument, warn};

use crate::error::{CredentialsError, CredentialsResult};

/// Environment variable holding the master encryption secret.
///
/// `MERCADO_ENCRYPTION_KEY_FILE` may point at a file instead.
pub const MASTER_SECRET_ENV: &str = "MERCADO_ENCRYPTION_KEY";

/// Configuration handed to [`crate::SecretCodec`].
#[derive(Clone, Default)]
pub struct CodecConfig {
	master_secret: Option<SecretString>,
}

impl CodecConfig {
	/// An empty master secret is treated as absent.
	pub fn new(master_secret: Option<SecretString>) -> Self {
		Self {
			master_secret: master_secret.filter(|secret| !secret.is_empty()),
		}
	}

	/// Load configuration from environment variables.
	///
	/// A missing master secret is not an error here: the codec reports
	/// [`CredentialsError::MasterSecretNotConfigured`] on every encrypt or
	/// decrypt, so callers refuse to save or verify credentials.
	#[instrument(skip_all)]
	pub fn from_env() -> CredentialsResult<Self> {
		let master_secret = load_secret_env(MASTER_SECRET_ENV)
			.map_err(|e| CredentialsError::Configuration(e.to_string()))?;

		if master_secret.is_none() {
			warn!(
				var = MASTER_SECRET_ENV,
				"master encryption secret not set; credential encryption is unavailable"
			);
		}

		Ok(Self::new(master_secret))
	}

	pub fn master_secret(&self) -> Option<&SecretString> {
		self.master_secret.as_ref()
	}

	pub fn is_configured(&self) -> bool {
		self.master_secret.is_some()
	}
}

impl std::fmt::Debug for CodecConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CodecConfig")
			.field(
				"master_secret",
				&self.master_secret.as_ref().map(|_| "[REDACTED]"),
			)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_master_secret_is_not_configured() {
		let config = CodecConfig::new(Some(SecretString::from("")));
		assert!(!config.is_configured());
		assert!(config.master_secret().is_none());
	}

	#[test]
	fn debug_redacts_master_secret() {
		let config = CodecConfig::new(Some(SecretString::from("super_secret_master")));
		let debug = format!("{config:?}");
		assert!(!debug.contains("super_secret_master"));
		assert!(debug.contains("[REDACTED]"));
	}

	#[test]
	fn from_env_reads_master_secret() {
		std::env::remove_var(format!("{MASTER_SECRET_ENV}_FILE"));
		std::env::set_var(MASTER_SECRET_ENV, "env-master-secret");

		let config = CodecConfig::from_env().unwrap();
		std::env::remove_var(MASTER_SECRET_ENV);

		assert_eq!(
			config.master_secret().map(|s| s.expose().as_str()),
			Some("env-master-secret")
		);
	}
}
