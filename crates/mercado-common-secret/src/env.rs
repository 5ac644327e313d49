// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading secrets from the process environment.
//!
//! A secret named `VAR` may be supplied directly or, for Docker and
//! Kubernetes mounted secrets, as a path in `VAR_FILE`. The file form wins
//! when both are present. A direct value that is the empty string counts as
//! unset: an empty master key must never be mistaken for a configured one.

use std::path::PathBuf;
use std::{env, fs};

use thiserror::Error;

use crate::SecretString;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

#[derive(Debug, Error)]
pub enum RequiredSecretError {
	#[error("required secret not found: set either {var} or {file_var}")]
	Missing { var: String, file_var: String },

	#[error(transparent)]
	Load(#[from] SecretEnvError),
}

/// Read `var` (or the file named by `{var}_FILE`) from the environment.
///
/// One trailing newline is stripped from file contents. Returns `Ok(None)`
/// when nothing usable is configured.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path) = env::var(&file_var) {
		if path.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(path);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;
		let value = content.strip_suffix('\n').unwrap_or(&content);
		if value.is_empty() {
			return Ok(None);
		}
		return Ok(Some(SecretString::new(value.to_string())));
	}

	match env::var(var) {
		Ok(value) if !value.is_empty() => Ok(Some(SecretString::new(value))),
		_ => Ok(None),
	}
}

/// Like [`load_secret_env`] but treats absence as an error.
pub fn require_secret_env(var: &str) -> Result<SecretString, RequiredSecretError> {
	load_secret_env(var)?.ok_or_else(|| RequiredSecretError::Missing {
		var: var.to_string(),
		file_var: format!("{var}_FILE"),
	})
}
