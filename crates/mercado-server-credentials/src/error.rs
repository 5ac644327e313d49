// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for credential encryption.

use thiserror::Error;

/// Result type alias for credential operations.
pub type CredentialsResult<T> = Result<T, CredentialsError>;

/// Errors raised while encrypting or decrypting stored credentials.
///
/// None of the variants carry plaintext, key material or ciphertext.
#[derive(Debug, Error)]
pub enum CredentialsError {
	// =========================================================================
	// Configuration Errors
	// =========================================================================
	#[error("master encryption secret not configured")]
	MasterSecretNotConfigured,

	#[error("configuration error: {0}")]
	Configuration(String),

	// =========================================================================
	// Stored Value Errors
	// =========================================================================
	#[error("invalid encrypted secret format: {0}")]
	Format(String),

	#[error("encrypted secret failed authentication (wrong master secret or tampered value)")]
	AuthenticationFailed,

	// =========================================================================
	// Primitive Failures
	// =========================================================================
	#[error("key derivation failed: {0}")]
	KeyDerivation(String),

	#[error("encryption failed: {0}")]
	Encryption(String),
}

impl CredentialsError {
	/// True for errors that point at a deployment problem rather than a bad
	/// stored value.
	pub fn is_configuration(&self) -> bool {
		matches!(
			self,
			CredentialsError::MasterSecretNotConfigured
				| CredentialsError::Configuration(_)
				| CredentialsError::KeyDerivation(_)
		)
	}

	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		!matches!(self, CredentialsError::Format(_))
	}
}
