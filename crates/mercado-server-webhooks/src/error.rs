// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for webhook authentication.

use mercado_server_credentials::{CredentialsError, Provider, SecretField, UnknownProvider};
use thiserror::Error;

/// Result type alias for webhook operations.
pub type WebhookResult<T> = Result<T, WebhookError>;

/// The webhook could not be verified at all.
///
/// A signature that was checked and did not match is not an error; it is a
/// [`crate::Verdict::Rejected`]. Neither outcome may trigger business effects.
#[derive(Debug, Error)]
pub enum WebhookError {
	/// The tenant has no credential for this provider.
	#[error("no {provider} credential configured for tenant")]
	MissingCredential { provider: Provider },

	/// The tenant's credential is switched off.
	#[error("{provider} credential for tenant {tenant_id} is inactive")]
	CredentialInactive { tenant_id: String, provider: Provider },

	/// The credential belongs to a different provider than the webhook.
	#[error("credential is for {found}, webhook is from {expected}")]
	ProviderMismatch { expected: Provider, found: Provider },

	/// A secret the scheme needs is not stored on the credential.
	#[error("credential is missing {0}")]
	MissingSecret(SecretField),

	/// A signed field is absent from the payload.
	#[error("payload is missing required field {0}")]
	MissingField(&'static str),

	#[error("malformed webhook payload: {0}")]
	MalformedPayload(String),

	#[error(transparent)]
	UnsupportedProvider(#[from] UnknownProvider),

	/// Stored secrets could not be decrypted.
	#[error("credential error: {0}")]
	Credentials(#[from] CredentialsError),
}

impl WebhookError {
	/// True when the tenant or platform setup is at fault rather than the
	/// incoming request.
	pub fn is_configuration(&self) -> bool {
		match self {
			WebhookError::MissingCredential { .. }
			| WebhookError::CredentialInactive { .. }
			| WebhookError::ProviderMismatch { .. }
			| WebhookError::MissingSecret(_) => true,
			WebhookError::Credentials(_) => true,
			WebhookError::MissingField(_)
			| WebhookError::MalformedPayload(_)
			| WebhookError::UnsupportedProvider(_) => false,
		}
	}
}
