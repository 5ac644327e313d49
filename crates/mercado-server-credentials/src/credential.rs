// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-tenant provider credentials as they are persisted.
//!
//! Secret fields only ever exist in memory as [`EncryptedSecret`] on the
//! record and as [`SecretString`] once revealed.

use std::fmt;

use mercado_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{EncryptedSecret, SecretCodec};
use crate::error::CredentialsResult;
use crate::provider::Provider;

/// The encrypted fields of a [`ProviderCredential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretField {
	CustomerId,
	PrivateKey,
	/// Integrity secret for ePayco, app secret for Meta.
	SharedSecret,
	EncryptionKey,
}

impl SecretField {
	pub const ALL: [SecretField; 4] = [
		SecretField::CustomerId,
		SecretField::PrivateKey,
		SecretField::SharedSecret,
		SecretField::EncryptionKey,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			SecretField::CustomerId => "customer_id",
			SecretField::PrivateKey => "private_key",
			SecretField::SharedSecret => "shared_secret",
			SecretField::EncryptionKey => "encryption_key",
		}
	}
}

impl fmt::Display for SecretField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A tenant's stored configuration for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredential {
	pub tenant_id: String,
	pub provider: Provider,
	/// Published by the provider; stored as plaintext.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub public_key: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_id: Option<EncryptedSecret>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub private_key: Option<EncryptedSecret>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shared_secret: Option<EncryptedSecret>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub encryption_key: Option<EncryptedSecret>,
	#[serde(default)]
	pub test_mode: bool,
	#[serde(default = "default_active")]
	pub active: bool,
}

fn default_active() -> bool {
	true
}

impl ProviderCredential {
	/// The stored (encrypted) value of `field`, if set.
	pub fn stored(&self, field: SecretField) -> Option<&EncryptedSecret> {
		match field {
			SecretField::CustomerId => self.customer_id.as_ref(),
			SecretField::PrivateKey => self.private_key.as_ref(),
			SecretField::SharedSecret => self.shared_secret.as_ref(),
			SecretField::EncryptionKey => self.encryption_key.as_ref(),
		}
	}

	/// Decrypt one secret field. `Ok(None)` when the field is not set.
	pub fn reveal(
		&self,
		field: SecretField,
		codec: &SecretCodec,
	) -> CredentialsResult<Option<SecretString>> {
		self.stored(field)
			.map(|encrypted| codec.decrypt_secret(encrypted))
			.transpose()
	}

	pub fn is_usable(&self) -> bool {
		self.active
	}
}

/// Plaintext credential as entered by an administrator, before sealing.
pub struct ProviderCredentialDraft {
	tenant_id: String,
	provider: Provider,
	public_key: Option<String>,
	customer_id: Option<SecretString>,
	private_key: Option<SecretString>,
	shared_secret: Option<SecretString>,
	encryption_key: Option<SecretString>,
	test_mode: bool,
	active: bool,
}

impl ProviderCredentialDraft {
	pub fn new(tenant_id: impl Into<String>, provider: Provider) -> Self {
		Self {
			tenant_id: tenant_id.into(),
			provider,
			public_key: None,
			customer_id: None,
			private_key: None,
			shared_secret: None,
			encryption_key: None,
			test_mode: false,
			active: true,
		}
	}

	pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
		self.public_key = Some(public_key.into());
		self
	}

	pub fn with_customer_id(mut self, customer_id: SecretString) -> Self {
		self.customer_id = Some(customer_id);
		self
	}

	pub fn with_private_key(mut self, private_key: SecretString) -> Self {
		self.private_key = Some(private_key);
		self
	}

	pub fn with_shared_secret(mut self, shared_secret: SecretString) -> Self {
		self.shared_secret = Some(shared_secret);
		self
	}

	pub fn with_encryption_key(mut self, encryption_key: SecretString) -> Self {
		self.encryption_key = Some(encryption_key);
		self
	}

	pub fn with_test_mode(mut self, test_mode: bool) -> Self {
		self.test_mode = test_mode;
		self
	}

	pub fn with_active(mut self, active: bool) -> Self {
		self.active = active;
		self
	}

	/// Encrypt every supplied secret. Empty values are dropped.
	pub fn seal(self, codec: &SecretCodec) -> CredentialsResult<ProviderCredential> {
		let seal_field = |value: Option<SecretString>| -> CredentialsResult<Option<EncryptedSecret>> {
			match value {
				Some(secret) if !secret.is_empty() => Ok(Some(codec.encrypt(secret.expose())?)),
				_ => Ok(None),
			}
		};

		let credential = ProviderCredential {
			customer_id: seal_field(self.customer_id)?,
			private_key: seal_field(self.private_key)?,
			shared_secret: seal_field(self.shared_secret)?,
			encryption_key: seal_field(self.encryption_key)?,
			tenant_id: self.tenant_id,
			provider: self.provider,
			public_key: self.public_key.filter(|key| !key.is_empty()),
			test_mode: self.test_mode,
			active: self.active,
		};

		debug!(
			tenant_id = %credential.tenant_id,
			provider = %credential.provider,
			"sealed provider credential"
		);
		Ok(credential)
	}
}

impl fmt::Debug for ProviderCredentialDraft {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProviderCredentialDraft")
			.field("tenant_id", &self.tenant_id)
			.field("provider", &self.provider)
			.field("public_key", &self.public_key)
			.field("customer_id", &self.customer_id)
			.field("private_key", &self.private_key)
			.field("shared_secret", &self.shared_secret)
			.field("encryption_key", &self.encryption_key)
			.field("test_mode", &self.test_mode)
			.field("active", &self.active)
			.finish()
	}
}
