// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Signature schemes and the data they verify against.

use mercado_common_secret::SecretString;
use mercado_server_credentials::{Provider, SecretField};

use crate::error::{WebhookError, WebhookResult};
use crate::verdict::Verdict;
use crate::{epayco, meta};

/// Decrypted provider secrets for a single verification.
///
/// Lives only for the duration of one call and redacts in `Debug`.
#[derive(Debug, Default)]
pub struct ProviderSecrets {
	entries: Vec<(SecretField, SecretString)>,
}

impl ProviderSecrets {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add or replace the value for `field`.
	pub fn insert(&mut self, field: SecretField, value: SecretString) {
		match self.entries.iter_mut().find(|(f, _)| *f == field) {
			Some(entry) => entry.1 = value,
			None => self.entries.push((field, value)),
		}
	}

	pub fn with(mut self, field: SecretField, value: SecretString) -> Self {
		self.insert(field, value);
		self
	}

	pub fn get(&self, field: SecretField) -> Option<&SecretString> {
		self.entries
			.iter()
			.find(|(f, _)| *f == field)
			.map(|(_, value)| value)
	}

	/// The value for `field`, or [`WebhookError::MissingSecret`].
	pub fn require(&self, field: SecretField) -> WebhookResult<&SecretString> {
		self.get(field)
			.filter(|value| !value.is_empty())
			.ok_or(WebhookError::MissingSecret(field))
	}
}

/// Everything a scheme needs to check one webhook.
///
/// `payload` is the body exactly as received. Schemes hash or parse these
/// bytes directly and never re-serialize them.
#[derive(Debug)]
pub struct WebhookSignatureContext<'a> {
	pub provider: Provider,
	pub payload: &'a [u8],
	pub content_type: Option<&'a str>,
	/// Value of the provider's signature header, if the provider uses one.
	pub signature: Option<&'a str>,
	pub secrets: ProviderSecrets,
}

/// A way of checking a webhook signature.
pub trait VerifySignature {
	/// Secret fields that must be decrypted before [`Self::verify`] runs.
	fn required_secrets(&self) -> &'static [SecretField];

	fn verify(&self, ctx: &WebhookSignatureContext<'_>) -> WebhookResult<Verdict>;
}

/// The signature scheme of each supported provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
	/// SHA-256 over customer id, integrity secret and transaction fields.
	Epayco,
	/// HMAC-SHA256 of the raw body in `X-Hub-Signature-256`.
	Meta,
}

impl SignatureScheme {
	pub fn for_provider(provider: Provider) -> Self {
		match provider {
			Provider::Epayco => SignatureScheme::Epayco,
			Provider::Meta => SignatureScheme::Meta,
		}
	}

	pub fn provider(&self) -> Provider {
		match self {
			SignatureScheme::Epayco => Provider::Epayco,
			SignatureScheme::Meta => Provider::Meta,
		}
	}
}

impl From<Provider> for SignatureScheme {
	fn from(provider: Provider) -> Self {
		Self::for_provider(provider)
	}
}

impl VerifySignature for SignatureScheme {
	fn required_secrets(&self) -> &'static [SecretField] {
		match self {
			SignatureScheme::Epayco => &[SecretField::CustomerId, SecretField::SharedSecret],
			SignatureScheme::Meta => &[SecretField::SharedSecret],
		}
	}

	fn verify(&self, ctx: &WebhookSignatureContext<'_>) -> WebhookResult<Verdict> {
		if ctx.provider != self.provider() {
			return Err(WebhookError::ProviderMismatch {
				expected: self.provider(),
				found: ctx.provider,
			});
		}

		match self {
			SignatureScheme::Epayco => epayco::verify_webhook(ctx),
			SignatureScheme::Meta => meta::verify_webhook(ctx),
		}
	}
}
