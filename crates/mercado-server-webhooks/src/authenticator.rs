// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use mercado_server_credentials::{Provider, ProviderCredential, SecretCodec};
use tracing::{debug, instrument, warn};

use crate::error::{WebhookError, WebhookResult};
use crate::scheme::{ProviderSecrets, SignatureScheme, VerifySignature, WebhookSignatureContext};
use crate::verdict::Verdict;

/// An inbound webhook request as the HTTP layer received it.
#[derive(Debug, Clone, Copy)]
pub struct InboundWebhook<'a> {
	provider: Provider,
	body: &'a [u8],
	content_type: Option<&'a str>,
	signature: Option<&'a str>,
}

impl<'a> InboundWebhook<'a> {
	/// `body` must be the exact bytes read off the wire.
	pub fn new(provider: Provider, body: &'a [u8]) -> Self {
		Self {
			provider,
			body,
			content_type: None,
			signature: None,
		}
	}

	/// Build from the provider segment of a webhook route, e.g.
	/// `/webhooks/{provider}`.
	pub fn for_route(provider: &str, body: &'a [u8]) -> WebhookResult<Self> {
		Ok(Self::new(provider.parse()?, body))
	}

	pub fn with_content_type(mut self, content_type: &'a str) -> Self {
		self.content_type = Some(content_type);
		self
	}

	/// Value of the provider's signature header, if present.
	pub fn with_signature(mut self, signature: &'a str) -> Self {
		self.signature = Some(signature);
		self
	}

	pub fn provider(&self) -> Provider {
		self.provider
	}

	pub fn body(&self) -> &'a [u8] {
		self.body
	}
}

/// Decides whether an inbound webhook really comes from its provider.
///
/// Holds no per-request state; share one instance behind an `Arc`.
#[derive(Debug, Clone)]
pub struct WebhookAuthenticator {
	codec: Arc<SecretCodec>,
}

impl WebhookAuthenticator {
	pub fn new(codec: Arc<SecretCodec>) -> Self {
		Self { codec }
	}

	/// Verify `webhook` against the tenant's stored `credential`.
	///
	/// Returns `Ok(Verdict::Authentic)` only when the signature was
	/// recomputed from the tenant's secrets and matched. A missing or
	/// inactive credential, a credential without the needed secrets, or a
	/// payload missing signed fields is an `Err`.
	#[instrument(skip_all, fields(provider = %webhook.provider()))]
	pub fn authenticate(
		&self,
		credential: Option<&ProviderCredential>,
		webhook: &InboundWebhook<'_>,
	) -> WebhookResult<Verdict> {
		let provider = webhook.provider();
		let Some(credential) = credential else {
			warn!("no credential configured for webhook provider");
			return Err(WebhookError::MissingCredential { provider });
		};

		if credential.provider != provider {
			return Err(WebhookError::ProviderMismatch {
				expected: provider,
				found: credential.provider,
			});
		}
		if !credential.is_usable() {
			warn!(tenant_id = %credential.tenant_id, "webhook for inactive credential");
			return Err(WebhookError::CredentialInactive {
				tenant_id: credential.tenant_id.clone(),
				provider,
			});
		}

		let scheme = SignatureScheme::for_provider(provider);
		let mut secrets = ProviderSecrets::new();
		for &field in scheme.required_secrets() {
			let value = credential
				.reveal(field, &self.codec)?
				.filter(|value| !value.is_empty())
				.ok_or(WebhookError::MissingSecret(field))?;
			secrets.insert(field, value);
		}

		let ctx = WebhookSignatureContext {
			provider,
			payload: webhook.body(),
			content_type: webhook.content_type,
			signature: webhook.signature,
			secrets,
		};
		let verdict = scheme.verify(&ctx)?;

		match verdict {
			Verdict::Authentic => {
				debug!(tenant_id = %credential.tenant_id, "webhook signature verified");
			}
			Verdict::Rejected(reason) => {
				warn!(
					tenant_id = %credential.tenant_id,
					%reason,
					body_len = webhook.body().len(),
					"webhook signature rejected"
				);
			}
		}
		Ok(verdict)
	}
}
