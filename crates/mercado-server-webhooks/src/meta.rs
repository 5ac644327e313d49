// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Meta (WhatsApp Business) webhooks.
//!
//! Event deliveries carry `X-Hub-Signature-256: sha256=<hex>`, the
//! HMAC-SHA256 of the raw request body keyed with the app secret.
//! Subscription setup is a separate GET handshake that echoes
//! `hub.challenge` when `hub.verify_token` matches.

use mercado_common_secret::SecretString;
use mercado_common_webhook::{compute_hmac_sha256, constant_time_eq, verify_hmac_sha256, SHA256_LEN};
use mercado_server_credentials::SecretField;

use crate::error::{WebhookError, WebhookResult};
use crate::scheme::WebhookSignatureContext;
use crate::verdict::{Rejection, Verdict};

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// The only algorithm Meta signs with.
pub const SIGNATURE_ALGORITHM: &str = "sha256";

/// Split `sha256=<hex>` and return the hex digest.
pub fn parse_signature_header(header: &str) -> Result<&str, Rejection> {
	let header = header.trim();
	if header.is_empty() {
		return Err(Rejection::MissingSignature);
	}

	let Some((algorithm, digest)) = header.split_once('=') else {
		return Err(Rejection::MalformedSignature);
	};
	if !algorithm.eq_ignore_ascii_case(SIGNATURE_ALGORITHM) {
		return Err(Rejection::UnsupportedAlgorithm);
	}
	if digest.len() != SHA256_LEN * 2 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
		return Err(Rejection::MalformedSignature);
	}
	Ok(digest)
}

/// Header value Meta would send for `body`: `sha256=<hex>`.
pub fn compute_signature(app_secret: &str, body: &[u8]) -> String {
	format!(
		"{SIGNATURE_ALGORITHM}={}",
		compute_hmac_sha256(app_secret.as_bytes(), body)
	)
}

/// Check a `X-Hub-Signature-256` header against the raw body.
pub fn verify_signature(app_secret: &str, body: &[u8], header: Option<&str>) -> Verdict {
	let Some(header) = header else {
		return Rejection::MissingSignature.into();
	};
	let digest = match parse_signature_header(header) {
		Ok(digest) => digest,
		Err(reason) => return reason.into(),
	};

	if verify_hmac_sha256(app_secret.as_bytes(), body, digest) {
		Verdict::Authentic
	} else {
		Rejection::SignatureMismatch.into()
	}
}

pub(crate) fn verify_webhook(ctx: &WebhookSignatureContext<'_>) -> WebhookResult<Verdict> {
	let app_secret = ctx.secrets.require(SecretField::SharedSecret)?;
	Ok(verify_signature(app_secret.expose(), ctx.payload, ctx.signature))
}

pub const MODE_PARAM: &str = "hub.mode";
pub const VERIFY_TOKEN_PARAM: &str = "hub.verify_token";
pub const CHALLENGE_PARAM: &str = "hub.challenge";

const SUBSCRIBE_MODE: &str = "subscribe";

/// The `GET` request Meta sends when a webhook subscription is configured.
pub struct SubscriptionRequest {
	mode: String,
	verify_token: SecretString,
	challenge: String,
}

impl SubscriptionRequest {
	/// Parse the query string (without the leading `?`).
	pub fn parse(query: &str) -> WebhookResult<Self> {
		let mut mode = None;
		let mut verify_token = None;
		let mut challenge = None;

		for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
			let slot = match name.as_ref() {
				MODE_PARAM => &mut mode,
				VERIFY_TOKEN_PARAM => &mut verify_token,
				CHALLENGE_PARAM => &mut challenge,
				_ => continue,
			};
			if slot.is_none() {
				*slot = Some(value.into_owned());
			}
		}

		Ok(Self {
			mode: mode.ok_or(WebhookError::MissingField(MODE_PARAM))?,
			verify_token: verify_token
				.map(SecretString::new)
				.ok_or(WebhookError::MissingField(VERIFY_TOKEN_PARAM))?,
			challenge: challenge.ok_or(WebhookError::MissingField(CHALLENGE_PARAM))?,
		})
	}

	pub fn mode(&self) -> &str {
		&self.mode
	}

	/// The challenge to echo back, if this is a subscribe request carrying
	/// `expected_token`.
	pub fn confirm(&self, expected_token: &SecretString) -> Option<&str> {
		if self.mode != SUBSCRIBE_MODE || expected_token.is_empty() {
			return None;
		}
		let matches = constant_time_eq(
			self.verify_token.expose().as_bytes(),
			expected_token.expose().as_bytes(),
		);
		matches.then_some(self.challenge.as_str())
	}
}

impl std::fmt::Debug for SubscriptionRequest {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SubscriptionRequest")
			.field("mode", &self.mode)
			.field("verify_token", &self.verify_token)
			.field("challenge", &self.challenge)
			.finish()
	}
}
