// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ePayco payment confirmations.
//!
//! ePayco signs a confirmation with the lowercase hex SHA-256 of
//! `customer_id || integrity_secret || x_ref_payco || x_transaction_id ||
//! x_amount || x_currency_code`, concatenated with no separator, and sends
//! it as `x_signature` inside the payload. Confirmations arrive either as
//! JSON or as `application/x-www-form-urlencoded`.

use std::collections::HashMap;

use mercado_common_webhook::{hex_digest_matches, sha256_hex, SHA256_LEN};
use mercado_server_credentials::SecretField;
use serde_json::value::RawValue;

use crate::error::{WebhookError, WebhookResult};
use crate::scheme::WebhookSignatureContext;
use crate::verdict::{Rejection, Verdict};

pub const FIELD_REF_PAYCO: &str = "x_ref_payco";
pub const FIELD_TRANSACTION_ID: &str = "x_transaction_id";
pub const FIELD_AMOUNT: &str = "x_amount";
pub const FIELD_CURRENCY_CODE: &str = "x_currency_code";
pub const FIELD_SIGNATURE: &str = "x_signature";
pub const FIELD_COD_RESPONSE: &str = "x_cod_response";
pub const FIELD_ID_INVOICE: &str = "x_id_invoice";
pub const FIELD_TEST_REQUEST: &str = "x_test_request";

/// Transaction state carried in `x_cod_response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
	Accepted,
	Rejected,
	Pending,
	Failed,
	Reversed,
	Held,
	Initiated,
	Expired,
	Abandoned,
	Cancelled,
	Antifraud,
	Unknown,
}

impl TransactionState {
	pub fn from_code(code: &str) -> Self {
		match code.trim() {
			"1" => TransactionState::Accepted,
			"2" => TransactionState::Rejected,
			"3" => TransactionState::Pending,
			"4" => TransactionState::Failed,
			"6" => TransactionState::Reversed,
			"7" => TransactionState::Held,
			"8" => TransactionState::Initiated,
			"9" => TransactionState::Expired,
			"10" => TransactionState::Abandoned,
			"11" => TransactionState::Cancelled,
			"12" => TransactionState::Antifraud,
			_ => TransactionState::Unknown,
		}
	}

	/// True once ePayco will not move the transaction any further.
	pub fn is_final(&self) -> bool {
		!matches!(
			self,
			TransactionState::Pending
				| TransactionState::Held
				| TransactionState::Initiated
				| TransactionState::Unknown
		)
	}
}

/// A parsed ePayco confirmation.
///
/// Field values are kept exactly as sent. Nothing here is trustworthy until
/// the signature has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpaycoConfirmation {
	pub ref_payco: String,
	pub transaction_id: String,
	pub amount: String,
	pub currency_code: String,
	pub signature: Option<String>,
	pub cod_response: Option<String>,
	pub invoice_id: Option<String>,
	pub test_request: bool,
}

impl EpaycoConfirmation {
	/// Parse a confirmation body.
	///
	/// JSON when `content_type` mentions `json`, form-encoded otherwise.
	pub fn parse(payload: &[u8], content_type: Option<&str>) -> WebhookResult<Self> {
		let fields = if is_json(content_type) {
			json_fields(payload)?
		} else {
			form_fields(payload)
		};
		Self::from_fields(&fields)
	}

	pub fn from_fields(fields: &HashMap<String, String>) -> WebhookResult<Self> {
		let required = |name: &'static str| -> WebhookResult<String> {
			fields
				.get(name)
				.filter(|value| !value.is_empty())
				.cloned()
				.ok_or(WebhookError::MissingField(name))
		};
		let optional = |name: &str| fields.get(name).filter(|value| !value.is_empty()).cloned();

		Ok(Self {
			ref_payco: required(FIELD_REF_PAYCO)?,
			transaction_id: required(FIELD_TRANSACTION_ID)?,
			amount: required(FIELD_AMOUNT)?,
			currency_code: required(FIELD_CURRENCY_CODE)?,
			signature: optional(FIELD_SIGNATURE),
			cod_response: optional(FIELD_COD_RESPONSE),
			invoice_id: optional(FIELD_ID_INVOICE),
			test_request: optional(FIELD_TEST_REQUEST)
				.map(|value| value.eq_ignore_ascii_case("true") || value == "1")
				.unwrap_or(false),
		})
	}

	pub fn invoice_id(&self) -> Option<&str> {
		self.invoice_id.as_deref()
	}

	pub fn state(&self) -> TransactionState {
		self.cod_response
			.as_deref()
			.map(TransactionState::from_code)
			.unwrap_or(TransactionState::Unknown)
	}
}

fn is_json(content_type: Option<&str>) -> bool {
	content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
}

fn json_fields(payload: &[u8]) -> WebhookResult<HashMap<String, String>> {
	let object: HashMap<String, &RawValue> = serde_json::from_slice(payload)
		.map_err(|e| WebhookError::MalformedPayload(format!("expected a JSON object: {e}")))?;

	let mut fields = HashMap::with_capacity(object.len());
	for (name, raw) in object {
		let token = raw.get().trim();
		let value = match token.as_bytes().first() {
			Some(b'"') => serde_json::from_str::<String>(token).map_err(|e| {
				WebhookError::MalformedPayload(format!("invalid string in {name}: {e}"))
			})?,
			// Numbers and booleans are kept as the sender wrote them.
			Some(b'-' | b'0'..=b'9' | b't' | b'f') => token.to_string(),
			_ => continue,
		};
		fields.insert(name, value);
	}
	Ok(fields)
}

fn form_fields(payload: &[u8]) -> HashMap<String, String> {
	let mut fields = HashMap::new();
	for (name, value) in url::form_urlencoded::parse(payload) {
		fields
			.entry(name.into_owned())
			.or_insert_with(|| value.into_owned());
	}
	fields
}

/// Lowercase hex signature ePayco would send for `confirmation`.
pub fn compute_signature(
	customer_id: &str,
	shared_secret: &str,
	confirmation: &EpaycoConfirmation,
) -> String {
	sha256_hex([
		customer_id,
		shared_secret,
		confirmation.ref_payco.as_str(),
		confirmation.transaction_id.as_str(),
		confirmation.amount.as_str(),
		confirmation.currency_code.as_str(),
	])
}

/// Check `x_signature` on a parsed confirmation.
///
/// Hex case is ignored; the digests are compared in constant time.
pub fn verify_signature(
	customer_id: &str,
	shared_secret: &str,
	confirmation: &EpaycoConfirmation,
) -> Verdict {
	let Some(claimed) = confirmation.signature.as_deref().map(str::trim) else {
		return Rejection::MissingSignature.into();
	};
	if claimed.len() != SHA256_LEN * 2 || !claimed.bytes().all(|b| b.is_ascii_hexdigit()) {
		return Rejection::MalformedSignature.into();
	}

	let expected = compute_signature(customer_id, shared_secret, confirmation);
	if hex_digest_matches(&expected, claimed) {
		Verdict::Authentic
	} else {
		Rejection::SignatureMismatch.into()
	}
}

pub(crate) fn verify_webhook(ctx: &WebhookSignatureContext<'_>) -> WebhookResult<Verdict> {
	let customer_id = ctx.secrets.require(SecretField::CustomerId)?;
	let shared_secret = ctx.secrets.require(SecretField::SharedSecret)?;
	let confirmation = EpaycoConfirmation::parse(ctx.payload, ctx.content_type)?;

	Ok(verify_signature(
		customer_id.expose(),
		shared_secret.expose(),
		&confirmation,
	))
}
