// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end webhook authentication against sealed tenant credentials.

use std::io;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

use mercado_common_secret::SecretString;
use mercado_server_credentials::{
	CodecConfig, Provider, ProviderCredential, ProviderCredentialDraft, SecretCodec,
};
use mercado_server_webhooks::{
	epayco, meta, InboundWebhook, Rejection, TransactionState, Verdict, WebhookAuthenticator,
	WebhookError,
};

const CUSTOMER_ID: &str = "12345";
const INTEGRITY_SECRET: &str = "test_encryption_key";
const APP_SECRET: &str = "meta-app-secret";
const EPAYCO_SIGNATURE: &str = "9f954114bdde7e3ac53b68139a95e611924fb4193aadd9585c2361a1db737a22";

fn codec() -> Arc<SecretCodec> {
	static CODEC: OnceLock<Arc<SecretCodec>> = OnceLock::new();
	CODEC
		.get_or_init(|| {
			Arc::new(SecretCodec::new(CodecConfig::new(Some(SecretString::from(
				"integration-master-secret",
			)))))
		})
		.clone()
}

fn epayco_credential() -> ProviderCredential {
	ProviderCredentialDraft::new("tenant-shop", Provider::Epayco)
		.with_public_key("pub_491")
		.with_customer_id(SecretString::from(CUSTOMER_ID))
		.with_private_key(SecretString::from("priv_491"))
		.with_shared_secret(SecretString::from(INTEGRITY_SECRET))
		.with_test_mode(true)
		.seal(&codec())
		.unwrap()
}

fn meta_credential() -> ProviderCredential {
	ProviderCredentialDraft::new("tenant-shop", Provider::Meta)
		.with_shared_secret(SecretString::from(APP_SECRET))
		.seal(&codec())
		.unwrap()
}

fn epayco_form(signature: &str) -> String {
	format!(
		"x_ref_payco=test_ref_123&x_transaction_id=test_tx_456&x_amount=10000&x_currency_code=COP\
		 &x_cod_response=1&x_id_invoice=ORD-77&x_signature={signature}"
	)
}

#[test]
fn epayco_form_confirmation_is_authentic() {
	let body = epayco_form(EPAYCO_SIGNATURE);
	let webhook = InboundWebhook::for_route("epayco", body.as_bytes())
		.unwrap()
		.with_content_type("application/x-www-form-urlencoded");

	let verdict = WebhookAuthenticator::new(codec())
		.authenticate(Some(&epayco_credential()), &webhook)
		.unwrap();
	assert_eq!(verdict, Verdict::Authentic);

	let confirmation = epayco::EpaycoConfirmation::parse(body.as_bytes(), None).unwrap();
	assert_eq!(confirmation.state(), TransactionState::Accepted);
	assert_eq!(confirmation.invoice_id(), Some("ORD-77"));
}

#[test]
fn epayco_json_confirmation_is_authentic() {
	let body = format!(
		r#"{{"x_ref_payco":"test_ref_123","x_transaction_id":"test_tx_456","x_amount":"10000","x_currency_code":"COP","x_signature":"{EPAYCO_SIGNATURE}"}}"#
	);
	let webhook =
		InboundWebhook::new(Provider::Epayco, body.as_bytes()).with_content_type("application/json");

	let verdict = WebhookAuthenticator::new(codec())
		.authenticate(Some(&epayco_credential()), &webhook)
		.unwrap();
	assert!(verdict.is_authentic());
}

#[test]
fn epayco_tampered_amount_is_rejected() {
	let body = epayco_form(EPAYCO_SIGNATURE).replace("x_amount=10000", "x_amount=10001");
	let webhook = InboundWebhook::new(Provider::Epayco, body.as_bytes());

	let verdict = WebhookAuthenticator::new(codec())
		.authenticate(Some(&epayco_credential()), &webhook)
		.unwrap();
	assert_eq!(verdict, Verdict::Rejected(Rejection::SignatureMismatch));
}

#[test]
fn epayco_missing_signed_field_is_an_error() {
	let body = "x_ref_payco=test_ref_123&x_amount=10000&x_currency_code=COP";
	let webhook = InboundWebhook::new(Provider::Epayco, body.as_bytes());

	let err = WebhookAuthenticator::new(codec())
		.authenticate(Some(&epayco_credential()), &webhook)
		.unwrap_err();
	assert!(matches!(err, WebhookError::MissingField("x_transaction_id")));
	assert!(!err.is_configuration());
}

#[test]
fn meta_signature_covers_exact_bytes() {
	let body = br#"{"object":"whatsapp_business_account","entry":[]}"#;
	let header = meta::compute_signature(APP_SECRET, body);
	let authenticator = WebhookAuthenticator::new(codec());
	let credential = meta_credential();

	let webhook = InboundWebhook::new(Provider::Meta, body).with_signature(&header);
	assert_eq!(
		authenticator.authenticate(Some(&credential), &webhook).unwrap(),
		Verdict::Authentic
	);

	let mut padded = body.to_vec();
	padded.push(b'\n');
	let webhook = InboundWebhook::new(Provider::Meta, &padded).with_signature(&header);
	assert_eq!(
		authenticator.authenticate(Some(&credential), &webhook).unwrap(),
		Verdict::Rejected(Rejection::SignatureMismatch)
	);
}

#[test]
fn meta_without_header_is_rejected_not_authentic() {
	let webhook = InboundWebhook::new(Provider::Meta, b"{}");
	let verdict = WebhookAuthenticator::new(codec())
		.authenticate(Some(&meta_credential()), &webhook)
		.unwrap();
	assert_eq!(verdict, Verdict::Rejected(Rejection::MissingSignature));
}

#[test]
fn unconfigured_codec_never_authenticates() {
	let credential = meta_credential();
	let unconfigured = Arc::new(SecretCodec::new(CodecConfig::default()));
	let body = b"{}";
	let header = meta::compute_signature(APP_SECRET, body);
	let webhook = InboundWebhook::new(Provider::Meta, body).with_signature(&header);

	let err = WebhookAuthenticator::new(unconfigured)
		.authenticate(Some(&credential), &webhook)
		.unwrap_err();
	assert!(err.is_configuration());
}

#[test]
fn authenticator_is_shared_across_threads() {
	let authenticator = Arc::new(WebhookAuthenticator::new(codec()));
	let credential = Arc::new(meta_credential());

	let handles: Vec<_> = (0..4)
		.map(|i| {
			let authenticator = Arc::clone(&authenticator);
			let credential = Arc::clone(&credential);
			thread::spawn(move || {
				let body = format!(r#"{{"entry":[{i}]}}"#);
				let header = meta::compute_signature(APP_SECRET, body.as_bytes());
				let webhook = InboundWebhook::new(Provider::Meta, body.as_bytes()).with_signature(&header);
				authenticator.authenticate(Some(&credential), &webhook).unwrap()
			})
		})
		.collect();

	for handle in handles {
		assert_eq!(handle.join().unwrap(), Verdict::Authentic);
	}
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.0.lock().unwrap().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

#[test]
fn logs_never_contain_secrets_or_expected_signatures() {
	let logs = CapturedLogs::default();
	let writer = logs.clone();
	let subscriber = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::DEBUG)
		.with_ansi(false)
		.with_writer(move || writer.clone())
		.finish();

	tracing::subscriber::with_default(subscriber, || {
		let authenticator = WebhookAuthenticator::new(codec());
		let good = epayco_form(EPAYCO_SIGNATURE);
		let bad = epayco_form(&"0".repeat(64));
		for body in [good, bad] {
			let webhook = InboundWebhook::new(Provider::Epayco, body.as_bytes());
			let _ = authenticator.authenticate(Some(&epayco_credential()), &webhook);
		}
	});

	let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
	assert!(output.contains("webhook signature verified"));
	assert!(output.contains("signature_mismatch"));
	for secret in [INTEGRITY_SECRET, "priv_491", "integration-master-secret"] {
		assert!(!output.contains(secret), "log output leaked {secret}");
	}
	assert!(!output.contains(EPAYCO_SIGNATURE));
}
