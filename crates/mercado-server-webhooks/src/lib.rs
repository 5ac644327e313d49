// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication of inbound payment and messaging webhooks.
//!
//! [`WebhookAuthenticator`] recomputes a provider's signature from the
//! tenant's stored (encrypted) credential and the raw request, and returns
//! a [`Verdict`]. Handlers must only act on [`Verdict::Authentic`]; both
//! [`Verdict::Rejected`] and any [`WebhookError`] mean "do nothing".
//!
//! # Supported providers
//!
//! - ePayco: SHA-256 over customer id, integrity secret and the signed
//!   transaction fields, sent as `x_signature` in the payload. See [`epayco`].
//! - Meta: HMAC-SHA256 of the raw body in `X-Hub-Signature-256`. See [`meta`].
//!
//! ```ignore
//! use std::sync::Arc;
//! use mercado_server_webhooks::{InboundWebhook, Verdict, WebhookAuthenticator};
//!
//! let authenticator = WebhookAuthenticator::new(Arc::new(codec));
//! let webhook = InboundWebhook::for_route("meta", &body)?
//!     .with_signature(signature_header);
//! if authenticator.authenticate(credential.as_ref(), &webhook)? == Verdict::Authentic {
//!     // apply the event
//! }
//! ```

pub mod authenticator;
pub mod epayco;
pub mod error;
pub mod meta;
pub mod scheme;
pub mod verdict;

pub use authenticator::{InboundWebhook, WebhookAuthenticator};
pub use epayco::{EpaycoConfirmation, TransactionState};
pub use error::{WebhookError, WebhookResult};
pub use meta::SubscriptionRequest;
pub use scheme::{ProviderSecrets, SignatureScheme, VerifySignature, WebhookSignatureContext};
pub use verdict::{Rejection, Verdict};
