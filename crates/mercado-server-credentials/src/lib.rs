// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! At-rest encryption of tenant provider credentials.
//!
//! [`SecretCodec`] turns plaintext provider secrets into the persisted
//! `<iv_hex>:<tag_hex>:<ciphertext_hex>` form and back, keyed by a master
//! secret that never leaves the process. [`ProviderCredential`] is the
//! stored record that carries those values per tenant and provider.
//!
//! ```ignore
//! use mercado_server_credentials::{CodecConfig, SecretCodec};
//!
//! let codec = SecretCodec::new(CodecConfig::from_env()?);
//! let stored = codec.encrypt("sk_live_4242")?.to_string();
//! let plaintext = codec.decrypt(&stored)?;
//! ```

pub mod codec;
pub mod config;
pub mod credential;
pub mod error;
pub mod kdf;
pub mod provider;

pub use codec::{is_encrypted, EncryptedSecret, SecretCodec, IV_SIZE, TAG_SIZE};
pub use config::{CodecConfig, MASTER_SECRET_ENV};
pub use credential::{ProviderCredential, ProviderCredentialDraft, SecretField};
pub use error::{CredentialsError, CredentialsResult};
pub use kdf::KEY_SIZE;
pub use provider::{Provider, UnknownProvider};
