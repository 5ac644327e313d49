// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Derivation of the credential encryption key from the master secret.
//!
//! scrypt with N = 2^14, r = 8, p = 1 and the constant salt `"salt"`. These
//! match the parameters every stored credential was written with; changing
//! any of them makes existing values undecryptable. The constant salt gives
//! no per-value protection and relies on the master secret being high
//! entropy.

use mercado_common_secret::SecretString;
use scrypt::{scrypt, Params};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{CredentialsError, CredentialsResult};

/// Size of the derived AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Fixed scrypt salt.
pub const KDF_SALT: &[u8] = b"salt";

/// log2 of the scrypt cost parameter N (16384).
pub const SCRYPT_LOG_N: u8 = 14;

pub const SCRYPT_R: u32 = 8;

pub const SCRYPT_P: u32 = 1;

/// Derive the 32-byte encryption key for `master_secret`.
pub fn derive_key(master_secret: &SecretString) -> CredentialsResult<Zeroizing<[u8; KEY_SIZE]>> {
	if master_secret.is_empty() {
		return Err(CredentialsError::MasterSecretNotConfigured);
	}

	let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_SIZE)
		.map_err(|e| CredentialsError::KeyDerivation(format!("invalid scrypt parameters: {e}")))?;

	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	scrypt(
		master_secret.expose().as_bytes(),
		KDF_SALT,
		&params,
		key.as_mut_slice(),
	)
	.map_err(|e| CredentialsError::KeyDerivation(e.to_string()))?;

	debug!("derived credential encryption key");
	Ok(key)
}
