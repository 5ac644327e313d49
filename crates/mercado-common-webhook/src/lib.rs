// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Signature primitives shared by the webhook schemes.
//!
//! Everything here works on raw bytes. Callers must pass the exact bytes
//! the sender signed, never a re-serialized copy.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of a SHA-256 digest or HMAC-SHA256 tag.
pub const SHA256_LEN: usize = 32;

/// Lowercase hex SHA-256 of `parts` fed in order with no separator.
pub fn sha256_hex<I, P>(parts: I) -> String
where
	I: IntoIterator<Item = P>,
	P: AsRef<[u8]>,
{
	let mut hasher = Sha256::new();
	for part in parts {
		hasher.update(part.as_ref());
	}
	hex::encode(hasher.finalize())
}

/// Hex-encoded HMAC-SHA256 of `payload`, without any prefix.
pub fn compute_hmac_sha256(secret: &[u8], payload: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
	mac.update(payload);
	hex::encode(mac.finalize().into_bytes())
}

/// Check a hex HMAC-SHA256 signature (no prefix) over `payload`.
///
/// Invalid hex is a mismatch. The tag comparison is constant time.
pub fn verify_hmac_sha256(secret: &[u8], payload: &[u8], signature_hex: &str) -> bool {
	let Ok(claimed) = hex::decode(signature_hex) else {
		return false;
	};

	let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
		return false;
	};
	mac.update(payload);
	mac.verify_slice(&claimed).is_ok()
}

/// Constant-time equality; slices of different length compare unequal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}
	a.ct_eq(b).into()
}

/// Compare a claimed hex digest with an expected hex digest.
///
/// Both sides are decoded first, so letter case does not matter. Anything
/// that is not hex never matches.
pub fn hex_digest_matches(expected_hex: &str, claimed_hex: &str) -> bool {
	match (hex::decode(expected_hex), hex::decode(claimed_hex)) {
		(Ok(expected), Ok(claimed)) => constant_time_eq(&expected, &claimed),
		_ => false,
	}
}
