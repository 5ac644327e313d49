// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authenticated encryption of credentials at rest.
//!
//! Stored form: `<iv_hex>:<tag_hex>:<ciphertext_hex>`, AES-256-GCM with a
//! random 16-byte IV per value and a detached 16-byte tag. The key comes
//! from [`crate::kdf::derive_key`] and is derived at most once per codec.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use aes_gcm::{
	aead::{consts::U16, AeadInPlace, KeyInit, OsRng},
	aes::Aes256,
	AesGcm, Key, Nonce, Tag,
};
use mercado_common_secret::SecretString;
use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;
use zeroize::Zeroizing;

use crate::config::CodecConfig;
use crate::error::{CredentialsError, CredentialsResult};
use crate::kdf::{derive_key, KEY_SIZE};

/// AES-256-GCM keyed for 16-byte IVs.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Size of the random IV in bytes.
pub const IV_SIZE: usize = 16;

/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Separator between the hex segments of the stored form.
pub const SEGMENT_DELIMITER: char = ':';

const SEGMENT_COUNT: usize = 3;

/// A credential value as persisted: IV, tag and ciphertext.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedSecret {
	iv: [u8; IV_SIZE],
	tag: [u8; TAG_SIZE],
	ciphertext: Vec<u8>,
}

impl EncryptedSecret {
	pub fn iv(&self) -> &[u8; IV_SIZE] {
		&self.iv
	}

	pub fn tag(&self) -> &[u8; TAG_SIZE] {
		&self.tag
	}

	pub fn ciphertext(&self) -> &[u8] {
		&self.ciphertext
	}

	/// Parse the stored form.
	///
	/// Anything other than exactly three segments, or a segment that is not
	/// hex of the right length, is a [`CredentialsError::Format`] error. The
	/// ciphertext segment is empty for an encrypted empty string.
	pub fn parse(encoded: &str) -> CredentialsResult<Self> {
		let segments: Vec<&str> = encoded.split(SEGMENT_DELIMITER).collect();
		if segments.len() != SEGMENT_COUNT {
			return Err(CredentialsError::Format(format!(
				"expected {SEGMENT_COUNT} segments, found {}",
				segments.len()
			)));
		}

		let mut iv = [0u8; IV_SIZE];
		hex::decode_to_slice(segments[0], &mut iv)
			.map_err(|e| CredentialsError::Format(format!("invalid IV segment: {e}")))?;

		let mut tag = [0u8; TAG_SIZE];
		hex::decode_to_slice(segments[1], &mut tag)
			.map_err(|e| CredentialsError::Format(format!("invalid tag segment: {e}")))?;

		let ciphertext = hex::decode(segments[2])
			.map_err(|e| CredentialsError::Format(format!("invalid ciphertext segment: {e}")))?;

		Ok(Self {
			iv,
			tag,
			ciphertext,
		})
	}
}

impl fmt::Display for EncryptedSecret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}{SEGMENT_DELIMITER}{}{SEGMENT_DELIMITER}{}",
			hex::encode(self.iv),
			hex::encode(self.tag),
			hex::encode(&self.ciphertext)
		)
	}
}

impl fmt::Debug for EncryptedSecret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EncryptedSecret")
			.field("ciphertext_len", &self.ciphertext.len())
			.finish_non_exhaustive()
	}
}

impl FromStr for EncryptedSecret {
	type Err = CredentialsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl Serialize for EncryptedSecret {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for EncryptedSecret {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let encoded = String::deserialize(deserializer)?;
		Self::parse(&encoded).map_err(de::Error::custom)
	}
}

/// True iff `value` has the stored shape: three non-empty hex segments.
///
/// Used to tell encrypted values from legacy plaintext. Does not need a
/// master secret and never fails.
pub fn is_encrypted(value: &str) -> bool {
	let mut count = 0;
	for segment in value.split(SEGMENT_DELIMITER) {
		count += 1;
		if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_hexdigit()) {
			return false;
		}
	}
	count == SEGMENT_COUNT
}

/// Encrypts and decrypts tenant credentials under the platform master secret.
///
/// Stateless apart from the lazily derived key, which is tied to the master
/// secret this codec was built with. A different master secret needs a new
/// codec.
pub struct SecretCodec {
	config: CodecConfig,
	key: OnceLock<Zeroizing<[u8; KEY_SIZE]>>,
}

impl SecretCodec {
	pub fn new(config: CodecConfig) -> Self {
		Self {
			config,
			key: OnceLock::new(),
		}
	}

	pub fn with_master_secret(master_secret: SecretString) -> Self {
		Self::new(CodecConfig::new(Some(master_secret)))
	}

	pub fn from_env() -> CredentialsResult<Self> {
		Ok(Self::new(CodecConfig::from_env()?))
	}

	pub fn is_configured(&self) -> bool {
		self.config.is_configured()
	}

	fn key(&self) -> CredentialsResult<&Zeroizing<[u8; KEY_SIZE]>> {
		if let Some(key) = self.key.get() {
			return Ok(key);
		}

		let master_secret = self
			.config
			.master_secret()
			.ok_or(CredentialsError::MasterSecretNotConfigured)?;
		let derived = derive_key(master_secret)?;
		Ok(self.key.get_or_init(|| derived))
	}

	fn cipher(&self) -> CredentialsResult<Aes256Gcm16> {
		let key = self.key()?;
		Ok(Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.as_slice())))
	}

	/// Encrypt `plaintext` under a fresh random IV.
	///
	/// Two calls with the same input produce different values.
	pub fn encrypt(&self, plaintext: &str) -> CredentialsResult<EncryptedSecret> {
		let cipher = self.cipher()?;

		let mut iv = [0u8; IV_SIZE];
		OsRng.fill_bytes(&mut iv);

		let mut ciphertext = plaintext.as_bytes().to_vec();
		let tag = cipher
			.encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut ciphertext)
			.map_err(|e| CredentialsError::Encryption(format!("AES-256-GCM seal failed: {e}")))?;

		let mut tag_bytes = [0u8; TAG_SIZE];
		tag_bytes.copy_from_slice(&tag);

		Ok(EncryptedSecret {
			iv,
			tag: tag_bytes,
			ciphertext,
		})
	}

	/// Decrypt a stored value.
	///
	/// The shape is checked before the key is touched, so malformed input is
	/// always a [`CredentialsError::Format`] error.
	pub fn decrypt(&self, encoded: &str) -> CredentialsResult<SecretString> {
		let encrypted = EncryptedSecret::parse(encoded)?;
		self.decrypt_secret(&encrypted)
	}

	/// Decrypt an already parsed value. Fails closed on a tag mismatch.
	pub fn decrypt_secret(&self, encrypted: &EncryptedSecret) -> CredentialsResult<SecretString> {
		let cipher = self.cipher()?;

		let mut buffer = Zeroizing::new(encrypted.ciphertext.clone());
		if cipher
			.decrypt_in_place_detached(
				Nonce::<U16>::from_slice(&encrypted.iv),
				b"",
				&mut buffer,
				Tag::<U16>::from_slice(&encrypted.tag),
			)
			.is_err()
		{
			warn!(
				ciphertext_len = encrypted.ciphertext.len(),
				"stored credential failed authentication"
			);
			return Err(CredentialsError::AuthenticationFailed);
		}

		let plaintext = std::str::from_utf8(&buffer)
			.map_err(|_| CredentialsError::Format("decrypted value is not valid UTF-8".into()))?;
		Ok(SecretString::new(plaintext.to_string()))
	}

	/// See [`is_encrypted`].
	pub fn is_encrypted(value: &str) -> bool {
		is_encrypted(value)
	}

	/// Encrypt `value` unless it is already a stored value.
	///
	/// An encrypted empty string (`iv:tag:`) counts as stored even though
	/// [`is_encrypted`] rejects its empty ciphertext segment.
	pub fn ensure_encrypted(&self, value: &str) -> CredentialsResult<String> {
		if is_encrypted(value) || EncryptedSecret::parse(value).is_ok() {
			return Ok(value.to_string());
		}
		Ok(self.encrypt(value)?.to_string())
	}

	/// Plaintext of `value`, decrypting it if it has the stored shape.
	///
	/// Lets legacy rows written before encryption keep working during
	/// migration. A value that looks encrypted but fails to decrypt is an
	/// error, never passed through.
	pub fn reveal(&self, value: &str) -> CredentialsResult<SecretString> {
		match EncryptedSecret::parse(value) {
			Ok(encrypted) => self.decrypt_secret(&encrypted),
			Err(err) if is_encrypted(value) => Err(err),
			Err(_) => Ok(SecretString::new(value.to_string())),
		}
	}
}

impl fmt::Debug for SecretCodec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SecretCodec")
			.field("config", &self.config)
			.field("key_derived", &self.key.get().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const MASTER: &str = "test-master-secret";

	fn codec() -> &'static SecretCodec {
		static CODEC: OnceLock<SecretCodec> = OnceLock::new();
		CODEC.get_or_init(|| SecretCodec::with_master_secret(SecretString::from(MASTER)))
	}

	fn other_codec() -> &'static SecretCodec {
		static CODEC: OnceLock<SecretCodec> = OnceLock::new();
		CODEC.get_or_init(|| SecretCodec::with_master_secret(SecretString::from("rotated-master-secret")))
	}

	#[test]
	fn roundtrip_including_empty_string() {
		for plaintext in ["", "sk_live_4242", "llave privada ñ ✓"] {
			let encrypted = codec().encrypt(plaintext).unwrap();
			let decrypted = codec().decrypt(&encrypted.to_string()).unwrap();
			assert_eq!(decrypted.expose(), plaintext);
		}
	}

	#[test]
	fn stored_form_has_expected_shape() {
		let encoded = codec().encrypt("abc").unwrap().to_string();
		let segments: Vec<&str> = encoded.split(':').collect();

		assert_eq!(segments.len(), 3);
		assert_eq!(segments[0].len(), IV_SIZE * 2);
		assert_eq!(segments[1].len(), TAG_SIZE * 2);
		assert_eq!(segments[2].len(), 6);
		assert_eq!(encoded, encoded.to_lowercase());
	}

	#[test]
	fn decrypts_value_written_by_previous_platform() {
		let stored = "000102030405060708090a0b0c0d0e0f:9e2d7f28b67fd72b3f77c87347dfa7fc:ed9aaee1ecb9dddc7a3648b9";
		assert_eq!(codec().decrypt(stored).unwrap().expose(), "sk_live_4242");
	}

	#[test]
	fn encryption_is_not_deterministic() {
		let a = codec().encrypt("same").unwrap();
		let b = codec().encrypt("same").unwrap();
		assert_ne!(a.iv(), b.iv());
		assert_ne!(a.to_string(), b.to_string());

		for encrypted in [a, b] {
			assert_eq!(codec().decrypt_secret(&encrypted).unwrap().expose(), "same");
		}
	}

	#[test]
	fn wrong_master_secret_fails_authentication() {
		let encrypted = codec().encrypt("merchant secret").unwrap();
		let result = other_codec().decrypt(&encrypted.to_string());
		assert!(matches!(result, Err(CredentialsError::AuthenticationFailed)));
	}

	#[test]
	fn tampered_tag_fails_authentication() {
		let encrypted = codec().encrypt("merchant secret").unwrap();
		let mut tag = encrypted.tag;
		tag[0] ^= 0x80;
		let tampered = EncryptedSecret { tag, ..encrypted };

		assert!(matches!(
			codec().decrypt_secret(&tampered),
			Err(CredentialsError::AuthenticationFailed)
		));
	}

	#[test]
	fn malformed_inputs_are_format_errors() {
		for input in ["", "one-part", "two:parts", "a:b:c:d", "zz:00:00", "00:00:00"] {
			assert!(
				matches!(codec().decrypt(input), Err(CredentialsError::Format(_))),
				"expected format error for {input:?}"
			);
		}
	}

	#[test]
	fn unconfigured_codec_refuses_to_operate() {
		let codec = SecretCodec::new(CodecConfig::default());
		assert!(!codec.is_configured());
		assert!(matches!(
			codec.encrypt("x"),
			Err(CredentialsError::MasterSecretNotConfigured)
		));

		let stored = "000102030405060708090a0b0c0d0e0f:9e2d7f28b67fd72b3f77c87347dfa7fc:ed9aaee1ecb9dddc7a3648b9";
		assert!(matches!(
			codec.decrypt(stored),
			Err(CredentialsError::MasterSecretNotConfigured)
		));
	}

	#[test]
	fn is_encrypted_classification() {
		for value in ["", "one-part", "two:parts", "hello world", "abc:def:xyz", "ab::cd", "ab:cd:ef:01"] {
			assert!(!is_encrypted(value), "{value:?} must not look encrypted");
		}
		assert!(is_encrypted("ab:CD:ef"));
		assert!(SecretCodec::is_encrypted(&codec().encrypt("x").unwrap().to_string()));
	}

	#[test]
	fn ensure_encrypted_does_not_double_encrypt() {
		let once = codec().ensure_encrypted("p_key_123").unwrap();
		assert!(is_encrypted(&once));

		let twice = codec().ensure_encrypted(&once).unwrap();
		assert_eq!(once, twice);
		assert_eq!(codec().decrypt(&twice).unwrap().expose(), "p_key_123");
	}

	#[test]
	fn reveal_passes_legacy_plaintext_through() {
		assert_eq!(codec().reveal("legacy-token").unwrap().expose(), "legacy-token");

		let encrypted = codec().encrypt("new-token").unwrap().to_string();
		assert_eq!(codec().reveal(&encrypted).unwrap().expose(), "new-token");
	}

	#[test]
	fn encrypted_empty_string_is_revealed_not_passed_through() {
		let stored = codec().encrypt("").unwrap().to_string();
		assert!(stored.ends_with(':'));
		assert!(!is_encrypted(&stored));

		assert_eq!(codec().reveal(&stored).unwrap().expose(), "");
		assert_eq!(codec().ensure_encrypted(&stored).unwrap(), stored);
	}

	#[test]
	fn reveal_rejects_hex_shaped_value_with_bad_lengths() {
		let result = codec().reveal("ab:cd:ef");
		assert!(matches!(result, Err(CredentialsError::Format(_))));
	}

	#[test]
	fn serde_uses_stored_form() {
		let encrypted = codec().encrypt("secret").unwrap();
		let json = serde_json::to_string(&encrypted).unwrap();
		assert_eq!(json, format!("\"{encrypted}\""));

		let parsed: EncryptedSecret = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed, encrypted);
		assert!(serde_json::from_str::<EncryptedSecret>("\"plaintext\"").is_err());
	}

	#[test]
	fn debug_does_not_print_segments() {
		let encrypted = codec().encrypt("secret").unwrap();
		let debug = format!("{encrypted:?}");
		assert!(!debug.contains(&hex::encode(encrypted.iv())));
		assert!(!format!("{:?}", codec()).contains(MASTER));
	}

	proptest! {
		#[test]
		fn prop_roundtrip(plaintext in ".*") {
			let encrypted = codec().encrypt(&plaintext).unwrap();
			let decrypted = codec().decrypt(&encrypted.to_string()).unwrap();
			prop_assert_eq!(decrypted.expose(), &plaintext);
		}

		#[test]
		fn prop_encrypted_values_are_detected(plaintext in "[^:]{1,64}") {
			prop_assert!(!is_encrypted(&plaintext));
			let encoded = codec().encrypt(&plaintext).unwrap().to_string();
			prop_assert!(is_encrypted(&encoded));
		}

		#[test]
		fn prop_tampered_ciphertext_fails(
			plaintext in ".{1,200}",
			idx in any::<usize>(),
		) {
			let encrypted = codec().encrypt(&plaintext).unwrap();
			let mut ciphertext = encrypted.ciphertext.clone();
			let i = idx % ciphertext.len();
			ciphertext[i] ^= 0x01;
			let tampered = EncryptedSecret { ciphertext, ..encrypted };

			prop_assert!(matches!(
				codec().decrypt_secret(&tampered),
				Err(CredentialsError::AuthenticationFailed)
			));
		}
	}
}
