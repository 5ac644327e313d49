// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for provider secrets.
//!
//! Merchant credentials (gateway private keys, integrity secrets, Meta app
//! secrets) and the platform master key travel through the codebase as
//! [`SecretString`]. The wrapper:
//!
//! - prints `[REDACTED]` for `Debug`, `Display` and `Serialize`
//! - zeroizes its memory on drop
//! - hands out the value only through [`Secret::expose`]
//!
//! ```
//! use mercado_common_secret::SecretString;
//!
//! let p_key = SecretString::new("epayco-integrity-key".to_string());
//! assert_eq!(format!("{p_key}"), "[REDACTED]");
//! assert_eq!(p_key.expose(), "epayco-integrity-key");
//! ```
//!
//! Structured logging with `tracing` goes through `Display` (`%field`) or
//! `Debug` (`?field`), so both forms stay redacted.

pub mod env;

use std::fmt;

use zeroize::Zeroize;

pub use env::{load_secret_env, require_secret_env, RequiredSecretError, SecretEnvError};

/// Placeholder written wherever a secret would otherwise be rendered.
pub const REDACTED: &str = "[REDACTED]";

/// A sensitive value that refuses to be printed.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// The common case: a secret string such as an API key.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Borrow the wrapped value. Every call site is an explicit opt-in.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl SecretString {
	/// True when the wrapped string is empty.
	///
	/// Empty secrets are treated as "not configured" by callers.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self::new(self.inner.clone())
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

#[cfg(feature = "serde")]
mod serde_impl {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	use super::{Secret, REDACTED};

	impl<T> Serialize for Secret<T>
	where
		T: Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}
