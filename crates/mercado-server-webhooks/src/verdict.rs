// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

/// Outcome of checking a webhook signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Verdict {
	/// The signature matches; the payload may be trusted.
	Authentic,
	/// The signature was checked and refused.
	Rejected(Rejection),
}

impl Verdict {
	pub fn is_authentic(&self) -> bool {
		matches!(self, Verdict::Authentic)
	}

	pub fn rejection(&self) -> Option<Rejection> {
		match self {
			Verdict::Authentic => None,
			Verdict::Rejected(reason) => Some(*reason),
		}
	}
}

/// Why a webhook was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
	/// Recomputed signature differs from the claimed one.
	SignatureMismatch,
	/// No signature was sent.
	MissingSignature,
	/// The signature is not in the expected encoding.
	MalformedSignature,
	/// The signature names an algorithm other than the one the provider uses.
	UnsupportedAlgorithm,
}

impl Rejection {
	pub fn as_str(&self) -> &'static str {
		match self {
			Rejection::SignatureMismatch => "signature_mismatch",
			Rejection::MissingSignature => "missing_signature",
			Rejection::MalformedSignature => "malformed_signature",
			Rejection::UnsupportedAlgorithm => "unsupported_algorithm",
		}
	}
}

impl fmt::Display for Rejection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<Rejection> for Verdict {
	fn from(reason: Rejection) -> Self {
		Verdict::Rejected(reason)
	}
}
