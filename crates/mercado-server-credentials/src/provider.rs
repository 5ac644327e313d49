// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// External service a tenant credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
	/// ePayco payment gateway.
	Epayco,
	/// Meta (WhatsApp Business) messaging.
	#[serde(alias = "whatsapp")]
	Meta,
}

impl Provider {
	pub const ALL: [Provider; 2] = [Provider::Epayco, Provider::Meta];

	pub fn as_str(&self) -> &'static str {
		match self {
			Provider::Epayco => "epayco",
			Provider::Meta => "meta",
		}
	}
}

impl fmt::Display for Provider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
	type Err = UnknownProvider;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"epayco" => Ok(Provider::Epayco),
			"meta" | "whatsapp" => Ok(Provider::Meta),
			_ => Err(UnknownProvider(s.to_string())),
		}
	}
}
