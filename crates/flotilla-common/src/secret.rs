// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret wrapper type that prevents accidental logging of sensitive values.
//!
//! `SecretString` serializes to its inner value (the credential payload
//! stored in Secrets Manager needs the real secret), but `Debug` and
//! `Display` always print [`REDACTED`]. The inner value is zeroized when
//! the wrapper is dropped.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Placeholder emitted wherever a secret would otherwise appear in output.
pub const REDACTED: &str = "[REDACTED]";

/// A string whose value never appears in `Debug`/`Display` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Call sites name the exposure explicitly.
	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({REDACTED})")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl Drop for SecretString {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_debug_is_redacted() {
		let secret = SecretString::new("hunter2");
		assert_eq!(format!("{secret:?}"), "SecretString([REDACTED])");
		assert_eq!(format!("{secret}"), REDACTED);
	}

	#[test]
	fn test_expose_returns_inner_value() {
		let secret = SecretString::new("hunter2");
		assert_eq!(secret.expose(), "hunter2");
	}

	#[test]
	fn test_serde_passthrough() {
		let secret = SecretString::new("hunter2");
		let json = serde_json::to_string(&secret).unwrap();
		assert_eq!(json, "\"hunter2\"");

		let back: SecretString = serde_json::from_str(&json).unwrap();
		assert_eq!(back, secret);
	}
}
