// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The local configuration writer capability.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ProfileError;

/// Writes one key under a named local profile.
///
/// A narrow capability so reconciliation can be exercised in tests without
/// invoking a real external process.
#[async_trait]
pub trait ProfileWriter: Send + Sync {
	async fn set(&self, profile: &str, key: &str, value: &str) -> Result<(), ProfileError>;
}

/// Production writer: shells out to `aws configure set`.
#[derive(Debug, Clone, Default)]
pub struct AwsCliProfileWriter;

impl AwsCliProfileWriter {
	pub fn new() -> Self {
		Self
	}

	// Command context for error messages; the value is omitted since it
	// may be a secret.
	fn command_context(profile: &str, key: &str) -> String {
		format!("aws configure set {key} --profile {profile}")
	}
}

#[async_trait]
impl ProfileWriter for AwsCliProfileWriter {
	async fn set(&self, profile: &str, key: &str, value: &str) -> Result<(), ProfileError> {
		debug!(profile, key, "writing profile key");

		let output = Command::new("aws")
			.args(["configure", "set", key, value, "--profile", profile])
			.output()
			.await
			.map_err(|e| ProfileError::Write {
				command: Self::command_context(profile, key),
				message: e.to_string(),
			})?;

		let stderr = String::from_utf8_lossy(&output.stderr);
		if !output.status.success() {
			return Err(ProfileError::Write {
				command: Self::command_context(profile, key),
				message: format!("exit status {}: {}", output.status, stderr.trim()),
			});
		}
		if !stderr.trim().is_empty() {
			return Err(ProfileError::Write {
				command: Self::command_context(profile, key),
				message: stderr.trim().to_string(),
			});
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_command_context_omits_value() {
		let context = AwsCliProfileWriter::command_context("acme-ops", "aws_secret_access_key");
		assert_eq!(context, "aws configure set aws_secret_access_key --profile acme-ops");
	}
}
