// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime settings, constructed once at process start.

use std::time::Duration;

use flotilla_common::RetryPolicy;

/// Region used for all provider clients and written into local profiles.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Cross-account administrative role created by AWS Organizations in every
/// member account.
pub const ORGANIZATION_ROLE_NAME: &str = "OrganizationAccountAccessRole";

/// Managed policy attached to each operator identity.
pub const ADMIN_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AdministratorAccess";

/// Username provisioned in each member account unless overridden.
pub const DEFAULT_USERNAME: &str = "deploy";

/// Explicit runtime configuration for all components.
///
/// Built once in `main` and passed by reference into each component
/// constructor; components copy the fields they need.
#[derive(Debug, Clone)]
pub struct Settings {
	/// AWS region for provider clients and local profile writes.
	pub region: String,
	/// Role assumed inside each member account for bootstrap.
	pub organization_role_name: String,
	/// Policy ARN attached to the operator identity.
	pub admin_policy_arn: String,
	/// Operator username used when none is given on the command line.
	pub default_username: String,
	/// Generated login-password length.
	pub password_length: usize,
	/// Interval between account-creation status polls.
	pub creation_poll_interval: Duration,
	/// Maximum total wait for account creation to reach a terminal state.
	pub creation_poll_timeout: Duration,
	/// Cooldown after each account-creation attempt, to stay clear of the
	/// provider's rate limiting on rapid sequential creation.
	pub operation_cooldown: Duration,
	/// Backoff policy for retryable provider conflicts.
	pub retry: RetryPolicy,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			region: DEFAULT_REGION.to_string(),
			organization_role_name: ORGANIZATION_ROLE_NAME.to_string(),
			admin_policy_arn: ADMIN_POLICY_ARN.to_string(),
			default_username: DEFAULT_USERNAME.to_string(),
			password_length: 12,
			creation_poll_interval: Duration::from_secs(1),
			creation_poll_timeout: Duration::from_secs(600),
			operation_cooldown: Duration::from_secs(15),
			retry: RetryPolicy::default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let settings = Settings::default();
		assert_eq!(settings.region, "us-east-1");
		assert_eq!(settings.organization_role_name, "OrganizationAccountAccessRole");
		assert_eq!(settings.default_username, "deploy");
		assert_eq!(settings.retry.max_attempts, 5);
		assert!(settings.creation_poll_timeout > settings.creation_poll_interval);
	}
}
