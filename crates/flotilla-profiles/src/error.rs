// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use flotilla_aws::AwsError;

/// Errors that can occur while reconciling a local profile.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
	/// The declared account must already exist remotely.
	#[error("could not find an organization account with email {email}")]
	AccountNotFound { email: String },

	/// Reconciliation never fabricates credentials.
	#[error(
		"no credentials found for user {username} in account {account_id}. Run `flotilla create-accounts --username {username}` first to create the operator identity and store its credentials"
	)]
	MissingCredentials {
		account_id: String,
		username: String,
	},

	/// A local configuration write failed.
	#[error("profile write failed running `{command}`: {message}")]
	Write { command: String, message: String },

	#[error(transparent)]
	Store(#[from] AwsError),
}
