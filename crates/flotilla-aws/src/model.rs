// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Domain model for the provider boundary.

use flotilla_common::SecretString;
use serde::{Deserialize, Serialize};

/// Console sign-in domain used to derive per-account console URLs.
pub const CONSOLE_SIGNIN_DOMAIN: &str = "signin.aws.amazon.com";

/// Sentinel stored in place of a password when a login profile already
/// existed and was left untouched. Callers must treat this as "no new
/// password issued", not as a literal credential.
pub const PASSWORD_NOT_CHANGED: &str = "**EXISTING PASSWORD NOT CHANGED**";

/// Creation failure reason that is reportable rather than fatal.
pub const FAILURE_EMAIL_ALREADY_EXISTS: &str = "EMAIL_ALREADY_EXISTS";

/// A member account as reported by the organization listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
	pub id: String,
	/// Natural idempotency key; compared case-insensitively.
	pub email: String,
	pub name: Option<String>,
	pub status: String,
}

/// States of an asynchronous account-creation request.
///
/// `Started` is the local initial value before the first poll; the rest
/// come from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
	Started,
	InProgress,
	Succeeded,
	Failed,
}

impl CreationState {
	pub fn is_terminal(self) -> bool {
		matches!(self, CreationState::Succeeded | CreationState::Failed)
	}
}

/// A poll result for an in-flight creation request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationStatus {
	pub state: CreationState,
	pub account_id: Option<String>,
	pub failure_reason: Option<String>,
}

impl CreationStatus {
	/// The local value before the first poll.
	pub fn started() -> Self {
		Self {
			state: CreationState::Started,
			account_id: None,
			failure_reason: None,
		}
	}
}

/// The credential payload persisted in the secret store.
///
/// Serializes to the exact stored JSON layout: `username`, `password`,
/// `access_key_id`, `secret_access_key`, `account_id`, `console_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
	pub username: String,
	pub password: SecretString,
	pub access_key_id: String,
	pub secret_access_key: SecretString,
	pub account_id: String,
	pub console_url: String,
}

/// Derives the deterministic console sign-in URL for an account.
pub fn console_url(account_id: &str) -> String {
	format!("https://{account_id}.{CONSOLE_SIGNIN_DOMAIN}/console")
}

/// The operator's own identity, confirmed before mutating operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
	pub account_id: String,
	pub arn: String,
}

/// Short-lived credentials scoped to a member account.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
	pub access_key_id: String,
	pub secret_access_key: SecretString,
	pub session_token: SecretString,
}
