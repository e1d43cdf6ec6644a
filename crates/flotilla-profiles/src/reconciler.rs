// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reconciles one declared profile against the credential store.

use std::sync::Arc;

use tracing::info;

use flotilla_aws::{Account, CredentialStore};
use flotilla_config::Settings;

use crate::error::ProfileError;
use crate::writer::ProfileWriter;

const OUTPUT_FORMAT: &str = "json";

/// Renders stored credentials into named local profiles.
pub struct ProfileReconciler {
	store: CredentialStore,
	writer: Arc<dyn ProfileWriter>,
	region: String,
}

impl ProfileReconciler {
	pub fn new(store: CredentialStore, writer: Arc<dyn ProfileWriter>, settings: &Settings) -> Self {
		Self {
			store,
			writer,
			region: settings.region.clone(),
		}
	}

	/// Rebuilds the named profile from the stored credential record.
	///
	/// The declared account must already exist remotely and have stored
	/// credentials; four writes are issued in a fixed order and the first
	/// failure aborts the remainder.
	pub async fn apply(
		&self,
		email: &str,
		live_accounts: &[Account],
		profile_name: &str,
		username: &str,
	) -> Result<(), ProfileError> {
		let account = live_accounts
			.iter()
			.find(|account| account.email.eq_ignore_ascii_case(email))
			.ok_or_else(|| ProfileError::AccountNotFound {
				email: email.to_string(),
			})?;
		info!(email, profile = profile_name, account_id = %account.id, "reconciling local profile");

		let record = self
			.store
			.get(&account.id, username)
			.await?
			.ok_or_else(|| ProfileError::MissingCredentials {
				account_id: account.id.clone(),
				username: username.to_string(),
			})?;

		self.writer
			.set(profile_name, "aws_access_key_id", &record.access_key_id)
			.await?;
		self.writer
			.set(
				profile_name,
				"aws_secret_access_key",
				record.secret_access_key.expose(),
			)
			.await?;
		self.writer.set(profile_name, "region", &self.region).await?;
		self.writer.set(profile_name, "output", OUTPUT_FORMAT).await?;

		info!(profile = profile_name, "profile configured");
		Ok(())
	}
}
