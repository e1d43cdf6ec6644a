// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential persistence in the remote secret store.
//!
//! The store is the single durable source of truth for generated
//! credentials; the orchestrator only holds them transiently in memory.
//! Writes use a create-then-update fallback — no pre-read — so repeated
//! runs converge on exactly one logical secret per account/username pair.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_secretsmanager::types::Tag;
use tracing::{debug, info};

use crate::error::{classify, AwsError, ErrorKind, ProviderError};
use crate::model::CredentialRecord;

/// Prefix of every credential secret name.
pub const SECRET_NAME_PREFIX: &str = "iam-user";

/// Persisted secret naming layout, reproduced exactly for compatibility.
pub fn secret_name(account_id: &str, username: &str) -> String {
	format!("{SECRET_NAME_PREFIX}/{account_id}/{username}")
}

/// Wire-level surface of the secret store.
#[async_trait]
pub trait SecretsApi: Send + Sync {
	async fn create_secret(
		&self,
		name: &str,
		value: &str,
		description: &str,
		tags: &[(&str, &str)],
	) -> Result<(), ProviderError>;

	async fn put_secret_value(&self, name: &str, value: &str) -> Result<(), ProviderError>;

	async fn get_secret_value(&self, name: &str) -> Result<String, ProviderError>;
}

/// Production implementation over the AWS Secrets Manager client.
#[derive(Debug, Clone)]
pub struct AwsSecrets {
	client: aws_sdk_secretsmanager::Client,
}

impl AwsSecrets {
	pub fn new(client: aws_sdk_secretsmanager::Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl SecretsApi for AwsSecrets {
	async fn create_secret(
		&self,
		name: &str,
		value: &str,
		description: &str,
		tags: &[(&str, &str)],
	) -> Result<(), ProviderError> {
		let mut request = self
			.client
			.create_secret()
			.name(name)
			.secret_string(value)
			.description(description);
		for (key, tag_value) in tags {
			request = request.tags(Tag::builder().key(*key).value(*tag_value).build());
		}

		request
			.send()
			.await
			.map(|_| ())
			.map_err(|e| classify("secretsmanager:CreateSecret", e))
	}

	async fn put_secret_value(&self, name: &str, value: &str) -> Result<(), ProviderError> {
		self.client
			.put_secret_value()
			.secret_id(name)
			.secret_string(value)
			.send()
			.await
			.map(|_| ())
			.map_err(|e| classify("secretsmanager:PutSecretValue", e))
	}

	async fn get_secret_value(&self, name: &str) -> Result<String, ProviderError> {
		let out = self
			.client
			.get_secret_value()
			.secret_id(name)
			.send()
			.await
			.map_err(|e| classify("secretsmanager:GetSecretValue", e))?;

		out.secret_string().map(str::to_string).ok_or_else(|| {
			ProviderError::other("secretsmanager:GetSecretValue", "response missing SecretString")
		})
	}
}

/// Persists and retrieves per-account, per-username credential records.
pub struct CredentialStore {
	api: Arc<dyn SecretsApi>,
}

impl CredentialStore {
	pub fn new(api: Arc<dyn SecretsApi>) -> Self {
		Self { api }
	}

	/// Stores the record, creating the secret or updating it in place.
	///
	/// The create-then-update fallback is the idempotency mechanism; no
	/// pre-read is performed.
	pub async fn put(
		&self,
		account_id: &str,
		username: &str,
		record: &CredentialRecord,
	) -> Result<(), AwsError> {
		let name = secret_name(account_id, username);
		let value = serde_json::to_string(record)?;
		let description = format!("Credentials for IAM user {username} in account {account_id}");

		match self
			.api
			.create_secret(
				&name,
				&value,
				&description,
				&[("AccountId", account_id), ("Username", username)],
			)
			.await
		{
			Ok(()) => {
				info!(secret = %name, "stored credentials in secret store");
				Ok(())
			}
			Err(e) if e.kind == ErrorKind::AlreadyExists => {
				self.api.put_secret_value(&name, &value).await?;
				info!(secret = %name, "updated credentials in secret store");
				Ok(())
			}
			Err(e) => Err(e.into()),
		}
	}

	/// Returns the stored record, or `None` when no secret exists.
	pub async fn get(
		&self,
		account_id: &str,
		username: &str,
	) -> Result<Option<CredentialRecord>, AwsError> {
		let name = secret_name(account_id, username);
		match self.api.get_secret_value(&name).await {
			Ok(value) => Ok(Some(serde_json::from_str(&value)?)),
			Err(e) if e.kind == ErrorKind::NotFound => {
				debug!(secret = %name, "no credentials stored");
				Ok(None)
			}
			Err(e) => Err(e.into()),
		}
	}
}
