// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account registry: listing, existence gate, and the asynchronous
//! account-creation workflow.
//!
//! Account creation against the provider is eventually consistent: a
//! submission returns a request id, and the request is polled to a
//! terminal state. [`AccountRegistry`] owns that workflow — the identifying
//! email is the idempotency gate, concurrency conflicts on submission are
//! retried with bounded backoff, the poll loop is capped by a maximum
//! wait, and every attempt is followed by a cooldown so rapid sequential
//! creation stays clear of provider rate limiting.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_organizations::types::CreateAccountState;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use flotilla_common::RetryPolicy;
use flotilla_config::Settings;

use crate::error::{classify, AwsError, ErrorKind, ProviderError};
use crate::model::{Account, CreationState, CreationStatus, FAILURE_EMAIL_ALREADY_EXISTS};

/// One page of the remote account listing.
#[derive(Debug, Clone)]
pub struct AccountPage {
	pub accounts: Vec<Account>,
	pub next_token: Option<String>,
}

/// Wire-level surface of the organizations service.
#[async_trait]
pub trait OrganizationsApi: Send + Sync {
	async fn list_accounts_page(&self, next_token: Option<String>) -> Result<AccountPage, ProviderError>;

	/// Submits a creation request and returns its request id.
	async fn submit_account_creation(
		&self,
		email: &str,
		account_name: &str,
		role_name: &str,
	) -> Result<String, ProviderError>;

	async fn creation_status(&self, request_id: &str) -> Result<CreationStatus, ProviderError>;
}

/// Production implementation over the AWS Organizations client.
#[derive(Debug, Clone)]
pub struct AwsOrganizations {
	client: aws_sdk_organizations::Client,
}

impl AwsOrganizations {
	pub fn new(client: aws_sdk_organizations::Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl OrganizationsApi for AwsOrganizations {
	async fn list_accounts_page(&self, next_token: Option<String>) -> Result<AccountPage, ProviderError> {
		let out = self
			.client
			.list_accounts()
			.set_next_token(next_token)
			.send()
			.await
			.map_err(|e| classify("organizations:ListAccounts", e))?;

		let accounts = out
			.accounts()
			.iter()
			.filter_map(|account| {
				Some(Account {
					id: account.id()?.to_string(),
					email: account.email()?.to_string(),
					name: account.name().map(str::to_string),
					status: account
						.status()
						.map(|status| status.as_str().to_string())
						.unwrap_or_default(),
				})
			})
			.collect();

		Ok(AccountPage {
			accounts,
			next_token: out.next_token().map(str::to_string),
		})
	}

	async fn submit_account_creation(
		&self,
		email: &str,
		account_name: &str,
		role_name: &str,
	) -> Result<String, ProviderError> {
		let out = self
			.client
			.create_account()
			.email(email)
			.account_name(account_name)
			.role_name(role_name)
			.send()
			.await
			.map_err(|e| classify("organizations:CreateAccount", e))?;

		out.create_account_status()
			.and_then(|status| status.id())
			.map(str::to_string)
			.ok_or_else(|| {
				ProviderError::other(
					"organizations:CreateAccount",
					"response missing CreateAccountStatus.Id",
				)
			})
	}

	async fn creation_status(&self, request_id: &str) -> Result<CreationStatus, ProviderError> {
		let out = self
			.client
			.describe_create_account_status()
			.create_account_request_id(request_id)
			.send()
			.await
			.map_err(|e| classify("organizations:DescribeCreateAccountStatus", e))?;

		let status = out.create_account_status().ok_or_else(|| {
			ProviderError::other(
				"organizations:DescribeCreateAccountStatus",
				"response missing CreateAccountStatus",
			)
		})?;

		let state = match status.state() {
			Some(CreateAccountState::Succeeded) => CreationState::Succeeded,
			Some(CreateAccountState::Failed) => CreationState::Failed,
			_ => CreationState::InProgress,
		};

		Ok(CreationStatus {
			state,
			account_id: status.account_id().map(str::to_string),
			failure_reason: status
				.failure_reason()
				.map(|reason| reason.as_str().to_string()),
		})
	}
}

/// Lists existing member accounts and drives new-account creation to a
/// terminal state.
pub struct AccountRegistry {
	api: Arc<dyn OrganizationsApi>,
	poll_interval: Duration,
	poll_timeout: Duration,
	cooldown: Duration,
	retry: RetryPolicy,
}

impl AccountRegistry {
	pub fn new(api: Arc<dyn OrganizationsApi>, settings: &Settings) -> Self {
		Self {
			api,
			poll_interval: settings.creation_poll_interval,
			poll_timeout: settings.creation_poll_timeout,
			cooldown: settings.operation_cooldown,
			retry: settings.retry,
		}
	}

	/// Pages through the remote listing until exhausted.
	///
	/// `AccessDenied` here is fatal: without listing permission no account
	/// discovery is possible, so it maps to a remediation-carrying error
	/// and is never retried.
	pub async fn list_accounts(&self) -> Result<Vec<Account>, AwsError> {
		let mut accounts = Vec::new();
		let mut next_token = None;

		loop {
			let page = self
				.api
				.list_accounts_page(next_token)
				.await
				.map_err(|e| match e.kind {
					ErrorKind::AccessDenied => AwsError::AccessDenied {
						operation: e.operation,
						message: e.message,
					},
					_ => AwsError::Provider(e),
				})?;
			accounts.extend(page.accounts);
			next_token = page.next_token;
			if next_token.is_none() {
				break;
			}
		}

		debug!(count = accounts.len(), "listed organization accounts");
		Ok(accounts)
	}

	/// The idempotency gate before creation: case-insensitive comparison
	/// of the identifying email against every listed account.
	pub async fn account_exists(&self, email: &str) -> Result<bool, AwsError> {
		let accounts = self.list_accounts().await?;
		Ok(accounts
			.iter()
			.any(|account| account.email.eq_ignore_ascii_case(email)))
	}

	/// Resolves or creates the account identified by `email`.
	///
	/// Returns `Ok(None)` without any remote mutation when the email
	/// already exists and `overwrite` is unset, and when creation fails
	/// with the reportable `EMAIL_ALREADY_EXISTS` reason. Returns the new
	/// account id on success. Every attempt, including the idempotent
	/// skip, is followed by the configured cooldown.
	pub async fn create_account(
		&self,
		email: &str,
		account_name: &str,
		role_name: &str,
		overwrite: bool,
	) -> Result<Option<String>, AwsError> {
		debug!(email, "starting account creation");

		if !overwrite && self.account_exists(email).await? {
			info!(email, "account already exists, skipping creation");
			self.wait_for_next_operation().await;
			return Ok(None);
		}

		let request_id = self.submit_with_retry(email, account_name, role_name).await?;
		info!(email, request_id = %request_id, "account creation initiated");

		let status = self.poll_creation(&request_id).await?;
		self.wait_for_next_operation().await;

		match status.state {
			CreationState::Succeeded => {
				info!(email, "account creation succeeded");
				status
					.account_id
					.map(Some)
					.ok_or(AwsError::MissingResponseField("CreateAccountStatus.AccountId"))
			}
			// The poll loop only returns terminal states, so this is FAILED.
			_ => {
				let reason = status
					.failure_reason
					.unwrap_or_else(|| "unknown".to_string());
				if reason == FAILURE_EMAIL_ALREADY_EXISTS {
					warn!(email, %reason, "account creation failed, continuing");
					Ok(None)
				} else {
					Err(AwsError::CreationFailed { reason })
				}
			}
		}
	}

	/// Submits the creation request, retrying concurrency conflicts with
	/// bounded exponential backoff. Conflicts happen when two operators
	/// create accounts simultaneously; any other failure is immediate.
	async fn submit_with_retry(
		&self,
		email: &str,
		account_name: &str,
		role_name: &str,
	) -> Result<String, AwsError> {
		let mut attempt = 1u32;
		loop {
			match self
				.api
				.submit_account_creation(email, account_name, role_name)
				.await
			{
				Ok(request_id) => return Ok(request_id),
				Err(e) if e.kind == ErrorKind::ConcurrencyConflict && !self.retry.is_exhausted(attempt) => {
					let delay = self.retry.delay_for(attempt);
					warn!(
						email,
						attempt,
						delay_ms = delay.as_millis() as u64,
						error = %e,
						"creation request conflicted, retrying"
					);
					sleep(delay).await;
					attempt += 1;
				}
				Err(e) => return Err(e.into()),
			}
		}
	}

	/// Polls the creation request at a fixed interval until it reaches a
	/// terminal state or the maximum wait elapses.
	async fn poll_creation(&self, request_id: &str) -> Result<CreationStatus, AwsError> {
		let deadline = Instant::now() + self.poll_timeout;
		let mut status = CreationStatus::started();

		while !status.state.is_terminal() {
			if Instant::now() >= deadline {
				return Err(AwsError::CreationTimeout {
					request_id: request_id.to_string(),
					waited_secs: self.poll_timeout.as_secs(),
				});
			}

			debug!(request_id, "polling account creation status");
			status = self.api.creation_status(request_id).await?;
			debug!(request_id, state = ?status.state, "account creation status");

			if !status.state.is_terminal() {
				sleep(self.poll_interval).await;
			}
		}

		Ok(status)
	}

	async fn wait_for_next_operation(&self) {
		info!(
			secs = self.cooldown.as_secs(),
			"waiting before next operation"
		);
		sleep(self.cooldown).await;
	}
}
