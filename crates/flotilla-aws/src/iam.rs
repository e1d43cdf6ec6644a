// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator-identity bootstrap inside member accounts.
//!
//! The bootstrapper exchanges the orchestrator's identity for a 1-hour
//! session scoped to the cross-account administrative role, then
//! provisions the operator user: principal, login profile, administrative
//! policy attachment, and one access key. Every step is idempotent by
//! response, not by pre-check — "already exists" answers downgrade to
//! skips rather than failing the bootstrap.
//!
//! Concurrent runs against the same account are only partially safe: there
//! is no conflict-retry here analogous to account creation's, so a true
//! race can create a second access key for one stored secret (last write
//! wins, the earlier key is orphaned but still valid).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use flotilla_common::{password, SecretString};
use flotilla_config::Settings;

use crate::error::{classify, AwsError, ErrorKind, ProviderError};
use crate::model::{console_url, CredentialRecord, PASSWORD_NOT_CHANGED};
use crate::sts::StsApi;

const SESSION_NAME: &str = "flotilla-bootstrap";
const SESSION_DURATION: Duration = Duration::from_secs(3600);

/// A freshly created access key pair.
#[derive(Debug, Clone)]
pub struct AccessKey {
	pub access_key_id: String,
	pub secret_access_key: SecretString,
}

/// Wire-level IAM surface, bound to one account's session.
#[async_trait]
pub trait IamApi: Send + Sync {
	async fn get_user(&self, username: &str) -> Result<(), ProviderError>;

	async fn create_user(&self, username: &str) -> Result<(), ProviderError>;

	async fn create_login_profile(
		&self,
		username: &str,
		password: &str,
		reset_required: bool,
	) -> Result<(), ProviderError>;

	async fn attach_user_policy(&self, username: &str, policy_arn: &str) -> Result<(), ProviderError>;

	async fn create_access_key(&self, username: &str) -> Result<AccessKey, ProviderError>;
}

/// Mints a per-account [`IamApi`] from a scoped session.
#[async_trait]
pub trait IamSessionFactory: Send + Sync {
	async fn for_account(&self, account_id: &str) -> Result<Box<dyn IamApi>, AwsError>;
}

/// Production implementation over the AWS IAM client.
#[derive(Debug, Clone)]
pub struct AwsIam {
	client: aws_sdk_iam::Client,
}

impl AwsIam {
	pub fn new(client: aws_sdk_iam::Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl IamApi for AwsIam {
	async fn get_user(&self, username: &str) -> Result<(), ProviderError> {
		self.client
			.get_user()
			.user_name(username)
			.send()
			.await
			.map(|_| ())
			.map_err(|e| classify("iam:GetUser", e))
	}

	async fn create_user(&self, username: &str) -> Result<(), ProviderError> {
		self.client
			.create_user()
			.user_name(username)
			.send()
			.await
			.map(|_| ())
			.map_err(|e| classify("iam:CreateUser", e))
	}

	async fn create_login_profile(
		&self,
		username: &str,
		password: &str,
		reset_required: bool,
	) -> Result<(), ProviderError> {
		self.client
			.create_login_profile()
			.user_name(username)
			.password(password)
			.password_reset_required(reset_required)
			.send()
			.await
			.map(|_| ())
			.map_err(|e| classify("iam:CreateLoginProfile", e))
	}

	async fn attach_user_policy(&self, username: &str, policy_arn: &str) -> Result<(), ProviderError> {
		self.client
			.attach_user_policy()
			.user_name(username)
			.policy_arn(policy_arn)
			.send()
			.await
			.map(|_| ())
			.map_err(|e| classify("iam:AttachUserPolicy", e))
	}

	async fn create_access_key(&self, username: &str) -> Result<AccessKey, ProviderError> {
		let out = self
			.client
			.create_access_key()
			.user_name(username)
			.send()
			.await
			.map_err(|e| classify("iam:CreateAccessKey", e))?;

		let key = out
			.access_key()
			.ok_or_else(|| ProviderError::other("iam:CreateAccessKey", "response missing AccessKey"))?;

		Ok(AccessKey {
			access_key_id: key.access_key_id().to_string(),
			secret_access_key: key.secret_access_key().into(),
		})
	}
}

/// Assumes the organization's cross-account role and builds an IAM client
/// from the scoped session credentials.
pub struct StsSessionFactory {
	sts: Arc<dyn StsApi>,
	sdk_config: aws_config::SdkConfig,
	role_name: String,
}

impl StsSessionFactory {
	pub fn new(sts: Arc<dyn StsApi>, sdk_config: aws_config::SdkConfig, settings: &Settings) -> Self {
		Self {
			sts,
			sdk_config,
			role_name: settings.organization_role_name.clone(),
		}
	}
}

#[async_trait]
impl IamSessionFactory for StsSessionFactory {
	async fn for_account(&self, account_id: &str) -> Result<Box<dyn IamApi>, AwsError> {
		let role_arn = format!("arn:aws:iam::{account_id}:role/{}", self.role_name);
		debug!(account_id, role_arn = %role_arn, "assuming administrative role");

		let session = self
			.sts
			.assume_role(&role_arn, SESSION_NAME, SESSION_DURATION)
			.await?;

		let credentials = aws_sdk_iam::config::Credentials::new(
			session.access_key_id.clone(),
			session.secret_access_key.expose().to_string(),
			Some(session.session_token.expose().to_string()),
			None,
			"flotilla-assumed-role",
		);
		let conf = aws_sdk_iam::config::Builder::from(&self.sdk_config)
			.credentials_provider(credentials)
			.build();

		Ok(Box::new(AwsIam::new(aws_sdk_iam::Client::from_conf(conf))))
	}
}

/// Provisions the operator identity inside a member account.
pub struct IdentityBootstrapper {
	sessions: Arc<dyn IamSessionFactory>,
	admin_policy_arn: String,
	password_length: usize,
}

impl IdentityBootstrapper {
	pub fn new(sessions: Arc<dyn IamSessionFactory>, settings: &Settings) -> Self {
		Self {
			sessions,
			admin_policy_arn: settings.admin_policy_arn.clone(),
			password_length: settings.password_length,
		}
	}

	/// Idempotent entry point: returns `None` without mutating anything
	/// when the operator user already exists (credentials, if needed, are
	/// assumed already stored), otherwise bootstraps and returns the
	/// generated record for the caller to persist.
	pub async fn provision(
		&self,
		account_id: &str,
		username: &str,
	) -> Result<Option<CredentialRecord>, AwsError> {
		info!(username, account_id, "bootstrapping operator identity");
		let session = self.sessions.for_account(account_id).await?;

		if self.user_exists(session.as_ref(), username).await? {
			info!(username, account_id, "operator identity already exists, skipping bootstrap");
			return Ok(None);
		}

		debug!(username, account_id, "operator identity absent, creating");
		let record = self
			.create_operator_identity(session.as_ref(), account_id, username)
			.await?;
		Ok(Some(record))
	}

	/// Probes for the principal; `NotFound` is the normal negative case.
	pub async fn user_exists(&self, session: &dyn IamApi, username: &str) -> Result<bool, AwsError> {
		match session.get_user(username).await {
			Ok(()) => Ok(true),
			Err(e) if e.kind == ErrorKind::NotFound => Ok(false),
			Err(e) => Err(e.into()),
		}
	}

	/// Creates the operator principal, its login profile, the
	/// administrative policy attachment, and one access key.
	pub async fn create_operator_identity(
		&self,
		session: &dyn IamApi,
		account_id: &str,
		username: &str,
	) -> Result<CredentialRecord, AwsError> {
		match session.create_user(username).await {
			Ok(()) => debug!(username, "created operator user"),
			Err(e) if e.kind == ErrorKind::AlreadyExists => {
				debug!(username, "operator user already present")
			}
			Err(e) => return Err(e.into()),
		}

		let generated = password::generate(self.password_length);
		let password: SecretString = match session
			.create_login_profile(username, &generated, true)
			.await
		{
			Ok(()) => generated.into(),
			Err(e) if e.kind == ErrorKind::AlreadyExists => {
				warn!(username, "login profile already exists, leaving password unchanged");
				PASSWORD_NOT_CHANGED.into()
			}
			Err(e) => return Err(e.into()),
		};

		// Attaching an already-attached policy is not an error.
		session
			.attach_user_policy(username, &self.admin_policy_arn)
			.await?;

		let key = session.create_access_key(username).await?;
		info!(username, account_id, "operator identity created");

		Ok(CredentialRecord {
			username: username.to_string(),
			password,
			access_key_id: key.access_key_id,
			secret_access_key: key.secret_access_key,
			account_id: account_id.to_string(),
			console_url: console_url(account_id),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;

	#[derive(Default)]
	struct FakeIam {
		user_exists: bool,
		login_profile_exists: bool,
		calls: Arc<Mutex<Vec<String>>>,
	}

	#[async_trait]
	impl IamApi for FakeIam {
		async fn get_user(&self, _username: &str) -> Result<(), ProviderError> {
			self.calls.lock().unwrap().push("get_user".to_string());
			if self.user_exists {
				Ok(())
			} else {
				Err(ProviderError::new(
					ErrorKind::NotFound,
					"iam:GetUser",
					"no such entity",
				))
			}
		}

		async fn create_user(&self, _username: &str) -> Result<(), ProviderError> {
			self.calls.lock().unwrap().push("create_user".to_string());
			Ok(())
		}

		async fn create_login_profile(
			&self,
			_username: &str,
			_password: &str,
			_reset_required: bool,
		) -> Result<(), ProviderError> {
			self.calls
				.lock()
				.unwrap()
				.push("create_login_profile".to_string());
			if self.login_profile_exists {
				Err(ProviderError::new(
					ErrorKind::AlreadyExists,
					"iam:CreateLoginProfile",
					"entity already exists",
				))
			} else {
				Ok(())
			}
		}

		async fn attach_user_policy(
			&self,
			_username: &str,
			_policy_arn: &str,
		) -> Result<(), ProviderError> {
			self.calls
				.lock()
				.unwrap()
				.push("attach_user_policy".to_string());
			Ok(())
		}

		async fn create_access_key(&self, _username: &str) -> Result<AccessKey, ProviderError> {
			self.calls
				.lock()
				.unwrap()
				.push("create_access_key".to_string());
			Ok(AccessKey {
				access_key_id: "AKIAEXAMPLE".to_string(),
				secret_access_key: "sk-example".into(),
			})
		}
	}

	struct FakeFactory {
		user_exists: bool,
		login_profile_exists: bool,
		calls: Arc<Mutex<Vec<String>>>,
	}

	#[async_trait]
	impl IamSessionFactory for FakeFactory {
		async fn for_account(&self, _account_id: &str) -> Result<Box<dyn IamApi>, AwsError> {
			Ok(Box::new(FakeIam {
				user_exists: self.user_exists,
				login_profile_exists: self.login_profile_exists,
				calls: Arc::clone(&self.calls),
			}))
		}
	}

	fn bootstrapper(factory: FakeFactory) -> IdentityBootstrapper {
		IdentityBootstrapper::new(Arc::new(factory), &Settings::default())
	}

	#[tokio::test]
	async fn test_provision_skips_existing_user() {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let bootstrapper = bootstrapper(FakeFactory {
			user_exists: true,
			login_profile_exists: false,
			calls: Arc::clone(&calls),
		});

		let record = bootstrapper.provision("111111111111", "deploy").await.unwrap();

		assert!(record.is_none());
		assert_eq!(*calls.lock().unwrap(), vec!["get_user"]);
	}

	#[tokio::test]
	async fn test_provision_creates_identity_in_order() {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let bootstrapper = bootstrapper(FakeFactory {
			user_exists: false,
			login_profile_exists: false,
			calls: Arc::clone(&calls),
		});

		let record = bootstrapper
			.provision("111111111111", "deploy")
			.await
			.unwrap()
			.expect("identity should be created");

		assert_eq!(
			*calls.lock().unwrap(),
			vec![
				"get_user",
				"create_user",
				"create_login_profile",
				"attach_user_policy",
				"create_access_key"
			]
		);
		assert_eq!(record.username, "deploy");
		assert_eq!(record.account_id, "111111111111");
		assert_eq!(record.access_key_id, "AKIAEXAMPLE");
		assert_eq!(record.password.expose().len(), 12);
		assert_eq!(
			record.console_url,
			"https://111111111111.signin.aws.amazon.com/console"
		);
	}

	#[tokio::test]
	async fn test_existing_login_profile_downgrades_to_sentinel() {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let bootstrapper = bootstrapper(FakeFactory {
			user_exists: false,
			login_profile_exists: true,
			calls: Arc::clone(&calls),
		});

		let record = bootstrapper
			.provision("111111111111", "deploy")
			.await
			.unwrap()
			.expect("identity should be created");

		assert_eq!(record.password.expose(), PASSWORD_NOT_CHANGED);
	}

	#[tokio::test]
	async fn test_unexpected_get_user_error_propagates() {
		struct BrokenIam;

		#[async_trait]
		impl IamApi for BrokenIam {
			async fn get_user(&self, _username: &str) -> Result<(), ProviderError> {
				Err(ProviderError::other("iam:GetUser", "service failure"))
			}

			async fn create_user(&self, _username: &str) -> Result<(), ProviderError> {
				unreachable!("exists check failed")
			}

			async fn create_login_profile(
				&self,
				_username: &str,
				_password: &str,
				_reset_required: bool,
			) -> Result<(), ProviderError> {
				unreachable!("exists check failed")
			}

			async fn attach_user_policy(
				&self,
				_username: &str,
				_policy_arn: &str,
			) -> Result<(), ProviderError> {
				unreachable!("exists check failed")
			}

			async fn create_access_key(&self, _username: &str) -> Result<AccessKey, ProviderError> {
				unreachable!("exists check failed")
			}
		}

		struct BrokenFactory;

		#[async_trait]
		impl IamSessionFactory for BrokenFactory {
			async fn for_account(&self, _account_id: &str) -> Result<Box<dyn IamApi>, AwsError> {
				Ok(Box::new(BrokenIam))
			}
		}

		let bootstrapper = IdentityBootstrapper::new(Arc::new(BrokenFactory), &Settings::default());
		let err = bootstrapper.provision("111111111111", "deploy").await.unwrap_err();
		assert!(matches!(err, AwsError::Provider(_)));
	}
}
