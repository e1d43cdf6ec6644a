// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The top-level provisioning pass.
//!
//! Accounts are processed strictly sequentially, in declaration order.
//! Within one account the steps are ordered by data dependency: creation
//! yields the account id, bootstrap yields the credentials, persistence
//! stores them. The loop deliberately does not catch bootstrap or persist
//! errors — a single account's irrecoverable failure stops the whole run,
//! favoring visible stop-the-line failures over silently incomplete
//! batches. Only the idempotent creation skip and the reportable
//! email-exists failure advance to the next declared account.

use tracing::info;

use flotilla_aws::{AccountRegistry, CredentialStore, IdentityBootstrapper, IdentityVerifier};
use flotilla_config::{DesiredState, Settings};

use crate::error::ProvisionError;

/// Per-run options from the command line.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
	/// Operator username to provision in each account.
	pub username: String,
	/// Create accounts even when the identifying email already exists.
	pub overwrite: bool,
}

/// Coordinates registry, bootstrapper, and credential store over the
/// desired state.
pub struct Orchestrator {
	verifier: IdentityVerifier,
	registry: AccountRegistry,
	bootstrapper: IdentityBootstrapper,
	store: CredentialStore,
	role_name: String,
}

impl Orchestrator {
	pub fn new(
		verifier: IdentityVerifier,
		registry: AccountRegistry,
		bootstrapper: IdentityBootstrapper,
		store: CredentialStore,
		settings: &Settings,
	) -> Self {
		Self {
			verifier,
			registry,
			bootstrapper,
			store,
			role_name: settings.organization_role_name.clone(),
		}
	}

	/// Runs one provisioning pass over the desired state.
	pub async fn run(
		&self,
		desired: &DesiredState,
		request: &ProvisionRequest,
	) -> Result<(), ProvisionError> {
		self.verifier.verify().await?;

		if desired.accounts.is_empty() {
			return Err(ProvisionError::EmptyDesiredState);
		}

		for declared in &desired.accounts {
			info!(email = %declared.identifying_email, "processing declared account");

			let created = self
				.registry
				.create_account(
					&declared.identifying_email,
					&declared.account_name,
					&self.role_name,
					request.overwrite,
				)
				.await?;

			let Some(account_id) = created else {
				continue;
			};
			info!(
				email = %declared.identifying_email,
				account_id = %account_id,
				"account created"
			);

			if let Some(record) = self
				.bootstrapper
				.provision(&account_id, &request.username)
				.await?
			{
				self.store
					.put(&account_id, &request.username, &record)
					.await?;
			}
		}

		info!("provisioning run complete");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::{HashMap, VecDeque};
	use std::sync::{Arc, Mutex};
	use std::time::Duration;

	use async_trait::async_trait;
	use flotilla_aws::error::ProviderError;
	use flotilla_aws::iam::{AccessKey, IamApi, IamSessionFactory};
	use flotilla_aws::organizations::{AccountPage, OrganizationsApi};
	use flotilla_aws::secrets::SecretsApi;
	use flotilla_aws::sts::StsApi;
	use flotilla_aws::{
		Account, AwsError, CallerIdentity, CreationState, CreationStatus, ErrorKind,
	};
	use flotilla_aws::model::SessionCredentials;
	use flotilla_config::DesiredAccount;

	#[derive(Default)]
	struct FakeOrganizations {
		accounts: Vec<Account>,
		submissions: Mutex<Vec<String>>,
		statuses: Mutex<VecDeque<CreationStatus>>,
	}

	#[async_trait]
	impl OrganizationsApi for FakeOrganizations {
		async fn list_accounts_page(
			&self,
			_next_token: Option<String>,
		) -> Result<AccountPage, ProviderError> {
			Ok(AccountPage {
				accounts: self.accounts.clone(),
				next_token: None,
			})
		}

		async fn submit_account_creation(
			&self,
			email: &str,
			_account_name: &str,
			_role_name: &str,
		) -> Result<String, ProviderError> {
			self.submissions.lock().unwrap().push(email.to_string());
			Ok("car-1".to_string())
		}

		async fn creation_status(&self, _request_id: &str) -> Result<CreationStatus, ProviderError> {
			let mut statuses = self.statuses.lock().unwrap();
			match statuses.front() {
				Some(_) if statuses.len() > 1 => Ok(statuses.pop_front().unwrap()),
				Some(last) => Ok(last.clone()),
				None => Ok(CreationStatus::started()),
			}
		}
	}

	struct FakeSts;

	#[async_trait]
	impl StsApi for FakeSts {
		async fn caller_identity(&self) -> Result<CallerIdentity, ProviderError> {
			Ok(CallerIdentity {
				account_id: "999999999999".to_string(),
				arn: "arn:aws:iam::999999999999:user/ops".to_string(),
			})
		}

		async fn assume_role(
			&self,
			_role_arn: &str,
			_session_name: &str,
			_duration: Duration,
		) -> Result<SessionCredentials, ProviderError> {
			unreachable!("the fake session factory does not assume roles")
		}
	}

	#[derive(Default)]
	struct FakeIam {
		existing_users: Vec<String>,
		bootstrap_calls: Arc<Mutex<Vec<String>>>,
	}

	#[async_trait]
	impl IamApi for FakeIam {
		async fn get_user(&self, username: &str) -> Result<(), ProviderError> {
			if self.existing_users.iter().any(|u| u == username) {
				Ok(())
			} else {
				Err(ProviderError::new(
					ErrorKind::NotFound,
					"iam:GetUser",
					"no such entity",
				))
			}
		}

		async fn create_user(&self, username: &str) -> Result<(), ProviderError> {
			self.bootstrap_calls
				.lock()
				.unwrap()
				.push(format!("create_user:{username}"));
			Ok(())
		}

		async fn create_login_profile(
			&self,
			username: &str,
			_password: &str,
			_reset_required: bool,
		) -> Result<(), ProviderError> {
			self.bootstrap_calls
				.lock()
				.unwrap()
				.push(format!("create_login_profile:{username}"));
			Ok(())
		}

		async fn attach_user_policy(
			&self,
			username: &str,
			_policy_arn: &str,
		) -> Result<(), ProviderError> {
			self.bootstrap_calls
				.lock()
				.unwrap()
				.push(format!("attach_user_policy:{username}"));
			Ok(())
		}

		async fn create_access_key(&self, username: &str) -> Result<AccessKey, ProviderError> {
			self.bootstrap_calls
				.lock()
				.unwrap()
				.push(format!("create_access_key:{username}"));
			Ok(AccessKey {
				access_key_id: "AKIAEXAMPLE".to_string(),
				secret_access_key: "sk-example".into(),
			})
		}
	}

	#[derive(Default)]
	struct FakeSessionFactory {
		existing_users: Vec<String>,
		bootstrap_calls: Arc<Mutex<Vec<String>>>,
		sessions_minted: Mutex<u32>,
	}

	#[async_trait]
	impl IamSessionFactory for FakeSessionFactory {
		async fn for_account(&self, _account_id: &str) -> Result<Box<dyn IamApi>, AwsError> {
			*self.sessions_minted.lock().unwrap() += 1;
			Ok(Box::new(FakeIam {
				existing_users: self.existing_users.clone(),
				bootstrap_calls: Arc::clone(&self.bootstrap_calls),
			}))
		}
	}

	#[derive(Default)]
	struct FakeSecrets {
		secrets: Mutex<HashMap<String, String>>,
		put_failure: bool,
	}

	#[async_trait]
	impl SecretsApi for FakeSecrets {
		async fn create_secret(
			&self,
			name: &str,
			value: &str,
			_description: &str,
			_tags: &[(&str, &str)],
		) -> Result<(), ProviderError> {
			if self.put_failure {
				return Err(ProviderError::other(
					"secretsmanager:CreateSecret",
					"internal failure",
				));
			}
			let mut secrets = self.secrets.lock().unwrap();
			if secrets.contains_key(name) {
				return Err(ProviderError::new(
					ErrorKind::AlreadyExists,
					"secretsmanager:CreateSecret",
					"resource exists",
				));
			}
			secrets.insert(name.to_string(), value.to_string());
			Ok(())
		}

		async fn put_secret_value(&self, name: &str, value: &str) -> Result<(), ProviderError> {
			self.secrets
				.lock()
				.unwrap()
				.insert(name.to_string(), value.to_string());
			Ok(())
		}

		async fn get_secret_value(&self, name: &str) -> Result<String, ProviderError> {
			self.secrets.lock().unwrap().get(name).cloned().ok_or_else(|| {
				ProviderError::new(
					ErrorKind::NotFound,
					"secretsmanager:GetSecretValue",
					"resource not found",
				)
			})
		}
	}

	struct Fixture {
		organizations: Arc<FakeOrganizations>,
		sessions: Arc<FakeSessionFactory>,
		secrets: Arc<FakeSecrets>,
	}

	impl Fixture {
		fn orchestrator(&self) -> Orchestrator {
			let settings = Settings::default();
			Orchestrator::new(
				IdentityVerifier::new(Arc::new(FakeSts)),
				AccountRegistry::new(
					Arc::clone(&self.organizations) as Arc<dyn OrganizationsApi>,
					&settings,
				),
				IdentityBootstrapper::new(
					Arc::clone(&self.sessions) as Arc<dyn IamSessionFactory>,
					&settings,
				),
				CredentialStore::new(Arc::clone(&self.secrets) as Arc<dyn SecretsApi>),
				&settings,
			)
		}
	}

	fn fixture() -> Fixture {
		Fixture {
			organizations: Arc::new(FakeOrganizations::default()),
			sessions: Arc::new(FakeSessionFactory::default()),
			secrets: Arc::new(FakeSecrets::default()),
		}
	}

	fn declared(email: &str) -> DesiredAccount {
		DesiredAccount {
			account_name: "Ops".to_string(),
			profile_name: "acme-ops".to_string(),
			identifying_email: email.to_string(),
		}
	}

	fn request() -> ProvisionRequest {
		ProvisionRequest {
			username: "deploy".to_string(),
			overwrite: false,
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_fresh_account_is_created_bootstrapped_and_persisted() {
		let fixture = fixture();
		fixture.organizations.statuses.lock().unwrap().extend([
			CreationStatus {
				state: CreationState::InProgress,
				account_id: None,
				failure_reason: None,
			},
			CreationStatus {
				state: CreationState::Succeeded,
				account_id: Some("111111111111".to_string()),
				failure_reason: None,
			},
		]);

		let desired = DesiredState {
			accounts: vec![declared("ops@example.com")],
		};
		fixture.orchestrator().run(&desired, &request()).await.unwrap();

		assert_eq!(*fixture.organizations.submissions.lock().unwrap(), vec!["ops@example.com"]);
		assert_eq!(
			*fixture.sessions.bootstrap_calls.lock().unwrap(),
			vec![
				"create_user:deploy",
				"create_login_profile:deploy",
				"attach_user_policy:deploy",
				"create_access_key:deploy"
			]
		);

		let secrets = fixture.secrets.secrets.lock().unwrap();
		assert_eq!(secrets.len(), 1);
		assert!(secrets.contains_key("iam-user/111111111111/deploy"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_existing_email_skips_creation_and_bootstrap() {
		let mut fixture = fixture();
		fixture.organizations = Arc::new(FakeOrganizations {
			accounts: vec![Account {
				id: "111111111111".to_string(),
				email: "ops@example.com".to_string(),
				name: None,
				status: "ACTIVE".to_string(),
			}],
			..Default::default()
		});

		let desired = DesiredState {
			accounts: vec![declared("ops@example.com")],
		};
		fixture.orchestrator().run(&desired, &request()).await.unwrap();

		assert!(fixture.organizations.submissions.lock().unwrap().is_empty());
		assert_eq!(*fixture.sessions.sessions_minted.lock().unwrap(), 0);
		assert!(fixture.secrets.secrets.lock().unwrap().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_email_exists_failure_continues_batch() {
		let fixture = fixture();
		// First declared account fails with the reportable reason, the
		// second succeeds.
		fixture.organizations.statuses.lock().unwrap().extend([
			CreationStatus {
				state: CreationState::Failed,
				account_id: None,
				failure_reason: Some("EMAIL_ALREADY_EXISTS".to_string()),
			},
			CreationStatus {
				state: CreationState::Succeeded,
				account_id: Some("222222222222".to_string()),
				failure_reason: None,
			},
		]);

		let desired = DesiredState {
			accounts: vec![declared("ops@example.com"), declared("dev@example.com")],
		};
		fixture.orchestrator().run(&desired, &request()).await.unwrap();

		assert_eq!(
			*fixture.organizations.submissions.lock().unwrap(),
			vec!["ops@example.com", "dev@example.com"]
		);
		let secrets = fixture.secrets.secrets.lock().unwrap();
		assert_eq!(secrets.len(), 1);
		assert!(secrets.contains_key("iam-user/222222222222/deploy"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_existing_user_is_not_rebootstrapped() {
		let mut fixture = fixture();
		fixture.sessions = Arc::new(FakeSessionFactory {
			existing_users: vec!["deploy".to_string()],
			..Default::default()
		});
		fixture.organizations.statuses.lock().unwrap().push_back(CreationStatus {
			state: CreationState::Succeeded,
			account_id: Some("111111111111".to_string()),
			failure_reason: None,
		});

		let desired = DesiredState {
			accounts: vec![declared("ops@example.com")],
		};
		fixture.orchestrator().run(&desired, &request()).await.unwrap();

		assert!(fixture.sessions.bootstrap_calls.lock().unwrap().is_empty());
		assert!(fixture.secrets.secrets.lock().unwrap().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_empty_desired_state_is_fatal() {
		let fixture = fixture();
		let err = fixture
			.orchestrator()
			.run(&DesiredState::default(), &request())
			.await
			.unwrap_err();
		assert!(matches!(err, ProvisionError::EmptyDesiredState));
	}

	#[tokio::test(start_paused = true)]
	async fn test_persist_failure_stops_the_run() {
		let mut fixture = fixture();
		fixture.secrets = Arc::new(FakeSecrets {
			put_failure: true,
			..Default::default()
		});
		fixture.organizations.statuses.lock().unwrap().push_back(CreationStatus {
			state: CreationState::Succeeded,
			account_id: Some("111111111111".to_string()),
			failure_reason: None,
		});

		let desired = DesiredState {
			accounts: vec![declared("ops@example.com"), declared("dev@example.com")],
		};
		let err = fixture
			.orchestrator()
			.run(&desired, &request())
			.await
			.unwrap_err();

		assert!(matches!(err, ProvisionError::Aws(_)));
		// The second declared account was never reached.
		assert_eq!(
			*fixture.organizations.submissions.lock().unwrap(),
			vec!["ops@example.com"]
		);
	}
}
