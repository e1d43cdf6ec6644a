// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command handlers.
//!
//! The context owns one of each provider-facing seam, built once from the
//! ambient AWS configuration; handlers assemble the components they need
//! per invocation.

use std::path::Path;
use std::sync::Arc;

use aws_config::Region;
use tracing::info;

use flotilla_aws::iam::{IamSessionFactory, StsSessionFactory};
use flotilla_aws::organizations::{AwsOrganizations, OrganizationsApi};
use flotilla_aws::secrets::{AwsSecrets, SecretsApi};
use flotilla_aws::sts::{AwsSts, StsApi};
use flotilla_aws::{AccountRegistry, CredentialStore, IdentityBootstrapper, IdentityVerifier};
use flotilla_config::{DesiredState, Settings, DESIRED_STATE_FILE};
use flotilla_profiles::{AwsCliProfileWriter, ProfileReconciler};
use flotilla_provision::{Orchestrator, ProvisionRequest};

use crate::confirm;

pub struct CommandContext {
	settings: Settings,
	organizations: Arc<dyn OrganizationsApi>,
	sts: Arc<dyn StsApi>,
	secrets: Arc<dyn SecretsApi>,
	sessions: Arc<dyn IamSessionFactory>,
}

impl CommandContext {
	/// Builds provider clients from the ambient AWS configuration.
	pub async fn from_env(settings: Settings) -> Self {
		let sdk_config = aws_config::from_env()
			.region(Region::new(settings.region.clone()))
			.load()
			.await;

		let sts: Arc<dyn StsApi> = Arc::new(AwsSts::new(aws_sdk_sts::Client::new(&sdk_config)));
		let sessions: Arc<dyn IamSessionFactory> = Arc::new(StsSessionFactory::new(
			Arc::clone(&sts),
			sdk_config.clone(),
			&settings,
		));

		Self {
			organizations: Arc::new(AwsOrganizations::new(aws_sdk_organizations::Client::new(
				&sdk_config,
			))),
			secrets: Arc::new(AwsSecrets::new(aws_sdk_secretsmanager::Client::new(
				&sdk_config,
			))),
			sts,
			sessions,
			settings,
		}
	}

	fn verifier(&self) -> IdentityVerifier {
		IdentityVerifier::new(Arc::clone(&self.sts))
	}

	fn registry(&self) -> AccountRegistry {
		AccountRegistry::new(Arc::clone(&self.organizations), &self.settings)
	}

	fn store(&self) -> CredentialStore {
		CredentialStore::new(Arc::clone(&self.secrets))
	}

	pub async fn list_accounts(&self) -> anyhow::Result<()> {
		self.verifier().verify().await?;
		let accounts = self.registry().list_accounts().await?;
		if accounts.is_empty() {
			info!("no accounts found in the organization");
			return Ok(());
		}

		println!("{:<14} {:<42} {:<12} NAME", "ACCOUNT ID", "EMAIL", "STATUS");
		for account in &accounts {
			println!(
				"{:<14} {:<42} {:<12} {}",
				account.id,
				account.email,
				account.status,
				account.name.as_deref().unwrap_or("-")
			);
		}
		Ok(())
	}

	pub async fn list_accounts_with_credentials(&self) -> anyhow::Result<()> {
		self.verifier().verify().await?;
		let accounts = self.registry().list_accounts().await?;
		let store = self.store();
		let username = &self.settings.default_username;

		for account in &accounts {
			println!("{} - {} - {}", account.id, account.email, account.status);
			match store.get(&account.id, username).await? {
				Some(record) => {
					println!("  username:          {}", record.username);
					println!("  password:          {}", record.password.expose());
					println!("  access key id:     {}", record.access_key_id);
					println!("  secret access key: {}", record.secret_access_key.expose());
					println!("  console url:       {}", record.console_url);
				}
				None => println!("  no stored credentials for {username}"),
			}
		}
		Ok(())
	}

	pub async fn create_accounts(
		&self,
		username: String,
		overwrite: bool,
		skip_confirmation: bool,
	) -> anyhow::Result<()> {
		if !skip_confirmation
			&& !confirm::confirm("Are you sure you want to create new accounts in AWS Organizations?")?
		{
			info!("aborted by operator");
			return Ok(());
		}

		let desired = DesiredState::load(Path::new(DESIRED_STATE_FILE))?;
		let orchestrator = Orchestrator::new(
			self.verifier(),
			self.registry(),
			IdentityBootstrapper::new(Arc::clone(&self.sessions), &self.settings),
			self.store(),
			&self.settings,
		);

		orchestrator
			.run(&desired, &ProvisionRequest { username, overwrite })
			.await?;
		Ok(())
	}

	pub async fn setup_aws_profiles(&self, username: String) -> anyhow::Result<()> {
		self.verifier().verify().await?;
		let live_accounts = self.registry().list_accounts().await?;
		let desired = DesiredState::load(Path::new(DESIRED_STATE_FILE))?;

		let reconciler = ProfileReconciler::new(
			self.store(),
			Arc::new(AwsCliProfileWriter::new()),
			&self.settings,
		);
		for declared in &desired.accounts {
			info!(email = %declared.identifying_email, "setting up profile");
			reconciler
				.apply(
					&declared.identifying_email,
					&live_accounts,
					&declared.profile_name,
					&username,
				)
				.await?;
		}
		Ok(())
	}
}
