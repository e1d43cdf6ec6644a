// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller identity verification and scoped session minting.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{classify, AwsError, ProviderError};
use crate::model::{CallerIdentity, SessionCredentials};

/// Wire-level surface of the token service.
#[async_trait]
pub trait StsApi: Send + Sync {
	async fn caller_identity(&self) -> Result<CallerIdentity, ProviderError>;

	async fn assume_role(
		&self,
		role_arn: &str,
		session_name: &str,
		duration: Duration,
	) -> Result<SessionCredentials, ProviderError>;
}

/// Production implementation over the AWS STS client.
#[derive(Debug, Clone)]
pub struct AwsSts {
	client: aws_sdk_sts::Client,
}

impl AwsSts {
	pub fn new(client: aws_sdk_sts::Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl StsApi for AwsSts {
	async fn caller_identity(&self) -> Result<CallerIdentity, ProviderError> {
		let out = self
			.client
			.get_caller_identity()
			.send()
			.await
			.map_err(|e| classify("sts:GetCallerIdentity", e))?;

		Ok(CallerIdentity {
			account_id: out.account().unwrap_or_default().to_string(),
			arn: out.arn().unwrap_or_default().to_string(),
		})
	}

	async fn assume_role(
		&self,
		role_arn: &str,
		session_name: &str,
		duration: Duration,
	) -> Result<SessionCredentials, ProviderError> {
		let out = self
			.client
			.assume_role()
			.role_arn(role_arn)
			.role_session_name(session_name)
			.duration_seconds(duration.as_secs() as i32)
			.send()
			.await
			.map_err(|e| classify("sts:AssumeRole", e))?;

		let credentials = out
			.credentials()
			.ok_or_else(|| ProviderError::other("sts:AssumeRole", "response missing Credentials"))?;

		Ok(SessionCredentials {
			access_key_id: credentials.access_key_id().to_string(),
			secret_access_key: credentials.secret_access_key().into(),
			session_token: credentials.session_token().into(),
		})
	}
}

/// Confirms the operator's caller identity before any mutating operation.
///
/// Cheap and stateless; no retries beyond transport level.
pub struct IdentityVerifier {
	api: Arc<dyn StsApi>,
}

impl IdentityVerifier {
	pub fn new(api: Arc<dyn StsApi>) -> Self {
		Self { api }
	}

	pub async fn verify(&self) -> Result<CallerIdentity, AwsError> {
		let identity = self.api.caller_identity().await?;

		if identity.account_id.is_empty() {
			return Err(AwsError::MissingResponseField("GetCallerIdentity.Account"));
		}
		if identity.arn.ends_with(":root") {
			warn!("running as the root user; consider an IAM identity instead");
		}

		info!(account_id = %identity.account_id, "verified caller identity");
		Ok(identity)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FakeSts {
		identity: CallerIdentity,
	}

	#[async_trait]
	impl StsApi for FakeSts {
		async fn caller_identity(&self) -> Result<CallerIdentity, ProviderError> {
			Ok(self.identity.clone())
		}

		async fn assume_role(
			&self,
			_role_arn: &str,
			_session_name: &str,
			_duration: Duration,
		) -> Result<SessionCredentials, ProviderError> {
			unreachable!("not exercised")
		}
	}

	#[tokio::test]
	async fn test_verify_returns_identity() {
		let verifier = IdentityVerifier::new(Arc::new(FakeSts {
			identity: CallerIdentity {
				account_id: "999999999999".to_string(),
				arn: "arn:aws:iam::999999999999:user/ops".to_string(),
			},
		}));

		let identity = verifier.verify().await.unwrap();
		assert_eq!(identity.account_id, "999999999999");
	}

	#[tokio::test]
	async fn test_verify_rejects_missing_account() {
		let verifier = IdentityVerifier::new(Arc::new(FakeSts {
			identity: CallerIdentity {
				account_id: String::new(),
				arn: String::new(),
			},
		}));

		let err = verifier.verify().await.unwrap_err();
		assert!(matches!(err, AwsError::MissingResponseField(_)));
	}

	#[tokio::test]
	async fn test_verify_tolerates_root_caller() {
		let verifier = IdentityVerifier::new(Arc::new(FakeSts {
			identity: CallerIdentity {
				account_id: "999999999999".to_string(),
				arn: "arn:aws:iam::999999999999:root".to_string(),
			},
		}));

		assert!(verifier.verify().await.is_ok());
	}
}
