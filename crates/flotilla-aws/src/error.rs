// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provider error classification.
//!
//! SDK errors are classified exactly once, here, into the closed
//! [`ErrorKind`] set. Callers above this boundary match on kinds, never on
//! provider error names. Idempotency signals (`AlreadyExists`) and
//! negative results (`NotFound`) are absorbed into control flow by the
//! components; everything else propagates.

use aws_smithy_runtime_api::client::result::SdkError;

/// Closed classification of remote provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Caller lacks permission; fatal, never retried.
	AccessDenied,
	/// The entity already exists; an idempotency signal, not a failure.
	AlreadyExists,
	/// The entity does not exist; a negative result, not a failure.
	NotFound,
	/// Simultaneous mutations collided; retryable with backoff.
	ConcurrencyConflict,
	/// Anything else.
	Other,
}

/// A remote provider failure, classified at the client boundary.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{operation}: {message}")]
pub struct ProviderError {
	pub kind: ErrorKind,
	pub operation: &'static str,
	pub message: String,
}

impl ProviderError {
	pub fn new(kind: ErrorKind, operation: &'static str, message: impl Into<String>) -> Self {
		Self {
			kind,
			operation,
			message: message.into(),
		}
	}

	/// An unclassified failure, e.g. a malformed response.
	pub fn other(operation: &'static str, message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Other, operation, message)
	}
}

/// Errors surfaced by the provider-facing components.
#[derive(Debug, thiserror::Error)]
pub enum AwsError {
	/// Organization-level permission is missing; no discovery is possible.
	#[error(
		"access denied during {operation}: {message}. The current credentials cannot list or create accounts in this organization; use a profile with the required permissions"
	)]
	AccessDenied {
		operation: &'static str,
		message: String,
	},

	/// Creation reached FAILED for a reason other than an existing email.
	#[error("account creation failed: {reason}")]
	CreationFailed { reason: String },

	/// Creation did not reach a terminal state within the wait window.
	#[error(
		"timed out after {waited_secs}s waiting for account creation request {request_id} to reach a terminal state"
	)]
	CreationTimeout {
		request_id: String,
		waited_secs: u64,
	},

	/// The provider response omitted a field the workflow depends on.
	#[error("provider response missing {0}")]
	MissingResponseField(&'static str),

	/// The stored credential payload could not be encoded or decoded.
	#[error("credential record encoding: {0}")]
	Encoding(#[from] serde_json::Error),

	/// Any other classified provider failure.
	#[error(transparent)]
	Provider(#[from] ProviderError),
}

/// Per-operation mapping from the SDK's typed error variants to [`ErrorKind`].
pub(crate) trait ClassifyError {
	fn kind(&self) -> ErrorKind;
}

/// Classifies an SDK error into a [`ProviderError`].
///
/// Transport-level failures (dispatch, construction, timeouts) have no
/// service error to inspect and classify as [`ErrorKind::Other`].
pub(crate) fn classify<E, R>(operation: &'static str, err: SdkError<E, R>) -> ProviderError
where
	E: ClassifyError + std::fmt::Display,
{
	match err.as_service_error() {
		Some(service_err) => ProviderError::new(service_err.kind(), operation, service_err.to_string()),
		None => ProviderError::other(operation, err.to_string()),
	}
}

mod classification {
	use super::{ClassifyError, ErrorKind};

	use aws_sdk_iam::operation::attach_user_policy::AttachUserPolicyError;
	use aws_sdk_iam::operation::create_access_key::CreateAccessKeyError;
	use aws_sdk_iam::operation::create_login_profile::CreateLoginProfileError;
	use aws_sdk_iam::operation::create_user::CreateUserError;
	use aws_sdk_iam::operation::get_user::GetUserError;
	use aws_sdk_organizations::operation::create_account::CreateAccountError;
	use aws_sdk_organizations::operation::describe_create_account_status::DescribeCreateAccountStatusError;
	use aws_sdk_organizations::operation::list_accounts::ListAccountsError;
	use aws_sdk_secretsmanager::operation::create_secret::CreateSecretError;
	use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
	use aws_sdk_secretsmanager::operation::put_secret_value::PutSecretValueError;
	use aws_sdk_sts::operation::assume_role::AssumeRoleError;
	use aws_sdk_sts::operation::get_caller_identity::GetCallerIdentityError;

	impl ClassifyError for ListAccountsError {
		fn kind(&self) -> ErrorKind {
			if self.is_access_denied_exception() {
				ErrorKind::AccessDenied
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for CreateAccountError {
		fn kind(&self) -> ErrorKind {
			if self.is_concurrent_modification_exception() {
				ErrorKind::ConcurrencyConflict
			} else if self.is_access_denied_exception() {
				ErrorKind::AccessDenied
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for DescribeCreateAccountStatusError {
		fn kind(&self) -> ErrorKind {
			if self.is_access_denied_exception() {
				ErrorKind::AccessDenied
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for GetUserError {
		fn kind(&self) -> ErrorKind {
			if self.is_no_such_entity_exception() {
				ErrorKind::NotFound
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for CreateUserError {
		fn kind(&self) -> ErrorKind {
			if self.is_entity_already_exists_exception() {
				ErrorKind::AlreadyExists
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for CreateLoginProfileError {
		fn kind(&self) -> ErrorKind {
			if self.is_entity_already_exists_exception() {
				ErrorKind::AlreadyExists
			} else if self.is_no_such_entity_exception() {
				ErrorKind::NotFound
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for AttachUserPolicyError {
		fn kind(&self) -> ErrorKind {
			if self.is_no_such_entity_exception() {
				ErrorKind::NotFound
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for CreateAccessKeyError {
		fn kind(&self) -> ErrorKind {
			if self.is_no_such_entity_exception() {
				ErrorKind::NotFound
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for CreateSecretError {
		fn kind(&self) -> ErrorKind {
			if self.is_resource_exists_exception() {
				ErrorKind::AlreadyExists
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for PutSecretValueError {
		fn kind(&self) -> ErrorKind {
			if self.is_resource_not_found_exception() {
				ErrorKind::NotFound
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for GetSecretValueError {
		fn kind(&self) -> ErrorKind {
			if self.is_resource_not_found_exception() {
				ErrorKind::NotFound
			} else {
				ErrorKind::Other
			}
		}
	}

	impl ClassifyError for AssumeRoleError {
		fn kind(&self) -> ErrorKind {
			ErrorKind::Other
		}
	}

	impl ClassifyError for GetCallerIdentityError {
		fn kind(&self) -> ErrorKind {
			ErrorKind::Other
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_provider_error_display() {
		let err = ProviderError::new(ErrorKind::AccessDenied, "organizations:ListAccounts", "denied");
		assert_eq!(err.to_string(), "organizations:ListAccounts: denied");
	}

	#[test]
	fn test_access_denied_carries_remediation() {
		let err = AwsError::AccessDenied {
			operation: "organizations:ListAccounts",
			message: "denied".to_string(),
		};
		assert!(err.to_string().contains("use a profile with the required permissions"));
	}
}
