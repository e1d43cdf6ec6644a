// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use flotilla_aws::AwsError;

/// Errors that can occur during a provisioning run.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
	#[error("no accounts declared in the desired state")]
	EmptyDesiredState,

	#[error(transparent)]
	Aws(#[from] AwsError),
}
