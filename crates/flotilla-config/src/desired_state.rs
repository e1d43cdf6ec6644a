// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Desired-state file loading and the skeleton template.
//!
//! The desired state is a JSON object with an `accounts` array of
//! `{accountName, profileName, identifyingEmail}` entries, read from
//! `flotilla.json` in the working directory. It is read-only input: the
//! provisioning pass never writes it back.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// File name looked up in the current working directory.
pub const DESIRED_STATE_FILE: &str = "flotilla.json";

/// One declared member account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredAccount {
	pub account_name: String,
	pub profile_name: String,
	pub identifying_email: String,
}

/// The declarative input driving every provisioning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
	pub accounts: Vec<DesiredAccount>,
}

impl DesiredState {
	/// Loads and parses the desired-state file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		debug!(path = %path.display(), "loading desired state");
		let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}

	/// Returns the three-entry example emitted by `generate-skeleton`.
	pub fn skeleton() -> Self {
		Self {
			accounts: vec![
				DesiredAccount {
					account_name: "Shared Services".to_string(),
					profile_name: "myappname-shared".to_string(),
					identifying_email: "sharedservices@example.com".to_string(),
				},
				DesiredAccount {
					account_name: "Staging".to_string(),
					profile_name: "myappname-staging".to_string(),
					identifying_email: "staging@example.com".to_string(),
				},
				DesiredAccount {
					account_name: "Production".to_string(),
					profile_name: "myappname-production".to_string(),
					identifying_email: "production@example.com".to_string(),
				},
			],
		}
	}

	/// Pretty-printed JSON rendering, used by `generate-skeleton`.
	pub fn to_pretty_json(&self) -> String {
		serde_json::to_string_pretty(self).expect("desired state serializes to JSON")
	}
}
