// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration error types.

use std::path::PathBuf;

/// Errors that can occur while loading the desired-state file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// Desired-state file missing or unreadable
	#[error(
		"failed to read desired-state file {}: {}. Ensure 'flotilla.json' exists in the current directory; `flotilla generate-skeleton` prints an example",
		.path.display(),
		.source
	)]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Desired-state file is not valid JSON of the expected shape
	#[error(
		"invalid desired-state file {}: {}. `flotilla generate-skeleton` prints an example of the expected shape",
		.path.display(),
		.source
	)]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}
