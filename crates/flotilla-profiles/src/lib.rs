// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local AWS CLI profile reconciliation.
//!
//! Profiles are derived entirely from the credential store — the store is
//! the source of truth and reconciliation fails closed when no record
//! exists. Each profile is fully rebuilt on every run (overwritten, not
//! merged).

pub mod error;
pub mod reconciler;
pub mod writer;

pub use error::ProfileError;
pub use reconciler::ProfileReconciler;
pub use writer::{AwsCliProfileWriter, ProfileWriter};
