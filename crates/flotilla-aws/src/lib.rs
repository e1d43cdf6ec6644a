// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed AWS provider boundary for Flotilla.
//!
//! Every remote subsystem is reached through a narrow `async_trait` seam
//! (`OrganizationsApi`, `StsApi`, `IamApi`, `SecretsApi`) so the workflow
//! logic above it can be exercised against in-memory fakes. The production
//! implementations wrap the official AWS SDK clients and classify SDK
//! errors exactly once, at this boundary, into the closed
//! [`ErrorKind`](error::ErrorKind) set consumed by the orchestrator.
//!
//! The components built on those seams:
//!
//! - [`AccountRegistry`]: paginated listing, email existence gate, and the
//!   submit/poll/cooldown account-creation workflow
//! - [`IdentityVerifier`]: caller-identity confirmation before mutations
//! - [`IdentityBootstrapper`]: per-account operator-identity provisioning
//!   via a scoped assume-role session
//! - [`CredentialStore`]: create-then-update credential persistence in
//!   Secrets Manager, the single durable source of truth

pub mod error;
pub mod iam;
pub mod model;
pub mod organizations;
pub mod secrets;
pub mod sts;

pub use error::{AwsError, ErrorKind, ProviderError};
pub use iam::{IdentityBootstrapper, IamApi, IamSessionFactory, StsSessionFactory};
pub use model::{Account, CallerIdentity, CreationState, CreationStatus, CredentialRecord};
pub use organizations::{AccountRegistry, AwsOrganizations, OrganizationsApi};
pub use secrets::{AwsSecrets, CredentialStore, SecretsApi};
pub use sts::{AwsSts, IdentityVerifier, StsApi};
