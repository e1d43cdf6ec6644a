// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for Flotilla.
//!
//! Two concerns live here:
//!
//! - [`Settings`]: the explicit runtime configuration value, constructed
//!   once at process start and passed by reference into each component
//!   constructor. Component logic never reads ambient global state.
//! - [`DesiredState`]: the declarative `flotilla.json` input driving every
//!   provisioning pass, plus the skeleton template for it.

pub mod desired_state;
pub mod error;
pub mod settings;

pub use desired_state::{DesiredAccount, DesiredState, DESIRED_STATE_FILE};
pub use error::ConfigError;
pub use settings::Settings;
