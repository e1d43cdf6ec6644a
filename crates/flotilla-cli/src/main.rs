// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flotilla CLI.
//!
//! Provisions AWS member accounts under a parent organization, bootstraps
//! an administrative operator identity in each, persists the generated
//! credentials in the parent account's Secrets Manager, and reconciles
//! local AWS CLI profiles against those stored credentials.
//!
//! Exits zero on normal completion and non-zero on any fatal error; fatal
//! errors are logged at the point of catch with their full context. Log
//! verbosity is controlled with `FLOTILLA_LOG` (default `info`).

mod commands;
mod confirm;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use flotilla_config::settings::DEFAULT_USERNAME;
use flotilla_config::{DesiredState, Settings};

#[derive(Parser, Debug)]
#[command(
	name = "flotilla",
	version,
	about = "Provision AWS member accounts and their operator credentials"
)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// List accounts in the organization
	ListAccounts,
	/// List accounts with their stored credentials
	ListAccountsWithCredentials,
	/// Print a skeleton flotilla.json to stdout
	GenerateSkeleton,
	/// Create declared accounts and bootstrap their operator identities
	CreateAccounts {
		/// Operator username to create in each account
		#[arg(long, default_value = DEFAULT_USERNAME)]
		username: String,
		/// Create accounts even when the identifying email already exists
		#[arg(long)]
		overwrite: bool,
		/// Skip the confirmation prompt
		#[arg(long)]
		skip_confirmation: bool,
	},
	/// Configure local AWS profiles from stored credentials
	SetupAwsProfiles {
		/// Operator username whose credentials to use
		#[arg(long, default_value = DEFAULT_USERNAME)]
		username: String,
	},
}

#[tokio::main]
async fn main() {
	init_tracing();
	let cli = Cli::parse();

	// The skeleton needs no provider clients.
	if matches!(cli.command, Command::GenerateSkeleton) {
		println!("{}", DesiredState::skeleton().to_pretty_json());
		return;
	}

	let context = commands::CommandContext::from_env(Settings::default()).await;

	let result = match cli.command {
		Command::ListAccounts => context.list_accounts().await,
		Command::ListAccountsWithCredentials => context.list_accounts_with_credentials().await,
		Command::GenerateSkeleton => unreachable!("handled above"),
		Command::CreateAccounts {
			username,
			overwrite,
			skip_confirmation,
		} => {
			context
				.create_accounts(username, overwrite, skip_confirmation)
				.await
		}
		Command::SetupAwsProfiles { username } => context.setup_aws_profiles(username).await,
	};

	if let Err(err) = result {
		error!("command failed: {err:#}");
		std::process::exit(1);
	}
}

fn init_tracing() {
	let filter = EnvFilter::try_from_env("FLOTILLA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}
