// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `tollgate` command line tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod version;

/// Tollgate - rule catalog validation and record access checks.
#[derive(Parser, Debug)]
#[command(name = "tollgate", about = "Tollgate access policy tools", version)]
struct Args {
	/// Config file (defaults to /etc/tollgate/server.toml)
	#[arg(long, global = true, env = "TOLLGATE_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Parse a rule catalog and print its object types
	Validate(commands::validate::ValidateArgs),
	/// Print the subset of records a user may read
	Filter(commands::filter::FilterArgs),
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	let config = match &args.config {
		Some(path) => tollgate_server_config::load_config_with_file(path)?,
		None => tollgate_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	match args.command {
		Command::Validate(validate) => commands::validate::run(validate, &config),
		Command::Filter(filter) => commands::filter::run(filter, &config).await,
		Command::Version => Ok(()),
	}
}
