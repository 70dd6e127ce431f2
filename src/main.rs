mod cli;
mod dns;
mod logging;
mod output;
mod probe;
mod resolver;
mod stats;
mod transport;

#[cfg(test)]
mod testutil;

use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;

use crate::cli::Cli;

/// Exit status reported to the agent when the plugin cannot run
const STATUS_WARNING: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(e) if e.kind() == ErrorKind::DisplayHelp => {
			let _ = e.print();
			return ExitCode::SUCCESS;
		}
		Err(e) => {
			let _ = e.print();
			return ExitCode::from(STATUS_WARNING);
		}
	};

	if cli.version {
		print_version();
		return ExitCode::SUCCESS;
	}

	logging::init_logging();

	match run(&cli).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("{:#}", e);
			ExitCode::from(STATUS_WARNING)
		}
	}
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
	// The agent asks for graph metadata with a separate invocation
	if std::env::var(output::PLUGIN_META_ENV).is_ok_and(|v| !v.is_empty()) {
		print!("{}", output::graph_definition(&cli.prefix)?);
		return Ok(());
	}

	let config = cli.probe_config().context("invalid probe configuration")?;
	let result = probe::run_cycle(config).await;

	let epoch = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.context("system clock is before the unix epoch")?
		.as_secs();
	print!("{}", output::format_metrics(&cli.prefix, &result.metrics(), epoch));
	Ok(())
}

fn print_version() {
	let program = std::env::args().next()
		.unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
	println!("{} {}", program, env!("CARGO_PKG_VERSION"));
	println!("Platform: {}/{}", std::env::consts::OS, std::env::consts::ARCH);
}
