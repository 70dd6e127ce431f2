use std::time::Duration;

use clap::Parser;

use crate::output::DEFAULT_PREFIX;
use crate::transport::{ConfigError, LatencyPolicy, ProbeConfig, Protocol};

/// Synthetic DNS availability probe for the monitoring agent
#[derive(Parser, Debug)]
#[command(name = "mackerel-plugin-dns-synthetic")]
#[command(about = "Probe DNS servers and report availability, status counts and RTT")]
#[command(disable_version_flag = true)]
pub struct Cli {
	/// Show version
	#[arg(short = 'v', long = "version")]
	pub version: bool,

	/// Metric key prefix
	#[arg(long = "prefix", default_value = DEFAULT_PREFIX)]
	pub prefix: String,

	/// Transport protocol
	#[arg(long = "protocol", default_value = "udp", value_parser = ["udp", "tcp"])]
	pub protocol: String,

	/// Port number
	#[arg(short = 'p', long = "port", default_value = "53")]
	pub port: u16,

	/// DNS server hostnames (repeatable)
	#[arg(short = 'H', long = "hostname", default_value = "127.0.0.1")]
	pub hosts: Vec<String>,

	/// Question hostname
	#[arg(short = 'Q', long = "question", default_value = "example.com.")]
	pub question: String,

	/// Expect string in result
	#[arg(short = 'E', long = "expect")]
	pub expect: Option<String>,

	/// Per-query timeout in milliseconds
	#[arg(long = "timeout", default_value = "5000")]
	pub timeout: u64,

	/// Number of resolutions per host
	#[arg(long = "try", default_value = "1")]
	pub attempts: u32,

	/// Delay between resolutions against the same host, in milliseconds
	#[arg(long = "interval", default_value = "0")]
	pub interval: u64,

	/// Only count RTT of fully successful resolutions in mean/max
	#[arg(long = "rtt-on-success-only")]
	pub rtt_on_success_only: bool,
}

impl Cli {
	/// Build the validated configuration for one probe cycle.
	pub fn probe_config(&self) -> Result<ProbeConfig, ConfigError> {
		let latency = if self.rtt_on_success_only {
			LatencyPolicy::Succeeded
		} else {
			LatencyPolicy::Answered
		};
		let config = ProbeConfig {
			protocol: self.protocol.parse::<Protocol>()?,
			port: self.port,
			hosts: self.hosts.iter().map(|h| h.trim().to_string()).collect(),
			question: self.question.clone(),
			expect: self.expect.clone().filter(|e| !e.is_empty()),
			timeout: Duration::from_millis(self.timeout),
			attempts: self.attempts,
			interval: Duration::from_millis(self.interval),
			latency,
		};
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn test_command_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn test_defaults() {
		let cli = Cli::try_parse_from(["probe"]).unwrap();
		assert!(!cli.version);
		assert_eq!(cli.prefix, "dnsdist");

		let config = cli.probe_config().unwrap();
		assert_eq!(config.protocol, Protocol::Udp);
		assert_eq!(config.port, 53);
		assert_eq!(config.hosts, vec!["127.0.0.1"]);
		assert_eq!(config.question, "example.com.");
		assert_eq!(config.expect, None);
		assert_eq!(config.timeout, Duration::from_secs(5));
		assert_eq!(config.attempts, 1);
		assert_eq!(config.interval, Duration::ZERO);
		assert_eq!(config.latency, LatencyPolicy::Answered);
	}

	#[test]
	fn test_repeated_hosts_replace_default() {
		let cli = Cli::try_parse_from([
			"probe", "--protocol", "tcp", "-p", "5353",
			"-H", "10.0.0.1", "-H", "10.0.0.1", "-H", "::1",
			"-Q", "www.example.org.", "-E", "192.0.2.",
			"--timeout", "250", "--try", "3", "--interval", "100",
			"--rtt-on-success-only",
		]).unwrap();

		let config = cli.probe_config().unwrap();
		assert_eq!(config.protocol, Protocol::Tcp);
		assert_eq!(config.port, 5353);
		assert_eq!(config.hosts, vec!["10.0.0.1", "10.0.0.1", "::1"]);
		assert_eq!(config.expect.as_deref(), Some("192.0.2."));
		assert_eq!(config.timeout, Duration::from_millis(250));
		assert_eq!(config.attempts, 3);
		assert_eq!(config.interval, Duration::from_millis(100));
		assert_eq!(config.latency, LatencyPolicy::Succeeded);
		assert_eq!(config.total_attempts(), 9);
	}

	#[test]
	fn test_empty_expect_is_none() {
		let cli = Cli::try_parse_from(["probe", "-E", ""]).unwrap();
		assert_eq!(cli.probe_config().unwrap().expect, None);
	}

	#[test]
	fn test_rejects_unknown_protocol() {
		assert!(Cli::try_parse_from(["probe", "--protocol", "sctp"]).is_err());
	}

	#[test]
	fn test_rejects_zero_try() {
		let cli = Cli::try_parse_from(["probe", "--try", "0"]).unwrap();
		assert_eq!(cli.probe_config().unwrap_err(), ConfigError::NoAttempts);
	}

	#[test]
	fn test_version_flag() {
		let cli = Cli::try_parse_from(["probe", "-v"]).unwrap();
		assert!(cli.version);
	}
}
