use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::dns::ExchangeError;

/// Transport used for every query in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
	#[default]
	Udp,
	Tcp,
}

impl fmt::Display for Protocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Protocol::Udp => f.write_str("udp"),
			Protocol::Tcp => f.write_str("tcp"),
		}
	}
}

impl FromStr for Protocol {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"udp" => Ok(Protocol::Udp),
			"tcp" => Ok(Protocol::Tcp),
			_ => Err(ConfigError::UnknownProtocol(s.to_string())),
		}
	}
}

/// Which outcomes contribute a latency sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatencyPolicy {
	/// Every outcome whose transport exchange completed, whatever its verdict
	#[default]
	Answered,
	/// Only outcomes classified as a full success
	Succeeded,
}

/// Problems with a probe configuration, caught before a cycle starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("at least one host is required")]
	NoHosts,
	#[error("host names must not be empty")]
	EmptyHost,
	#[error("number of attempts per host must be at least 1")]
	NoAttempts,
	#[error("question must not be empty")]
	EmptyQuestion,
	#[error("timeout must be greater than zero")]
	ZeroTimeout,
	#[error("unknown protocol '{0}', expected 'udp' or 'tcp'")]
	UnknownProtocol(String),
}

/// Fully resolved configuration for one measurement cycle
#[derive(Debug, Clone)]
pub struct ProbeConfig {
	pub protocol: Protocol,
	pub port: u16,
	/// Resolver hosts; duplicates are probed as independent targets
	pub hosts: Vec<String>,
	pub question: String,
	/// Substring that must appear in the joined answer addresses
	pub expect: Option<String>,
	pub timeout: Duration,
	pub attempts: u32,
	/// Delay between consecutive attempts against the same host
	pub interval: Duration,
	pub latency: LatencyPolicy,
}

impl ProbeConfig {
	/// Check the invariants a cycle relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.hosts.is_empty() {
			return Err(ConfigError::NoHosts);
		}
		if self.hosts.iter().any(|h| h.trim().is_empty()) {
			return Err(ConfigError::EmptyHost);
		}
		if self.attempts == 0 {
			return Err(ConfigError::NoAttempts);
		}
		if self.question.trim().is_empty() {
			return Err(ConfigError::EmptyQuestion);
		}
		if self.timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}
		Ok(())
	}

	/// Number of outcomes a cycle with this configuration produces.
	pub fn total_attempts(&self) -> u64 {
		self.hosts.len() as u64 * u64::from(self.attempts)
	}
}

/// Classification tier of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTier {
	Transport,
	ResponseCode,
	ContentMismatch,
}

impl fmt::Display for FailureTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FailureTier::Transport => f.write_str("transport"),
			FailureTier::ResponseCode => f.write_str("rcode"),
			FailureTier::ContentMismatch => f.write_str("content"),
		}
	}
}

/// Why a single attempt did not count as a success
#[derive(Debug, Error)]
pub enum Failure {
	#[error(transparent)]
	Transport(#[from] ExchangeError),
	#[error("failed to resolve '{question}'. rcode:{rcode}")]
	ResponseCode { question: String, rcode: String },
	#[error("dns answer does not contain '{expect}' in '{answers}'")]
	ContentMismatch { expect: String, answers: String },
}

impl Failure {
	pub fn tier(&self) -> FailureTier {
		match self {
			Failure::Transport(_) => FailureTier::Transport,
			Failure::ResponseCode { .. } => FailureTier::ResponseCode,
			Failure::ContentMismatch { .. } => FailureTier::ContentMismatch,
		}
	}
}

/// Result of one attempt against one host.
///
/// The round-trip time is present exactly when the transport exchange
/// completed, so the constructors are the only way to build one.
#[derive(Debug)]
pub struct Outcome {
	host: String,
	rtt: Option<Duration>,
	failure: Option<Failure>,
}

impl Outcome {
	pub fn success(host: impl Into<String>, rtt: Duration) -> Self {
		Outcome { host: host.into(), rtt: Some(rtt), failure: None }
	}

	/// Transport succeeded but the answer was rejected.
	pub fn answered(host: impl Into<String>, rtt: Duration, failure: Failure) -> Self {
		Outcome { host: host.into(), rtt: Some(rtt), failure: Some(failure) }
	}

	/// No usable response was obtained.
	pub fn unanswered(host: impl Into<String>, err: ExchangeError) -> Self {
		Outcome {
			host: host.into(),
			rtt: None,
			failure: Some(Failure::Transport(err)),
		}
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	pub fn rtt(&self) -> Option<Duration> {
		self.rtt
	}

	pub fn failure(&self) -> Option<&Failure> {
		self.failure.as_ref()
	}

	pub fn is_success(&self) -> bool {
		self.failure.is_none()
	}
}

#[cfg(test)]
pub(crate) fn test_config(port: u16) -> ProbeConfig {
	ProbeConfig {
		protocol: Protocol::Udp,
		port,
		hosts: vec!["127.0.0.1".to_string()],
		question: "example.com.".to_string(),
		expect: None,
		timeout: Duration::from_secs(1),
		attempts: 1,
		interval: Duration::ZERO,
		latency: LatencyPolicy::Answered,
	}
}
