use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::ResponseCode;
use tokio::time::Instant;

use crate::dns::{self, DnsResponse, ExchangeError};
use crate::transport::{Failure, Outcome, ProbeConfig};

/// Join a host and port into a dialable address string.
///
/// Bare IPv6 literals are bracketed; names, IPv4 literals and already
/// bracketed hosts are used as-is:
///   "127.0.0.1", 53  -> "127.0.0.1:53"
///   "::1", 53        -> "[::1]:53"
///   "ns.example", 53 -> "ns.example:53"
pub fn join_host_port(host: &str, port: u16) -> String {
	if host.contains(':') && !host.starts_with('[') {
		format!("[{}]:{}", host, port)
	} else {
		format!("{}:{}", host, port)
	}
}

/// Issues single queries against one host at a time and classifies the result.
#[derive(Debug, Clone)]
pub struct Resolver {
	config: Arc<ProbeConfig>,
}

impl Resolver {
	pub fn new(config: Arc<ProbeConfig>) -> Self {
		Resolver { config }
	}

	/// Run one attempt against `host`. Never retries.
	pub async fn resolve_once(&self, host: &str) -> Outcome {
		let (response, rtt) = match self.exchange(host).await {
			Ok(answered) => answered,
			Err(e) => return Outcome::unanswered(host, e),
		};
		match self.classify(&response) {
			Ok(()) => Outcome::success(host, rtt),
			Err(failure) => Outcome::answered(host, rtt, failure),
		}
	}

	/// Look up the target and exchange one query, all within the attempt timeout.
	async fn exchange(&self, host: &str) -> Result<(DnsResponse, Duration), ExchangeError> {
		let timeout = self.config.timeout;
		let deadline = Instant::now() + timeout;

		let target = join_host_port(host, self.config.port);
		let addr = tokio::time::timeout_at(deadline, lookup(&target))
			.await
			.map_err(|_| ExchangeError::Timeout(timeout))??;

		let remaining = deadline.saturating_duration_since(Instant::now());
		dns::exchange(self.config.protocol, addr, &self.config.question, remaining)
			.await
			.map_err(|e| match e {
				ExchangeError::Timeout(_) => ExchangeError::Timeout(timeout),
				other => other,
			})
	}

	/// Judge a response that made it back over the wire.
	pub fn classify(&self, response: &DnsResponse) -> Result<(), Failure> {
		if response.rcode != ResponseCode::NoError {
			return Err(Failure::ResponseCode {
				question: self.config.question.clone(),
				rcode: response.rcode.to_string(),
			});
		}

		let expect = match self.config.expect.as_deref() {
			Some(expect) if !expect.is_empty() => expect,
			_ => return Ok(()),
		};
		if !response.answers.join("|").contains(expect) {
			return Err(Failure::ContentMismatch {
				expect: expect.to_string(),
				answers: response.answers.join("\t"),
			});
		}
		Ok(())
	}
}

/// First socket address for `target`; IP literals skip the system resolver.
async fn lookup(target: &str) -> Result<SocketAddr, ExchangeError> {
	tokio::net::lookup_host(target)
		.await?
		.next()
		.ok_or_else(|| ExchangeError::NoAddress(target.to_string()))
}
