use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::resolver::{join_host_port, Resolver};
use crate::stats::{AggregateResult, Tally};
use crate::transport::{Outcome, ProbeConfig};

/// Run one measurement cycle across every configured host.
///
/// One task is spawned per host (duplicates included); each runs its attempts
/// sequentially, pausing `interval` between them, and sends every outcome to a
/// single channel. The collector waits for exactly `hosts x attempts`
/// outcomes before folding them. Per-attempt failures are logged and counted,
/// never returned.
pub async fn run_cycle(config: ProbeConfig) -> AggregateResult {
	let config = Arc::new(config);
	let total = config.total_attempts();
	debug!(
		hosts = config.hosts.len(),
		attempts = config.attempts,
		protocol = %config.protocol,
		question = %config.question,
		"starting probe cycle"
	);

	// Sized so no host task ever waits on the collector
	let capacity = usize::try_from(total).unwrap_or(usize::MAX).max(1);
	let (tx, mut rx) = mpsc::channel::<Outcome>(capacity);

	for host in &config.hosts {
		let tx = tx.clone();
		let host = host.clone();
		let resolver = Resolver::new(Arc::clone(&config));
		let attempts = config.attempts;
		let interval = config.interval;

		tokio::spawn(async move {
			for attempt in 0..attempts {
				if attempt > 0 && !interval.is_zero() {
					tokio::time::sleep(interval).await;
				}
				let outcome = resolver.resolve_once(&host).await;
				if tx.send(outcome).await.is_err() {
					return;
				}
			}
		});
	}
	drop(tx);

	let mut tally = Tally::default();
	let mut received: u64 = 0;
	while received < total {
		let Some(outcome) = rx.recv().await else {
			error!(
				missing = total - received,
				"host tasks ended before delivering every outcome"
			);
			tally.record_missing(total - received);
			break;
		};
		received += 1;

		if let Some(failure) = outcome.failure() {
			warn!(
				host = outcome.host(),
				port = config.port,
				tier = %failure.tier(),
				"{} on {}",
				failure,
				join_host_port(outcome.host(), config.port)
			);
		}
		tally.record(&outcome, config.latency);
	}

	let result = tally.finish(total);
	debug!(
		success = result.success,
		error = result.error,
		"probe cycle finished"
	);
	result
}
