use std::collections::BTreeMap;
use std::time::Duration;

use crate::transport::{LatencyPolicy, Outcome};

pub const AVAILABLE: &str = "available";
pub const ERROR: &str = "error";
pub const SUCCESS: &str = "success";
pub const SUCCESS_RATE: &str = "success-rate";
pub const MEAN: &str = "mean";
pub const MAX: &str = "max";

/// Aggregate of one measurement cycle
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
	/// True when at least one attempt anywhere succeeded
	pub available: bool,
	pub success: u64,
	pub error: u64,
	/// Successes over total attempts, as a percentage
	pub success_rate: f64,
	/// Absent when no attempt produced a latency sample
	pub mean_ms: Option<f64>,
	pub max_ms: Option<f64>,
}

impl AggregateResult {
	/// Flatten into the named metrics reported to the monitoring agent.
	///
	/// `mean` and `max` are left out rather than zeroed when there was no
	/// latency sample.
	pub fn metrics(&self) -> BTreeMap<&'static str, f64> {
		let mut metrics = BTreeMap::new();
		metrics.insert(AVAILABLE, if self.available { 100.0 } else { 0.0 });
		metrics.insert(ERROR, self.error as f64);
		metrics.insert(SUCCESS, self.success as f64);
		metrics.insert(SUCCESS_RATE, self.success_rate);
		if let Some(mean) = self.mean_ms {
			metrics.insert(MEAN, mean);
		}
		if let Some(max) = self.max_ms {
			metrics.insert(MAX, max);
		}
		metrics
	}
}

/// Running counters folded from outcomes as they arrive
#[derive(Debug, Default)]
pub struct Tally {
	success: u64,
	error: u64,
	rtts_ms: Vec<f64>,
}

impl Tally {
	/// Count one outcome. The failure tier does not matter here, only whether
	/// there is a failure at all.
	pub fn record(&mut self, outcome: &Outcome, policy: LatencyPolicy) {
		let sample = match policy {
			LatencyPolicy::Answered => outcome.rtt(),
			LatencyPolicy::Succeeded => outcome.rtt().filter(|_| outcome.is_success()),
		};
		if let Some(rtt) = sample {
			self.rtts_ms.push(duration_ms(rtt));
		}

		if outcome.is_success() {
			self.success += 1;
		} else {
			self.error += 1;
		}
	}

	/// Count attempts whose outcome never arrived as errors.
	pub fn record_missing(&mut self, count: u64) {
		self.error += count;
	}

	pub fn finish(self, total: u64) -> AggregateResult {
		let success_rate = if total > 0 {
			(self.success as f64 / total as f64) * 100.0
		} else {
			0.0
		};
		AggregateResult {
			available: self.success > 0,
			success: self.success,
			error: self.error,
			success_rate,
			mean_ms: mean(&self.rtts_ms),
			max_ms: max(&self.rtts_ms),
		}
	}
}

/// Duration in fractional milliseconds.
pub fn duration_ms(d: Duration) -> f64 {
	d.as_nanos() as f64 / 1_000_000.0
}

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let sum: f64 = values.iter().sum();
	Some(sum / values.len() as f64)
}

/// Largest value in the slice, `None` when empty.
pub fn max(values: &[f64]) -> Option<f64> {
	values.iter().copied().reduce(f64::max)
}
