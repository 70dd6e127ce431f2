use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::Result;
use serde::Serialize;

use crate::stats::{AVAILABLE, ERROR, MAX, MEAN, SUCCESS, SUCCESS_RATE};

pub const DEFAULT_PREFIX: &str = "dnsdist";

/// Environment variable the monitoring agent sets when it wants graph metadata
pub const PLUGIN_META_ENV: &str = "MACKEREL_AGENT_PLUGIN_META";

const META_HEADER: &str = "# mackerel-agent-plugin";

/// Graph layout: graph name, label suffix, unit, and member metrics
/// as (metric, label, stacked).
const GRAPHS: &[(&str, &str, &str, &[(&str, &str, bool)])] = &[
	("service", "Available", "percentage", &[(AVAILABLE, "available", true)]),
	(
		"status",
		"resolve status count",
		"integer",
		&[(ERROR, "Error", true), (SUCCESS, "Success", true)],
	),
	("rate", "Success Rate", "percentage", &[(SUCCESS_RATE, "Success Rate", false)]),
	("rtt", "RTT", "float", &[(MAX, "Max", false), (MEAN, "Mean", false)]),
];

#[derive(Debug, Serialize)]
struct GraphMeta {
	graphs: BTreeMap<String, Graph>,
}

#[derive(Debug, Serialize)]
struct Graph {
	label: String,
	unit: &'static str,
	metrics: Vec<GraphMetric>,
}

#[derive(Debug, Serialize)]
struct GraphMetric {
	name: &'static str,
	label: &'static str,
	stacked: bool,
}

/// Metric key prefix derived from the `--prefix` option.
pub fn metric_key_prefix(prefix: &str) -> String {
	if prefix.is_empty() {
		"dns-synthetic".to_string()
	} else {
		format!("{}-synthetic", prefix)
	}
}

/// Capitalize each hyphen-separated word, keeping the rest of it as-is.
fn title_case(s: &str) -> String {
	s.split('-')
		.map(|word| {
			let mut chars = word.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars).collect(),
				None => String::new(),
			}
		})
		.collect::<Vec<String>>()
		.join("-")
}

fn graph_of(metric: &str) -> Option<&'static str> {
	GRAPHS.iter()
		.find(|(_, _, _, metrics)| metrics.iter().any(|(name, _, _)| *name == metric))
		.map(|(graph, _, _, _)| *graph)
}

/// Render metrics as plugin output lines: `<key>\t<value>\t<epoch>`.
///
/// Metrics without a graph are skipped, since the agent would drop them.
pub fn format_metrics(prefix: &str, metrics: &BTreeMap<&str, f64>, epoch: u64) -> String {
	let key_prefix = metric_key_prefix(prefix);
	let mut out = String::new();
	for (name, value) in metrics {
		let Some(graph) = graph_of(name) else {
			continue;
		};
		let _ = writeln!(out, "{}.{}.{}\t{}\t{}", key_prefix, graph, name, value, epoch);
	}
	out
}

/// Graph definition printed when the agent asks for plugin metadata.
pub fn graph_definition(prefix: &str) -> Result<String> {
	let key_prefix = metric_key_prefix(prefix);
	let label_prefix = title_case(&key_prefix);

	let graphs = GRAPHS.iter()
		.map(|&(name, label, unit, metrics)| {
			let graph = Graph {
				label: format!("{}: {}", label_prefix, label),
				unit,
				metrics: metrics.iter()
					.map(|&(metric, metric_label, stacked)| GraphMetric {
						name: metric,
						label: metric_label,
						stacked,
					})
					.collect(),
			};
			(format!("{}.{}", key_prefix, name), graph)
		})
		.collect();

	let json = serde_json::to_string(&GraphMeta { graphs })?;
	Ok(format!("{}\n{}\n", META_HEADER, json))
}
