use tracing_subscriber::EnvFilter;

/// Setup logging of probe events to stderr, keeping stdout for metrics.
///
/// Defaults to warnings, which includes one line per failed attempt. Use the
/// RUST_LOG environment variable to override, e.g. RUST_LOG=debug to also see
/// cycle start and finish.
pub fn init_logging() {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new("warn"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.try_init()
		.ok();
}
