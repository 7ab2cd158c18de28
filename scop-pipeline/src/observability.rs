use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` directives are honoured; the crate
/// itself logs at `info` unless overridden.
pub fn init_tracing() {
    let directive = "scop_pipeline=info"
        .parse()
        .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into());
    let filter = EnvFilter::from_default_env().add_directive(directive);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
