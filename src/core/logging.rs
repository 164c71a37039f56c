//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable, e.g.
/// `RUST_LOG=meadow::render::frame=trace` to follow every frame phase.
///
/// # Example
/// ```
/// meadow::core::logging::init();
/// log::info!("Meadow started");
/// ```
pub fn init() {
    // try_init so tests and doc examples may call this more than once
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).try_init();
}
