//! Compatibility bridges for other logging crates

#[cfg(feature = "log-compat")]
pub mod log_bridge;

#[cfg(feature = "tracing-compat")]
pub mod tracing_bridge;

/// Install `logger` globally and route both `log` and `tracing` into it.
#[cfg(all(feature = "log-compat", feature = "tracing-compat"))]
pub fn init_with_bridges(
    logger: std::sync::Arc<dyn crate::Logger>,
) -> Result<(), Box<dyn std::error::Error>> {
    crate::init(logger.clone())?;
    log_bridge::init_log_bridge(logger.clone())?;
    tracing_bridge::init_tracing_bridge(logger)?;
    Ok(())
}

/// Crates whose own diagnostics must never be fed back into a logger.
#[cfg(any(feature = "log-compat", feature = "tracing-compat"))]
pub(crate) fn is_own_target(target: &str) -> bool {
    target.starts_with("pocs_logger")
}
