use std::env;
use std::fs;
use std::sync::Arc;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize logging for the synchronization layer.
///
/// Reads `RUST_LOG` for the filter level; set `SIMBRIDGE_LOG_FILE` to a path
/// to mirror output into a file (ANSI stripped).
pub fn init_logging() {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let enable_backtrace = env::var("RUST_BACKTRACE").unwrap_or_else(|_| "0".to_string()) == "1";

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&log_level);
        filter = filter.add_directive("simbridge=debug".parse().unwrap());
        filter
    });

    let registry = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_ansi(true),
    );

    // Optional file layer, enabled by env var so library consumers opt in.
    if let Ok(path) = env::var("SIMBRIDGE_LOG_FILE") {
        match fs::File::create(&path) {
            Ok(log_file) => {
                registry
                    .with(
                        fmt::layer()
                            .with_writer(Arc::new(log_file))
                            .with_span_events(FmtSpan::CLOSE)
                            .with_target(true)
                            .with_ansi(false),
                    )
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: failed to create log file {}: {}", path, e);
                registry.init();
            }
        }
    } else {
        registry.init();
    }

    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!("Panic occurred: {}", panic_info);

        if let Some(location) = panic_info.location() {
            tracing::error!(
                "Panic location: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }

        if enable_backtrace {
            tracing::error!("Backtrace:\n{:?}", std::backtrace::Backtrace::capture());
        }
    }));

    tracing::info!("Logging initialized with level: {}", log_level);
}

/// Log build information for debugging.
pub fn log_build_info() {
    tracing::info!("=== simbridge ===");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("OS: {}", std::env::consts::OS);
    tracing::info!("Architecture: {}", std::env::consts::ARCH);
    tracing::info!("=================");
}
