use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::format::{Format, Writer},
    EnvFilter,
};

/// Timestamp formatter: "DD Month - HH:MM:SS.microseconds".
struct CustomTimer;

impl tracing_subscriber::fmt::time::FormatTime for CustomTimer {
    fn format_time(&self, writer: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(writer, "{} - {}", now.format("%d %B"), now.format("%H:%M:%S%.6f"))
    }
}

/// Sets up the global logger with the specified log level.
///
/// `RUST_LOG` directives are honoured on top of `log_level`.
///
/// # Note
/// If a global logger is already set, this function does nothing and
/// returns `false`.
pub fn setup_logger(log_level: LevelFilter) -> bool {
    let filter = EnvFilter::from_default_env().add_directive(log_level.into());

    let format = Format::default().with_timer(CustomTimer).with_level(true).with_target(true);

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).event_format(format).finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

/// Sets up the global logger with INFO level.
pub fn setup_info_logger() -> bool {
    setup_logger(LevelFilter::INFO)
}
