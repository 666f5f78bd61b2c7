mod duration;
pub use duration::{now_nanos, parse_duration, DurationError, TimeWindow, NOW};
mod logger;
pub use logger::{setup_info_logger, setup_logger};
mod yaml;
pub use yaml::{
    read, read_str, ClientConfig, ConfigError, EnvironmentConfig, SetupConfig, TokenConfig,
    DEFAULT_PRODUCT,
};

pub use tracing::level_filters::LevelFilter;
