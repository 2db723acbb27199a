//! Application configuration

mod app_config;

pub use app_config::{AppConfig, AutoStopConfig, DispatchConfig, LogFormat, LoggingConfig};
