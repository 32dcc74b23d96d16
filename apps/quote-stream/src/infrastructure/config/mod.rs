//! Configuration Module
//!
//! Configuration loading for the quote stream service.

mod settings;

pub use settings::{
    AppConfig, ConfigError, Credentials, ProviderKind, ProviderSettings, ServerSettings,
};
