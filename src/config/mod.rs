#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::ExportArgs;
pub use toml_config::ExportConfig;
