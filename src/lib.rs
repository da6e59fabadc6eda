pub mod adapters;
pub mod analysis;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::ExportArgs;

pub use adapters::{ClientSettings, EarthEngineClient, LocalStorage};
pub use config::ExportConfig;
pub use core::{engine::ExportEngine, plan::plan_exports};
pub use utils::error::{ExportError, Result};
