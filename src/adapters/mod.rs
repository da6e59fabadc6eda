// Adapters layer: concrete implementations of the domain ports.

pub mod earth_engine;
pub mod storage;

pub use earth_engine::{ClientSettings, EarthEngineClient};
pub use storage::LocalStorage;
