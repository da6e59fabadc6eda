pub mod engine;
pub mod expression;
pub mod plan;

pub use crate::domain::model::{ExportReceipt, ExportTask, RunReport};
pub use crate::domain::ports::{ConfigProvider, ExportBackend, Storage};
pub use crate::utils::error::Result;
