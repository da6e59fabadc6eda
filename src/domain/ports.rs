use crate::domain::model::{
    BoundingBox, Destination, ExportTask, FileFormat, Operation, SamplingParams, YearRange,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Resolved parameters an export plan is derived from.
pub trait ConfigProvider: Send + Sync {
    fn project(&self) -> &str;
    fn region(&self) -> BoundingBox;
    fn collection_id(&self) -> &str;
    fn band(&self) -> &str;
    fn years(&self) -> YearRange;
    fn sampling(&self) -> SamplingParams;
    fn description_prefix(&self) -> &str;
    fn file_format(&self) -> FileFormat;
    fn destination(&self) -> &Destination;
}

/// Remote side of the export loop.
#[async_trait]
pub trait ExportBackend: Send + Sync {
    async fn submit_table_export(&self, task: &ExportTask) -> Result<Operation>;
    async fn get_operation(&self, name: &str) -> Result<Operation>;
}
