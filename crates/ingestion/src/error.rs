//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 批大小必须至少为 1
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
