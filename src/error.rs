use thiserror::Error;

use crate::auth::errors::AuthError;
use crate::common::client::error::ApiError;
use crate::common::models::{ProductType, SourceType};
use crate::downloader::error::DownloadError;
use crate::navigator::NavError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("认证失败: {0}")]
    Auth(#[from] AuthError),

    #[error("尚未购买该课程: {title}")]
    NotOwned { title: String },

    #[error("输入的课程 ID 有误, productType: {actual}, sourceType: {}", .expected.value())]
    TypeMismatch {
        expected: SourceType,
        actual: ProductType,
    },

    #[error("{0}")]
    Transfer(DownloadError),

    #[error("{0}")]
    Filesystem(DownloadError),

    #[error("{0}")]
    Validation(String),

    #[error("接口错误: {0}")]
    Api(ApiError),

    #[error("终端输入失败: {0}")]
    Prompt(#[from] std::io::Error),

    #[error(transparent)]
    Nav(#[from] NavError),

    #[error("操作已中断")]
    Interrupted,
}

impl AppError {
    /// 可恢复的错误回到上一个导航状态，其余错误结束程序
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::NotOwned { .. } | AppError::TypeMismatch { .. } | AppError::Validation(_)
        )
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::AuthRequired => AppError::Auth(AuthError::Expired),
            e => AppError::Api(e),
        }
    }
}

impl From<DownloadError> for AppError {
    fn from(e: DownloadError) -> Self {
        match e {
            DownloadError::Cancelled => AppError::Interrupted,
            DownloadError::Api(ApiError::AuthRequired) => AppError::Auth(AuthError::Expired),
            e @ DownloadError::Filesystem { .. } => AppError::Filesystem(e),
            e => AppError::Transfer(e),
        }
    }
}
