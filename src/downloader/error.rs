use std::path::PathBuf;

use thiserror::Error;

use crate::common::client::error::ApiError;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP错误: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("目录或文件操作失败 {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP 请求失败，状态码: {status}，URL: {url}")]
    Status { status: u16, url: String },

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("接口错误: {0}")]
    Api(#[from] ApiError),

    #[error("渲染失败: {0}")]
    Render(String),

    #[error("不支持的内容: {0}")]
    Unsupported(String),

    #[error("《{article}》的{kind}下载失败: {source}")]
    Transfer {
        article: String,
        kind: String,
        #[source]
        source: Box<DownloadError>,
    },

    #[error("下载已取消")]
    Cancelled,

    #[error("信号量错误")]
    SemaphoreError,
}

impl DownloadError {
    /// 给叶子下载错误补上文章和格式信息，取消信号原样透传
    pub fn transfer(article: &str, kind: impl ToString, source: DownloadError) -> Self {
        match source {
            DownloadError::Cancelled => DownloadError::Cancelled,
            source => DownloadError::Transfer {
                article: article.to_string(),
                kind: kind.to_string(),
                source: Box::new(source),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled)
    }
}
