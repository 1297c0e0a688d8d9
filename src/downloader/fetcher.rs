use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::DownloadError;
use crate::common::client::models::StoredCookie;
use crate::common::models::{Quality, SourceType};

/// 打印一篇文章页面需要的参数
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub article_id: i64,
    pub dir: PathBuf,
    pub title: String,
    pub cookies: Vec<StoredCookie>,
    pub include_comments: bool,
}

/// 一个已经启动的渲染会话，例如一个无头浏览器进程
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// 把文章页面打印成 `<dir>/<title>.pdf`
    async fn render(&self, request: &RenderRequest) -> Result<(), DownloadError>;

    /// 释放会话占用的资源
    async fn close(self: Box<Self>) -> Result<(), DownloadError>;
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn open(&self) -> Result<Box<dyn RenderSession>, DownloadError>;
}

#[async_trait]
pub trait TextFetcher: Send + Sync {
    /// 把文章正文写成 `<dir>/<title>.md`，正文中的图片用至多 `concurrency` 个并发下载
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        body: &str,
        title: &str,
        dir: &Path,
        article_id: i64,
        concurrency: usize,
    ) -> Result<(), DownloadError>;
}

#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// 下载 `<dir>/<title>.mp3`，地址为空时什么也不做
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        url: &str,
        dir: &Path,
        title: &str,
    ) -> Result<(), DownloadError>;
}

/// 一个视频文章的定位信息
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub article_id: i64,
    pub source: SourceType,
    /// 训练营视频需要课程 ID
    pub product_id: i64,
    /// 已经清洗过的文件名，不含扩展名
    pub title: String,
}

#[async_trait]
pub trait VideoFetcher: Send + Sync {
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        request: &VideoRequest,
        dir: &Path,
        quality: Quality,
        concurrency: usize,
    ) -> Result<(), DownloadError>;
}

/// 调度器用到的所有下载实现
#[derive(Clone)]
pub struct Fetchers {
    pub renderer: Arc<dyn PageRenderer>,
    pub text: Arc<dyn TextFetcher>,
    pub audio: Arc<dyn AudioFetcher>,
    pub video: Arc<dyn VideoFetcher>,
}
