use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::future::try_join_all;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::DownloadError;
use super::progress::byte_bar;

const PART_SUFFIX: &str = ".part";

/// 未完成文件的临时路径，`a.mp3` -> `a.mp3.part`
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(PART_SUFFIX);
    dest.with_file_name(name)
}

/// 先写 `.part` 再改名，目录扫描只会看到完整的文件
pub async fn write_atomic(dest: &Path, contents: &[u8]) -> Result<(), DownloadError> {
    ensure_parent(dest).await?;
    let tmp = part_path(dest);
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|source| DownloadError::Filesystem {
            path: tmp.clone(),
            source,
        })?;
    commit(&tmp, dest).await
}

pub async fn ensure_dir(dir: &Path) -> Result<(), DownloadError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| DownloadError::Filesystem {
            path: dir.to_path_buf(),
            source,
        })
}

/// 只有 NotFound 视为不存在，其余错误上报
pub async fn file_exists(path: &Path) -> Result<bool, DownloadError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|source| DownloadError::Filesystem {
            path: path.to_path_buf(),
            source,
        })
}

async fn ensure_parent(dest: &Path) -> Result<(), DownloadError> {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent).await,
        _ => Ok(()),
    }
}

async fn commit(tmp: &Path, dest: &Path) -> Result<(), DownloadError> {
    tokio::fs::rename(tmp, dest)
        .await
        .map_err(|source| DownloadError::Filesystem {
            path: dest.to_path_buf(),
            source,
        })
}

/// 在取消信号到来前完成 `fut`
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, DownloadError>
where
    F: Future<Output = Result<T, DownloadError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(DownloadError::Cancelled),
        result = fut => result,
    }
}

/// 叶子下载共用的 HTTP 传输
#[derive(Debug, Clone)]
pub struct DownloadCore {
    client: Client,
}

impl DownloadCore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 流式下载到 `dest`，返回写入的字节数
    pub async fn download_file(
        &self,
        cancel: &CancellationToken,
        url: &str,
        dest: &Path,
        show_progress: bool,
    ) -> Result<u64, DownloadError> {
        ensure_parent(dest).await?;
        let tmp = part_path(dest);

        let written = cancellable(cancel, self.stream_to(url, &tmp, show_progress)).await;
        match written {
            Ok(n) => {
                commit(&tmp, dest).await?;
                debug!("下载完成: {} ({} 字节)", dest.display(), n);
                Ok(n)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&tmp).await {
                    debug!("清理临时文件 {} 失败: {}", tmp.display(), rm);
                }
                Err(e)
            }
        }
    }

    async fn stream_to(
        &self,
        url: &str,
        tmp: &Path,
        show_progress: bool,
    ) -> Result<u64, DownloadError> {
        let response = self.client.get(url).send().await?;
        Self::check_response_status(&response, url)?;

        let total = response.content_length().unwrap_or(0);
        let pb = show_progress.then(|| {
            let name = tmp
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            byte_bar(total, &name)
        });

        let mut file = tokio::fs::File::create(tmp)
            .await
            .map_err(|source| DownloadError::Filesystem {
                path: tmp.to_path_buf(),
                source,
            })?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            if let Some(pb) = &pb {
                pb.set_position(downloaded);
            }
        }
        file.flush().await?;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        Ok(downloaded)
    }

    /// 整个响应体读进内存，适合图片和视频分片
    pub async fn fetch_bytes(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<Bytes, DownloadError> {
        cancellable(cancel, async {
            let response = self.client.get(url).send().await?;
            Self::check_response_status(&response, url)?;
            Ok::<_, DownloadError>(response.bytes().await?)
        })
        .await
    }

    pub async fn fetch_text(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<String, DownloadError> {
        cancellable(cancel, async {
            let response = self.client.get(url).send().await?;
            Self::check_response_status(&response, url)?;
            Ok::<_, DownloadError>(response.text().await?)
        })
        .await
    }

    /// 并发下载多个地址，同时最多 `concurrency` 个请求，结果与 `urls` 顺序一致。
    /// 任一请求失败时返回第一个错误，其余请求随之丢弃。
    pub async fn fetch_all(
        &self,
        cancel: &CancellationToken,
        urls: &[String],
        concurrency: usize,
    ) -> Result<Vec<Bytes>, DownloadError> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let jobs = urls.iter().map(|url| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| DownloadError::SemaphoreError)?;
                self.fetch_bytes(cancel, url).await
            }
        });
        try_join_all(jobs).await
    }

    fn check_response_status(response: &reqwest::Response, url: &str) -> Result<(), DownloadError> {
        let status = response.status();
        debug!("Response Status: {} {}", status, url);

        if status.is_success() {
            return Ok(());
        }
        match status {
            reqwest::StatusCode::FORBIDDEN | reqwest::StatusCode::TOO_MANY_REQUESTS => {
                warn!("请求被拒绝 ({})，可能触发了风控，建议稍后重试", status);
            }
            reqwest::StatusCode::UNAUTHORIZED => {
                warn!("认证失败 (401)，请检查登录状态");
            }
            _ => {}
        }
        Err(DownloadError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}
