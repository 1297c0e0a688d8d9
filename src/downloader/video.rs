use std::path::Path;

use async_trait::async_trait;
use futures::{FutureExt, StreamExt, TryStreamExt, stream};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::core::{DownloadCore, cancellable, ensure_dir, part_path};
use super::error::DownloadError;
use super::fetcher::{VideoFetcher, VideoRequest};
use crate::common::client::client::GeekClient;
use crate::common::models::{Quality, SourceType};

pub const TS_EXTENSION: &str = ".ts";

/// 视频文件名 `<title>.ts`
pub fn video_file_name(title: &str) -> String {
    format!("{}{}", title, TS_EXTENSION)
}

/// HLS 视频：按清晰度取 m3u8，分片并发下载后按顺序拼接成一个 ts 文件
pub struct HlsVideoFetcher {
    client: GeekClient,
    core: DownloadCore,
}

impl HlsVideoFetcher {
    pub fn new(client: GeekClient, core: DownloadCore) -> Self {
        Self { client, core }
    }

    async fn playlist_url(
        &self,
        request: &VideoRequest,
        quality: Quality,
    ) -> Result<String, DownloadError> {
        let url = match request.source {
            SourceType::University => {
                self.client
                    .university_video_url(request.product_id, request.article_id, quality)
                    .await?
            }
            _ => {
                self.client
                    .article_video_url(request.article_id, quality)
                    .await?
            }
        };
        url.ok_or_else(|| {
            DownloadError::Unsupported(format!(
                "文章 {} 没有 {} 清晰度的视频",
                request.article_id,
                quality.as_str()
            ))
        })
    }

    /// 主播放列表时取第一个子播放列表
    async fn media_playlist(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<(Url, String), DownloadError> {
        let mut base = Url::parse(url).map_err(|e| DownloadError::InvalidUrl(e.to_string()))?;
        let mut text = self.core.fetch_text(cancel, url).await?;

        if let Some(variant) = first_variant(&text, &base)? {
            debug!("使用子播放列表 {}", variant);
            text = self.core.fetch_text(cancel, variant.as_str()).await?;
            base = variant;
        }
        Ok((base, text))
    }

    async fn write_segments(
        &self,
        cancel: &CancellationToken,
        segments: &[Url],
        tmp: &Path,
        concurrency: usize,
    ) -> Result<(), DownloadError> {
        let pb = ProgressBar::new(segments.len() as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} 分片")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        if let Some(name) = tmp.file_name() {
            pb.set_message(name.to_string_lossy().trim_end_matches(".part").to_string());
        }

        let mut file = tokio::fs::File::create(tmp)
            .await
            .map_err(|source| DownloadError::Filesystem {
                path: tmp.to_path_buf(),
                source,
            })?;

        // buffered 保证写入顺序与播放列表一致
        let fetches: Vec<_> = segments
            .iter()
            .map(|url| self.core.fetch_bytes(cancel, url.as_str()).boxed())
            .collect();
        let mut chunks = stream::iter(fetches).buffered(concurrency.max(1));
        while let Some(chunk) = chunks.try_next().await? {
            file.write_all(&chunk).await?;
            pb.inc(1);
        }
        file.flush().await?;
        pb.finish_and_clear();
        Ok(())
    }
}

#[async_trait]
impl VideoFetcher for HlsVideoFetcher {
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        request: &VideoRequest,
        dir: &Path,
        quality: Quality,
        concurrency: usize,
    ) -> Result<(), DownloadError> {
        let url = cancellable(cancel, self.playlist_url(request, quality)).await?;
        let (base, playlist) = self.media_playlist(cancel, &url).await?;
        let segments = parse_segments(&playlist, &base)?;
        info!("《{}》共 {} 个视频分片", request.title, segments.len());

        ensure_dir(dir).await?;
        let dest = dir.join(video_file_name(&request.title));
        let tmp = part_path(&dest);

        match self.write_segments(cancel, &segments, &tmp, concurrency).await {
            Ok(()) => tokio::fs::rename(&tmp, &dest)
                .await
                .map_err(|source| DownloadError::Filesystem { path: dest, source }),
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&tmp).await {
                    debug!("清理临时文件 {} 失败: {}", tmp.display(), rm);
                }
                Err(e)
            }
        }
    }
}

fn join(base: &Url, uri: &str) -> Result<Url, DownloadError> {
    base.join(uri)
        .map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", uri, e)))
}

/// 主播放列表中第一个子播放列表的地址，媒体播放列表返回 None
fn first_variant(playlist: &str, base: &Url) -> Result<Option<Url>, DownloadError> {
    let mut lines = playlist.lines().map(str::trim);
    while let Some(line) = lines.next() {
        if line.starts_with("#EXT-X-STREAM-INF") {
            if let Some(uri) = lines.find(|l| !l.is_empty() && !l.starts_with('#')) {
                return join(base, uri).map(Some);
            }
        }
    }
    Ok(None)
}

/// 媒体播放列表中的分片地址，加密的播放列表不支持
fn parse_segments(playlist: &str, base: &Url) -> Result<Vec<Url>, DownloadError> {
    let mut segments = Vec::new();
    for line in playlist.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(attrs) = line.strip_prefix("#EXT-X-KEY:") {
            if !attrs.contains("METHOD=NONE") {
                return Err(DownloadError::Unsupported("加密的视频暂不支持".to_string()));
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        segments.push(join(base, line)?);
    }

    if segments.is_empty() {
        return Err(DownloadError::Unsupported("播放列表中没有视频分片".to_string()));
    }
    Ok(segments)
}
