use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::artifact::ArtifactKind;
use super::core::DownloadCore;
use super::error::DownloadError;
use super::fetcher::AudioFetcher;

/// 文章音频，直接流式保存为 mp3
pub struct HttpAudioFetcher {
    core: DownloadCore,
}

impl HttpAudioFetcher {
    pub fn new(core: DownloadCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl AudioFetcher for HttpAudioFetcher {
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        url: &str,
        dir: &Path,
        title: &str,
    ) -> Result<(), DownloadError> {
        // 部分文章没有音频
        if url.is_empty() {
            debug!("《{}》没有音频", title);
            return Ok(());
        }
        let dest = dir.join(ArtifactKind::Audio.file_name(title));
        self.core.download_file(cancel, url, &dest, false).await?;
        Ok(())
    }
}
