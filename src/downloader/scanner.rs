use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use super::error::DownloadError;

/// 章节目录名 -> 目录下的文件名集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceIndex {
    entries: HashMap<String, HashSet<String>>,
}

impl PresenceIndex {
    pub fn contains(&self, chapter_dir: &str, file_name: &str) -> bool {
        self.entries
            .get(chapter_dir)
            .is_some_and(|files| files.contains(file_name))
    }

    pub fn insert(&mut self, chapter_dir: &str, file_name: &str) {
        self.entries
            .entry(chapter_dir.to_string())
            .or_default()
            .insert(file_name.to_string());
    }

    pub fn chapter(&self, chapter_dir: &str) -> Option<&HashSet<String>> {
        self.entries.get(chapter_dir)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 扫描项目目录下已下载的文件，只读两层，不修改文件系统。
/// 目录不存在视为什么都没下载。
pub async fn scan(root: &Path) -> Result<PresenceIndex, DownloadError> {
    let mut index = PresenceIndex::default();

    let mut top = match tokio::fs::read_dir(root).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("下载目录不存在, 视为空: {}", root.display());
            return Ok(index);
        }
        Err(source) => {
            return Err(DownloadError::Filesystem {
                path: root.to_path_buf(),
                source,
            });
        }
    };

    while let Some(entry) = top.next_entry().await.map_err(|source| DownloadError::Filesystem {
        path: root.to_path_buf(),
        source,
    })? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let files = index.entries.entry(name).or_default();

        // 顶层的符号链接目录只读一层，失效的链接当作普通文件
        let is_dir = match tokio::fs::metadata(entry.path()).await {
            Ok(meta) => meta.is_dir(),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(source) => {
                return Err(DownloadError::Filesystem {
                    path: entry.path(),
                    source,
                });
            }
        };
        if !is_dir {
            continue;
        }

        let chapter_path = entry.path();
        let mut children =
            tokio::fs::read_dir(&chapter_path)
                .await
                .map_err(|source| DownloadError::Filesystem {
                    path: chapter_path.clone(),
                    source,
                })?;
        while let Some(child) =
            children
                .next_entry()
                .await
                .map_err(|source| DownloadError::Filesystem {
                    path: chapter_path.clone(),
                    source,
                })?
        {
            files.insert(child.file_name().to_string_lossy().into_owned());
        }
    }

    debug!("扫描到 {} 个已存在的章节目录", index.len());
    Ok(index)
}
