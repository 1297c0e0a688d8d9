use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::errors::{AuthError, Result};
use crate::common::client::models::StoredCookie;

const CONFIG_FOLDER: &str = "geektime-downloader";

/// 按手机号保存的登录 cookie，`<配置目录>/geektime-downloader/<手机号>.json`
#[derive(Debug, Clone)]
pub struct CookieFile {
    path: PathBuf,
}

impl CookieFile {
    pub fn for_phone(phone: &str) -> Result<Self> {
        let dir = dirs::config_dir().ok_or(AuthError::NoConfigDir)?;
        Ok(Self::in_dir(&dir.join(CONFIG_FOLDER), phone))
    }

    pub fn in_dir(dir: &Path, phone: &str) -> Self {
        Self {
            path: dir.join(format!("{}.json", phone)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件不存在时返回 None
    pub async fn load(&self) -> Result<Option<Vec<StoredCookie>>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("cookie 文件不存在: {}", self.path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(AuthError::CookieFile {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let cookies: Vec<StoredCookie> = serde_json::from_str(&text)?;
        Ok((!cookies.is_empty()).then_some(cookies))
    }

    pub async fn save(&self, cookies: &[StoredCookie]) -> Result<()> {
        let io_err = |source| AuthError::CookieFile {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(cookies)?;
        tokio::fs::write(&self.path, json).await.map_err(io_err)?;
        info!("cookie 已保存到 {}", self.path.display());
        Ok(())
    }

    pub async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AuthError::CookieFile {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
