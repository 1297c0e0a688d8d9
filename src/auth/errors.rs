use std::path::PathBuf;

use thiserror::Error;

use crate::common::client::error::ApiError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("网络请求失败: {0}")]
    Api(#[from] ApiError),

    #[error("读写 cookie 文件 {} 失败: {source}", .path.display())]
    CookieFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cookie 文件格式错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("找不到用户配置目录")]
    NoConfigDir,

    #[error("需要手机号或者 gcid/gcess")]
    MissingCredentials,

    #[error("登录状态无效或已过期，请重新登录")]
    Expired,

    #[error("读取密码失败: {0}")]
    Prompt(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
