use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("网络请求失败: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("响应解析失败: {0}")]
    InvalidResponse(String),

    #[error("返回了 HTML 页面而不是 JSON, 可能需要重新登录")]
    HtmlResponse(String),

    #[error("需要登录认证")]
    AuthRequired,

    #[error("服务暂时不可用，请稍后重试")]
    RetryLater,

    #[error("加锁失败")]
    LockError,

    #[error("无效的地址: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("极客时间 API 错误({0}): {1}")]
    ApiError(i64, String),
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}
