use std::sync::Arc;
use std::time::Duration;

use cookie::Cookie;
use cookie_store::CookieStore;
use reqwest::{
    Client, ClientBuilder, Response, StatusCode, Url,
    header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT},
};
use reqwest_cookie_store::CookieStoreMutex;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, error};

use crate::common::client::error::ApiError;
use crate::common::client::models::StoredCookie;

pub const GEEKBANG_COOKIE_DOMAIN: &str = ".geekbang.org";
pub const GCID: &str = "GCID";
pub const GCESS: &str = "GCESS";

const GEEKBANG: &str = "https://time.geekbang.org";
const GEEKBANG_ACCOUNT: &str = "https://account.geekbang.org";
const GEEKBANG_UNIVERSITY: &str = "https://u.geekbang.org";

// 未登录/登录失效时接口返回的错误码
const AUTH_FAILED_CODES: [i64; 2] = [-3050, -2000];

/// 各个站点的根地址，测试时可以指向本地 mock 服务
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub time: Url,
    pub account: Url,
    pub university: Url,
}

impl Endpoints {
    pub fn geekbang() -> Result<Self, ApiError> {
        Ok(Self {
            time: Url::parse(GEEKBANG)?,
            account: Url::parse(GEEKBANG_ACCOUNT)?,
            university: Url::parse(GEEKBANG_UNIVERSITY)?,
        })
    }

    /// 三个站点都指向同一个地址
    pub fn single(base: &str) -> Result<Self, ApiError> {
        let url = Url::parse(base)?;
        Ok(Self {
            time: url.clone(),
            account: url.clone(),
            university: url,
        })
    }
}

// 支持自动携带认证状态的客户端
#[derive(Debug, Clone)]
pub struct GeekClient {
    inner: Client,
    cookie_store: Arc<CookieStoreMutex>,
    endpoints: Endpoints,
}

impl GeekClient {
    pub fn new(endpoints: Endpoints) -> Result<Self, ApiError> {
        let cookie_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let inner = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .cookie_provider(Arc::clone(&cookie_store))
            .default_headers(Self::get_default_headers())
            .build()?;

        Ok(Self {
            inner,
            cookie_store,
            endpoints,
        })
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9"));
        headers.insert(ORIGIN, HeaderValue::from_static(GEEKBANG));
        headers.insert(REFERER, HeaderValue::from_static("https://time.geekbang.org/"));
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36"));
        headers
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// 底层 reqwest 客户端，cookie 与接口调用共享
    pub fn http(&self) -> Client {
        self.inner.clone()
    }

    pub fn set_cookies(&self, cookies: &[StoredCookie]) -> Result<(), ApiError> {
        let mut store = self.cookie_store.lock().map_err(|_| ApiError::LockError)?;
        let site = &self.endpoints.time;

        for stored in cookies {
            let cookie = Cookie::build((stored.name.clone(), stored.value.clone()))
                .domain(stored.domain.clone())
                .path("/")
                .http_only(true)
                .max_age(cookie::time::Duration::days(180))
                .build();
            if let Err(e) = store.insert_raw(&cookie, site) {
                // 本地 mock 地址与 cookie 域名不匹配时会走到这里
                debug!("cookie {} 未写入: {}", stored.name, e);
            }
        }
        Ok(())
    }

    pub fn site_cookies(&self) -> Result<Vec<StoredCookie>, ApiError> {
        let store = self.cookie_store.lock().map_err(|_| ApiError::LockError)?;
        Ok(store
            .iter_any()
            .map(|c| StoredCookie {
                name: c.name().to_string(),
                value: c.value().to_string(),
                domain: c
                    .domain()
                    .map(|d| format!(".{}", d.trim_start_matches('.')))
                    .unwrap_or_else(|| GEEKBANG_COOKIE_DOMAIN.to_string()),
            })
            .collect())
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let resp = self.inner.get(url).send().await.map_err(|e| {
            error!("请求失败: {}", e);
            ApiError::Reqwest(e)
        })?;
        Self::handle_response(resp).await
    }

    pub async fn post_json<T, B>(&self, url: Url, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!("POST {}", url);
        let resp = self.inner.post(url).json(body).send().await.map_err(|e| {
            error!("请求失败: {}", e);
            ApiError::Reqwest(e)
        })?;
        Self::handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let status = resp.status();
        if status.is_server_error() {
            return Err(ApiError::RetryLater);
        }
        // 451/452 是极客时间对未登录或风控请求的返回
        if status == StatusCode::UNAUTHORIZED || status.as_u16() == 451 || status.as_u16() == 452 {
            return Err(ApiError::AuthRequired);
        }

        let url = resp.url().to_string();
        let text = resp.text().await?;

        let json_value = match serde_json::from_str::<Value>(&text) {
            Ok(v) => v,
            Err(_) => {
                if text.contains("<!DOCTYPE html>") || text.contains("<html") {
                    return Err(ApiError::HtmlResponse(text));
                }
                return Err(ApiError::InvalidResponse(text));
            }
        };

        if let Some(code) = json_value.get("code").and_then(Value::as_i64) {
            if code != 0 {
                let err = json_value.get("error");
                let err_code = err
                    .and_then(|e| e.get("code"))
                    .and_then(Value::as_i64)
                    .unwrap_or(code);
                let message = err
                    .and_then(|e| e.get("msg"))
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error")
                    .to_string();
                if AUTH_FAILED_CODES.contains(&err_code) {
                    return Err(ApiError::AuthRequired);
                }
                return Err(ApiError::ApiError(err_code, message));
            }
        }

        serde_json::from_value::<T>(json_value).map_err(|e| {
            error!("失败的请求的URL: {}", url);
            error!("JSON 结构匹配失败: {}", e);
            ApiError::InvalidResponse(format!("结构匹配失败: {}", e))
        })
    }
}
