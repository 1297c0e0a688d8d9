//! 用无头 Chromium 把文章页面打印成 PDF

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::artifact::ArtifactKind;
use super::core::write_atomic;
use super::error::DownloadError;
use super::fetcher::{PageRenderer, RenderRequest, RenderSession};
use crate::common::client::models::StoredCookie;

const ARTICLE_URL: &str = "https://time.geekbang.org/column/article";
const CHROME_PATH_ENV: &str = "GEEKTIME_CHROME_PATH";

// 页面里评论区的节点，不需要评论时打印前移除
const REMOVE_COMMENTS_JS: &str = r#"
document.querySelectorAll('[class*="comment"], [class*="Comment"]').forEach(el => el.remove());
true
"#;

// 等待正文中的图片懒加载
const SCROLL_JS: &str = r#"
window.scrollTo(0, document.body.scrollHeight);
true
"#;

fn render_error(context: &str, e: impl std::fmt::Display) -> DownloadError {
    DownloadError::Render(format!("{}: {}", context, e))
}

/// 每次 `open` 启动一个新的浏览器进程
pub struct ChromiumRenderer {
    executable: Option<PathBuf>,
}

impl ChromiumRenderer {
    pub fn new() -> Self {
        Self {
            executable: std::env::var_os(CHROME_PATH_ENV).map(PathBuf::from),
        }
    }
}

impl Default for ChromiumRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn open(&self) -> Result<Box<dyn RenderSession>, DownloadError> {
        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| render_error("浏览器配置错误", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| render_error("启动 Chromium 失败", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("浏览器事件错误: {}", e);
                }
            }
        });

        info!("Chromium 已启动");
        Ok(Box::new(ChromiumSession { browser, handler }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    async fn print(&self, page: &Page, request: &RenderRequest) -> Result<Vec<u8>, DownloadError> {
        page.set_cookies(cookie_params(&request.cookies)?)
            .await
            .map_err(|e| render_error("设置 cookie 失败", e))?;

        let url = format!("{}/{}", ARTICLE_URL, request.article_id);
        page.goto(url.as_str())
            .await
            .map_err(|e| render_error("打开文章页面失败", e))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| render_error("等待页面加载失败", e))?;

        page.evaluate(SCROLL_JS)
            .await
            .map_err(|e| render_error("滚动页面失败", e))?;
        tokio::time::sleep(Duration::from_secs(1)).await;

        if !request.include_comments {
            page.evaluate(REMOVE_COMMENTS_JS)
                .await
                .map_err(|e| render_error("移除评论失败", e))?;
        }

        let params = PrintToPdfParams {
            print_background: Some(true),
            ..Default::default()
        };
        page.pdf(params)
            .await
            .map_err(|e| render_error("打印 PDF 失败", e))
    }
}

fn cookie_params(cookies: &[StoredCookie]) -> Result<Vec<CookieParam>, DownloadError> {
    cookies
        .iter()
        .map(|c| {
            CookieParam::builder()
                .name(c.name.clone())
                .value(c.value.clone())
                .domain(c.domain.clone())
                .path("/")
                .build()
                .map_err(|e| render_error("cookie 格式错误", e))
        })
        .collect()
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn render(&self, request: &RenderRequest) -> Result<(), DownloadError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| render_error("创建页面失败", e))?;

        let printed = self.print(&page, request).await;
        if let Err(e) = page.close().await {
            warn!("关闭页面失败: {}", e);
        }

        let pdf = printed?;
        let dest = request
            .dir
            .join(ArtifactKind::Document.file_name(&request.title));
        write_atomic(&dest, &pdf).await
    }

    async fn close(self: Box<Self>) -> Result<(), DownloadError> {
        let ChromiumSession {
            mut browser,
            handler,
        } = *self;

        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            warn!("等待 Chromium 退出失败: {}", e);
        }
        handler.abort();
        closed.map_err(|e| render_error("关闭 Chromium 失败", e))?;
        info!("Chromium 已关闭");
        Ok(())
    }
}
