#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use geektime_downloader::common::client::api::CourseApi;
use geektime_downloader::common::client::error::ApiError;
use geektime_downloader::common::models::{
    Article, ArticleChapter, ArticleDetail, ArticleRef, DownloadConfig, Lesson, Product,
    ProductType, Quality,
};
use geektime_downloader::downloader::Dispatcher;
use geektime_downloader::downloader::artifact::ArtifactSet;
use geektime_downloader::downloader::error::DownloadError;
use geektime_downloader::downloader::fetcher::{
    AudioFetcher, Fetchers, PageRenderer, RenderRequest, RenderSession, TextFetcher,
    VideoFetcher, VideoRequest,
};
use geektime_downloader::downloader::progress::SilentProgress;

pub const ACCOUNT: &str = "tester";

/// 按调用顺序记录的外部调用
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

pub struct FakeApi {
    pub log: CallLog,
    pub product: Product,
    pub refs: Vec<ArticleRef>,
    pub chapters: Vec<ArticleChapter>,
}

impl FakeApi {
    pub fn new(log: CallLog, product: Product) -> Self {
        Self {
            log,
            product,
            refs: Vec::new(),
            chapters: Vec::new(),
        }
    }
}

#[async_trait]
impl CourseApi for FakeApi {
    async fn auth(&self) -> Result<(), ApiError> {
        Ok(())
    }

    async fn column_info(&self, product_id: i64) -> Result<Product, ApiError> {
        self.log.push(format!("column_info:{product_id}"));
        Ok(self.product.clone())
    }

    async fn product_info(&self, product_id: i64) -> Result<Product, ApiError> {
        self.log.push(format!("product_info:{product_id}"));
        Ok(self.product.clone())
    }

    async fn university_product(&self, class_id: i64) -> Result<Product, ApiError> {
        self.log.push(format!("university_product:{class_id}"));
        Ok(self.product.clone())
    }

    async fn column_articles(&self, _product_id: i64) -> Result<Vec<ArticleRef>, ApiError> {
        self.log.push("column_articles");
        Ok(self.refs.clone())
    }

    async fn article_chapter(&self, article_id: i64) -> Result<ArticleChapter, ApiError> {
        self.log.push(format!("chapter:{article_id}"));
        self.chapters
            .iter()
            .find(|c| c.article_id == article_id)
            .cloned()
            .ok_or_else(|| ApiError::InvalidResponse(format!("no chapter for {article_id}")))
    }

    async fn article_detail(&self, article_id: i64) -> Result<ArticleDetail, ApiError> {
        self.log.push(format!("detail:{article_id}"));
        Ok(ArticleDetail {
            content: format!("<p>正文 {article_id}</p>"),
            audio_url: format!("https://static001.geekbang.org/{article_id}.mp3"),
        })
    }
}

/// `fail_on` 指定的文章渲染失败
pub struct FakeRenderer {
    pub log: CallLog,
    pub fail_on: Option<i64>,
}

pub struct FakeSession {
    log: CallLog,
    fail_on: Option<i64>,
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn open(&self) -> Result<Box<dyn RenderSession>, DownloadError> {
        self.log.push("open");
        Ok(Box::new(FakeSession {
            log: self.log.clone(),
            fail_on: self.fail_on,
        }))
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn render(&self, request: &RenderRequest) -> Result<(), DownloadError> {
        self.log.push(format!("render:{}", request.article_id));
        if self.fail_on == Some(request.article_id) {
            return Err(DownloadError::Render("页面加载超时".to_string()));
        }
        std::fs::write(request.dir.join(format!("{}.pdf", request.title)), b"%PDF")?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DownloadError> {
        self.log.push("close");
        Ok(())
    }
}

/// 写完文件后可以选择触发取消，`fail_on` 指定的文章直接失败
pub struct FakeText {
    pub log: CallLog,
    pub cancel_after: Option<(i64, CancellationToken)>,
    pub fail_on: Option<i64>,
}

#[async_trait]
impl TextFetcher for FakeText {
    async fn fetch(
        &self,
        _cancel: &CancellationToken,
        body: &str,
        title: &str,
        dir: &Path,
        article_id: i64,
        _concurrency: usize,
    ) -> Result<(), DownloadError> {
        self.log.push(format!("text:{article_id}"));
        if self.fail_on == Some(article_id) {
            return Err(DownloadError::Status {
                status: 404,
                url: format!("https://static001.geekbang.org/{article_id}.png"),
            });
        }
        std::fs::write(dir.join(format!("{title}.md")), body)?;
        if let Some((id, token)) = &self.cancel_after {
            if *id == article_id {
                token.cancel();
            }
        }
        Ok(())
    }
}

pub struct FakeAudio {
    pub log: CallLog,
}

#[async_trait]
impl AudioFetcher for FakeAudio {
    async fn fetch(
        &self,
        _cancel: &CancellationToken,
        url: &str,
        dir: &Path,
        title: &str,
    ) -> Result<(), DownloadError> {
        self.log.push(format!("audio:{url}"));
        std::fs::write(dir.join(format!("{title}.mp3")), b"ID3")?;
        Ok(())
    }
}

pub struct FakeVideo {
    pub log: CallLog,
}

#[async_trait]
impl VideoFetcher for FakeVideo {
    async fn fetch(
        &self,
        _cancel: &CancellationToken,
        request: &VideoRequest,
        dir: &Path,
        _quality: Quality,
        _concurrency: usize,
    ) -> Result<(), DownloadError> {
        self.log.push(format!("video:{}", request.article_id));
        std::fs::write(dir.join(format!("{}.ts", request.title)), b"ts")?;
        Ok(())
    }
}

pub fn fetchers(log: &CallLog, cancel_after: Option<(i64, CancellationToken)>) -> Fetchers {
    let mut fetchers = failing_fetchers(log, None, None);
    fetchers.text = Arc::new(FakeText {
        log: log.clone(),
        cancel_after,
        fail_on: None,
    });
    fetchers
}

/// 渲染或正文下载在指定文章上失败
pub fn failing_fetchers(log: &CallLog, render_fail: Option<i64>, text_fail: Option<i64>) -> Fetchers {
    Fetchers {
        renderer: Arc::new(FakeRenderer {
            log: log.clone(),
            fail_on: render_fail,
        }),
        text: Arc::new(FakeText {
            log: log.clone(),
            cancel_after: None,
            fail_on: text_fail,
        }),
        audio: Arc::new(FakeAudio { log: log.clone() }),
        video: Arc::new(FakeVideo { log: log.clone() }),
    }
}

pub fn config(root: &Path, output: ArtifactSet) -> DownloadConfig {
    DownloadConfig {
        download_folder: root.to_path_buf(),
        account_key: ACCOUNT.to_string(),
        quality: Quality::Sd,
        output,
        comments: true,
        concurrency: 2,
    }
}

pub fn dispatcher(
    api: Arc<dyn CourseApi>,
    fetchers: Fetchers,
    config: DownloadConfig,
    cancel: CancellationToken,
) -> Dispatcher {
    Dispatcher::new(api, fetchers, config, cancel)
        .with_progress(Arc::new(SilentProgress))
        .with_max_delay(Duration::ZERO)
}

pub fn article(id: i64, title: &str, index: usize) -> Article {
    Article {
        id,
        title: title.to_string(),
        index,
        video_time: None,
    }
}

pub fn lesson(index: usize, title: &str, articles: Vec<Article>) -> Lesson {
    Lesson {
        chapter_id: index.to_string(),
        title: title.to_string(),
        index,
        articles,
    }
}

/// 一个已分好章节的专栏
pub fn column(lessons: Vec<Lesson>) -> Product {
    let mut product = Product::new(100, "测试专栏", ProductType::Column, true);
    product.total = lessons.iter().map(|l| l.articles.len()).sum();
    product.lessons = lessons;
    product
}

pub fn project_dir(root: &Path, title: &str) -> PathBuf {
    root.join(ACCOUNT).join(title)
}
