use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::client::api::CourseApi;
use crate::common::client::models::StoredCookie;
use crate::common::logger::PrettyLogger;
use crate::common::models::{DownloadConfig, Lesson, Product, SourceType};
use crate::common::sanitize::sanitize;
use crate::log_step;

use artifact::{ArtifactKind, needed};
use self::core::{cancellable, ensure_dir, file_exists};
use error::DownloadError;
use fetcher::{Fetchers, RenderRequest, RenderSession, VideoRequest};
use progress::{ConsoleProgress, ProgressSink};
use scanner::{PresenceIndex, scan};
use video::video_file_name;

pub mod artifact;
pub mod audio;
pub mod core;
pub mod error;
pub mod fetcher;
pub mod markdown;
pub mod pdf;
pub mod progress;
pub mod scanner;
pub mod video;

const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);
const DETAIL_KIND: &str = "文章详情";
const VIDEO_KIND: &str = "视频";

/// 下载范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Article(i64),
}

/// 一次下载的结果，遇到第一个错误就停止
#[derive(Debug, Default)]
pub struct RunReport {
    /// 已完成的文章数，包括因为文件都已存在而跳过的
    pub succeeded: usize,
    pub skipped: usize,
    pub error: Option<DownloadError>,
}

impl RunReport {
    pub fn into_result(self) -> Result<usize, DownloadError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.succeeded),
        }
    }
}

/// 按章节、文章顺序逐篇下载，只有单篇文章内部的传输是并发的
pub struct Dispatcher {
    api: Arc<dyn CourseApi>,
    fetchers: Fetchers,
    progress: Arc<dyn ProgressSink>,
    config: DownloadConfig,
    cancel: CancellationToken,
    cookies: Vec<StoredCookie>,
    max_delay: Duration,
}

impl Dispatcher {
    pub fn new(
        api: Arc<dyn CourseApi>,
        fetchers: Fetchers,
        config: DownloadConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            fetchers,
            progress: Arc::new(ConsoleProgress),
            config,
            cancel,
            cookies: Vec::new(),
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// 渲染 PDF 时注入浏览器的站点 cookie
    pub fn with_cookies(mut self, cookies: Vec<StoredCookie>) -> Self {
        self.cookies = cookies;
        self
    }

    /// 批量下载时两篇文章之间的最大随机等待
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// 下载一个已分好章节的课程，`Scope::Article` 只下载其中一篇
    pub async fn run(&self, product: &Product, source: SourceType, scope: Scope) -> RunReport {
        let mut report = RunReport::default();
        if let Err(e) = self.run_inner(product, source, scope, &mut report).await {
            report.error = Some(e);
        }
        report
    }

    async fn run_inner(
        &self,
        product: &Product,
        source: SourceType,
        scope: Scope,
        report: &mut RunReport,
    ) -> Result<(), DownloadError> {
        let project_dir = self.config.project_dir(&product.title);
        ensure_dir(&project_dir).await?;
        let index = scan(&project_dir).await?;

        let lessons = select_lessons(product, scope)?;
        let total = match scope {
            Scope::All => lessons.iter().map(|l| l.articles.len()).sum(),
            Scope::Article(_) => 1,
        };

        if scope == Scope::All {
            log_step!("正在下载《{}》中的所有内容", product.title);
            PrettyLogger::file_info("保存目录", project_dir.display().to_string());
        }

        let walk = Walk {
            lessons: &lessons,
            index: &index,
            project_dir: &project_dir,
            total,
            batch: scope == Scope::All,
        };

        if product.is_text() {
            self.walk_text(&walk, report).await?;
        } else if product.is_video() {
            self.walk_video(&walk, product.id, source, report).await?;
        } else {
            return Err(DownloadError::Unsupported(format!(
                "课程类型 {} 不支持批量下载",
                product.product_type
            )));
        }

        let finished = match (scope, lessons.first().and_then(|l| l.articles.first())) {
            (Scope::Article(_), Some(article)) => article.title.as_str(),
            _ => product.title.as_str(),
        };
        self.progress.finished(finished);
        Ok(())
    }

    async fn walk_text(&self, walk: &Walk<'_>, report: &mut RunReport) -> Result<(), DownloadError> {
        // 浏览器只在确实需要打印 PDF 时才启动，并且无论成功与否都要关闭
        let mut session: Option<Box<dyn RenderSession>> = None;
        let result = self.text_articles(walk, &mut session, report).await;
        if let Some(session) = session {
            if let Err(e) = session.close().await {
                warn!("关闭渲染会话失败: {}", e);
            }
        }
        result
    }

    async fn text_articles(
        &self,
        walk: &Walk<'_>,
        session: &mut Option<Box<dyn RenderSession>>,
        report: &mut RunReport,
    ) -> Result<(), DownloadError> {
        let mut done = 0;
        for lesson in walk.lessons {
            self.progress.lesson(done, walk.total, &lesson.title);
            let dir_name = lesson.dir_name();
            let chapter_dir = walk.project_dir.join(&dir_name);
            ensure_dir(&chapter_dir).await?;

            for article in &lesson.articles {
                self.check_cancelled()?;
                done += 1;
                self.progress.article(done, walk.total, &article.title);

                let title = sanitize(&article.title);
                let work = needed(self.config.output, &dir_name, &title, walk.index);
                if work.is_empty() {
                    debug!("《{}》已下载 {}，跳过", title, self.config.output);
                    report.succeeded += 1;
                    report.skipped += 1;
                    continue;
                }
                debug!("《{}》需要下载 {}", title, work);

                if work.contains(ArtifactKind::Document) {
                    let renderer = match session.take() {
                        Some(s) => s,
                        None => self
                            .fetchers
                            .renderer
                            .open()
                            .await
                            .map_err(|e| DownloadError::transfer(&title, ArtifactKind::Document, e))?,
                    };
                    let request = RenderRequest {
                        article_id: article.id,
                        dir: chapter_dir.clone(),
                        title: title.clone(),
                        cookies: self.cookies.clone(),
                        include_comments: self.config.comments,
                    };
                    let rendered = cancellable(&self.cancel, renderer.render(&request)).await;
                    *session = Some(renderer);
                    rendered.map_err(|e| DownloadError::transfer(&title, ArtifactKind::Document, e))?;
                }

                let want_text = work.contains(ArtifactKind::MarkupText);
                let want_audio = work.contains(ArtifactKind::Audio);
                if want_text || want_audio {
                    let detail = cancellable(&self.cancel, async {
                        self.api
                            .article_detail(article.id)
                            .await
                            .map_err(DownloadError::from)
                    })
                    .await
                    .map_err(|e| DownloadError::transfer(&title, DETAIL_KIND, e))?;

                    let text = async {
                        if !want_text {
                            return Ok(());
                        }
                        self.fetchers
                            .text
                            .fetch(
                                &self.cancel,
                                &detail.content,
                                &title,
                                &chapter_dir,
                                article.id,
                                self.config.concurrency,
                            )
                            .await
                            .map_err(|e| DownloadError::transfer(&title, ArtifactKind::MarkupText, e))
                    };
                    let audio = async {
                        if !want_audio {
                            return Ok(());
                        }
                        self.fetchers
                            .audio
                            .fetch(&self.cancel, &detail.audio_url, &chapter_dir, &title)
                            .await
                            .map_err(|e| DownloadError::transfer(&title, ArtifactKind::Audio, e))
                    };
                    tokio::try_join!(text, audio)?;
                }

                report.succeeded += 1;
                if walk.batch && done < walk.total {
                    self.pause().await?;
                }
            }
        }
        Ok(())
    }

    async fn walk_video(
        &self,
        walk: &Walk<'_>,
        product_id: i64,
        source: SourceType,
        report: &mut RunReport,
    ) -> Result<(), DownloadError> {
        let mut done = 0;
        for lesson in walk.lessons {
            self.progress.lesson(done, walk.total, &lesson.title);
            let dir_name = lesson.dir_name();
            let chapter_dir = walk.project_dir.join(&dir_name);
            ensure_dir(&chapter_dir).await?;

            for article in &lesson.articles {
                self.check_cancelled()?;
                done += 1;
                self.progress.article(done, walk.total, &article.title);

                let title = sanitize(&article.title);
                if walk.index.contains(&dir_name, &video_file_name(&title)) {
                    report.succeeded += 1;
                    report.skipped += 1;
                    continue;
                }
                // 训练营里的非视频条目
                if source == SourceType::University && !article.has_video() {
                    debug!("《{}》没有视频，跳过", title);
                    report.succeeded += 1;
                    report.skipped += 1;
                    continue;
                }

                let request = VideoRequest {
                    article_id: article.id,
                    source,
                    product_id,
                    title: title.clone(),
                };
                self.fetchers
                    .video
                    .fetch(
                        &self.cancel,
                        &request,
                        &chapter_dir,
                        self.config.quality,
                        self.config.concurrency,
                    )
                    .await
                    .map_err(|e| DownloadError::transfer(&title, VIDEO_KIND, e))?;
                report.succeeded += 1;
            }
        }
        Ok(())
    }

    /// 每日一课、大厂案例：产品只包含一个视频，直接保存到课程目录
    pub async fn download_product_video(
        &self,
        product: &Product,
        source: SourceType,
    ) -> Result<PathBuf, DownloadError> {
        let article_id = product.single_article_id.ok_or_else(|| {
            DownloadError::Unsupported(format!("《{}》没有关联的视频", product.title))
        })?;
        self.check_cancelled()?;

        let project_dir = self.config.project_dir(&product.title);
        ensure_dir(&project_dir).await?;
        let title = sanitize(&product.title);
        let dest = project_dir.join(video_file_name(&title));
        if file_exists(&dest).await? {
            info!("{} 已存在，跳过", dest.display());
            return Ok(dest);
        }

        let request = VideoRequest {
            article_id,
            source,
            product_id: product.id,
            title: title.clone(),
        };
        self.fetchers
            .video
            .fetch(
                &self.cancel,
                &request,
                &project_dir,
                self.config.quality,
                self.config.concurrency,
            )
            .await
            .map_err(|e| DownloadError::transfer(&title, VIDEO_KIND, e))?;
        Ok(dest)
    }

    fn check_cancelled(&self) -> Result<(), DownloadError> {
        if self.cancel.is_cancelled() {
            Err(DownloadError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn pause(&self) -> Result<(), DownloadError> {
        let max = self.max_delay.as_millis() as u64;
        if max == 0 {
            return Ok(());
        }
        let millis = rand::rng().random_range(0..=max);
        cancellable(&self.cancel, async {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok::<(), DownloadError>(())
        })
        .await
    }
}

struct Walk<'a> {
    lessons: &'a [Lesson],
    index: &'a PresenceIndex,
    project_dir: &'a Path,
    total: usize,
    batch: bool,
}

/// 下载范围内的章节；单篇下载时只保留所在章节中的这一篇，章节序号不变
fn select_lessons(product: &Product, scope: Scope) -> Result<Vec<Lesson>, DownloadError> {
    match scope {
        Scope::All => Ok(product.lessons.clone()),
        Scope::Article(id) => {
            let lesson = product.lesson_of(id).ok_or_else(|| {
                DownloadError::Unsupported(format!("文章 {} 不在《{}》中", id, product.title))
            })?;
            Ok(vec![Lesson {
                articles: lesson.articles.iter().filter(|a| a.id == id).cloned().collect(),
                ..lesson.clone()
            }])
        }
    }
}
