use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::common::client::api::CourseApi;
use crate::common::client::error::ApiError;
use crate::common::models::{Product, SourceType};
use crate::downloader::progress::spinner;

pub mod grouping;

pub use grouping::LessonGrouper;

/// 课程层级加载，导航和下载只通过这个 trait 拿到分好章节的课程
#[async_trait]
pub trait HierarchyLoader: Send + Sync {
    /// 按课程类别查询课程基本信息，不校验类型和购买状态
    async fn load(&self, source: SourceType, product_id: i64) -> Result<Product, ApiError>;

    /// 补齐章节分组，已经分好组的课程直接返回
    async fn ensure_grouped(&self, product: &mut Product) -> Result<(), ApiError>;
}

pub struct CatalogLoader {
    api: Arc<dyn CourseApi>,
}

impl CatalogLoader {
    pub fn new(api: Arc<dyn CourseApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl HierarchyLoader for CatalogLoader {
    async fn load(&self, source: SourceType, product_id: i64) -> Result<Product, ApiError> {
        let pb = spinner("[ 正在加载课程信息... ]");
        let result = match source {
            SourceType::Normal => self.api.column_info(product_id).await,
            SourceType::University => self.api.university_product(product_id).await,
            SourceType::DailyLesson | SourceType::QconPlus => {
                self.api.product_info(product_id).await
            }
        };
        pb.finish_and_clear();

        let product = result?;
        info!(
            "加载课程 {} 《{}》 类型 {} 已购买 {}",
            product.id, product.title, product.product_type, product.access
        );
        Ok(product)
    }

    async fn ensure_grouped(&self, product: &mut Product) -> Result<(), ApiError> {
        if product.is_grouped() {
            return Ok(());
        }

        let pb = spinner("[ 正在加载文章列表... ]");
        let result = async {
            if product.articles.is_empty() {
                product.articles = self.api.column_articles(product.id).await?;
            }
            product.total = product.articles.len();

            let mut grouper = LessonGrouper::new();
            for article in &product.articles {
                let chapter = self.api.article_chapter(article.id).await?;
                debug!(
                    "文章 {} 属于章节 {} {}",
                    chapter.article_id, chapter.chapter_id, chapter.chapter_title
                );
                grouper.push(
                    &chapter.chapter_id,
                    &chapter.chapter_title,
                    chapter.article_id,
                    &chapter.title,
                    article.video_time,
                );
            }
            Ok::<_, ApiError>(grouper.finish())
        }
        .await;
        pb.finish_and_clear();

        product.lessons = result?;
        info!("《{}》共 {} 个章节", product.title, product.lessons.len());
        Ok(())
    }
}
