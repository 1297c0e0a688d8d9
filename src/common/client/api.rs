use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;

use crate::common::client::client::GeekClient;
use crate::common::client::error::ApiError;
use crate::common::client::models::{
    ArticleData, ArticleInfoData, ClassArticleData, ColumnArticlesData, ColumnInfoData,
    GeekResponse, MyClassData, ProductInfoData, id_to_string,
};
use crate::common::models::{
    Article, ArticleChapter, ArticleDetail, ArticleRef, Lesson, Product, ProductType, Quality,
};

const AUTH_PATH: &str = "serv/v1/user/auth";
const LOGIN_PATH: &str = "account/ticket/login";
const COLUMN_INFO_PATH: &str = "serv/v3/column/info";
const PRODUCT_INFO_PATH: &str = "serv/v3/product/info";
const COLUMN_ARTICLES_PATH: &str = "serv/v1/column/articles";
const ARTICLE_INFO_PATH: &str = "serv/v3/article/info";
const ARTICLE_PATH: &str = "serv/v1/article";
const MY_CLASS_INFO_PATH: &str = "serv/v1/myclass/info";
const MY_CLASS_ARTICLE_PATH: &str = "serv/v1/myclass/article";

/// 远程元数据接口，编排层只依赖这个 trait
#[async_trait]
pub trait CourseApi: Send + Sync {
    /// 校验当前 cookie 是否有效
    async fn auth(&self) -> Result<(), ApiError>;

    /// 专栏、视频课基本信息
    async fn column_info(&self, product_id: i64) -> Result<Product, ApiError>;

    /// 每日一课、大厂案例等产品信息
    async fn product_info(&self, product_id: i64) -> Result<Product, ApiError>;

    /// 训练营课程，接口直接返回按章节组织好的文章
    async fn university_product(&self, class_id: i64) -> Result<Product, ApiError>;

    /// 没有按章节组织的文章列表
    async fn column_articles(&self, product_id: i64) -> Result<Vec<ArticleRef>, ApiError>;

    /// 单篇文章所属章节
    async fn article_chapter(&self, article_id: i64) -> Result<ArticleChapter, ApiError>;

    /// 文章正文和音频地址
    async fn article_detail(&self, article_id: i64) -> Result<ArticleDetail, ApiError>;
}

fn required<T>(resp: GeekResponse<T>, what: &str) -> Result<T, ApiError> {
    resp.data
        .ok_or_else(|| ApiError::InvalidResponse(format!("API响应中未找到{}", what)))
}

impl GeekClient {
    /// 手机号密码登录，成功后 cookie 保存在客户端的 cookie store 中
    pub async fn login(&self, phone: &str, password: &str) -> Result<(), ApiError> {
        let url = self.endpoints().account.join(LOGIN_PATH)?;
        let body = json!({
            "country": 86,
            "cellphone": phone,
            "password": password,
            "captcha": "",
            "remember": 1,
            "platform": 3,
            "appid": 1,
            "source": "",
        });
        let _: Value = self.post_json(url, &body).await?;
        Ok(())
    }

    /// 普通视频课文章指定清晰度的 m3u8 地址
    pub async fn article_video_url(
        &self,
        article_id: i64,
        quality: Quality,
    ) -> Result<Option<String>, ApiError> {
        let data = self.article_data(article_id).await?;
        Ok(data
            .hls_videos
            .get(quality.as_str())
            .map(|v| v.url.clone())
            .filter(|u| !u.is_empty()))
    }

    /// 训练营文章指定清晰度的 m3u8 地址
    pub async fn university_video_url(
        &self,
        class_id: i64,
        article_id: i64,
        quality: Quality,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoints().university.join(MY_CLASS_ARTICLE_PATH)?;
        let resp: GeekResponse<ClassArticleData> = self
            .post_json(url, &json!({ "class_id": class_id, "article_id": article_id }))
            .await?;
        let data = required(resp, "训练营文章")?;
        Ok(data
            .video
            .hls_medias
            .into_iter()
            .find(|m| m.quality == quality.as_str())
            .map(|m| m.url)
            .filter(|u| !u.is_empty()))
    }

    async fn article_data(&self, article_id: i64) -> Result<ArticleData, ApiError> {
        let url = self.endpoints().time.join(ARTICLE_PATH)?;
        let resp: GeekResponse<ArticleData> = self
            .post_json(
                url,
                &json!({ "id": article_id.to_string(), "include_neighbors": true, "is_freelyread": true }),
            )
            .await?;
        required(resp, "文章详情")
    }
}

#[async_trait]
impl CourseApi for GeekClient {
    async fn auth(&self) -> Result<(), ApiError> {
        let mut url = self.endpoints().account.join(AUTH_PATH)?;
        url.query_pairs_mut()
            .append_pair("t", &Utc::now().timestamp_millis().to_string());
        let _: Value = self.get(url).await?;
        Ok(())
    }

    async fn column_info(&self, product_id: i64) -> Result<Product, ApiError> {
        let url = self.endpoints().time.join(COLUMN_INFO_PATH)?;
        let resp: GeekResponse<ColumnInfoData> = self
            .post_json(
                url,
                &json!({ "product_id": product_id, "with_recommend_article": true }),
            )
            .await?;
        let data = required(resp, "课程信息")?;
        debug!("column_info: {} {} {}", data.id, data.title, data.product_type);

        Ok(Product::new(
            data.id,
            data.title,
            ProductType::from_code(&data.product_type),
            data.extra.sub.access_mask > 0,
        ))
    }

    async fn product_info(&self, product_id: i64) -> Result<Product, ApiError> {
        let url = self.endpoints().time.join(PRODUCT_INFO_PATH)?;
        let resp: GeekResponse<ProductInfoData> =
            self.post_json(url, &json!({ "id": product_id })).await?;
        let info = required(resp, "产品信息")?.info;

        let mut product = Product::new(
            info.id,
            info.title,
            ProductType::from_code(&info.product_type),
            info.extra.sub.access_mask > 0,
        );
        product.single_article_id = (info.article.id > 0).then_some(info.article.id);
        Ok(product)
    }

    async fn university_product(&self, class_id: i64) -> Result<Product, ApiError> {
        let url = self.endpoints().university.join(MY_CLASS_INFO_PATH)?;
        let resp: GeekResponse<MyClassData> =
            self.post_json(url, &json!({ "class_id": class_id })).await?;
        // 无效的训练营 ID 不会报错，data 为空视为没有权限
        let Some(data) = resp.data else {
            return Ok(Product::new(
                class_id,
                String::new(),
                ProductType::UniversityVideo,
                false,
            ));
        };

        let mut product = Product::new(class_id, data.title, ProductType::UniversityVideo, true);
        for (i, lesson) in data.lessons.into_iter().enumerate() {
            let articles: Vec<Article> = lesson
                .articles
                .into_iter()
                .enumerate()
                .map(|(j, a)| Article {
                    id: a.article_id,
                    title: a.article_title,
                    index: j + 1,
                    video_time: Some(a.video_time),
                })
                .collect();
            product.articles.extend(articles.iter().map(|a| ArticleRef {
                id: a.id,
                title: a.title.clone(),
                video_time: a.video_time,
            }));
            product.lessons.push(Lesson {
                chapter_id: id_to_string(&lesson.chapter_id),
                title: lesson.chapter_name,
                index: i + 1,
                articles,
            });
        }
        product.total = product.articles.len();
        Ok(product)
    }

    async fn column_articles(&self, product_id: i64) -> Result<Vec<ArticleRef>, ApiError> {
        let url = self.endpoints().time.join(COLUMN_ARTICLES_PATH)?;
        let resp: GeekResponse<ColumnArticlesData> = self
            .post_json(
                url,
                &json!({
                    "cid": product_id.to_string(),
                    "size": 500,
                    "prev": 0,
                    "order": "earliest",
                    "sample": false,
                }),
            )
            .await?;
        Ok(required(resp, "文章列表")?
            .list
            .into_iter()
            .map(|item| ArticleRef {
                id: item.id,
                title: item.article_title,
                video_time: item.video_time,
            })
            .collect())
    }

    async fn article_chapter(&self, article_id: i64) -> Result<ArticleChapter, ApiError> {
        let url = self.endpoints().time.join(ARTICLE_INFO_PATH)?;
        let resp: GeekResponse<ArticleInfoData> =
            self.post_json(url, &json!({ "id": article_id })).await?;
        let info = required(resp, "文章信息")?.info;
        Ok(ArticleChapter {
            article_id: info.id,
            title: info.title,
            chapter_id: id_to_string(&info.chapter_id),
            chapter_title: info.chapter_title,
        })
    }

    async fn article_detail(&self, article_id: i64) -> Result<ArticleDetail, ApiError> {
        let data = self.article_data(article_id).await?;
        Ok(ArticleDetail {
            content: data.article_content,
            audio_url: data.audio_download_url,
        })
    }
}
