use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 极客时间接口的统一返回结构
#[derive(Debug, Deserialize)]
pub struct GeekResponse<T> {
    pub code: i64,

    pub data: Option<T>,
}

/// 持久化到配置目录、以及交给浏览器渲染使用的 cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

// 章节 ID 有时是字符串有时是数字
pub(crate) fn id_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccessExtra {
    pub sub: Subscription,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Subscription {
    pub access_mask: i64,
}

#[derive(Debug, Deserialize)]
pub struct ColumnInfoData {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub product_type: String,
    #[serde(default)]
    pub extra: AccessExtra,
}

#[derive(Debug, Deserialize)]
pub struct ProductInfoData {
    pub info: ProductInfo,
}

#[derive(Debug, Deserialize)]
pub struct ProductInfo {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub product_type: String,
    #[serde(default)]
    pub extra: AccessExtra,
    #[serde(default)]
    pub article: ProductArticle,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductArticle {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ColumnArticlesData {
    #[serde(default)]
    pub list: Vec<ColumnArticleItem>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnArticleItem {
    pub id: i64,
    pub article_title: String,
    #[serde(default)]
    pub video_time: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ArticleInfoData {
    pub info: ArticleInfo,
}

#[derive(Debug, Deserialize)]
pub struct ArticleInfo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub chapter_id: Value,
    #[serde(default)]
    pub chapter_title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticleData {
    pub article_content: String,
    pub audio_download_url: String,
    pub hls_videos: HashMap<String, HlsVideo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HlsVideo {
    pub url: String,
    pub size: u64,
}

#[derive(Debug, Deserialize)]
pub struct MyClassData {
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<ClassLesson>,
}

#[derive(Debug, Deserialize)]
pub struct ClassLesson {
    #[serde(default)]
    pub chapter_id: Value,
    pub chapter_name: String,
    #[serde(default)]
    pub articles: Vec<ClassArticle>,
}

#[derive(Debug, Deserialize)]
pub struct ClassArticle {
    pub article_id: i64,
    pub article_title: String,
    #[serde(default)]
    pub video_time: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClassArticleData {
    pub video: ClassVideo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClassVideo {
    pub hls_medias: Vec<HlsMedia>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HlsMedia {
    pub quality: String,
    pub url: String,
}
