use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;

use crate::common::sanitize::sanitize;
use crate::downloader::artifact::ArtifactSet;

// -----------------------------------------------------------------------------------------------

/// 极客时间返回的产品类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductType {
    /// 专栏
    Column,
    /// 视频课
    NormalVideo,
    /// 另一种视频课, 例如 https://time.geekbang.org/course/intro/100102901
    C6Video,
    /// 每日一课
    DailyLesson,
    /// 大厂案例
    QconPlus,
    /// 训练营视频，接口里没有这个类型，是自定义的
    UniversityVideo,
    /// 公开课, 例如 https://time.geekbang.org/opencourse/intro/100064201
    P29,
    /// 其他不支持的类型，保留原始代码
    Other(String),
}

impl ProductType {
    pub fn code(&self) -> &str {
        match self {
            ProductType::Column => "c1",
            ProductType::NormalVideo => "c3",
            ProductType::C6Video => "c6",
            ProductType::DailyLesson => "d",
            ProductType::QconPlus => "q",
            ProductType::UniversityVideo => "u",
            ProductType::P29 => "p29",
            ProductType::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "c1" => ProductType::Column,
            "c3" => ProductType::NormalVideo,
            "c6" => ProductType::C6Video,
            "d" => ProductType::DailyLesson,
            "q" => ProductType::QconPlus,
            "u" => ProductType::UniversityVideo,
            "p29" => ProductType::P29,
            other => ProductType::Other(other.to_string()),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ProductType::Column | ProductType::P29)
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            ProductType::NormalVideo | ProductType::UniversityVideo | ProductType::C6Video
        )
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// -----------------------------------------------------------------------------------------------

/// 用户在菜单里选择的课程类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Normal = 1,
    DailyLesson = 2,
    QconPlus = 4,
    University = 5,
}

impl SourceType {
    pub const ALL: [SourceType; 4] = [
        SourceType::Normal,
        SourceType::DailyLesson,
        SourceType::QconPlus,
        SourceType::University,
    ];

    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceType::Normal => "普通课程",
            SourceType::DailyLesson => "每日一课",
            SourceType::QconPlus => "大厂案例",
            SourceType::University => "训练营",
        }
    }

    /// 每日一课和大厂案例输入的是产品 ID，直接下载其中唯一的视频
    pub fn is_direct_video(self) -> bool {
        matches!(self, SourceType::DailyLesson | SourceType::QconPlus)
    }

    /// 产品类型与所选类别是否匹配
    pub fn accepts(self, product_type: &ProductType) -> bool {
        match self {
            SourceType::Normal => matches!(
                product_type,
                ProductType::Column
                    | ProductType::NormalVideo
                    | ProductType::C6Video
                    | ProductType::P29
            ),
            SourceType::DailyLesson => *product_type == ProductType::DailyLesson,
            SourceType::QconPlus => *product_type == ProductType::QconPlus,
            // 训练营不校验类型，ID 无效时 access 为 false
            SourceType::University => true,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// -----------------------------------------------------------------------------------------------

/// 文章列表接口返回的条目，还没有按章节分组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRef {
    pub id: i64,
    pub title: String,
    pub video_time: Option<u64>,
}

/// 单篇文章所属章节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleChapter {
    pub article_id: i64,
    pub title: String,
    pub chapter_id: String,
    pub chapter_title: String,
}

/// 下载 Markdown 和音频需要的文章详情
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleDetail {
    pub content: String,
    pub audio_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    /// 章节内从 1 开始的序号
    pub index: usize,
    pub video_time: Option<u64>,
}

impl Article {
    pub fn has_video(&self) -> bool {
        self.video_time.is_some_and(|t| t > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub chapter_id: String,
    pub title: String,
    /// 从 1 开始，分组时分配，整个会话内不变
    pub index: usize,
    pub articles: Vec<Article>,
}

impl Lesson {
    /// 章节目录名，形如 `1.开篇词`
    pub fn dir_name(&self) -> String {
        sanitize(&format!("{}.{}", self.index, self.title))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub product_type: ProductType,
    pub access: bool,
    pub lessons: Vec<Lesson>,
    pub articles: Vec<ArticleRef>,
    pub total: usize,
    /// 每日一课/大厂案例对应的视频文章
    pub single_article_id: Option<i64>,
}

impl Product {
    pub fn new(id: i64, title: impl Into<String>, product_type: ProductType, access: bool) -> Self {
        Self {
            id,
            title: title.into(),
            product_type,
            access,
            lessons: Vec::new(),
            articles: Vec::new(),
            total: 0,
            single_article_id: None,
        }
    }

    pub fn is_grouped(&self) -> bool {
        !self.lessons.is_empty()
    }

    pub fn is_text(&self) -> bool {
        self.product_type.is_text()
    }

    pub fn is_video(&self) -> bool {
        self.product_type.is_video()
    }

    pub fn lesson_of(&self, article_id: i64) -> Option<&Lesson> {
        self.lessons
            .iter()
            .find(|lesson| lesson.articles.iter().any(|a| a.id == article_id))
    }

    /// 按章节顺序展开的文章
    pub fn grouped_articles(&self) -> impl Iterator<Item = &Article> {
        self.lessons.iter().flat_map(|lesson| lesson.articles.iter())
    }
}

// -----------------------------------------------------------------------------------------------

/// 视频清晰度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Quality {
    /// 标清
    Ld,
    /// 高清
    #[default]
    Sd,
    /// 超清
    Hd,
}

impl Quality {
    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Ld => "ld",
            Quality::Sd => "sd",
            Quality::Hd => "hd",
        }
    }
}

/// 一次运行的下载配置，由命令行参数得到
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub download_folder: PathBuf,
    /// 下载目录下的账号子目录，cookie 登录时为 gcid，否则为手机号
    pub account_key: String,
    pub quality: Quality,
    pub output: ArtifactSet,
    pub comments: bool,
    pub concurrency: usize,
}

impl DownloadConfig {
    pub fn default_concurrency() -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cpus.div_ceil(2)
    }

    pub fn project_dir(&self, product_title: &str) -> PathBuf {
        self.download_folder
            .join(&self.account_key)
            .join(sanitize(product_title))
    }
}
