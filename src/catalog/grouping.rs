use crate::common::models::{Article, Lesson};

/// 按章节 ID 变化把扁平的文章列表切成章节。
///
/// 文章列表接口不返回章节名，也没有单独查询章节的接口，所以逐篇查询文章详情拿到
/// 章节信息，章节 ID 与上一篇不同就开启新章节。前提是接口返回的文章按章节连续排列；
/// 如果同一章节的文章被打散，会被拆成多个同名章节。
#[derive(Debug, Default)]
pub struct LessonGrouper {
    lessons: Vec<Lesson>,
}

impl LessonGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        chapter_id: &str,
        chapter_title: &str,
        article_id: i64,
        title: &str,
        video_time: Option<u64>,
    ) {
        let opens_new = self
            .lessons
            .last()
            .is_none_or(|lesson| lesson.chapter_id != chapter_id);
        if opens_new {
            self.lessons.push(Lesson {
                chapter_id: chapter_id.to_string(),
                title: chapter_title.to_string(),
                index: self.lessons.len() + 1,
                articles: Vec::new(),
            });
        }

        if let Some(lesson) = self.lessons.last_mut() {
            let index = lesson.articles.len() + 1;
            lesson.articles.push(Article {
                id: article_id,
                title: title.to_string(),
                index,
                video_time,
            });
        }
    }

    pub fn finish(self) -> Vec<Lesson> {
        self.lessons
    }
}
