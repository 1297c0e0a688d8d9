mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use geektime_downloader::common::models::{ProductType, SourceType};
use geektime_downloader::downloader::Scope;
use geektime_downloader::downloader::artifact::{ArtifactKind, ArtifactSet};
use geektime_downloader::downloader::error::DownloadError;
use geektime_downloader::downloader::scanner::scan;

use common::*;

const CHAPTER: &str = "1.开篇词";

#[tokio::test]
async fn empty_tree_downloads_every_format_in_order() {
    let root = tempfile::tempdir().unwrap();
    let log = CallLog::default();
    let product = column(vec![lesson(1, "开篇词", vec![article(11, "01 你好", 1)])]);
    let api = Arc::new(FakeApi::new(log.clone(), product.clone()));
    let cancel = CancellationToken::new();
    let dispatcher = dispatcher(
        api,
        fetchers(&log, None),
        config(root.path(), ArtifactSet::ALL),
        cancel,
    );

    let report = dispatcher.run(&product, SourceType::Normal, Scope::All).await;

    assert!(report.error.is_none(), "{:?}", report.error);
    assert_eq!(report.succeeded, 1);
    assert_eq!(
        log.calls(),
        vec![
            "open",
            "render:11",
            "detail:11",
            "text:11",
            "audio:https://static001.geekbang.org/11.mp3",
            "close",
        ]
    );

    let chapter = project_dir(root.path(), "测试专栏").join(CHAPTER);
    for ext in ["pdf", "md", "mp3"] {
        assert!(chapter.join(format!("01 你好.{ext}")).is_file(), "missing .{ext}");
    }
}

#[tokio::test]
async fn existing_pdf_is_not_rendered_again() {
    let root = tempfile::tempdir().unwrap();
    let chapter = project_dir(root.path(), "测试专栏").join(CHAPTER);
    std::fs::create_dir_all(&chapter).unwrap();
    std::fs::write(chapter.join("01 你好.pdf"), b"%PDF").unwrap();

    let log = CallLog::default();
    let product = column(vec![lesson(1, "开篇词", vec![article(11, "01 你好", 1)])]);
    let api = Arc::new(FakeApi::new(log.clone(), product.clone()));
    let dispatcher = dispatcher(
        api,
        fetchers(&log, None),
        config(root.path(), ArtifactSet::ALL),
        CancellationToken::new(),
    );

    let report = dispatcher.run(&product, SourceType::Normal, Scope::All).await;

    assert_eq!(report.into_result().unwrap(), 1);
    assert_eq!(log.count("open"), 0);
    assert_eq!(log.count("render"), 0);
    assert_eq!(log.count("detail"), 1);
    assert_eq!(log.count("text"), 1);
    assert_eq!(log.count("audio"), 1);
}

#[tokio::test]
async fn fully_present_chapter_makes_no_calls() {
    let root = tempfile::tempdir().unwrap();
    let chapter = project_dir(root.path(), "测试专栏").join(CHAPTER);
    std::fs::create_dir_all(&chapter).unwrap();
    for title in ["01 你好", "02 再见"] {
        for ext in ["pdf", "md", "mp3"] {
            std::fs::write(chapter.join(format!("{title}.{ext}")), b"x").unwrap();
        }
    }

    let log = CallLog::default();
    let product = column(vec![lesson(
        1,
        "开篇词",
        vec![article(11, "01 你好", 1), article(12, "02 再见", 2)],
    )]);
    let api = Arc::new(FakeApi::new(log.clone(), product.clone()));
    let dispatcher = dispatcher(
        api,
        fetchers(&log, None),
        config(root.path(), ArtifactSet::ALL),
        CancellationToken::new(),
    );

    let report = dispatcher.run(&product, SourceType::Normal, Scope::All).await;

    assert!(report.error.is_none());
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.skipped, 2);
    assert!(log.calls().is_empty(), "{:?}", log.calls());
}

#[tokio::test]
async fn markdown_only_skips_the_renderer() {
    let root = tempfile::tempdir().unwrap();
    let log = CallLog::default();
    let product = column(vec![lesson(1, "开篇词", vec![article(11, "01 你好", 1)])]);
    let api = Arc::new(FakeApi::new(log.clone(), product.clone()));
    let dispatcher = dispatcher(
        api,
        fetchers(&log, None),
        config(root.path(), ArtifactSet::from(ArtifactKind::MarkupText)),
        CancellationToken::new(),
    );

    let report = dispatcher.run(&product, SourceType::Normal, Scope::All).await;

    assert!(report.error.is_none());
    assert_eq!(log.calls(), vec!["detail:11", "text:11"]);
}

#[tokio::test]
async fn cancellation_stops_before_the_next_article() {
    let root = tempfile::tempdir().unwrap();
    let log = CallLog::default();
    let product = column(vec![
        lesson(1, "开篇词", vec![article(11, "01 你好", 1)]),
        lesson(2, "基础篇", vec![article(21, "02 继续", 1)]),
    ]);
    let api = Arc::new(FakeApi::new(log.clone(), product.clone()));
    let cancel = CancellationToken::new();
    let dispatcher = dispatcher(
        api,
        fetchers(&log, Some((11, cancel.clone()))),
        config(root.path(), ArtifactSet::from(ArtifactKind::MarkupText)),
        cancel,
    );

    let report = dispatcher.run(&product, SourceType::Normal, Scope::All).await;

    assert!(matches!(report.error, Some(DownloadError::Cancelled)));
    assert_eq!(report.succeeded, 1);
    assert_eq!(log.count("detail:21"), 0);
    assert_eq!(log.count("text:21"), 0);

    let index = scan(&project_dir(root.path(), "测试专栏")).await.unwrap();
    assert!(index.contains(CHAPTER, "01 你好.md"));
    assert!(!index.contains("2.基础篇", "02 继续.md"));
}

#[tokio::test]
async fn single_article_keeps_its_chapter_directory() {
    let root = tempfile::tempdir().unwrap();
    let log = CallLog::default();
    let product = column(vec![
        lesson(1, "开篇词", vec![article(11, "01 你好", 1)]),
        lesson(2, "基础篇", vec![article(21, "02 继续", 1), article(22, "03 深入", 2)]),
    ]);
    let api = Arc::new(FakeApi::new(log.clone(), product.clone()));
    let dispatcher = dispatcher(
        api,
        fetchers(&log, None),
        config(root.path(), ArtifactSet::from(ArtifactKind::MarkupText)),
        CancellationToken::new(),
    );

    let report = dispatcher
        .run(&product, SourceType::Normal, Scope::Article(22))
        .await;

    assert_eq!(report.into_result().unwrap(), 1);
    assert_eq!(log.calls(), vec!["detail:22", "text:22"]);
    assert!(
        project_dir(root.path(), "测试专栏")
            .join("2.基础篇")
            .join("03 深入.md")
            .is_file()
    );
}

#[tokio::test]
async fn university_entries_without_video_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    let log = CallLog::default();
    let mut with_video = article(31, "第一课", 1);
    with_video.video_time = Some(600);
    let mut product = column(vec![lesson(
        1,
        "第一周",
        vec![with_video, article(32, "课后作业", 2)],
    )]);
    product.product_type = ProductType::UniversityVideo;
    product.title = "训练营".to_string();

    let api = Arc::new(FakeApi::new(log.clone(), product.clone()));
    let dispatcher = dispatcher(
        api,
        fetchers(&log, None),
        config(root.path(), ArtifactSet::ALL),
        CancellationToken::new(),
    );

    let report = dispatcher
        .run(&product, SourceType::University, Scope::All)
        .await;

    assert!(report.error.is_none());
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(log.calls(), vec!["video:31"]);
    assert!(
        project_dir(root.path(), "训练营")
            .join("1.第一周")
            .join("第一课.ts")
            .is_file()
    );

    // 再跑一次，已存在的视频不再下载
    let again = dispatcher
        .run(&product, SourceType::University, Scope::All)
        .await;
    assert_eq!(again.skipped, 2);
    assert_eq!(log.count("video"), 1);
}

#[tokio::test]
async fn daily_lesson_video_lands_in_the_product_directory() {
    let root = tempfile::tempdir().unwrap();
    let log = CallLog::default();
    let mut product = geektime_downloader::common::models::Product::new(
        7,
        "每日一课",
        ProductType::DailyLesson,
        false,
    );
    product.single_article_id = Some(700);

    let api = Arc::new(FakeApi::new(log.clone(), product.clone()));
    let dispatcher = dispatcher(
        api,
        fetchers(&log, None),
        config(root.path(), ArtifactSet::ALL),
        CancellationToken::new(),
    );

    let path = dispatcher
        .download_product_video(&product, SourceType::DailyLesson)
        .await
        .unwrap();

    assert_eq!(path, project_dir(root.path(), "每日一课").join("每日一课.ts"));
    assert!(path.is_file());
    assert_eq!(log.calls(), vec!["video:700"]);
}

#[tokio::test]
async fn render_failure_closes_the_browser_and_stops() {
    let root = tempfile::tempdir().unwrap();
    let log = CallLog::default();
    let product = column(vec![lesson(
        1,
        "开篇词",
        vec![article(11, "01 你好", 1), article(12, "02 再见", 2)],
    )]);
    let api = Arc::new(FakeApi::new(log.clone(), product.clone()));
    let dispatcher = dispatcher(
        api,
        failing_fetchers(&log, Some(11), None),
        config(root.path(), ArtifactSet::ALL),
        CancellationToken::new(),
    );

    let report = dispatcher.run(&product, SourceType::Normal, Scope::All).await;

    assert_eq!(report.succeeded, 0);
    assert_eq!(log.calls(), vec!["open", "render:11", "close"]);
    match report.error {
        Some(DownloadError::Transfer { article, kind, source }) => {
            assert_eq!(article, "01 你好");
            assert_eq!(kind, "PDF");
            assert!(matches!(*source, DownloadError::Render(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let chapter = project_dir(root.path(), "测试专栏").join(CHAPTER);
    assert!(!chapter.join("01 你好.pdf").exists());
}

#[tokio::test]
async fn text_failure_names_the_article_and_stops() {
    let root = tempfile::tempdir().unwrap();
    let log = CallLog::default();
    let product = column(vec![
        lesson(1, "开篇词", vec![article(11, "01 你好", 1)]),
        lesson(2, "基础篇", vec![article(21, "02 继续", 1)]),
    ]);
    let api = Arc::new(FakeApi::new(log.clone(), product.clone()));
    let dispatcher = dispatcher(
        api,
        failing_fetchers(&log, None, Some(11)),
        config(root.path(), ArtifactSet::from(ArtifactKind::MarkupText)),
        CancellationToken::new(),
    );

    let report = dispatcher.run(&product, SourceType::Normal, Scope::All).await;

    assert_eq!(report.succeeded, 0);
    assert_eq!(log.calls(), vec!["detail:11", "text:11"]);
    assert!(matches!(
        &report.error,
        Some(DownloadError::Transfer { article, kind, .. }) if article == "01 你好" && kind == "Markdown"
    ));
    assert!(report.into_result().is_err());
}
