use std::collections::HashMap;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use geektime_downloader::common::client::api::CourseApi;
use geektime_downloader::common::client::client::{Endpoints, GeekClient};
use geektime_downloader::common::client::error::ApiError;
use geektime_downloader::common::models::{ProductType, Quality, SourceType};
use geektime_downloader::downloader::audio::HttpAudioFetcher;
use geektime_downloader::downloader::core::DownloadCore;
use geektime_downloader::downloader::error::DownloadError;
use geektime_downloader::downloader::fetcher::{AudioFetcher, TextFetcher, VideoFetcher, VideoRequest};
use geektime_downloader::downloader::markdown::MarkdownFetcher;
use geektime_downloader::downloader::video::HlsVideoFetcher;

fn core() -> DownloadCore {
    DownloadCore::new(reqwest::Client::new())
}

async fn serve(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn audio_is_streamed_to_its_final_name() {
    let server = MockServer::start().await;
    serve(&server, "/audio/1.mp3", b"ID3-audio").await;
    let dir = tempfile::tempdir().unwrap();

    HttpAudioFetcher::new(core())
        .fetch(
            &CancellationToken::new(),
            &format!("{}/audio/1.mp3", server.uri()),
            dir.path(),
            "01 你好",
        )
        .await
        .unwrap();

    assert_eq!(std::fs::read(dir.path().join("01 你好.mp3")).unwrap(), b"ID3-audio");
    assert!(!dir.path().join("01 你好.mp3.part").exists());
}

#[tokio::test]
async fn failed_audio_leaves_nothing_behind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let err = HttpAudioFetcher::new(core())
        .fetch(
            &CancellationToken::new(),
            &format!("{}/missing.mp3", server.uri()),
            dir.path(),
            "01 你好",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Status { status: 404, .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn empty_audio_url_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    HttpAudioFetcher::new(core())
        .fetch(&CancellationToken::new(), "", dir.path(), "无音频")
        .await
        .unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn fetch_all_keeps_request_order() {
    let server = MockServer::start().await;
    for i in 0..5 {
        serve(&server, &format!("/blob/{i}"), format!("blob-{i}").as_bytes()).await;
    }
    let urls: Vec<String> = (0..5).map(|i| format!("{}/blob/{i}", server.uri())).collect();

    let blobs = core()
        .fetch_all(&CancellationToken::new(), &urls, 2)
        .await
        .unwrap();

    let texts: Vec<String> = blobs
        .iter()
        .map(|b| String::from_utf8(b.to_vec()).unwrap())
        .collect();
    assert_eq!(texts, vec!["blob-0", "blob-1", "blob-2", "blob-3", "blob-4"]);
}

#[tokio::test]
async fn markdown_images_are_saved_next_to_the_article() {
    let server = MockServer::start().await;
    serve(&server, "/img/a.png", b"png-a").await;
    serve(&server, "/img/b.jpg", b"jpg-b").await;
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        r#"<h2>标题</h2><p>正文<img src="{0}/img/a.png" alt="图一"></p><p><img src="{0}/img/b.jpg"></p>"#,
        server.uri()
    );

    MarkdownFetcher::new(core())
        .fetch(&CancellationToken::new(), &body, "01 你好", dir.path(), 7, 2)
        .await
        .unwrap();

    let markdown = std::fs::read_to_string(dir.path().join("01 你好.md")).unwrap();
    assert!(markdown.starts_with("## 标题"), "{markdown}");
    assert!(markdown.contains("![图一](images/7/a.png)"), "{markdown}");
    assert!(markdown.contains("(images/7/b.jpg)"), "{markdown}");
    assert!(!markdown.contains(&server.uri()));
    assert_eq!(std::fs::read(dir.path().join("images/7/a.png")).unwrap(), b"png-a");
    assert_eq!(std::fs::read(dir.path().join("images/7/b.jpg")).unwrap(), b"jpg-b");
}

#[tokio::test]
async fn broken_image_fails_the_markdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let body = format!(r#"<p><img src="{}/img/a.png"></p>"#, server.uri());

    let result = MarkdownFetcher::new(core())
        .fetch(&CancellationToken::new(), &body, "坏图", dir.path(), 8, 2)
        .await;

    assert!(matches!(result, Err(DownloadError::Status { status: 500, .. })));
    assert!(!dir.path().join("坏图.md").exists());
}

#[tokio::test]
async fn hls_segments_are_joined_in_playlist_order() {
    let server = MockServer::start().await;
    let client = GeekClient::new(Endpoints::single(&server.uri()).unwrap()).unwrap();

    Mock::given(method("POST"))
        .and(path("/serv/v1/article"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "hls_videos": {
                    "sd": { "url": format!("{}/v/index.m3u8", server.uri()), "size": 4 }
                }
            }
        })))
        .mount(&server)
        .await;
    serve(
        &server,
        "/v/index.m3u8",
        b"#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000\nsd/media.m3u8\n",
    )
    .await;
    serve(
        &server,
        "/v/sd/media.m3u8",
        b"#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10,\ns0.ts\n#EXTINF:10,\ns1.ts\n#EXT-X-ENDLIST\n",
    )
    .await;
    serve(&server, "/v/sd/s0.ts", b"AA").await;
    serve(&server, "/v/sd/s1.ts", b"BB").await;

    let dir = tempfile::tempdir().unwrap();
    let request = VideoRequest {
        article_id: 42,
        source: SourceType::Normal,
        product_id: 1,
        title: "01 视频".to_string(),
    };
    HlsVideoFetcher::new(client.clone(), DownloadCore::new(client.http()))
        .fetch(&CancellationToken::new(), &request, dir.path(), Quality::Sd, 2)
        .await
        .unwrap();

    assert_eq!(std::fs::read(dir.path().join("01 视频.ts")).unwrap(), b"AABB");
    assert!(!dir.path().join("01 视频.ts.part").exists());
}

#[tokio::test]
async fn missing_quality_is_unsupported() {
    let server = MockServer::start().await;
    let client = GeekClient::new(Endpoints::single(&server.uri()).unwrap()).unwrap();
    Mock::given(method("POST"))
        .and(path("/serv/v1/article"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": { "hls_videos": { "ld": { "url": "https://example.com/ld.m3u8" } } }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let request = VideoRequest {
        article_id: 42,
        source: SourceType::Normal,
        product_id: 1,
        title: "01 视频".to_string(),
    };
    let err = HlsVideoFetcher::new(client.clone(), DownloadCore::new(client.http()))
        .fetch(&CancellationToken::new(), &request, dir.path(), Quality::Hd, 2)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Unsupported(_)));
}

#[tokio::test]
async fn column_info_maps_type_and_access() {
    let server = MockServer::start().await;
    let client = GeekClient::new(Endpoints::single(&server.uri()).unwrap()).unwrap();
    Mock::given(method("POST"))
        .and(path("/serv/v3/column/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "id": 100,
                "title": "测试专栏",
                "type": "c1",
                "extra": { "sub": { "access_mask": 1 } }
            }
        })))
        .mount(&server)
        .await;

    let product = client.column_info(100).await.unwrap();

    assert_eq!(product.id, 100);
    assert_eq!(product.title, "测试专栏");
    assert_eq!(product.product_type, ProductType::Column);
    assert!(product.access);
}

#[tokio::test]
async fn column_info_keeps_unknown_type_codes() {
    let server = MockServer::start().await;
    let client = GeekClient::new(Endpoints::single(&server.uri()).unwrap()).unwrap();
    Mock::given(method("POST"))
        .and(path("/serv/v3/column/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "id": 200,
                "title": "新类型",
                "type": "c4",
                "extra": { "sub": { "access_mask": 1 } }
            }
        })))
        .mount(&server)
        .await;

    let product = client.column_info(200).await.unwrap();

    assert_eq!(product.product_type, ProductType::Other("c4".to_string()));
    assert!(!SourceType::Normal.accepts(&product.product_type));
}

#[tokio::test]
async fn auth_failure_codes_mean_login_required() {
    let server = MockServer::start().await;
    let client = GeekClient::new(Endpoints::single(&server.uri()).unwrap()).unwrap();
    Mock::given(method("GET"))
        .and(path("/serv/v1/user/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": -1,
            "error": { "code": -3050, "msg": "未登录" },
            "data": HashMap::<String, String>::new()
        })))
        .mount(&server)
        .await;

    assert!(matches!(client.auth().await, Err(ApiError::AuthRequired)));
}
