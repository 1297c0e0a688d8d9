use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use geektime_downloader::auth::{AuthManager, Credentials};
use geektime_downloader::catalog::CatalogLoader;
use geektime_downloader::cli::Cli;
use geektime_downloader::common::client::client::{Endpoints, GeekClient};
use geektime_downloader::common::logger::PrettyLogger;
use geektime_downloader::common::models::DownloadConfig;
use geektime_downloader::downloader::Dispatcher;
use geektime_downloader::downloader::audio::HttpAudioFetcher;
use geektime_downloader::downloader::core::DownloadCore;
use geektime_downloader::downloader::fetcher::Fetchers;
use geektime_downloader::downloader::markdown::MarkdownFetcher;
use geektime_downloader::downloader::pdf::ChromiumRenderer;
use geektime_downloader::downloader::video::HlsVideoFetcher;
use geektime_downloader::error::AppError;
use geektime_downloader::log_info;
use geektime_downloader::navigator::Navigator;
use geektime_downloader::navigator::prompt::TerminalPrompter;

// 阻塞在终端输入时取消信号无法送达，等这么久后直接退出
const FORCE_EXIT_AFTER: Duration = Duration::from_secs(3);
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// 收到 Ctrl+C 后取消所有下载
fn watch_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        PrettyLogger::warning("收到中断信号，正在停止...");
        cancel.cancel();
        tokio::time::sleep(FORCE_EXIT_AFTER).await;
        std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
    });
}

fn download_config(cli: &Cli, credentials: &Credentials) -> anyhow::Result<DownloadConfig> {
    let download_folder = cli.folder().context("无法确定下载目录，请通过 --folder 指定")?;
    Ok(DownloadConfig {
        download_folder,
        account_key: credentials.account_key().to_string(),
        quality: cli.quality,
        output: cli.artifacts(),
        comments: cli.comments,
        concurrency: cli
            .concurrency
            .filter(|n| *n > 0)
            .unwrap_or_else(DownloadConfig::default_concurrency),
    })
}

async fn run(cli: Cli, cancel: CancellationToken) -> anyhow::Result<()> {
    let credentials = Credentials::from_args(cli.phone.clone(), cli.gcid.clone(), cli.gcess.clone())?;
    let config = download_config(&cli, &credentials)?;
    debug!("下载配置: {:?}", config);

    let client = GeekClient::new(Endpoints::geekbang()?)?;
    let auth = AuthManager::new(client.clone());
    let mut prompter = TerminalPrompter::stdin();
    auth.login(&credentials, &mut prompter).await?;
    info!("登录成功");
    log_info!("下载目录: {}", config.download_folder.display());

    let core = DownloadCore::new(client.http());
    let fetchers = Fetchers {
        renderer: Arc::new(ChromiumRenderer::new()),
        text: Arc::new(MarkdownFetcher::new(core.clone())),
        audio: Arc::new(HttpAudioFetcher::new(core.clone())),
        video: Arc::new(HlsVideoFetcher::new(client.clone(), core)),
    };

    let api = Arc::new(client.clone());
    let dispatcher = Dispatcher::new(api.clone(), fetchers, config, cancel)
        .with_cookies(client.site_cookies()?);
    let loader = CatalogLoader::new(api);

    let mut navigator = Navigator::new(Box::new(prompter), Arc::new(loader), Arc::new(dispatcher));
    navigator.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    watch_interrupt(cancel.clone());

    match run(cli, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if matches!(e.downcast_ref::<AppError>(), Some(AppError::Interrupted)) => {
            PrettyLogger::info("已退出");
            ExitCode::from(INTERRUPTED_EXIT_CODE)
        }
        Err(e) => {
            error!("{:#}", e);
            PrettyLogger::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
