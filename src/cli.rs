use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::common::models::Quality;
use crate::downloader::artifact::ArtifactSet;

/// 极客时间下载器
#[derive(Parser, Debug)]
#[command(name = "gkdl")]
#[command(version)]
#[command(about = "一个简单的极客时间专栏与视频课下载工具", long_about = None)]
pub struct Cli {
    /// 登录手机号，已保存的 cookie 失效时会提示输入密码
    #[arg(short = 'u', long, value_name = "PHONE")]
    #[arg(conflicts_with_all = ["gcid", "gcess"])]
    pub phone: Option<String>,

    /// 浏览器 cookie 中的 GCID
    #[arg(long, value_name = "GCID", requires = "gcess")]
    pub gcid: Option<String>,

    /// 浏览器 cookie 中的 GCESS
    #[arg(long, value_name = "GCESS", requires = "gcid")]
    pub gcess: Option<String>,

    /// 下载目录，默认 ~/geektime-downloader
    #[arg(short = 'f', long, value_name = "DIR")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub folder: Option<PathBuf>,

    /// 视频清晰度
    #[arg(short = 'q', long, value_enum, default_value_t = Quality::Sd)]
    pub quality: Quality,

    /// 是否在 PDF 中保留评论
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub comments: bool,

    /// 专栏输出格式：1=PDF, 2=Markdown, 4=音频，可相加
    #[arg(long, value_name = "MASK", default_value_t = 1)]
    #[arg(value_parser = clap::value_parser!(u8).range(1..=7))]
    pub output: u8,

    /// 单篇文章内的并发数，默认为 CPU 核数的一半
    #[arg(long, value_name = "N")]
    #[arg(value_parser = clap::value_parser!(usize))]
    pub concurrency: Option<usize>,

    /// 日志级别
    #[arg(long, value_name = "LEVEL", default_value_t = tracing::Level::WARN)]
    pub log_level: tracing::Level,
}

impl Cli {
    pub fn artifacts(&self) -> ArtifactSet {
        ArtifactSet::from_bits(self.output).unwrap_or(ArtifactSet::ALL)
    }

    pub fn folder(&self) -> Option<PathBuf> {
        self.folder
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join("geektime-downloader")))
    }
}
