use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::common::logger::PrettyLogger;

/// 加载时的转圈提示
pub fn spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {prefix}") {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// 单个文件的字节进度条，总大小未知时退化为转圈
pub fn byte_bar(total: u64, message: &str) -> ProgressBar {
    let pb = if total > 0 {
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_message(message.to_string());
    pb
}

/// 下载过程中的进度汇报
pub trait ProgressSink: Send + Sync {
    /// 开始处理一个章节，`done` 为此前已处理的文章数
    fn lesson(&self, done: usize, total: usize, title: &str);

    /// 开始处理一篇文章，`done` 包含这一篇
    fn article(&self, done: usize, total: usize, title: &str);

    fn finished(&self, title: &str);
}

/// 终端输出：`\r[时间] 正在下载 i/total` 加上章节和文章名
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn lesson(&self, done: usize, total: usize, title: &str) {
        PrettyLogger::progress(done, total);
        println!("\t{}", title);
    }

    fn article(&self, done: usize, total: usize, title: &str) {
        PrettyLogger::progress(done, total);
        println!("\t\t{}", title);
    }

    fn finished(&self, title: &str) {
        println!();
        PrettyLogger::success(format!("{} 下载完成", title));
    }
}

/// 不输出任何内容
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn lesson(&self, _done: usize, _total: usize, _title: &str) {}

    fn article(&self, _done: usize, _total: usize, _title: &str) {}

    fn finished(&self, _title: &str) {}
}
