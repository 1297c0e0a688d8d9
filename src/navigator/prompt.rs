use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::error::AppError;

/// 交互输入，导航和登录只通过这个 trait 读终端
pub trait Prompter: Send {
    /// 从列表中选择一项，返回下标
    fn select(&mut self, label: &str, items: &[String]) -> Result<usize, AppError>;

    /// 读取一行输入，不做校验
    fn input(&mut self, label: &str) -> Result<String, AppError>;

    /// 读取密码
    fn password(&mut self, label: &str) -> Result<String, AppError>;
}

/// 基于标准输入输出的实现，列表按编号选择
pub struct TerminalPrompter<R> {
    reader: R,
}

impl TerminalPrompter<io::BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        Self {
            reader: io::BufReader::new(io::stdin()),
        }
    }
}

impl<R: BufRead + Send> TerminalPrompter<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    fn read_line(&mut self) -> Result<String, AppError> {
        let mut line = String::new();
        // 输入流结束视为用户中断
        if self.reader.read_line(&mut line)? == 0 {
            return Err(AppError::Interrupted);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl<R: BufRead + Send> Prompter for TerminalPrompter<R> {
    fn select(&mut self, label: &str, items: &[String]) -> Result<usize, AppError> {
        loop {
            println!("\n{}", label.bold());
            for (i, item) in items.iter().enumerate() {
                println!("  {} {}", format!("[{}]", i).cyan(), item);
            }
            print!("{} ", ">".red());
            io::stdout().flush()?;

            let line = self.read_line()?;
            match line.trim().parse::<usize>() {
                Ok(i) if i < items.len() => return Ok(i),
                _ => eprintln!("{}", format!("请输入 0 到 {} 之间的编号", items.len().saturating_sub(1)).yellow()),
            }
        }
    }

    fn input(&mut self, label: &str) -> Result<String, AppError> {
        print!("{}: ", label);
        io::stdout().flush()?;
        self.read_line()
    }

    fn password(&mut self, label: &str) -> Result<String, AppError> {
        self.input(label)
    }
}
