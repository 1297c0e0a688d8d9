use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use ego_tree::NodeRef;
use regex::Regex;
use scraper::{Html, Node, Selector, node::Element};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::artifact::ArtifactKind;
use super::core::{DownloadCore, write_atomic};
use super::error::DownloadError;
use super::fetcher::TextFetcher;
use crate::common::sanitize::sanitize;

const IMAGE_DIR: &str = "images";

#[allow(clippy::expect_used)]
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

#[allow(clippy::expect_used)]
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line regex is valid"));

/// 文章正文转 Markdown，图片下载到 `images/<文章ID>/` 并改写为本地相对路径
pub struct MarkdownFetcher {
    core: DownloadCore,
}

impl MarkdownFetcher {
    pub fn new(core: DownloadCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl TextFetcher for MarkdownFetcher {
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        body: &str,
        title: &str,
        dir: &Path,
        article_id: i64,
        concurrency: usize,
    ) -> Result<(), DownloadError> {
        let plan = plan_images(&image_sources(body), article_id);

        if !plan.is_empty() {
            debug!("《{}》共 {} 张图片", title, plan.len());
            let urls: Vec<String> = plan.iter().map(|(url, _)| url.clone()).collect();
            let blobs = self.core.fetch_all(cancel, &urls, concurrency).await?;
            for ((_, local), data) in plan.iter().zip(blobs) {
                write_atomic(&dir.join(local), &data).await?;
            }
        }

        let links: HashMap<String, String> = plan.into_iter().collect();
        let markdown = html_to_markdown(body, &links);
        write_atomic(
            &dir.join(ArtifactKind::MarkupText.file_name(title)),
            markdown.as_bytes(),
        )
        .await
    }
}

/// 正文里的远程图片地址，按出现顺序去重
pub fn image_sources(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let Ok(selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| src.starts_with("http://") || src.starts_with("https://"))
        .filter(|src| seen.insert(src.to_string()))
        .map(str::to_string)
        .collect()
}

/// 每个图片地址对应的本地相对路径
fn plan_images(sources: &[String], article_id: i64) -> Vec<(String, String)> {
    let mut used = HashSet::new();
    sources
        .iter()
        .enumerate()
        .map(|(i, src)| {
            let base = Url::parse(src)
                .ok()
                .and_then(|url| {
                    url.path_segments()
                        .and_then(|mut segments| segments.next_back().map(str::to_string))
                })
                .filter(|name| !name.is_empty())
                .map(|name| sanitize(&name))
                .unwrap_or_else(|| format!("{}.png", i + 1));
            let name = if used.insert(base.clone()) {
                base
            } else {
                format!("{}_{}", i + 1, base)
            };
            (src.clone(), format!("{}/{}/{}", IMAGE_DIR, article_id, name))
        })
        .collect()
}

/// 把文章 HTML 转为 Markdown，`images` 中的图片地址替换为本地路径
pub fn html_to_markdown(html: &str, images: &HashMap<String, String>) -> String {
    let fragment = Html::parse_fragment(html);
    let mut converter = Converter::new(images);
    converter.walk(fragment.tree.root());
    converter.finish()
}

struct Converter<'a> {
    images: &'a HashMap<String, String>,
    out: String,
    in_pre: bool,
    // None 为无序列表，Some(n) 为有序列表当前序号
    lists: Vec<Option<usize>>,
}

impl<'a> Converter<'a> {
    fn new(images: &'a HashMap<String, String>) -> Self {
        Self {
            images,
            out: String::new(),
            in_pre: false,
            lists: Vec::new(),
        }
    }

    fn finish(self) -> String {
        let collapsed = BLANK_LINES.replace_all(&self.out, "\n\n");
        let trimmed = collapsed.trim();
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}\n", trimmed)
        }
    }

    fn walk(&mut self, node: NodeRef<'_, Node>) {
        match node.value() {
            Node::Text(text) => self.text(text),
            Node::Element(element) => self.element(node, element),
            _ => self.children(node),
        }
    }

    fn children(&mut self, node: NodeRef<'_, Node>) {
        for child in node.children() {
            self.walk(child);
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_pre {
            self.out.push_str(text);
            return;
        }
        let collapsed = WHITESPACE.replace_all(text, " ");
        if self.out.is_empty() || self.out.ends_with('\n') {
            self.out.push_str(collapsed.trim_start());
        } else {
            self.out.push_str(&collapsed);
        }
    }

    fn block_break(&mut self) {
        if self.out.is_empty() || self.out.ends_with("\n\n") {
            return;
        }
        if self.out.ends_with('\n') {
            self.out.push('\n');
        } else {
            self.out.push_str("\n\n");
        }
    }

    fn wrapped(&mut self, node: NodeRef<'_, Node>, marker: &str) {
        self.out.push_str(marker);
        self.children(node);
        self.out.push_str(marker);
    }

    fn element(&mut self, node: NodeRef<'_, Node>, element: &Element) {
        match element.name() {
            "script" | "style" => {}
            name @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                self.block_break();
                self.out.push_str(&"#".repeat(level));
                self.out.push(' ');
                self.children(node);
                self.block_break();
            }
            "p" | "div" | "section" | "article" | "figure" => {
                self.block_break();
                self.children(node);
                self.block_break();
            }
            "br" => {
                if self.in_pre {
                    self.out.push('\n');
                } else {
                    self.out.push_str("  \n");
                }
            }
            "hr" => {
                self.block_break();
                self.out.push_str("---");
                self.block_break();
            }
            "strong" | "b" => self.wrapped(node, "**"),
            "em" | "i" => self.wrapped(node, "*"),
            "code" if !self.in_pre => self.wrapped(node, "`"),
            "pre" => {
                self.block_break();
                self.out.push_str("```\n");
                self.in_pre = true;
                self.children(node);
                self.in_pre = false;
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.out.push_str("```");
                self.block_break();
            }
            "a" => {
                let href = element.attr("href").unwrap_or_default();
                self.out.push('[');
                self.children(node);
                self.out.push_str("](");
                self.out.push_str(href);
                self.out.push(')');
            }
            "img" => {
                let src = element.attr("src").unwrap_or_default();
                let alt = element.attr("alt").unwrap_or_default();
                let target = self.images.get(src).map(String::as_str).unwrap_or(src);
                self.out.push_str(&format!("![{}]({})", alt, target));
            }
            "ul" | "ol" => {
                let ordered = element.name() == "ol";
                self.block_break();
                self.lists.push(ordered.then_some(0));
                self.children(node);
                self.lists.pop();
                self.block_break();
            }
            "li" => self.list_item(node),
            "blockquote" => {
                let mut inner = Converter::new(self.images);
                inner.children(node);
                let quoted = inner
                    .finish()
                    .lines()
                    .map(|line| format!("> {}", line).trim_end().to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                self.block_break();
                self.out.push_str(&quoted);
                self.block_break();
            }
            _ => self.children(node),
        }
    }

    fn list_item(&mut self, node: NodeRef<'_, Node>) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        let depth = self.lists.len().max(1);
        let marker = match self.lists.last_mut() {
            Some(Some(n)) => {
                *n += 1;
                format!("{}. ", n)
            }
            _ => "- ".to_string(),
        };
        self.out.push_str(&"  ".repeat(depth - 1));
        self.out.push_str(&marker);
        self.children(node);
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }
}
