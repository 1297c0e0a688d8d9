//! 交互式导航：选择课程类别 → 输入课程 ID → 加载 → 菜单 → 文章列表。
//!
//! 状态和事件都是枚举，`transition` 是纯函数，`Navigator` 负责在每个状态执行
//! 对应的操作（读终端、加载课程、下载）并产生事件。

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::HierarchyLoader;
use crate::common::models::{Product, SourceType};
use crate::downloader::{Dispatcher, Scope};
use crate::error::AppError;
use crate::{log_error, log_success};

pub mod prompt;

use prompt::Prompter;

const BACK_LABEL: &str = "返回上一级";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    SelectProductType,
    InputProductId(SourceType),
    LoadProduct(SourceType, i64),
    ProductMenu,
    DownloadAll,
    ArticleMenu,
    DownloadOne(i64),
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Reselect,
    DownloadAll,
    SelectArticle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TypeChosen(SourceType),
    IdEntered(i64),
    /// 输入不合法，重新输入同一项
    InvalidInput,
    /// 类型不匹配或者未购买
    Rejected,
    /// 每日一课、大厂案例已直接下载
    DirectDownloaded,
    Loaded,
    Menu(MenuChoice),
    Back,
    Picked(i64),
    Finished,
    Interrupted,
}

#[derive(Debug, Error)]
pub enum NavError {
    #[error("状态 {state} 不接受事件 {event}")]
    Unexpected { state: String, event: String },

    #[error("当前没有选中的课程")]
    NoProduct,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 状态转移表
pub fn transition(state: &State, event: Event) -> Result<State, NavError> {
    use Event as E;
    use State as S;

    let next = match (state, event) {
        (_, E::Interrupted) => S::Exit,
        (S::SelectProductType, E::TypeChosen(source)) => S::InputProductId(source),
        (S::SelectProductType, E::InvalidInput) => S::SelectProductType,
        (S::InputProductId(source), E::IdEntered(id)) => S::LoadProduct(*source, id),
        (S::InputProductId(source), E::InvalidInput) => S::InputProductId(*source),
        (S::LoadProduct(source, _), E::Rejected | E::DirectDownloaded) => {
            S::InputProductId(*source)
        }
        (S::LoadProduct(..), E::Loaded) => S::ProductMenu,
        (S::ProductMenu, E::Menu(MenuChoice::Reselect)) => S::SelectProductType,
        (S::ProductMenu, E::Menu(MenuChoice::DownloadAll)) => S::DownloadAll,
        (S::ProductMenu, E::Menu(MenuChoice::SelectArticle)) => S::ArticleMenu,
        (S::DownloadAll, E::Finished) => S::SelectProductType,
        (S::ArticleMenu, E::Back) => S::ProductMenu,
        (S::ArticleMenu, E::Picked(id)) => S::DownloadOne(id),
        (S::DownloadOne(_), E::Finished) => S::ArticleMenu,
        (state, event) => {
            return Err(NavError::Unexpected {
                state: state.to_string(),
                event: event.to_string(),
            });
        }
    };
    Ok(next)
}

/// 可恢复错误对应的事件
fn recovery_event(err: &AppError) -> Event {
    match err {
        AppError::Validation(_) => Event::InvalidInput,
        _ => Event::Rejected,
    }
}

/// 一次交互会话的上下文
#[derive(Debug, Default)]
pub struct Session {
    pub source: Option<SourceType>,
    pub product: Option<Product>,
}

pub struct Navigator {
    prompter: Box<dyn Prompter>,
    loader: Arc<dyn HierarchyLoader>,
    dispatcher: Arc<Dispatcher>,
    session: Session,
}

impl Navigator {
    pub fn new(
        prompter: Box<dyn Prompter>,
        loader: Arc<dyn HierarchyLoader>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            prompter,
            loader,
            dispatcher,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 一直运行到用户中断或出现不可恢复的错误
    pub async fn run(&mut self) -> Result<(), AppError> {
        let mut state = State::SelectProductType;
        loop {
            if state == State::Exit {
                return Err(AppError::Interrupted);
            }
            let event = match self.step(&state).await {
                Ok(event) => event,
                Err(e) if e.is_recoverable() => {
                    log_error!("{}", e);
                    recovery_event(&e)
                }
                Err(AppError::Interrupted) => Event::Interrupted,
                Err(e) => return Err(e),
            };
            debug!("{} + {}", state, event);
            state = transition(&state, event)?;
        }
    }

    /// 执行一个状态的操作，返回产生的事件
    pub async fn step(&mut self, state: &State) -> Result<Event, AppError> {
        match state {
            State::SelectProductType => self.select_product_type(),
            State::InputProductId(source) => self.input_product_id(*source),
            State::LoadProduct(source, id) => self.load_product(*source, *id).await,
            State::ProductMenu => self.product_menu(),
            State::DownloadAll => self.download(Scope::All).await,
            State::ArticleMenu => self.article_menu().await,
            State::DownloadOne(id) => self.download(Scope::Article(*id)).await,
            State::Exit => Ok(Event::Interrupted),
        }
    }

    fn select_product_type(&mut self) -> Result<Event, AppError> {
        let items: Vec<String> = SourceType::ALL.iter().map(|s| s.label().to_string()).collect();
        let index = self.prompter.select("请选择想要下载的产品类型", &items)?;
        Ok(Event::TypeChosen(source_at(index)?))
    }

    fn input_product_id(&mut self, source: SourceType) -> Result<Event, AppError> {
        let text = self
            .prompter
            .input(&format!("请输入{}的课程 ID", source.label()))?;
        Ok(Event::IdEntered(parse_product_id(&text)?))
    }

    async fn load_product(&mut self, source: SourceType, id: i64) -> Result<Event, AppError> {
        let product = self.loader.load(source, id).await?;
        if !source.accepts(&product.product_type) {
            return Err(AppError::TypeMismatch {
                expected: source,
                actual: product.product_type,
            });
        }

        if source.is_direct_video() {
            let path = self.dispatcher.download_product_video(&product, source).await?;
            log_success!("{} 下载完成", path.display());
            return Ok(Event::DirectDownloaded);
        }

        if !product.access {
            return Err(AppError::NotOwned {
                title: product.title,
            });
        }
        info!("选中课程《{}》", product.title);
        self.session.source = Some(source);
        self.session.product = Some(product);
        Ok(Event::Loaded)
    }

    fn product_menu(&mut self) -> Result<Event, AppError> {
        let product = self.session.product.as_ref().ok_or(NavError::NoProduct)?;
        let (all, pick) = if product.is_video() {
            ("下载所有视频", "选择视频")
        } else {
            ("下载当前专栏所有文章", "选择文章")
        };
        let items = vec!["重新选择课程".to_string(), all.to_string(), pick.to_string()];
        let label = format!("当前选中的专栏为: {}, 请继续选择：", product.title);

        let choice = match self.prompter.select(&label, &items)? {
            0 => MenuChoice::Reselect,
            1 => MenuChoice::DownloadAll,
            _ => MenuChoice::SelectArticle,
        };
        Ok(Event::Menu(choice))
    }

    async fn grouped_product(&mut self) -> Result<&Product, AppError> {
        let product = self.session.product.as_mut().ok_or(NavError::NoProduct)?;
        self.loader.ensure_grouped(product).await?;
        Ok(product)
    }

    async fn article_menu(&mut self) -> Result<Event, AppError> {
        let product = self.grouped_product().await?;
        let ids: Vec<i64> = product.grouped_articles().map(|a| a.id).collect();
        let items: Vec<String> = std::iter::once(BACK_LABEL.to_string())
            .chain(product.grouped_articles().map(|a| a.title.clone()))
            .collect();

        let index = self.prompter.select("请选择文章: ", &items)?;
        match index.checked_sub(1).and_then(|i| ids.get(i)) {
            None => Ok(Event::Back),
            Some(id) => Ok(Event::Picked(*id)),
        }
    }

    async fn download(&mut self, scope: Scope) -> Result<Event, AppError> {
        let source = self.session.source.ok_or(NavError::NoProduct)?;
        let dispatcher = Arc::clone(&self.dispatcher);
        let product = self.grouped_product().await?;

        let report = dispatcher.run(product, source, scope).await;
        let succeeded = report.into_result()?;
        debug!("本次完成 {} 篇", succeeded);
        Ok(Event::Finished)
    }
}

fn source_at(index: usize) -> Result<SourceType, AppError> {
    SourceType::ALL
        .get(index)
        .copied()
        .ok_or_else(|| AppError::Validation(format!("无效的选项: {}", index)))
}

/// 课程 ID 只能是数字
pub fn parse_product_id(text: &str) -> Result<i64, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("课程 ID 不能为空".to_string()));
    }
    text.parse::<i64>()
        .map_err(|_| AppError::Validation("课程 ID 格式不合法".to_string()))
}
