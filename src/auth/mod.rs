pub mod errors;
pub mod store;

use tracing::{info, warn};

use crate::common::client::api::CourseApi;
use crate::common::client::client::{GCESS, GCID, GEEKBANG_COOKIE_DOMAIN, GeekClient};
use crate::common::client::error::ApiError;
use crate::common::client::models::StoredCookie;
use crate::downloader::progress::spinner;
use crate::navigator::prompt::Prompter;
use crate::{log_success, log_warning};

use errors::{AuthError, Result};
use store::CookieFile;

/// 命令行给出的登录方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// 直接使用浏览器里的 gcid/gcess
    Cookies { gcid: String, gcess: String },
    /// 手机号，优先读取保存的 cookie，没有再输入密码
    Phone(String),
}

impl Credentials {
    pub fn from_args(
        phone: Option<String>,
        gcid: Option<String>,
        gcess: Option<String>,
    ) -> Result<Self> {
        match (phone, gcid, gcess) {
            (Some(phone), _, _) if !phone.trim().is_empty() => Ok(Credentials::Phone(phone)),
            (_, Some(gcid), Some(gcess)) if !gcid.is_empty() && !gcess.is_empty() => {
                Ok(Credentials::Cookies { gcid, gcess })
            }
            _ => Err(AuthError::MissingCredentials),
        }
    }

    /// 下载目录下的账号子目录名
    pub fn account_key(&self) -> &str {
        match self {
            Credentials::Cookies { gcid, .. } => gcid,
            Credentials::Phone(phone) => phone,
        }
    }
}

fn input_cookies(gcid: &str, gcess: &str) -> Vec<StoredCookie> {
    [(GCID, gcid), (GCESS, gcess)]
        .into_iter()
        .map(|(name, value)| StoredCookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: GEEKBANG_COOKIE_DOMAIN.to_string(),
        })
        .collect()
}

// 登录状态管理，成功后 cookie 留在客户端里
pub struct AuthManager {
    client: GeekClient,
}

impl AuthManager {
    pub fn new(client: GeekClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GeekClient {
        &self.client
    }

    pub async fn login(
        &self,
        credentials: &Credentials,
        prompter: &mut dyn Prompter,
    ) -> Result<()> {
        match credentials {
            Credentials::Cookies { gcid, gcess } => {
                info!("使用命令行提供的 cookie 登录");
                self.client.set_cookies(&input_cookies(gcid, gcess))?;
                self.verify().await
            }
            Credentials::Phone(phone) => {
                let file = CookieFile::for_phone(phone)?;
                self.login_with_file(phone, &file, prompter).await
            }
        }
    }

    /// 先尝试保存的 cookie，失效或不存在时用密码登录并重新保存
    pub async fn login_with_file(
        &self,
        phone: &str,
        file: &CookieFile,
        prompter: &mut dyn Prompter,
    ) -> Result<()> {
        if let Some(cookies) = file.load().await? {
            self.client.set_cookies(&cookies)?;
            match self.verify().await {
                Ok(()) => {
                    info!("使用已保存的 cookie 登录: {}", file.path().display());
                    return Ok(());
                }
                Err(AuthError::Expired) => {
                    log_warning!("保存的登录状态已失效，请重新输入密码");
                    file.remove().await?;
                }
                Err(e) => return Err(e),
            }
        }

        let password = read_password(prompter)?;
        let pb = spinner("[ 正在登录... ]");
        let logged_in = self.client.login(phone, &password).await;
        pb.finish_and_clear();
        logged_in?;

        file.save(&self.client.site_cookies()?).await?;
        log_success!("登录成功");
        self.verify().await
    }

    /// 首次请求前检查登录状态
    pub async fn verify(&self) -> Result<()> {
        match self.client.auth().await {
            Ok(()) => Ok(()),
            Err(ApiError::AuthRequired) => Err(AuthError::Expired),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_password(prompter: &mut dyn Prompter) -> Result<String> {
    loop {
        let password = prompter
            .password("请输入密码")
            .map_err(|e| AuthError::Prompt(e.to_string()))?;
        if !password.trim().is_empty() {
            return Ok(password);
        }
        warn!("密码为空");
        log_warning!("密码不能为空");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_prefer_phone() {
        let creds = Credentials::from_args(Some("13800000000".into()), None, None).unwrap();
        assert_eq!(creds.account_key(), "13800000000");

        let creds =
            Credentials::from_args(None, Some("gcid".into()), Some("gcess".into())).unwrap();
        assert_eq!(creds.account_key(), "gcid");

        assert!(matches!(
            Credentials::from_args(None, Some("gcid".into()), None),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn input_cookies_use_the_site_domain() {
        let cookies = input_cookies("a", "b");
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.domain == GEEKBANG_COOKIE_DOMAIN));
        assert_eq!(cookies[0].name, GCID);
    }
}
