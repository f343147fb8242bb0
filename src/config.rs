use std::env;
use std::time::Duration;

use crate::error::CheckinError;

pub const DEFAULT_BASE_URL: &str = "https://club.fnnas.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

const COOKIE_VAR: &str = "FN_COOKIE";
const BASE_URL_VAR: &str = "FN_BASE_URL";
const USER_AGENT_VAR: &str = "FN_USER_AGENT";
const TIMEOUT_VAR: &str = "FN_TIMEOUT_SECS";
const NOTIFY_CMD_VAR: &str = "FN_NOTIFY_CMD";

/// Runtime settings for one check-in run.
///
/// An empty `cookie` is allowed here; [`crate::Checkin::run`] rejects it
/// before any request goes out.
#[derive(Debug, Clone)]
pub struct Config {
    pub cookie: String,
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub notify_cmd: Option<String>,
}

impl Config {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            notify_cmd: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_env() -> Result<Self, CheckinError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CheckinError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = match non_empty(TIMEOUT_VAR) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    CheckinError::Configuration(format!("{TIMEOUT_VAR} is not a number: {raw}"))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            // cookie 原样使用，不做 trim 以外的处理
            cookie: lookup(COOKIE_VAR).unwrap_or_default().trim().to_string(),
            base_url: non_empty(BASE_URL_VAR)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            user_agent: non_empty(USER_AGENT_VAR).unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout,
            notify_cmd: non_empty(NOTIFY_CMD_VAR),
        })
    }

    pub fn has_cookie(&self) -> bool {
        !self.cookie.is_empty()
    }
}
