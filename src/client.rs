use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::CheckinError;
use crate::parse::Sign;

const PLUGIN_PATH: &str = "/plugin.php";
const PLUGIN_ID: &str = "zqlj_sign";

/// The two pages the check-in needs. Implemented over HTTP by [`FnClient`].
#[async_trait]
pub trait Forum {
    /// Body of the status page (check-in link plus statistics).
    async fn status_page(&self) -> anyhow::Result<String>;

    /// Body returned by the check-in endpoint for `sign`.
    async fn submit(&self, sign: &Sign) -> anyhow::Result<String>;
}

pub struct FnClient {
    client: Client,
    base_url: String,
}

impl FnClient {
    pub fn new(config: &Config) -> Result<Self, CheckinError> {
        let headers = build_base_request_headers(config)?;

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CheckinError::Configuration(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn plugin_url(&self) -> String {
        format!("{}{}", self.base_url, PLUGIN_PATH)
    }

    async fn get_text(&self, query: &[(&str, &str)]) -> anyhow::Result<String> {
        let res = self
            .client
            .get(self.plugin_url())
            .query(query)
            .send()
            .await
            .context("request failed")?;
        info!("Status: {}", res.status());
        let res = res.error_for_status().context("unexpected status")?;
        res.text().await.context("failed to read body")
    }
}

#[async_trait]
impl Forum for FnClient {
    async fn status_page(&self) -> anyhow::Result<String> {
        debug!("GET {}?id={}", self.plugin_url(), PLUGIN_ID);
        self.get_text(&[("id", PLUGIN_ID)]).await
    }

    async fn submit(&self, sign: &Sign) -> anyhow::Result<String> {
        debug!("GET {}?id={}&sign={}", self.plugin_url(), PLUGIN_ID, sign);
        self.get_text(&[("id", PLUGIN_ID), ("sign", sign.as_str())])
            .await
    }
}

fn build_base_request_headers(config: &Config) -> Result<HeaderMap, CheckinError> {
    let mut headers = HeaderMap::new();

    let common = [
        (
            HeaderName::from_static("accept"),
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        ),
        (
            HeaderName::from_static("accept-language"),
            HeaderValue::from_static("zh-CN,zh;q=0.8,zh-TW;q=0.7,zh-HK;q=0.5,en-US;q=0.3,en;q=0.2"),
        ),
        (
            HeaderName::from_static("connection"),
            HeaderValue::from_static("keep-alive"),
        ),
    ];
    for (name, value) in common {
        headers.insert(name, value);
    }

    let dynamic = [
        ("user-agent", config.user_agent.as_str(), "User-Agent"),
        ("cookie", config.cookie.as_str(), "Cookie"),
    ];
    for (key, val, label) in dynamic {
        // 值里若有非法字节，这里直接报配置错误，不发请求
        let name = HeaderName::from_str(key)
            .map_err(|_| CheckinError::Configuration(format!("invalid header name: {key}")))?;
        let value = HeaderValue::from_str(val)
            .map_err(|_| CheckinError::Configuration(format!("invalid {label} header value")))?;
        headers.insert(name, value);
    }

    let referer = format!("{}/", config.base_url.trim_end_matches('/'));
    headers.insert(
        HeaderName::from_static("referer"),
        HeaderValue::from_str(&referer)
            .map_err(|_| CheckinError::Configuration(format!("invalid base url: {referer}")))?,
    );

    Ok(headers)
}
