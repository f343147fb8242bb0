use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckinError {
    /// 凭据缺失或无法作为请求头使用
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Extraction(String),

    #[error("check-in request failed: {0}")]
    Submission(String),

    #[error("{0}")]
    Reporting(String),
}

impl CheckinError {
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn reporting(msg: impl Into<String>) -> Self {
        Self::Reporting(msg.into())
    }
}
