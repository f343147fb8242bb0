use chrono::Local;
use tracing::{error, info, warn};

use crate::client::Forum;
use crate::config::Config;
use crate::error::CheckinError;
use crate::notify::Notifier;
use crate::parse::{self, Outcome, Sign, Stat};

pub const TITLE_CONFIG_ERROR: &str = "飞牛签到配置错误";
pub const TITLE_EXTRACT_FAILED: &str = "飞牛签到失败";
pub const TITLE_SUCCESS: &str = "飞牛论坛打卡成功";
pub const TITLE_FORUM: &str = "飞牛论坛";

pub const MSG_MISSING_COOKIE: &str = "未设置环境变量 FN_COOKIE，请先配置。";
pub const MSG_ALREADY_DONE: &str = "您今天已经打过卡了";
pub const MSG_FAILURE: &str = "打卡失败, cookies可能已经过期或站点更新.";

/// Where a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    /// Empty credential, nothing was requested.
    MissingCookie,
    /// Could not obtain a sign token; check-in was not attempted.
    ExtractionFailed,
    /// Check-in request itself failed.
    SubmissionFailed,
    /// Check-in went through, but the statistics could not be read.
    ReportFailed,
    Done(Outcome),
}

/// What the check-in step produced, before anything is notified.
#[derive(Debug)]
pub enum Submission {
    Checked(Vec<Stat>),
    AlreadyDone,
    Rejected,
}

pub struct Checkin<F, N> {
    config: Config,
    forum: F,
    notifier: N,
}

impl<F: Forum + Sync, N: Notifier + Sync> Checkin<F, N> {
    pub fn new(config: Config, forum: F, notifier: N) -> Self {
        Self {
            config,
            forum,
            notifier,
        }
    }

    pub async fn run(&self) -> RunReport {
        info!("开始执行飞牛社区签到 {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let report = self.run_inner().await;
        info!("任务执行完毕: {:?}", report);
        report
    }

    async fn run_inner(&self) -> RunReport {
        if !self.config.has_cookie() {
            error!("{}", MSG_MISSING_COOKIE);
            self.send(TITLE_CONFIG_ERROR, MSG_MISSING_COOKIE).await;
            return RunReport::MissingCookie;
        }

        let sign = match self.fetch_sign().await {
            Ok(sign) => sign,
            Err(e) => {
                error!("获取动态sign参数失败: {}", e);
                self.send(TITLE_EXTRACT_FAILED, &format!("获取动态sign参数失败: {e}"))
                    .await;
                return RunReport::ExtractionFailed;
            }
        };
        info!("sign: {}", sign);

        match self.submit(&sign).await {
            Ok(Submission::Checked(stats)) => {
                let body = stats
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n");
                info!("签到详情:\n{}", body);
                self.send(TITLE_SUCCESS, &body).await;
                RunReport::Done(Outcome::Success)
            }
            Ok(Submission::AlreadyDone) => {
                info!("已经打过卡了");
                self.send(TITLE_FORUM, MSG_ALREADY_DONE).await;
                RunReport::Done(Outcome::AlreadyDone)
            }
            Ok(Submission::Rejected) => {
                warn!("{}", MSG_FAILURE);
                self.send(TITLE_FORUM, MSG_FAILURE).await;
                RunReport::Done(Outcome::Failure)
            }
            Err(e @ CheckinError::Reporting(_)) => {
                error!("获取打卡信息失败: {}", e);
                self.send(TITLE_FORUM, &format!("获取打卡信息失败: {e}")).await;
                RunReport::ReportFailed
            }
            Err(e) => {
                error!("签到请求失败: {}", e);
                self.send(TITLE_FORUM, &format!("签到请求失败: {e}")).await;
                RunReport::SubmissionFailed
            }
        }
    }

    /// Fetches the status page and pulls the sign token out of it.
    pub async fn fetch_sign(&self) -> Result<Sign, CheckinError> {
        let html = self
            .forum
            .status_page()
            .await
            .map_err(|e| CheckinError::extraction(format!("status page: {e:#}")))?;
        parse::extract_token(&html)
    }

    /// Submits `sign`; on success also re-reads the statistics.
    pub async fn submit(&self, sign: &Sign) -> Result<Submission, CheckinError> {
        let body = self
            .forum
            .submit(sign)
            .await
            .map_err(|e| CheckinError::Submission(format!("{e:#}")))?;

        match parse::classify(&body) {
            Outcome::Success => {
                info!("打卡成功");
                self.fetch_stats().await.map(Submission::Checked)
            }
            Outcome::AlreadyDone => Ok(Submission::AlreadyDone),
            Outcome::Failure => Ok(Submission::Rejected),
        }
    }

    pub async fn fetch_stats(&self) -> Result<Vec<Stat>, CheckinError> {
        let html = self
            .forum
            .status_page()
            .await
            .map_err(|e| CheckinError::reporting(format!("status page: {e:#}")))?;
        parse::extract_stats(&html)
    }

    async fn send(&self, title: &str, message: &str) {
        if let Err(e) = self.notifier.notify(title, message).await {
            error!("发送通知失败: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeForum {
        pages: Mutex<VecDeque<anyhow::Result<String>>>,
        submit_body: Mutex<Option<anyhow::Result<String>>>,
        status_calls: Mutex<usize>,
        submitted: Mutex<Vec<String>>,
    }

    impl FakeForum {
        fn with_pages(pages: Vec<anyhow::Result<String>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                ..Default::default()
            }
        }

        fn submit_returns(self, body: anyhow::Result<String>) -> Self {
            *self.submit_body.lock().unwrap() = Some(body);
            self
        }

        fn status_calls(&self) -> usize {
            *self.status_calls.lock().unwrap()
        }

        fn submitted(&self) -> Vec<String> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<'a> Forum for &'a FakeForum {
        async fn status_page(&self) -> anyhow::Result<String> {
            *self.status_calls.lock().unwrap() += 1;
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no page queued")))
        }

        async fn submit(&self, sign: &Sign) -> anyhow::Result<String> {
            self.submitted.lock().unwrap().push(sign.to_string());
            self.submit_body
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no submit body queued")))
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl Recorder {
        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<'a> Notifier for &'a Recorder {
        async fn notify(&self, title: &str, message: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string()));
            if self.fail {
                anyhow::bail!("push endpoint down");
            }
            Ok(())
        }
    }

    const SIGN_PAGE: &str =
        r#"<a class="btna" href="plugin.php?id=zqlj_sign&sign=deadbeef">打卡</a>"#;
    const STATS_PAGE: &str = "<ul><li>连续打卡: 5 天</li><li>当前打卡等级: Lv.3</li></ul>";

    fn config() -> Config {
        Config::new("auth=1")
    }

    #[tokio::test]
    async fn empty_cookie_notifies_without_requests() {
        let forum = FakeForum::default();
        let notes = Recorder::default();
        let report = Checkin::new(Config::new(""), &forum, &notes).run().await;

        assert_eq!(report, RunReport::MissingCookie);
        assert_eq!(forum.status_calls(), 0);
        assert!(forum.submitted().is_empty());
        assert_eq!(
            notes.sent(),
            vec![(TITLE_CONFIG_ERROR.to_string(), MSG_MISSING_COOKIE.to_string())]
        );
    }

    #[tokio::test]
    async fn missing_link_aborts_before_submit() {
        let forum = FakeForum::with_pages(vec![Ok("<html>请先登录</html>".into())]);
        let notes = Recorder::default();
        let report = Checkin::new(config(), &forum, &notes).run().await;

        assert_eq!(report, RunReport::ExtractionFailed);
        assert!(forum.submitted().is_empty());
        let sent = notes.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, TITLE_EXTRACT_FAILED);
        assert!(sent[0].1.contains("no check-in link found"));
    }

    #[tokio::test]
    async fn status_page_error_aborts() {
        let forum = FakeForum::with_pages(vec![Err(anyhow::anyhow!("connection reset"))]);
        let notes = Recorder::default();
        let report = Checkin::new(config(), &forum, &notes).run().await;

        assert_eq!(report, RunReport::ExtractionFailed);
        assert!(notes.sent()[0].1.contains("connection reset"));
    }

    #[tokio::test]
    async fn success_reports_stats() {
        let forum = FakeForum::with_pages(vec![Ok(SIGN_PAGE.into()), Ok(STATS_PAGE.into())])
            .submit_returns(Ok("<div>恭喜您，打卡成功！</div>".into()));
        let notes = Recorder::default();
        let report = Checkin::new(config(), &forum, &notes).run().await;

        assert_eq!(report, RunReport::Done(Outcome::Success));
        assert_eq!(forum.submitted(), vec!["deadbeef".to_string()]);
        assert_eq!(forum.status_calls(), 2);
        assert_eq!(
            notes.sent(),
            vec![(
                TITLE_SUCCESS.to_string(),
                "连续打卡: 5 天\n当前打卡等级: Lv.3".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn already_done_skips_stats() {
        let forum = FakeForum::with_pages(vec![Ok(SIGN_PAGE.into())])
            .submit_returns(Ok("您今天已经打过卡了".into()));
        let notes = Recorder::default();
        let report = Checkin::new(config(), &forum, &notes).run().await;

        assert_eq!(report, RunReport::Done(Outcome::AlreadyDone));
        assert_eq!(forum.status_calls(), 1);
        assert_eq!(
            notes.sent(),
            vec![(TITLE_FORUM.to_string(), MSG_ALREADY_DONE.to_string())]
        );
    }

    #[tokio::test]
    async fn unknown_body_is_failure() {
        let forum = FakeForum::with_pages(vec![Ok(SIGN_PAGE.into())])
            .submit_returns(Ok("<html>出错了</html>".into()));
        let notes = Recorder::default();
        let report = Checkin::new(config(), &forum, &notes).run().await;

        assert_eq!(report, RunReport::Done(Outcome::Failure));
        assert_eq!(
            notes.sent(),
            vec![(TITLE_FORUM.to_string(), MSG_FAILURE.to_string())]
        );
    }

    #[tokio::test]
    async fn submit_error_is_contained() {
        let forum = FakeForum::with_pages(vec![Ok(SIGN_PAGE.into())])
            .submit_returns(Err(anyhow::anyhow!("timed out")));
        let notes = Recorder::default();
        let report = Checkin::new(config(), &forum, &notes).run().await;

        assert_eq!(report, RunReport::SubmissionFailed);
        let sent = notes.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("timed out"));
    }

    #[tokio::test]
    async fn missing_stats_is_contained() {
        let forum = FakeForum::with_pages(vec![
            Ok(SIGN_PAGE.into()),
            Ok("<ul><li>公告</li></ul>".into()),
        ])
        .submit_returns(Ok("恭喜您，打卡成功！".into()));
        let notes = Recorder::default();
        let report = Checkin::new(config(), &forum, &notes).run().await;

        assert_eq!(report, RunReport::ReportFailed);
        let sent = notes.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, TITLE_FORUM);
        assert!(sent[0].1.contains("no statistics found"));
    }

    #[tokio::test]
    async fn notifier_failure_does_not_change_report() {
        let forum = FakeForum::with_pages(vec![Ok(SIGN_PAGE.into())])
            .submit_returns(Ok("您今天已经打过卡了".into()));
        let notes = Recorder {
            fail: true,
            ..Default::default()
        };
        let report = Checkin::new(config(), &forum, &notes).run().await;

        assert_eq!(report, RunReport::Done(Outcome::AlreadyDone));
        assert_eq!(notes.sent().len(), 1);
    }
}
