//! HTML and body matching against the forum's check-in plugin page.
//!
//! Everything that depends on the markup of `plugin.php?id=zqlj_sign`
//! lives here, so a site change only touches this file.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::CheckinError;

pub const SUCCESS_MARKER: &str = "恭喜您，打卡成功！";
pub const ALREADY_DONE_MARKER: &str = "您今天已经打过卡了";

/// Labels of the statistics block, in report order.
pub const STAT_LABELS: [&str; 7] = [
    "最近打卡",
    "本月打卡",
    "连续打卡",
    "累计打卡",
    "累计奖励",
    "最近奖励",
    "当前打卡等级",
];

static SIGN_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.btna").expect("valid selector"));
static LIST_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("valid selector"));
static SIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sign=([a-f0-9]+)").expect("valid regex"));
// `.` 不跨行：只截掉第一处带冒号那一行的最后一个冒号之前的内容
static LABEL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*:").expect("valid regex"));

/// One-time token carried by the check-in link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sign(String);

impl Sign {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    AlreadyDone,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub label: &'static str,
    pub value: String,
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

/// Pulls the `sign` token out of the first `a.btna` link on the status page.
pub fn extract_token(html: &str) -> Result<Sign, CheckinError> {
    let document = Html::parse_document(html);
    let href = document
        .select(&SIGN_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or_else(|| CheckinError::extraction("no check-in link found"))?;

    SIGN_RE
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| Sign(m.as_str().to_string()))
        .ok_or_else(|| CheckinError::extraction("token pattern not found"))
}

/// Order matters: a page with both markers counts as a success.
pub fn classify(body: &str) -> Outcome {
    if body.contains(SUCCESS_MARKER) {
        Outcome::Success
    } else if body.contains(ALREADY_DONE_MARKER) {
        Outcome::AlreadyDone
    } else {
        Outcome::Failure
    }
}

/// Collects every statistic whose label appears in some `li` on the page.
///
/// The text of all matching `li` elements is concatenated, then everything
/// up to the last `:` of the first line that has one is dropped. Values
/// that themselves contain a colon are truncated by this rule. Labels with
/// an empty value are skipped; no labels at all is an error.
pub fn extract_stats(html: &str) -> Result<Vec<Stat>, CheckinError> {
    let document = Html::parse_document(html);
    let items: Vec<String> = document
        .select(&LIST_ITEM)
        .map(|li| li.text().collect::<String>())
        .collect();

    let stats: Vec<Stat> = STAT_LABELS
        .iter()
        .filter_map(|&label| {
            let text: String = items
                .iter()
                .filter(|t| t.contains(label))
                .map(String::as_str)
                .collect();
            if text.is_empty() {
                return None;
            }
            let value = LABEL_PREFIX_RE.replacen(&text, 1, "").trim().to_string();
            (!value.is_empty()).then_some(Stat { label, value })
        })
        .collect();

    if stats.is_empty() {
        return Err(CheckinError::reporting(
            "no statistics found, page structure changed",
        ));
    }
    Ok(stats)
}
