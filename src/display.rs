use crate::config::Config;
use crate::db::Database;
use crate::stats::{BonusStatus, DailyStats};
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

const DEFAULT_ACTIVITY_CLASS: &str = "member-activity-start";

static WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"width:\s*(\d+(?:\.\d+)?)%").expect("width pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub has_data: bool,
    pub bonus_status: BonusStatus,
    pub bonus_text: &'static str,
    pub bonus_class: &'static str,
    pub visit_count: u32,
    pub max_visit_count: u32,
    pub activity_class: String,
    pub activity_percent: f64,
    pub last_updated_local: Option<String>,
    pub last_updated_utc: Option<String>,
}

impl StatusView {
    /// A record from another day renders as "no data yet".
    pub fn from_record(
        record: Option<&DailyStats>,
        today: NaiveDate,
        max_visit_count: u32,
    ) -> Self {
        let Some(stats) = record.filter(|stats| stats.is_for(today)) else {
            return Self::empty(max_visit_count);
        };

        let (bonus_text, bonus_class) = bonus_label(stats.bonus_status);

        Self {
            has_data: true,
            bonus_status: stats.bonus_status,
            bonus_text,
            bonus_class,
            visit_count: stats.visit_count,
            max_visit_count,
            activity_class: stats
                .activity_bar_class
                .clone()
                .unwrap_or_else(|| DEFAULT_ACTIVITY_CLASS.to_string()),
            activity_percent: stats
                .activity_bar_style
                .as_deref()
                .and_then(activity_width)
                .unwrap_or(0.0),
            last_updated_local: stats.last_updated.map(format_local),
            last_updated_utc: stats.last_updated.map(format_utc),
        }
    }

    fn empty(max_visit_count: u32) -> Self {
        let (bonus_text, bonus_class) = bonus_label(BonusStatus::Unknown);

        Self {
            has_data: false,
            bonus_status: BonusStatus::Unknown,
            bonus_text,
            bonus_class,
            visit_count: 0,
            max_visit_count,
            activity_class: DEFAULT_ACTIVITY_CLASS.to_string(),
            activity_percent: 0.0,
            last_updated_local: None,
            last_updated_utc: None,
        }
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("每日奖励: {}", self.bonus_text),
            format!("今日浏览: {} / {}", self.visit_count, self.max_visit_count),
            format!(
                "活跃度:   {} {} {:.0}%",
                activity_gauge(self.activity_percent),
                self.activity_class,
                self.activity_percent
            ),
            format!(
                "本地时间: {}",
                self.last_updated_local.as_deref().unwrap_or("--")
            ),
            format!(
                "UTC 时间: {}",
                self.last_updated_utc.as_deref().unwrap_or("--")
            ),
        ];
        if !self.has_data {
            lines.push("等待数据更新...".to_string());
        }
        lines.join("\n")
    }
}

pub fn load_status(config: &Config, today: NaiveDate) -> Result<StatusView> {
    let record = Database::open(&config.db_path)?.daily_stats()?;
    Ok(StatusView::from_record(
        record.as_ref(),
        today,
        config.max_visit_count,
    ))
}

fn bonus_label(status: BonusStatus) -> (&'static str, &'static str) {
    match status {
        BonusStatus::Unknown => ("未知", "status-unknown"),
        BonusStatus::Attempted => ("已尝试领取", "status-unknown"),
        BonusStatus::Claimed => ("已领取", "status-claimed"),
        BonusStatus::MaybeClaimed => ("可能已领取", "status-claimed"),
        BonusStatus::Unclaimed => ("未领取", "status-unclaimed"),
    }
}

fn activity_width(style: &str) -> Option<f64> {
    WIDTH
        .captures(style)
        .and_then(|captures| captures[1].parse::<f64>().ok())
        .map(|width| width.clamp(0.0, 100.0))
}

fn activity_gauge(percent: f64) -> String {
    let filled = (percent / 10.0).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(10 - filled.min(10)))
}

fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y/%m/%d %H:%M:%S")
        .to_string()
}

fn format_utc(at: DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}
