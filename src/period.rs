//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 计量周期模块
//!
//! 从时间戳推导每种周期的规范键（UTC）：
//!
//! | 周期  | 格式             | 示例            |
//! |-------|------------------|-----------------|
//! | year  | `YYYY`           | `2017`          |
//! | month | `YYYY-MM`        | `2017-01`       |
//! | day   | `YYYY-MM-DD`     | `2017-01-01`    |
//! | hour  | `YYYY-MM-DDTHH`  | `2017-01-01T00` |
//! | week  | `YYYY-Www` (ISO) | `2016-W52`      |
//!
//! 周键使用 ISO-8601 周年份，年初几天可能属于上一年的最后一周。

use crate::constants::{
    SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_LONGEST_MONTH, SECONDS_PER_LONGEST_YEAR,
    SECONDS_PER_WEEK,
};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl PeriodKind {
    /// 所有周期类型，按窗口从小到大排列
    pub const ALL: [PeriodKind; 5] = [
        PeriodKind::Hour,
        PeriodKind::Day,
        PeriodKind::Week,
        PeriodKind::Month,
        PeriodKind::Year,
    ];

    /// 从字符串解析周期类型
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hour" => Some(PeriodKind::Hour),
            "day" => Some(PeriodKind::Day),
            "week" => Some(PeriodKind::Week),
            "month" => Some(PeriodKind::Month),
            "year" => Some(PeriodKind::Year),
            _ => None,
        }
    }

    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Hour => "hour",
            PeriodKind::Day => "day",
            PeriodKind::Week => "week",
            PeriodKind::Month => "month",
            PeriodKind::Year => "year",
        }
    }

    /// 周期的最大长度
    ///
    /// 月和年按最长情况计算（31天、366天）。
    pub fn period_length(&self) -> Duration {
        let secs = match self {
            PeriodKind::Hour => SECONDS_PER_HOUR,
            PeriodKind::Day => SECONDS_PER_DAY,
            PeriodKind::Week => SECONDS_PER_WEEK,
            PeriodKind::Month => SECONDS_PER_LONGEST_MONTH,
            PeriodKind::Year => SECONDS_PER_LONGEST_YEAR,
        };
        Duration::from_secs(secs)
    }

    /// 计数器过期时间：周期长度加宽限期
    pub fn counter_ttl(&self, grace: Duration) -> Duration {
        self.period_length() + grace
    }

    /// 该周期在给定时间的规范键
    pub fn key_for(&self, when: &DateTime<Utc>) -> String {
        match self {
            PeriodKind::Hour => when.format("%Y-%m-%dT%H").to_string(),
            PeriodKind::Day => when.format("%Y-%m-%d").to_string(),
            PeriodKind::Week => {
                let week = when.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            PeriodKind::Month => when.format("%Y-%m").to_string(),
            PeriodKind::Year => format!("{:04}", when.year()),
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 某一时刻所有周期的规范键
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodKeys {
    pub hour: String,
    pub day: String,
    pub week: String,
    pub month: String,
    pub year: String,
}

impl PeriodKeys {
    /// 从时间戳推导所有周期键
    pub fn derive(when: &DateTime<Utc>) -> Self {
        Self {
            hour: PeriodKind::Hour.key_for(when),
            day: PeriodKind::Day.key_for(when),
            week: PeriodKind::Week.key_for(when),
            month: PeriodKind::Month.key_for(when),
            year: PeriodKind::Year.key_for(when),
        }
    }

    /// 获取指定周期的键
    pub fn get(&self, kind: PeriodKind) -> &str {
        match kind {
            PeriodKind::Hour => &self.hour,
            PeriodKind::Day => &self.day,
            PeriodKind::Week => &self.week,
            PeriodKind::Month => &self.month,
            PeriodKind::Year => &self.year,
        }
    }

    /// 按 [`PeriodKind::ALL`] 顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (PeriodKind, &str)> + '_ {
        PeriodKind::ALL.iter().map(move |kind| (*kind, self.get(*kind)))
    }
}

/// 从时间戳推导所有周期键
pub fn derive_period_keys(when: &DateTime<Utc>) -> PeriodKeys {
    PeriodKeys::derive(when)
}
