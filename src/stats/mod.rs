use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Activity tiers after which the site grants no further browsing credit.
const TERMINAL_TIER_MARKERS: [&str; 2] = ["almost", "done"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusStatus {
    #[default]
    Unknown,
    Attempted,
    Claimed,
    MaybeClaimed,
    Unclaimed,
}

impl BonusStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Attempted => "attempted",
            Self::Claimed => "claimed",
            Self::MaybeClaimed => "maybe_claimed",
            Self::Unclaimed => "unclaimed",
        }
    }
}

impl fmt::Display for BonusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BonusStatus {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "unknown" => Ok(Self::Unknown),
            "attempted" => Ok(Self::Attempted),
            "claimed" => Ok(Self::Claimed),
            "maybe_claimed" => Ok(Self::MaybeClaimed),
            "unclaimed" => Ok(Self::Unclaimed),
            other => Err(anyhow::anyhow!("Unknown bonus status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityBar {
    pub class: String,
    pub style: String,
}

impl ActivityBar {
    pub fn is_terminal(&self) -> bool {
        is_terminal_tier(&self.class)
    }
}

pub fn is_terminal_tier(class: &str) -> bool {
    TERMINAL_TIER_MARKERS
        .iter()
        .any(|marker| class.contains(marker))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub bonus_status: BonusStatus,
    pub visit_count: u32,
    pub activity_bar_class: Option<String>,
    pub activity_bar_style: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DailyStats {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            bonus_status: BonusStatus::Unknown,
            visit_count: 0,
            activity_bar_class: None,
            activity_bar_style: None,
            last_updated: None,
        }
    }

    pub fn is_for(&self, today: NaiveDate) -> bool {
        self.date == today
    }

    pub fn is_claimed_on(&self, today: NaiveDate) -> bool {
        self.is_for(today) && self.bonus_status == BonusStatus::Claimed
    }

    pub fn reached_terminal_tier_on(&self, today: NaiveDate) -> bool {
        self.is_for(today)
            && self
                .activity_bar_class
                .as_deref()
                .is_some_and(is_terminal_tier)
    }
}

/// A partial update; absent fields leave the record untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsUpdate {
    pub bonus_status: Option<BonusStatus>,
    pub increment_visit: bool,
    pub activity_bar: Option<ActivityBar>,
}

impl StatsUpdate {
    pub fn bonus(status: BonusStatus) -> Self {
        Self {
            bonus_status: Some(status),
            ..Self::default()
        }
    }

    pub fn visit() -> Self {
        Self {
            increment_visit: true,
            ..Self::default()
        }
    }

    pub fn activity(bar: ActivityBar) -> Self {
        Self {
            activity_bar: Some(bar),
            ..Self::default()
        }
    }
}

/// Applies `update` on top of `current`, resetting first when the record
/// belongs to another day or does not exist yet.
pub fn merge(
    current: Option<DailyStats>,
    update: &StatsUpdate,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> DailyStats {
    let mut stats = current
        .filter(|stats| stats.is_for(today))
        .unwrap_or_else(|| DailyStats::empty(today));

    if let Some(status) = update.bonus_status {
        stats.bonus_status = status;
    }
    if update.increment_visit {
        stats.visit_count = stats.visit_count.saturating_add(1);
    }
    if let Some(bar) = &update.activity_bar {
        stats.activity_bar_class = Some(bar.class.clone());
        stats.activity_bar_style = Some(bar.style.clone());
    }
    stats.last_updated = Some(now);

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).expect("valid date")
    }

    fn populated(date: NaiveDate) -> DailyStats {
        DailyStats {
            date,
            bonus_status: BonusStatus::Claimed,
            visit_count: 7,
            activity_bar_class: Some("member-activity-half".to_string()),
            activity_bar_style: Some("width: 52%;".to_string()),
            last_updated: None,
        }
    }

    #[test]
    fn rollover_resets_before_applying_update() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 1, 0, 0).unwrap();
        let merged = merge(Some(populated(day(1))), &StatsUpdate::visit(), day(2), now);

        assert_eq!(merged.date, day(2));
        assert_eq!(merged.visit_count, 1);
        assert_eq!(merged.bonus_status, BonusStatus::Unknown);
        assert_eq!(merged.activity_bar_class, None);
        assert_eq!(merged.activity_bar_style, None);
        assert_eq!(merged.last_updated, Some(now));
    }

    #[test]
    fn visit_increment_preserves_other_fields() {
        let now = Utc::now();
        let merged = merge(Some(populated(day(1))), &StatsUpdate::visit(), day(1), now);

        assert_eq!(merged.visit_count, 8);
        assert_eq!(merged.bonus_status, BonusStatus::Claimed);
        assert_eq!(
            merged.activity_bar_class.as_deref(),
            Some("member-activity-half")
        );
        assert_eq!(merged.activity_bar_style.as_deref(), Some("width: 52%;"));
    }

    #[test]
    fn bonus_update_keeps_visit_count() {
        let merged = merge(
            Some(populated(day(1))),
            &StatsUpdate::bonus(BonusStatus::MaybeClaimed),
            day(1),
            Utc::now(),
        );

        assert_eq!(merged.bonus_status, BonusStatus::MaybeClaimed);
        assert_eq!(merged.visit_count, 7);
    }

    #[test]
    fn first_write_creates_record() {
        let bar = ActivityBar {
            class: "member-activity-start".to_string(),
            style: "width: 3%;".to_string(),
        };
        let merged = merge(None, &StatsUpdate::activity(bar), day(5), Utc::now());

        assert_eq!(merged.date, day(5));
        assert_eq!(merged.visit_count, 0);
        assert_eq!(
            merged.activity_bar_class.as_deref(),
            Some("member-activity-start")
        );
    }

    #[test]
    fn terminal_tier_detection() {
        assert!(is_terminal_tier("member-activity-almost"));
        assert!(is_terminal_tier("member-activity-done"));
        assert!(!is_terminal_tier("member-activity-half"));

        let stats = DailyStats {
            activity_bar_class: Some("member-activity-done".to_string()),
            ..DailyStats::empty(day(1))
        };
        assert!(stats.reached_terminal_tier_on(day(1)));
        assert!(!stats.reached_terminal_tier_on(day(2)));
    }

    #[test]
    fn parses_probe_output() {
        assert_eq!(
            " maybe_claimed\n".parse::<BonusStatus>().unwrap(),
            BonusStatus::MaybeClaimed
        );
        assert!("bogus".parse::<BonusStatus>().is_err());
    }
}
