pub const DAILY_STATS_KEY: &str = "daily_stats";

pub const CREATE_DAILY_STATS: &str = r#"
CREATE TABLE IF NOT EXISTS daily_stats (
  key                TEXT PRIMARY KEY,
  date               TEXT NOT NULL,
  bonus_status       TEXT NOT NULL DEFAULT 'unknown',
  visit_count        INTEGER NOT NULL DEFAULT 0,
  activity_bar_class TEXT,
  activity_bar_style TEXT,
  last_updated       INTEGER
);
"#;

pub const SELECT_DAILY_STATS: &str = "SELECT date, bonus_status, visit_count, activity_bar_class, activity_bar_style, last_updated
     FROM daily_stats
     WHERE key = ?1";

pub const UPSERT_DAILY_STATS: &str = "INSERT INTO daily_stats (key, date, bonus_status, visit_count, activity_bar_class, activity_bar_style, last_updated)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(key)
     DO UPDATE SET date=excluded.date, bonus_status=excluded.bonus_status, visit_count=excluded.visit_count,
                   activity_bar_class=excluded.activity_bar_class, activity_bar_style=excluded.activity_bar_style,
                   last_updated=excluded.last_updated";

pub fn schema_statements() -> Vec<&'static str> {
    vec![CREATE_DAILY_STATS]
}
