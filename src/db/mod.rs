pub mod queries;

use crate::stats::{self, DATE_FORMAT, DailyStats, StatsUpdate};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;

type RawStatsRow = (
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    Option<i64>,
);

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    /// The stored record as-is, whatever day it belongs to.
    pub fn daily_stats(&self) -> Result<Option<DailyStats>> {
        read_stats(&self.conn)
    }

    /// Read-merge-write of the single record, stamped with the local date.
    pub fn update_daily_stats(&mut self, update: &StatsUpdate) -> Result<DailyStats> {
        self.update_daily_stats_on(update, Local::now().date_naive(), Utc::now())
    }

    pub fn update_daily_stats_on(
        &mut self,
        update: &StatsUpdate,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DailyStats> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        let current = read_stats(&transaction)?;
        let merged = stats::merge(current, update, today, now);

        transaction
            .execute(
                queries::UPSERT_DAILY_STATS,
                params![
                    queries::DAILY_STATS_KEY,
                    merged.date.format(DATE_FORMAT).to_string(),
                    merged.bonus_status.as_str(),
                    i64::from(merged.visit_count),
                    merged.activity_bar_class.as_deref(),
                    merged.activity_bar_style.as_deref(),
                    merged.last_updated.map(|at| at.timestamp_millis()),
                ],
            )
            .context("Failed to write daily stats")?;

        transaction
            .commit()
            .context("Failed to commit daily stats")?;

        Ok(merged)
    }
}

fn read_stats(conn: &Connection) -> Result<Option<DailyStats>> {
    let row: Option<RawStatsRow> = conn
        .query_row(
            queries::SELECT_DAILY_STATS,
            params![queries::DAILY_STATS_KEY],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()
        .context("Failed to query daily stats")?;

    row.map(decode_stats).transpose()
}

fn decode_stats(
    (date, status, visit_count, class, style, last_updated): RawStatsRow,
) -> Result<DailyStats> {
    Ok(DailyStats {
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .with_context(|| format!("Invalid stored stats date: {date}"))?,
        bonus_status: status.parse()?,
        visit_count: u32::try_from(visit_count)
            .with_context(|| format!("Invalid stored visit_count: {visit_count}"))?,
        activity_bar_class: class,
        activity_bar_style: style,
        last_updated: last_updated.and_then(DateTime::from_timestamp_millis),
    })
}
