use crate::browser::PageDriver;
use crate::config::Config;
use crate::db::Database;
use crate::listing::ListingSource;
use crate::site::{self, CLAIM_PROBE, Site};
use crate::stats::{DailyStats, StatsUpdate};
use anyhow::Result;
use chrono::Local;
use rand::Rng;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};

/// Wait points of both routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub settle: Duration,
    pub close_delay: Duration,
    pub dwell_min: Duration,
    pub dwell_max: Duration,
}

impl Timing {
    pub fn from_config(config: &Config) -> Self {
        Self {
            settle: Duration::from_secs(config.page_settle_seconds),
            close_delay: Duration::from_secs(config.close_delay_seconds),
            dwell_min: Duration::from_secs(config.dwell_min_seconds),
            dwell_max: Duration::from_secs(config.dwell_max_seconds),
        }
    }

    /// Uniform in `[dwell_min, dwell_max)`.
    fn dwell(&self) -> Duration {
        if self.dwell_max <= self.dwell_min {
            return self.dwell_min;
        }
        rand::thread_rng().gen_range(self.dwell_min..self.dwell_max)
    }
}

pub struct Automation<D, L> {
    driver: D,
    listing: L,
    site: Site,
    db_path: PathBuf,
    timing: Timing,
    topic_count: AtomicUsize,
}

impl<D, L> Automation<D, L>
where
    D: PageDriver,
    L: ListingSource,
{
    pub fn new(
        driver: D,
        listing: L,
        site: Site,
        db_path: PathBuf,
        timing: Timing,
        topic_count: usize,
    ) -> Self {
        Self {
            driver,
            listing,
            site,
            db_path,
            timing,
            topic_count: AtomicUsize::new(topic_count),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Applies to the next browsing pass; a running pass keeps its limit.
    pub fn set_topic_count(&self, topic_count: usize) {
        self.topic_count.store(topic_count, Ordering::Relaxed);
    }

    pub fn topic_count(&self) -> usize {
        self.topic_count.load(Ordering::Relaxed)
    }

    pub async fn run_check_in(&self) {
        info!("performing daily check-in");

        if let Err(error) = self.check_in().await {
            error!(error = %error, "daily check-in failed");
        }
    }

    pub async fn run_browsing(&self) {
        info!("performing periodic browsing");

        if let Err(error) = self.browse().await {
            error!(error = %error, "periodic browsing failed");
        }
    }

    async fn check_in(&self) -> Result<()> {
        let today = Local::now().date_naive();
        if self
            .load_stats()?
            .is_some_and(|stats| stats.is_claimed_on(today))
        {
            info!("daily bonus already claimed, skipping check-in");
            return Ok(());
        }

        let url = self.site.claim_url()?;
        let tab = self.driver.open(url.as_str()).await?;

        sleep(self.timing.settle).await;
        let probed = async {
            let raw = self.driver.inject(&tab, CLAIM_PROBE).await?;
            let status = site::parse_claim_outcome(&raw)?;
            self.update_stats(&StatsUpdate::bonus(status))?;
            Ok::<_, anyhow::Error>(status)
        }
        .await;

        sleep(self.timing.close_delay).await;
        let closed = self.driver.close(&tab).await;

        let status = probed?;
        closed?;

        info!(status = %status, "check-in probe finished");
        Ok(())
    }

    async fn browse(&self) -> Result<()> {
        let today = Local::now().date_naive();
        if self
            .load_stats()?
            .is_some_and(|stats| stats.reached_terminal_tier_on(today))
        {
            info!("activity tier already terminal, skipping browsing");
            return Ok(());
        }

        let html = self.listing.fetch_listing().await?;

        match site::extract_activity_bar(&html) {
            Some(bar) => {
                info!(class = %bar.class, style = %bar.style, "activity bar observed");
                let terminal = bar.is_terminal();
                self.update_stats(&StatsUpdate::activity(bar))?;

                if terminal {
                    info!("activity tier reached terminal, no topics visited");
                    return Ok(());
                }
            }
            None => info!("activity bar not found in listing"),
        }

        let limit = self.topic_count();
        let topic_ids = site::extract_topic_ids(&html, limit);
        if topic_ids.is_empty() {
            warn!("no topic links found in listing");
            return Ok(());
        }

        info!(count = topic_ids.len(), limit, "topics selected for browsing");

        for topic_id in topic_ids {
            match self.visit_topic(topic_id).await {
                Ok(()) => info!(topic = topic_id, "topic visited"),
                Err(error) => warn!(topic = topic_id, error = %error, "failed to visit topic"),
            }
        }

        Ok(())
    }

    async fn visit_topic(&self, topic_id: u64) -> Result<()> {
        let url = self.site.topic_url(topic_id)?;
        let tab = self.driver.open(url.as_str()).await?;

        sleep(self.timing.dwell()).await;

        self.driver.close(&tab).await?;
        self.update_stats(&StatsUpdate::visit())?;

        Ok(())
    }

    fn load_stats(&self) -> Result<Option<DailyStats>> {
        Database::open(&self.db_path)?.daily_stats()
    }

    fn update_stats(&self, update: &StatsUpdate) -> Result<DailyStats> {
        Database::open(&self.db_path)?.update_daily_stats(update)
    }
}
