use crate::config::Schedule;
use anyhow::{Result, bail};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

pub const SETTINGS_POLL_SECONDS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alarm {
    CheckIn,
    Browsing,
}

impl Alarm {
    pub fn name(self) -> &'static str {
        match self {
            Self::CheckIn => "daily_checkin",
            Self::Browsing => "periodic_browse",
        }
    }
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named recurring timers. Registering an existing name replaces it.
pub trait Scheduler {
    fn register(&mut self, alarm: Alarm, period: Duration) -> Result<()>;
    fn clear_all(&mut self);
}

/// Clears every timer, then arms both routines from `schedule`.
pub fn arm_alarms<S: Scheduler>(scheduler: &mut S, schedule: Schedule) -> Result<()> {
    scheduler.clear_all();
    scheduler.register(Alarm::CheckIn, schedule.check_in_every)?;
    scheduler.register(Alarm::Browsing, schedule.browse_every)?;

    info!(
        check_in_minutes = schedule.check_in_every.as_secs() / 60,
        browsing_minutes = schedule.browse_every.as_secs() / 60,
        "alarms armed"
    );
    Ok(())
}

/// Tokio-backed timers that deliver fired alarms over a channel.
pub struct AlarmScheduler {
    sender: UnboundedSender<Alarm>,
    timers: HashMap<Alarm, JoinHandle<()>>,
}

impl AlarmScheduler {
    pub fn new(sender: UnboundedSender<Alarm>) -> Self {
        Self {
            sender,
            timers: HashMap::new(),
        }
    }

    pub fn armed(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for AlarmScheduler {
    fn register(&mut self, alarm: Alarm, period: Duration) -> Result<()> {
        if period.is_zero() {
            bail!("alarm {alarm} needs a period of at least one second");
        }

        let sender = self.sender.clone();
        let timer = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                debug!(alarm = %alarm, "alarm fired");
                if sender.send(alarm).is_err() {
                    break;
                }
            }
        });

        if let Some(previous) = self.timers.insert(alarm, timer) {
            previous.abort();
        }
        Ok(())
    }

    fn clear_all(&mut self) {
        self.timers.drain().for_each(|(_, timer)| timer.abort());
    }
}

impl Drop for AlarmScheduler {
    fn drop(&mut self) {
        self.clear_all();
    }
}
