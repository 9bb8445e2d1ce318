mod api;
mod browser;
mod cli;
mod config;
mod db;
mod display;
mod listing;
mod routine;
mod scheduler;
mod site;
mod stats;

use crate::browser::cdp::ChromeDriver;
use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::listing::HttpListing;
use crate::routine::{Automation, Timing};
use crate::scheduler::{Alarm, AlarmScheduler, SETTINGS_POLL_SECONDS, Scheduler};
use crate::site::Site;
use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type SiteAutomation = Automation<ChromeDriver, HttpListing>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Service => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
        Commands::CheckIn => {
            let automation = build_automation(&load_or_default_config()?)?;
            automation.run_check_in().await;
            automation.driver().shutdown().await
        }
        Commands::Browse => {
            let automation = build_automation(&load_or_default_config()?)?;
            automation.run_browsing().await;
            automation.driver().shutdown().await
        }
        Commands::Status => handle_status(),
        Commands::Config { command } => handle_config_command(command),
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let view = display::load_status(&config, Local::now().date_naive())?;

    println!("{}", view.render());
    Ok(())
}

fn build_automation(config: &Config) -> Result<SiteAutomation> {
    let site = Site::new(config.site_url()?);
    let listing = HttpListing::new(&site)?;

    Ok(Automation::new(
        ChromeDriver::new(config.headless),
        listing,
        site,
        config.db_path.clone(),
        Timing::from_config(config),
        config.topic_count,
    ))
}

async fn run_service(config: Config) -> Result<()> {
    let automation = Arc::new(build_automation(&config)?);

    let (alarm_sender, mut alarms) = mpsc::unbounded_channel();
    let mut alarm_timers = AlarmScheduler::new(alarm_sender);
    scheduler::arm_alarms(&mut alarm_timers, config.schedule())?;

    if config.check_in_on_startup {
        info!("startup check-in enabled");
        dispatch(&automation, Alarm::CheckIn);
    }

    let mut settings_poll = interval(Duration::from_secs(SETTINGS_POLL_SECONDS));
    settings_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    settings_poll.tick().await;

    let api_server = api::run_server(Arc::new(config.clone()));
    tokio::pin!(api_server);

    let mut current = config;
    info!(timers = alarm_timers.armed(), "dailybonus service started");

    loop {
        tokio::select! {
            Some(alarm) = alarms.recv() => {
                dispatch(&automation, alarm);
            }
            _ = settings_poll.tick() => {
                match Config::load() {
                    Ok(latest) if current.live_settings_changed(&latest) => {
                        info!("settings changed, re-arming alarms");
                        automation.set_topic_count(latest.topic_count);
                        match scheduler::arm_alarms(&mut alarm_timers, latest.schedule()) {
                            Ok(()) => current = latest,
                            Err(error) => {
                                warn!(error = %error, "failed to re-arm alarms, restoring previous");
                                automation.set_topic_count(current.topic_count);
                                scheduler::arm_alarms(&mut alarm_timers, current.schedule())?;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(error) => {
                        warn!("failed to reload settings, keeping current settings: {error:#}");
                    }
                }
            }
            api_result = &mut api_server => {
                api_result?;
                break;
            }
            _ = signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    alarm_timers.clear_all();
    automation.driver().shutdown().await
}

/// Each firing runs on its own task; the two routines are not serialized.
fn dispatch(automation: &Arc<SiteAutomation>, alarm: Alarm) {
    let automation = Arc::clone(automation);

    tokio::spawn(async move {
        match alarm {
            Alarm::CheckIn => automation.run_check_in().await,
            Alarm::Browsing => automation.run_browsing().await,
        }
    });
}

fn load_or_default_config() -> Result<Config> {
    let config_path = Config::config_path()?;
    if config_path.exists() {
        return Config::load();
    }

    let config = Config::default();
    config.save()?;
    info!(path = %config_path.display(), "default config written");
    Ok(config)
}
