use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_DIR: &str = ".dailybonus";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_SITE: &str = "https://www.v2ex.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub check_in_on_startup: bool,
    pub check_in_interval_hours: u32,
    pub browsing_interval_minutes: u32,
    pub topic_count: usize,
    pub max_visit_count: u32,
    pub site_base_url: String,
    pub db_path: PathBuf,
    pub api_port: u16,
    pub headless: bool,
    pub page_settle_seconds: u64,
    pub close_delay_seconds: u64,
    pub dwell_min_seconds: u64,
    pub dwell_max_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_in_on_startup: false,
            check_in_interval_hours: 3,
            browsing_interval_minutes: 60,
            topic_count: 8,
            max_visit_count: 80,
            site_base_url: DEFAULT_SITE.to_string(),
            db_path: default_root_dir().join("db").join("stats.db"),
            api_port: 7891,
            headless: true,
            page_settle_seconds: 5,
            close_delay_seconds: 5,
            dwell_min_seconds: 5,
            dwell_max_seconds: 10,
        }
    }
}

/// The subset of settings that decides how alarms are armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub check_in_every: Duration,
    pub browse_every: Duration,
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        Ok(config)
    }

    /// Rules shared by `set_value` and files edited by hand.
    pub fn validate(&self) -> Result<()> {
        if self.check_in_interval_hours == 0 {
            bail!("check_in_interval_hours must be at least 1");
        }
        if self.browsing_interval_minutes == 0 {
            bail!("browsing_interval_minutes must be at least 1");
        }
        if self.topic_count == 0 {
            bail!("topic_count must be at least 1");
        }
        if self.dwell_max_seconds < self.dwell_min_seconds {
            bail!(
                "dwell_max_seconds ({}) must not be below dwell_min_seconds ({})",
                self.dwell_max_seconds,
                self.dwell_min_seconds
            );
        }
        Url::parse(&self.site_base_url)
            .with_context(|| format!("Invalid site_base_url: {}", self.site_base_url))?;

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            check_in_every: Duration::from_secs(u64::from(self.check_in_interval_hours) * 3600),
            browse_every: Duration::from_secs(u64::from(self.browsing_interval_minutes) * 60),
        }
    }

    /// Whether `latest` changes anything the running service applies live.
    pub fn live_settings_changed(&self, latest: &Self) -> bool {
        self.schedule() != latest.schedule() || self.topic_count != latest.topic_count
    }

    pub fn site_url(&self) -> Result<Url> {
        Url::parse(&self.site_base_url)
            .with_context(|| format!("Invalid site_base_url: {}", self.site_base_url))
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "check_in_on_startup" => {
                self.check_in_on_startup = parse_bool(value, "check_in_on_startup")?;
            }
            "check_in_interval_hours" => {
                self.check_in_interval_hours = parse_positive(value, "check_in_interval_hours")?;
            }
            "browsing_interval_minutes" => {
                self.browsing_interval_minutes =
                    parse_positive(value, "browsing_interval_minutes")?;
            }
            "topic_count" => {
                self.topic_count = parse_positive::<u32>(value, "topic_count")? as usize;
            }
            "max_visit_count" => {
                self.max_visit_count = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("max_visit_count must be a number"))?;
            }
            "site_base_url" => {
                let trimmed = value.trim().trim_end_matches('/');
                Url::parse(trimmed).with_context(|| format!("Invalid URL: {trimmed}"))?;
                self.site_base_url = trimmed.to_string();
            }
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "headless" => {
                self.headless = parse_bool(value, "headless")?;
            }
            "page_settle_seconds" => {
                self.page_settle_seconds = parse_seconds(value, "page_settle_seconds")?;
            }
            "close_delay_seconds" => {
                self.close_delay_seconds = parse_seconds(value, "close_delay_seconds")?;
            }
            "dwell_min_seconds" => {
                self.dwell_min_seconds = parse_seconds(value, "dwell_min_seconds")?;
            }
            "dwell_max_seconds" => {
                self.dwell_max_seconds = parse_seconds(value, "dwell_max_seconds")?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: check_in_on_startup|checkInOnStartup, check_in_interval_hours|checkInInterval, browsing_interval_minutes|browsingInterval, topic_count|topicCount, max_visit_count|maxVisitCount, site_base_url|site.base_url, db_path|db.path, api_port|api.port, headless|browser.headless, page_settle_seconds, close_delay_seconds, dwell_min_seconds, dwell_max_seconds"
                );
            }
        }

        self.validate()
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "check_in_on_startup" => Some(self.check_in_on_startup.to_string()),
            "check_in_interval_hours" => Some(self.check_in_interval_hours.to_string()),
            "browsing_interval_minutes" => Some(self.browsing_interval_minutes.to_string()),
            "topic_count" => Some(self.topic_count.to_string()),
            "max_visit_count" => Some(self.max_visit_count.to_string()),
            "site_base_url" => Some(self.site_base_url.clone()),
            "db_path" => Some(self.db_path.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "headless" => Some(self.headless.to_string()),
            "page_settle_seconds" => Some(self.page_settle_seconds.to_string()),
            "close_delay_seconds" => Some(self.close_delay_seconds.to_string()),
            "dwell_min_seconds" => Some(self.dwell_min_seconds.to_string()),
            "dwell_max_seconds" => Some(self.dwell_max_seconds.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "check_in_on_startup" | "checkInOnStartup" | "schedule.check_in_on_startup" => {
            "check_in_on_startup"
        }
        "check_in_interval_hours" | "checkInInterval" | "schedule.check_in_interval" => {
            "check_in_interval_hours"
        }
        "browsing_interval_minutes" | "browsingInterval" | "schedule.browsing_interval" => {
            "browsing_interval_minutes"
        }
        "topic_count" | "topicCount" | "schedule.topic_count" => "topic_count",
        "max_visit_count" | "maxVisitCount" | "schedule.max_visit_count" => "max_visit_count",
        "site_base_url" | "site.base_url" => "site_base_url",
        "db_path" | "db.path" => "db_path",
        "api_port" | "api.port" => "api_port",
        "headless" | "browser.headless" => "headless",
        "page_settle_seconds" | "browser.settle_seconds" => "page_settle_seconds",
        "close_delay_seconds" | "browser.close_delay_seconds" => "close_delay_seconds",
        "dwell_min_seconds" | "browse.dwell_min_seconds" => "dwell_min_seconds",
        "dwell_max_seconds" | "browse.dwell_max_seconds" => "dwell_max_seconds",
        _ => key,
    }
}

fn parse_bool(value: &str, key: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .map_err(|_| anyhow!("{key} must be true/false"))
}

fn parse_positive<T>(value: &str, key: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + From<u8>,
{
    let parsed = value
        .parse::<T>()
        .map_err(|_| anyhow!("{key} must be a number"))?;
    if parsed < T::from(1) {
        bail!("{key} must be at least 1");
    }
    Ok(parsed)
}

fn parse_seconds(value: &str, key: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|_| anyhow!("{key} must be a number of seconds"))
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
