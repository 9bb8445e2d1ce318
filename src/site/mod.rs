//! Everything that depends on the forum's markup lives here.
//!
//! The patterns below target the 2025 V2EX layout. A failed match is a
//! normal "not found" and never an error.

use crate::stats::{ActivityBar, BonusStatus};
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

const CLAIM_PATH: &str = "mission/daily";
const RECENT_PATH: &str = "recent";

static ACTIVITY_BAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div class="member-activity-bar">\s*<div class="([^"]+)" style="([^"]*)""#)
        .expect("activity bar pattern is valid")
});

static TOPIC_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="/t/(\d+)(?:#\w+)?""#).expect("topic link pattern is valid")
});

/// Runs inside the claim page. Clicking only proves an attempt was made;
/// the "already claimed" banner is the sole confirmation of success.
pub const CLAIM_PROBE: &str = r#"(() => {
    const button = document.querySelector('input[type="button"][value^="领取"]');
    if (button) {
        button.click();
        return 'attempted';
    }
    if (document.body && document.body.innerText.includes('每日登录奖励已领取')) {
        return 'claimed';
    }
    return 'maybe_claimed';
})()"#;

#[derive(Debug, Clone)]
pub struct Site {
    base: Url,
}

impl Site {
    /// A base with a path prefix keeps it: relative joins resolve under it.
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn claim_url(&self) -> Result<Url> {
        self.join(CLAIM_PATH)
    }

    pub fn recent_url(&self) -> Result<Url> {
        self.join(RECENT_PATH)
    }

    pub fn topic_url(&self, topic_id: u64) -> Result<Url> {
        self.join(&format!("t/{topic_id}"))
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Failed to build URL {path} on {}", self.base))
    }
}

/// Maps the claim probe's return value onto a bonus status.
pub fn parse_claim_outcome(raw: &str) -> Result<BonusStatus> {
    let status = raw.parse::<BonusStatus>()?;
    match status {
        BonusStatus::Attempted | BonusStatus::Claimed | BonusStatus::MaybeClaimed => Ok(status),
        other => bail!("Claim probe returned unexpected status: {other}"),
    }
}

pub fn extract_activity_bar(html: &str) -> Option<ActivityBar> {
    ACTIVITY_BAR.captures(html).map(|captures| ActivityBar {
        class: captures[1].to_string(),
        style: captures[2].to_string(),
    })
}

/// Topic ids in first-seen order, without duplicates, at most `limit`.
pub fn extract_topic_ids(html: &str, limit: usize) -> Vec<u64> {
    let mut seen = HashSet::new();

    TOPIC_LINK
        .captures_iter(html)
        .filter_map(|captures| captures[1].parse::<u64>().ok())
        .filter(|id| seen.insert(*id))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_ids_are_deduplicated_in_order_and_limited() {
        let html = r#"
            <a href="/t/100">first</a>
            <a href="/t/200#r1">second</a>
            <a href="/t/100">again</a>
            <a href="/t/300">third</a>
        "#;

        assert_eq!(extract_topic_ids(html, 2), vec![100, 200]);
        assert_eq!(extract_topic_ids(html, 10), vec![100, 200, 300]);
    }

    #[test]
    fn ignores_non_topic_links() {
        let html = r#"<a href="/go/python">node</a><a href="/t/abc">bad</a><a href="/member/t">m</a>"#;
        assert!(extract_topic_ids(html, 5).is_empty());
    }

    #[test]
    fn finds_activity_bar() {
        let html = r#"<td><div class="member-activity-bar"><div class="member-activity-almost" style="width: 86%;"></div></div></td>"#;
        let bar = extract_activity_bar(html).expect("bar present");

        assert_eq!(bar.class, "member-activity-almost");
        assert_eq!(bar.style, "width: 86%;");
        assert!(bar.is_terminal());
    }

    #[test]
    fn missing_activity_bar_is_none() {
        assert!(extract_activity_bar("<div class=\"box\"></div>").is_none());
    }

    #[test]
    fn builds_site_urls() {
        let site = Site::new(Url::parse("https://www.v2ex.com").unwrap());

        assert_eq!(
            site.claim_url().unwrap().as_str(),
            "https://www.v2ex.com/mission/daily"
        );
        assert_eq!(
            site.topic_url(42).unwrap().as_str(),
            "https://www.v2ex.com/t/42"
        );
        assert_eq!(site.recent_url().unwrap().as_str(), "https://www.v2ex.com/recent");
    }

    #[test]
    fn path_prefix_without_trailing_slash_is_kept() {
        let site = Site::new(Url::parse("https://mirror.example/forum").unwrap());

        assert_eq!(site.base_url().as_str(), "https://mirror.example/forum/");
        assert_eq!(
            site.claim_url().unwrap().as_str(),
            "https://mirror.example/forum/mission/daily"
        );
        assert_eq!(
            site.topic_url(7).unwrap().as_str(),
            "https://mirror.example/forum/t/7"
        );
    }

    #[test]
    fn claim_outcome_rejects_non_probe_values() {
        assert_eq!(parse_claim_outcome("attempted").unwrap(), BonusStatus::Attempted);
        assert!(parse_claim_outcome("unknown").is_err());
    }
}
