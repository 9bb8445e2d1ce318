use super::{PageDriver, TabHandle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use eoka::{Browser, Page, StealthConfig};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

struct Session {
    browser: Browser,
    pages: HashMap<String, Page>,
}

/// Drives a local Chrome over CDP. The browser starts on first use and
/// keeps running until [`ChromeDriver::shutdown`].
pub struct ChromeDriver {
    headless: bool,
    session: Mutex<Option<Session>>,
}

impl ChromeDriver {
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            session: Mutex::new(None),
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(session) = self.session.lock().await.take() {
            session
                .browser
                .close()
                .await
                .context("Failed to close browser")?;
            info!("browser closed");
        }
        Ok(())
    }

    async fn launch(&self) -> Result<Session> {
        let config = StealthConfig {
            headless: self.headless,
            ..Default::default()
        };
        info!(headless = self.headless, "launching browser");

        let browser = Browser::launch_with_config(config)
            .await
            .context("Failed to launch browser")?;

        Ok(Session {
            browser,
            pages: HashMap::new(),
        })
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn open(&self, url: &str) -> Result<TabHandle> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let session = guard.as_mut().context("Browser session unavailable")?;

        let page = session
            .browser
            .new_page(url)
            .await
            .with_context(|| format!("Failed to open tab: {url}"))?;
        let id = page.target_id().to_string();
        session.pages.insert(id.clone(), page);

        debug!(tab = %id, url, "tab opened");
        Ok(TabHandle::new(id))
    }

    async fn inject(&self, tab: &TabHandle, script: &str) -> Result<String> {
        let guard = self.session.lock().await;
        let page = guard
            .as_ref()
            .and_then(|session| session.pages.get(tab.id()))
            .with_context(|| format!("Tab not open: {tab}"))?;

        page.evaluate::<String>(script)
            .await
            .with_context(|| format!("Failed to evaluate script in tab {tab}"))
    }

    async fn close(&self, tab: &TabHandle) -> Result<()> {
        let mut guard = self.session.lock().await;
        let session = guard
            .as_mut()
            .with_context(|| format!("Tab not open: {tab}"))?;

        session.pages.remove(tab.id());
        session
            .browser
            .close_tab(tab.id())
            .await
            .with_context(|| format!("Failed to close tab {tab}"))?;

        debug!(tab = %tab, "tab closed");
        Ok(())
    }
}
