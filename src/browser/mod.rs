pub mod cdp;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

/// Opaque reference to an open tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabHandle(String);

impl TabHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opens pages in background tabs, evaluates scripts in them, closes them.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn open(&self, url: &str) -> Result<TabHandle>;

    /// Evaluates `script` in the page and returns its string result.
    async fn inject(&self, tab: &TabHandle, script: &str) -> Result<String>;

    async fn close(&self, tab: &TabHandle) -> Result<()>;
}
