use crate::site::Site;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA, REFERER};
use std::time::Duration;
use url::Url;

const FETCH_TIMEOUT_SECONDS: u64 = 30;

/// Source of the recent-topics listing page.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listing(&self) -> Result<String>;
}

pub struct HttpListing {
    client: Client,
    url: Url,
}

impl HttpListing {
    pub fn new(site: &Site) -> Result<Self> {
        Self::with_builder(site, Client::builder())
    }

    fn with_builder(site: &Site, builder: ClientBuilder) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            REFERER,
            HeaderValue::from_str(site.base_url().as_str()).context("Invalid referer header")?,
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = builder
            .default_headers(headers)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: site.recent_url()?,
        })
    }
}

#[async_trait]
impl ListingSource for HttpListing {
    async fn fetch_listing(&self) -> Result<String> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to request {}", self.url))?
            .error_for_status()
            .with_context(|| format!("Listing request rejected: {}", self.url))?;

        response
            .text()
            .await
            .context("Failed to read listing body")
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpListing, ListingSource};
    use crate::site::Site;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use reqwest::Client;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;
    use url::Url;

    type SeenHeaders = Arc<Mutex<Option<HeaderMap>>>;

    async fn serve(status: StatusCode, seen: SeenHeaders) -> Url {
        let app = Router::new()
            .route(
                "/recent",
                get(
                    move |State(seen): State<SeenHeaders>, headers: HeaderMap| async move {
                        *seen.lock().unwrap() = Some(headers);
                        (status, "<a href=\"/t/101#reply3\">topic</a>")
                    },
                ),
            )
            .with_state(seen);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Url::parse(&format!("http://{addr}/")).expect("base url")
    }

    fn listing(base: Url) -> HttpListing {
        HttpListing::with_builder(&Site::new(base), Client::builder().no_proxy())
            .expect("listing client")
    }

    #[tokio::test]
    async fn fetch_sends_referer_and_no_cache_headers() {
        let seen = SeenHeaders::default();
        let base = serve(StatusCode::OK, Arc::clone(&seen)).await;

        let body = listing(base.clone())
            .fetch_listing()
            .await
            .expect("listing fetched");
        assert!(body.contains("/t/101"));

        let headers = seen.lock().unwrap().take().expect("request reached server");
        assert_eq!(headers["referer"], base.as_str());
        assert_eq!(headers["cache-control"], "no-cache");
        assert_eq!(headers["pragma"], "no-cache");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let seen = SeenHeaders::default();
        let base = serve(StatusCode::SERVICE_UNAVAILABLE, Arc::clone(&seen)).await;

        let result = listing(base).fetch_listing().await;

        assert!(result.is_err());
        assert!(seen.lock().unwrap().is_some());
    }
}
