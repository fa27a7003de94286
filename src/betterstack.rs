use crate::{
    config::BetterStack as BetterStackConfig,
    error::FetchError,
    metrics::external::{Target, external_request_timer, record_external_request_failure},
    monitor::Monitor,
};
use reqwest::Client;
use std::time::Duration;

pub mod monitor;

/// Monitors collected from every page that could be fetched.
///
/// `error` is set when a page failed and pagination stopped early.
#[derive(Debug, Default)]
pub struct MonitorFetch {
    pub monitors: Vec<Monitor>,
    pub pages: u32,
    pub error: Option<FetchError>,
}

impl MonitorFetch {
    pub fn is_truncated(&self) -> bool {
        self.error.is_some()
    }
}

pub struct BetterStack {
    config: BetterStackConfig,
    client: Client,
}

impl BetterStack {
    /// Create a new Better Stack instance
    pub fn new(config: BetterStackConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self { config, client })
    }

    /// Fetch a single page of monitors
    #[tracing::instrument(skip(self))]
    pub async fn get_page(&self, page: u32) -> Result<monitor::Page, FetchError> {
        let _timer = external_request_timer(Target::BetterStack);

        let resp = self
            .client
            .get(&self.config.url)
            .query(&[("page", page)])
            .bearer_auth(&self.config.token)
            .send()
            .await
            .inspect_err(|_| record_external_request_failure(Target::BetterStack))?;

        if !resp.status().is_success() {
            record_external_request_failure(Target::BetterStack);
            return Err(FetchError::Status(resp.status()));
        }

        Ok(resp.json::<monitor::Page>().await?)
    }

    /// Walk every page of monitors.
    ///
    /// A failing page ends pagination; whatever was collected before it is kept.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_monitors(&self) -> MonitorFetch {
        tracing::info!("Fetching monitors from Better Stack");

        let mut fetch = MonitorFetch::default();
        let mut page = 1;

        loop {
            match self.get_page(page).await {
                Ok(body) => {
                    fetch.pages += 1;
                    let has_next = body.has_next();
                    fetch
                        .monitors
                        .extend(body.data.into_iter().map(Monitor::from));

                    if !has_next {
                        break;
                    }

                    page += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch monitor page {}: {}", page, e);
                    fetch.error = Some(e);
                    break;
                }
            }
        }

        fetch
    }
}
