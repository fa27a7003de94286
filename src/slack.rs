use crate::{
    error::DispatchError,
    metrics::external::{Target, external_request_timer, record_external_request_failure},
};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize, Debug)]
struct Payload<'a> {
    text: &'a str,
    mrkdwn: bool,
}

/// Posts messages to Slack incoming webhooks
pub struct Slack {
    client: Client,
}

impl Slack {
    /// Create a new Slack instance
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self { client })
    }

    /// Send a single mrkdwn message
    #[tracing::instrument(skip(self, webhook_url, text))]
    pub async fn send(&self, webhook_url: &str, text: &str) -> Result<(), DispatchError> {
        let _timer = external_request_timer(Target::Slack);

        let resp = self
            .client
            .post(webhook_url)
            .json(&Payload { text, mrkdwn: true })
            .send()
            .await
            .inspect_err(|_| record_external_request_failure(Target::Slack))?;

        if !resp.status().is_success() {
            record_external_request_failure(Target::Slack);
            return Err(DispatchError::Status(resp.status()));
        }

        Ok(())
    }
}
