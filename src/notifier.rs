use crate::{
    aggregate::{StatusAggregate, aggregate},
    betterstack::BetterStack,
    classifier::{RuleSet, classify},
    config::{Config, EnvironmentRoute},
    error::{DispatchError, PipelineError},
    format::MessageFormatter,
    metrics::{
        self,
        run::{self as run_metrics, MessageKind},
    },
    monitor::Monitor,
    slack::Slack,
    state::{self, StateStore},
    throttle::Throttle,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// What happened to one environment during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Down monitors were reported, the throttle was not consulted
    Alerted { down: usize, chunks: usize },
    /// An all-clear summary was sent and recorded
    AllClear,
    /// An all-clear summary was held back by the throttle
    Suppressed,
    /// At least one message could not be delivered
    DispatchFailed { failures: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentReport {
    pub environment: String,
    pub monitors: usize,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub monitors_fetched: usize,
    /// Pagination stopped early on a failed page
    pub truncated: bool,
    pub unmatched: usize,
    pub environments: Vec<EnvironmentReport>,
    /// Set when the run failed and the failure was reported to the fallback destination
    pub failure: Option<String>,
}

impl RunReport {
    pub fn environment(&self, name: &str) -> Option<&EnvironmentReport> {
        self.environments.iter().find(|e| e.environment == name)
    }
}

pub struct Notifier {
    config: Config,
    rules: RuleSet,
    betterstack: BetterStack,
    slack: Slack,
    throttle: Throttle,
    formatter: MessageFormatter,
}

impl Notifier {
    /// Create a new Notifier using the state backend selected by the configuration
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = state::from_config(&config.state);

        Self::with_store(config, store)
    }

    /// Create a new Notifier persisting throttle state in `store`
    pub fn with_store(config: Config, store: Arc<dyn StateStore>) -> anyhow::Result<Self> {
        let rules = config.rule_set()?;
        let betterstack = BetterStack::new(config.betterstack.clone())?;
        let slack = Slack::new()?;
        let throttle = Throttle::new(store, config.throttle.interval());
        let formatter = MessageFormatter::new(
            config.betterstack.monitor_link_base.clone(),
            config.chunk_size,
            config.long_url_threshold,
        );

        Ok(Self {
            config,
            rules,
            betterstack,
            slack,
            throttle,
            formatter,
        })
    }

    /// Run the pipeline every `interval`, one run at a time
    pub async fn start(&self, interval: Duration) -> anyhow::Result<()> {
        tracing::info!("Starting notifier");

        loop {
            if let Err(e) = self.execute().await {
                tracing::error!("Run failed and could not be reported: {}", e);
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// Run the pipeline once.
    ///
    /// A run-level failure is reported to the fallback destination and returned
    /// in the report. `Err` means that report could not be delivered either.
    pub async fn execute(&self) -> Result<RunReport, PipelineError> {
        match self.run().await {
            Ok(report) => {
                run_metrics::record_run(metrics::Status::Success);
                run_metrics::record_successful_run();

                Ok(report)
            }
            Err(e) => {
                tracing::error!("Error in status check: {}", e);
                run_metrics::record_run(metrics::Status::Failure);

                match self.report_failure(&e).await {
                    Ok(()) => Ok(RunReport {
                        failure: Some(e.to_string()),
                        ..Default::default()
                    }),
                    Err(dispatch) => {
                        tracing::error!("Failed to report error: {}", dispatch);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Fetch, classify and notify every environment
    #[tracing::instrument(skip(self))]
    async fn run(&self) -> Result<RunReport, PipelineError> {
        tracing::info!("Starting system status check");
        let start_time = Instant::now();

        let fetch = self.betterstack.get_all_monitors().await;
        let fetch_time = start_time.elapsed().as_secs_f64();

        let truncated = fetch.is_truncated();
        if fetch.monitors.is_empty() {
            if let Some(e) = fetch.error {
                return Err(PipelineError::Fetch(e));
            }
        }

        let monitors_fetched = fetch.monitors.len();
        run_metrics::record_monitors_fetched(monitors_fetched);
        tracing::info!(
            "Fetched {} monitors in {:.1}s",
            monitors_fetched,
            fetch_time
        );

        let classified = classify(fetch.monitors, &self.rules);

        let mut report = RunReport {
            monitors_fetched,
            truncated,
            unmatched: classified.unmatched,
            ..Default::default()
        };

        for route in &self.config.environments {
            tracing::info!(
                "{}: {} monitors",
                route.name,
                classified.bucket(&route.name).len()
            );
        }

        for route in &self.config.environments {
            let bucket = classified.bucket(&route.name);
            let outcome = self.process_environment(route, bucket).await;

            report.environments.push(EnvironmentReport {
                environment: route.name.clone(),
                monitors: bucket.len(),
                outcome,
            });
        }

        let total_time = start_time.elapsed().as_secs_f64();
        tracing::info!(
            "Status check completed in {:.1}s (fetch {:.1}s, processing {:.1}s)",
            total_time,
            fetch_time,
            total_time - fetch_time
        );

        Ok(report)
    }

    /// Decide whether to notify one environment and send its messages
    #[tracing::instrument(skip(self, bucket), fields(environment = %route.name))]
    async fn process_environment(&self, route: &EnvironmentRoute, bucket: &[Monitor]) -> Outcome {
        let status = aggregate(bucket);
        run_metrics::record_environment(&route.name, status.total, status.down.len());

        if status.has_alerts() {
            return self.send_alerts(route, &status).await;
        }

        if !self.throttle.should_notify(&route.name).await {
            run_metrics::record_suppressed(&route.name);
            return Outcome::Suppressed;
        }

        tracing::info!("Sending {} notification (all clear)", route.name);

        let summary = self.formatter.render_summary(&status, &route.name);
        match self.dispatch(route, MessageKind::Summary, &summary).await {
            Ok(()) => {
                self.throttle.record_sent(&route.name).await;
                Outcome::AllClear
            }
            Err(_) => Outcome::DispatchFailed { failures: 1 },
        }
    }

    /// Send the summary followed by every down-list chunk, in order
    async fn send_alerts(&self, route: &EnvironmentRoute, status: &StatusAggregate) -> Outcome {
        tracing::info!(
            "Sending {} notification ({} alerts)",
            route.name,
            status.down.len()
        );

        let summary = self.formatter.render_summary(status, &route.name);
        let chunks = self.formatter.render_down_list(&status.down);

        let mut failures = 0;

        if self
            .dispatch(route, MessageKind::Summary, &summary)
            .await
            .is_err()
        {
            failures += 1;
        }

        for chunk in &chunks {
            if self
                .dispatch(route, MessageKind::DownList, chunk)
                .await
                .is_err()
            {
                failures += 1;
            }
        }

        match failures {
            0 => Outcome::Alerted {
                down: status.down.len(),
                chunks: chunks.len(),
            },
            failures => Outcome::DispatchFailed { failures },
        }
    }

    async fn dispatch(
        &self,
        route: &EnvironmentRoute,
        kind: MessageKind,
        text: &str,
    ) -> Result<(), DispatchError> {
        let result = match self.config.webhook(&route.destination) {
            Some(url) => self.slack.send(url, text).await,
            None => Err(DispatchError::UnknownDestination(route.destination.clone())),
        };

        match &result {
            Ok(()) => run_metrics::record_notification(&route.name, kind, metrics::Status::Success),
            Err(e) => {
                tracing::error!(
                    "Failed to send {} message for {} to {}: {}",
                    kind,
                    route.name,
                    route.destination,
                    e
                );
                run_metrics::record_notification(&route.name, kind, metrics::Status::Failure);
            }
        }

        result
    }

    /// Post a run failure to the fallback destination
    async fn report_failure(&self, error: &PipelineError) -> Result<(), DispatchError> {
        let fallback = &self.config.slack.fallback;
        let url = self
            .config
            .webhook(fallback)
            .ok_or_else(|| DispatchError::UnknownDestination(fallback.clone()))?;

        let result = self
            .slack
            .send(url, &MessageFormatter::render_error(error))
            .await;

        let status = match result {
            Ok(()) => metrics::Status::Success,
            Err(_) => metrics::Status::Failure,
        };
        run_metrics::record_notification(fallback, MessageKind::Error, status);

        result
    }
}
