//! Slack mrkdwn rendering of environment summaries and down-monitor lists.

use crate::{
    aggregate::StatusAggregate,
    monitor::{Monitor, Status},
};
use std::fmt::Write;

pub const DEFAULT_CHUNK_SIZE: usize = 15;
pub const DEFAULT_LONG_URL_THRESHOLD: usize = 100;
pub const DEFAULT_MONITOR_LINK_BASE: &str = "https://uptime.betterstack.com/team/t161704/monitors";

#[derive(Debug, Clone)]
pub struct MessageFormatter {
    monitor_link_base: String,
    chunk_size: usize,
    long_url_threshold: usize,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(
            DEFAULT_MONITOR_LINK_BASE,
            DEFAULT_CHUNK_SIZE,
            DEFAULT_LONG_URL_THRESHOLD,
        )
    }
}

impl MessageFormatter {
    pub fn new(
        monitor_link_base: impl Into<String>,
        chunk_size: usize,
        long_url_threshold: usize,
    ) -> Self {
        Self {
            monitor_link_base: monitor_link_base.into().trim_end_matches('/').to_string(),
            chunk_size: chunk_size.max(1),
            long_url_threshold,
        }
    }

    /// Render the status overview for one environment
    pub fn render_summary(&self, aggregate: &StatusAggregate, environment: &str) -> String {
        let environment = environment.to_uppercase();
        let percentage = aggregate
            .uptime_percentage()
            .map(|p| format!("{:.1}", p))
            .unwrap_or_else(|| "N/A".to_string());
        let down = aggregate.count(&Status::Down);

        let mut message = format!(
            ":warning: {environment} Status - {percentage}% Operational\n\
             :bar_chart: {environment} Environment Overview - {down} Services Down\n\
             *Total Monitors*\n{}\n\
             *Operational*\n:small_blue_diamond: {}\n\
             *Down*\n:small_red_triangle_down: {down}\n\
             *Paused*\n:double_vertical_bar: {}\n\
             *Validating*\n:arrows_counterclockwise: {}\n",
            aggregate.total,
            aggregate.count(&Status::Up),
            aggregate.count(&Status::Paused),
            aggregate.count(&Status::Validating),
        );

        let others: Vec<String> = aggregate
            .other_counts()
            .map(|(status, count)| format!("{}: {}", status, count))
            .collect();
        if !others.is_empty() {
            let _ = writeln!(message, "*Other*\n{}", others.join(", "));
        }

        message
    }

    /// Render down monitors as consecutive messages of at most `chunk_size` entries each.
    ///
    /// Empty input yields no messages.
    pub fn render_down_list(&self, down: &[Monitor]) -> Vec<String> {
        down.chunks(self.chunk_size)
            .enumerate()
            .map(|(index, chunk)| {
                let mut message = if index == 0 {
                    ":red_circle: Service Currently Down\n".to_string()
                } else {
                    ":red_circle: Service Currently Down (continued)\n".to_string()
                };

                for monitor in chunk {
                    message.push_str(&self.render_entry(monitor));
                }

                message
            })
            .collect()
    }

    fn render_entry(&self, monitor: &Monitor) -> String {
        let url = ensure_https(&monitor.url);
        let path = if url.chars().count() > self.long_url_threshold {
            format!("<{}|path>", url)
        } else {
            url
        };

        format!(
            "• <{}/{}|{}>\n  path: {}\n",
            self.monitor_link_base, monitor.id, monitor.display_name, path
        )
    }

    /// Render the message sent to the fallback destination when a run fails
    pub fn render_error(error: &impl std::fmt::Display) -> String {
        format!(
            ":x: *Monitor System Error*\nFailed to check system status: {}",
            error
        )
    }
}

fn ensure_https(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
