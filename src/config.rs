use crate::{
    classifier::{EXPLORER_PREPROD, PRODUCTION, Rule, RuleSet, STAGING},
    format::{DEFAULT_CHUNK_SIZE, DEFAULT_LONG_URL_THRESHOLD, DEFAULT_MONITOR_LINK_BASE},
    throttle::DEFAULT_INTERVAL,
};
use anyhow::{Result, bail};
use serde::Deserialize;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

const DEFAULT_MONITORS_URL: &str = "https://uptime.betterstack.com/api/v2/monitors";

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub betterstack: BetterStack,
    pub slack: Slack,
    #[serde(default)]
    pub environments: Vec<EnvironmentRoute>,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub throttle: Throttle,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_long_url_threshold")]
    pub long_url_threshold: usize,
    #[serde(default)]
    pub state: State,
    pub http: Option<Http>,
}

#[derive(Debug, Clone)]
pub struct BetterStack {
    pub url: String,
    pub token: String,
    pub monitor_link_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Slack {
    pub destinations: HashMap<String, Destination>,
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub url: String,
}

/// Which destination receives the messages of an environment
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EnvironmentRoute {
    pub name: String,
    pub destination: String,
}

impl EnvironmentRoute {
    pub fn new(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            destination: destination.into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    #[serde(default = "default_rule_set")]
    pub rule_set: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            rule_set: default_rule_set(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Throttle {
    pub interval_seconds: u64,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL.as_secs(),
        }
    }
}

impl Throttle {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// ConfigMap when running inside Kubernetes, file otherwise
    #[default]
    Auto,
    ConfigMap,
    File,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct State {
    pub backend: StateBackend,
    pub namespace: String,
    pub name: String,
    pub directory: PathBuf,
}

impl Default for State {
    fn default() -> Self {
        Self {
            backend: StateBackend::Auto,
            namespace: "cronjob".to_string(),
            name: "betterstack-notification-state".to_string(),
            directory: std::env::temp_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Http {
    pub host: String,
    pub port: u16,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_long_url_threshold() -> usize {
    DEFAULT_LONG_URL_THRESHOLD
}

fn default_fallback() -> String {
    PRODUCTION.to_string()
}

fn default_rule_set() -> String {
    RuleSet::DEFAULT.to_string()
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from file");

        let config = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&config)?;

        Ok(config.with_resolved_backend(std::env::var_os("KUBERNETES_SERVICE_HOST").is_some()))
    }

    /// Parse and validate configuration
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_norway::from_str(yaml)?;

        if config.environments.is_empty() {
            config.environments = default_routes(&config.classification.rule_set);
        }

        config.validate()?;

        Ok(config)
    }

    /// Replace an `auto` state backend with the one matching where we run
    pub fn with_resolved_backend(mut self, in_kubernetes: bool) -> Self {
        if self.state.backend == StateBackend::Auto {
            self.state.backend = match in_kubernetes {
                true => StateBackend::ConfigMap,
                false => StateBackend::File,
            };
        }

        self
    }

    /// The rule set selected by `classification`
    pub fn rule_set(&self) -> Result<RuleSet> {
        let classification = &self.classification;

        if classification.rule_set == RuleSet::CUSTOM {
            if classification.rules.is_empty() {
                bail!("classification.rules must not be empty for a custom rule set");
            }

            return Ok(RuleSet::new(RuleSet::CUSTOM, classification.rules.clone()));
        }

        match RuleSet::builtin(&classification.rule_set) {
            Some(rules) => Ok(rules),
            None => bail!("Unknown rule set '{}'", classification.rule_set),
        }
    }

    /// Webhook URL of a destination
    pub fn webhook(&self, destination: &str) -> Option<&str> {
        self.slack
            .destinations
            .get(destination)
            .map(|d| d.url.as_str())
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunkSize must be at least 1");
        }

        if self.webhook(&self.slack.fallback).is_none() {
            bail!(
                "Fallback destination '{}' is not a configured destination",
                self.slack.fallback
            );
        }

        for route in &self.environments {
            if self.webhook(&route.destination).is_none() {
                bail!(
                    "Environment '{}' routes to unknown destination '{}'",
                    route.name,
                    route.destination
                );
            }
        }

        let rules = self.rule_set()?;
        for environment in rules.environments() {
            if !self.environments.iter().any(|route| route.name == environment) {
                bail!(
                    "Rule set '{}' classifies into '{}' which has no route",
                    rules.name(),
                    environment
                );
            }
        }

        Ok(())
    }
}

/// Routing used when `environments` is omitted
fn default_routes(rule_set: &str) -> Vec<EnvironmentRoute> {
    let mut routes = vec![
        EnvironmentRoute::new(PRODUCTION, PRODUCTION),
        EnvironmentRoute::new(STAGING, STAGING),
    ];

    if rule_set == RuleSet::EXPLORER_PREPROD {
        routes.push(EnvironmentRoute::new(EXPLORER_PREPROD, STAGING));
    }

    routes
}

/// Use `value` when set, otherwise read the environment variable named by `from`
fn resolve_secret(value: Option<String>, from: Option<String>) -> Result<String> {
    match (value, from) {
        (Some(value), _) => Ok(value),
        (None, Some(from)) => std::env::var(&from)
            .map_err(|e| anyhow::anyhow!("Failed to read environment variable {}: {}", from, e)),
        (None, None) => Ok(String::new()),
    }
}

impl BetterStack {
    /// Create a new Better Stack instance, resolving token from environment variable if needed
    pub fn new(
        url: Option<String>,
        token: Option<String>,
        token_from: Option<String>,
        monitor_link_base: Option<String>,
    ) -> Result<Self> {
        let token = resolve_secret(token, token_from)?;
        if token.is_empty() {
            bail!("betterstack.token or betterstack.tokenFrom is required");
        }

        Ok(Self {
            url: url.unwrap_or_else(|| DEFAULT_MONITORS_URL.to_string()),
            token,
            monitor_link_base: monitor_link_base
                .unwrap_or_else(|| DEFAULT_MONITOR_LINK_BASE.to_string()),
        })
    }
}

impl<'de> Deserialize<'de> for BetterStack {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct BetterStackRaw {
            url: Option<String>,
            token: Option<String>,
            token_from: Option<String>,
            monitor_link_base: Option<String>,
        }

        let raw = BetterStackRaw::deserialize(deserializer)?;
        BetterStack::new(raw.url, raw.token, raw.token_from, raw.monitor_link_base)
            .map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Destination {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct DestinationRaw {
            url: Option<String>,
            url_from: Option<String>,
        }

        let raw = DestinationRaw::deserialize(deserializer)?;
        let url = resolve_secret(raw.url, raw.url_from).map_err(serde::de::Error::custom)?;
        if url.is_empty() {
            return Err(serde::de::Error::custom("destination url or urlFrom is required"));
        }

        Ok(Destination { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
betterstack:
  token: secret
slack:
  destinations:
    production:
      url: https://hooks.slack.com/services/prod
    staging:
      url: https://hooks.slack.com/services/staging
"#;

    #[test]
    fn applies_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.betterstack.url, DEFAULT_MONITORS_URL);
        assert_eq!(config.betterstack.monitor_link_base, DEFAULT_MONITOR_LINK_BASE);
        assert_eq!(config.chunk_size, 15);
        assert_eq!(config.long_url_threshold, 100);
        assert_eq!(config.throttle.interval(), Duration::from_secs(86400));
        assert_eq!(config.slack.fallback, "production");
        assert_eq!(config.state.namespace, "cronjob");
        assert_eq!(config.state.name, "betterstack-notification-state");
        assert_eq!(
            config.environments,
            vec![
                EnvironmentRoute::new("production", "production"),
                EnvironmentRoute::new("staging", "staging"),
            ]
        );
        assert_eq!(config.rule_set().unwrap(), RuleSet::default_rules());
        assert!(config.http.is_none());
    }

    #[test]
    fn explorer_preprod_routes_to_staging_by_default() {
        let yaml = format!("{}classification:\n  ruleSet: explorer-preprod\n", MINIMAL);
        let config = Config::from_yaml(&yaml).unwrap();

        assert_eq!(
            config.environments.last(),
            Some(&EnvironmentRoute::new("explorer-preprod", "staging"))
        );
        assert_eq!(config.rule_set().unwrap(), RuleSet::explorer_preprod_rules());
    }

    #[test]
    fn parses_custom_rules() {
        let yaml = format!(
            "{}{}",
            MINIMAL,
            r#"
classification:
  ruleSet: custom
  rules:
    - contains: API.zobula.xyz
      excludes: [explorer]
      environment: staging
environments:
  - name: staging
    destination: staging
"#
        );

        let config = Config::from_yaml(&yaml).unwrap();
        let rules = config.rule_set().unwrap();

        assert_eq!(rules.environment_for("https://api.zobula.xyz/x"), Some("staging"));
        assert_eq!(rules.environment_for("https://explorer-api.zobula.xyz/x"), None);
    }

    #[test]
    fn rejects_unknown_destination() {
        let yaml = format!(
            "{}environments:\n  - name: production\n    destination: nowhere\n",
            MINIMAL
        );

        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("unknown destination 'nowhere'"));
    }

    #[test]
    fn rejects_unrouted_environment() {
        let yaml = format!(
            "{}environments:\n  - name: production\n    destination: production\n",
            MINIMAL
        );

        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("'staging' which has no route"));
    }

    #[test]
    fn rejects_unknown_rule_set() {
        let yaml = format!("{}classification:\n  ruleSet: legacy\n", MINIMAL);

        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let yaml = format!("{}chunkSize: 0\n", MINIMAL);

        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn rejects_missing_token_variable() {
        let yaml = MINIMAL.replace(
            "token: secret",
            "tokenFrom: UPTIME_STATUS_NOTIFIER_TEST_UNSET_VARIABLE",
        );

        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn resolves_auto_backend() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.state.backend, StateBackend::Auto);

        let in_cluster = config.clone().with_resolved_backend(true);
        assert_eq!(in_cluster.state.backend, StateBackend::ConfigMap);

        let local = config.with_resolved_backend(false);
        assert_eq!(local.state.backend, StateBackend::File);
    }

    #[test]
    fn explicit_backend_is_kept() {
        let yaml = format!("{}state:\n  backend: file\n  directory: /var/lib/notifier\n", MINIMAL);
        let config = Config::from_yaml(&yaml).unwrap().with_resolved_backend(true);

        assert_eq!(config.state.backend, StateBackend::File);
        assert_eq!(config.state.directory, PathBuf::from("/var/lib/notifier"));
        assert_eq!(config.state.namespace, "cronjob");
    }
}
