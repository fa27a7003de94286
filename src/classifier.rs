//! Sorting monitors into deployment environments by URL.
//!
//! Rules are evaluated top to bottom and the first match wins, so a pattern that
//! is a substring of another (`api.mobula.io` inside `explorer-api.mobula.io`)
//! has to come after the more specific one or the monitor is silently put in
//! the wrong bucket.

use crate::monitor::Monitor;
use serde::Deserialize;
use std::collections::HashMap;

pub const PRODUCTION: &str = "production";
pub const STAGING: &str = "staging";
pub const EXPLORER_PREPROD: &str = "explorer-preprod";

/// Route a monitor to `environment` when its URL contains `contains` and none of `excludes`.
///
/// Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rule {
    pub contains: String,
    #[serde(default)]
    pub excludes: Vec<String>,
    pub environment: String,
}

impl Rule {
    pub fn new(contains: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            contains: contains.into().to_lowercase(),
            excludes: Vec::new(),
            environment: environment.into(),
        }
    }

    pub fn excluding(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into().to_lowercase());
        self
    }

    /// `url` must already be lowercased
    fn matches(&self, url: &str) -> bool {
        url.contains(&self.contains) && !self.excludes.iter().any(|e| url.contains(e))
    }
}

/// A named, ordered list of rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    name: String,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub const DEFAULT: &'static str = "default";
    pub const EXPLORER_PREPROD: &'static str = "explorer-preprod";
    pub const CUSTOM: &'static str = "custom";

    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| Rule {
                contains: rule.contains.to_lowercase(),
                excludes: rule.excludes.iter().map(|e| e.to_lowercase()).collect(),
                environment: rule.environment,
            })
            .collect();

        Self {
            name: name.into(),
            rules,
        }
    }

    /// Two environments. The first explorer API is treated as staging.
    pub fn default_rules() -> Self {
        Self::new(
            Self::DEFAULT,
            vec![
                Rule::new("explorer-api-2.mobula.io", PRODUCTION),
                Rule::new("explorer-api.mobula.io", STAGING),
                Rule::new("explorer-api.zobula.xyz", STAGING),
                Rule::new("api.mobula.io", PRODUCTION),
                Rule::new("api.zobula.xyz", STAGING),
            ],
        )
    }

    /// Three environments, with the explorer preprod health check split out.
    /// Every `api.mobula.io` host, explorers included, is production.
    pub fn explorer_preprod_rules() -> Self {
        Self::new(
            Self::EXPLORER_PREPROD,
            vec![
                Rule::new("explorer-api.zobula.xyz/health", EXPLORER_PREPROD),
                Rule::new("api.mobula.io", PRODUCTION),
                Rule::new("api.zobula.xyz", STAGING).excluding("explorer-api.zobula.xyz"),
            ],
        )
    }

    /// Look up one of the built-in rule sets
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            Self::DEFAULT => Some(Self::default_rules()),
            Self::EXPLORER_PREPROD => Some(Self::explorer_preprod_rules()),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Distinct environments in the order they first appear
    pub fn environments(&self) -> Vec<&str> {
        let mut environments: Vec<&str> = Vec::new();

        for rule in &self.rules {
            if !environments.contains(&rule.environment.as_str()) {
                environments.push(&rule.environment);
            }
        }

        environments
    }

    /// Environment of the first rule matching `url`
    pub fn environment_for(&self, url: &str) -> Option<&str> {
        let url = url.to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.matches(&url))
            .map(|rule| rule.environment.as_str())
    }
}

/// Monitors grouped per environment, input order preserved within each bucket
#[derive(Debug, Default)]
pub struct Classified {
    buckets: HashMap<String, Vec<Monitor>>,
    pub unmatched: usize,
}

impl Classified {
    pub fn bucket(&self, environment: &str) -> &[Monitor] {
        self.buckets
            .get(environment)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn matched(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// Put every monitor in the bucket of its first matching rule. Unmatched monitors are dropped.
#[tracing::instrument(skip_all, fields(rule_set = rules.name()))]
pub fn classify(monitors: Vec<Monitor>, rules: &RuleSet) -> Classified {
    let mut classified = Classified::default();

    for monitor in monitors {
        match rules.environment_for(&monitor.url) {
            Some(environment) => classified
                .buckets
                .entry(environment.to_string())
                .or_default()
                .push(monitor),
            None => classified.unmatched += 1,
        }
    }

    if classified.unmatched > 0 {
        tracing::debug!("{} monitors matched no environment", classified.unmatched);
    }

    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Status;

    fn monitor(id: &str, url: &str) -> Monitor {
        Monitor::new(id, url, id, Status::Up)
    }

    fn ids(monitors: &[Monitor]) -> Vec<&str> {
        monitors.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn default_rules_check_explorer_v2_before_v1() {
        let monitors = vec![
            monitor("a", "https://explorer-api-2.mobula.io/health"),
            monitor("b", "https://explorer-api.mobula.io/health"),
            monitor("c", "https://explorer-api.zobula.xyz/health"),
            monitor("d", "https://api.mobula.io/api/1/market"),
            monitor("e", "https://api.zobula.xyz/api/1/market"),
            monitor("f", "https://example.com"),
        ];

        let classified = classify(monitors, &RuleSet::default_rules());

        assert_eq!(ids(classified.bucket(PRODUCTION)), vec!["a", "d"]);
        assert_eq!(ids(classified.bucket(STAGING)), vec!["b", "c", "e"]);
        assert_eq!(classified.unmatched, 1);
    }

    #[test]
    fn explorer_preprod_rules_split_the_health_check() {
        let monitors = vec![
            monitor("a", "https://explorer-api.zobula.xyz/health"),
            monitor("b", "https://explorer-api.zobula.xyz/api/blocks"),
            monitor("c", "https://explorer-api.mobula.io/health"),
            monitor("d", "https://api.zobula.xyz/api/1/market"),
        ];

        let classified = classify(monitors, &RuleSet::explorer_preprod_rules());

        assert_eq!(ids(classified.bucket(EXPLORER_PREPROD)), vec!["a"]);
        assert_eq!(ids(classified.bucket(PRODUCTION)), vec!["c"]);
        assert_eq!(ids(classified.bucket(STAGING)), vec!["d"]);
        // excluded from staging and matched by nothing else
        assert_eq!(classified.unmatched, 1);
    }

    #[test]
    fn matching_ignores_case() {
        let classified = classify(
            vec![monitor("a", "HTTPS://API.MOBULA.IO/Health")],
            &RuleSet::new("custom", vec![Rule::new("Api.Mobula.io", PRODUCTION)]),
        );

        assert_eq!(classified.bucket(PRODUCTION).len(), 1);
    }

    #[test]
    fn misordered_rules_misclassify_silently() {
        let misordered = RuleSet::new(
            "custom",
            vec![
                Rule::new("api.mobula.io", PRODUCTION),
                Rule::new("explorer-api.mobula.io", STAGING),
            ],
        );

        let classified = classify(
            vec![monitor("a", "https://explorer-api.mobula.io/health")],
            &misordered,
        );

        assert_eq!(ids(classified.bucket(PRODUCTION)), vec!["a"]);
        assert!(classified.bucket(STAGING).is_empty());
    }

    #[test]
    fn every_monitor_lands_in_at_most_one_bucket() {
        let urls = [
            "https://explorer-api-2.mobula.io",
            "https://explorer-api.mobula.io",
            "https://explorer-api.zobula.xyz/health",
            "https://explorer-api.zobula.xyz",
            "https://api.mobula.io",
            "https://api.zobula.xyz",
            "https://unrelated.dev",
        ];

        for rules in [RuleSet::default_rules(), RuleSet::explorer_preprod_rules()] {
            let monitors: Vec<Monitor> = urls
                .iter()
                .enumerate()
                .map(|(i, url)| monitor(&i.to_string(), url))
                .collect();

            let classified = classify(monitors, &rules);
            let mut seen: Vec<&str> = rules
                .environments()
                .into_iter()
                .flat_map(|env| ids(classified.bucket(env)))
                .collect();
            let total = seen.len();
            seen.sort();
            seen.dedup();

            assert_eq!(seen.len(), total, "rule set {}", rules.name());
            assert_eq!(classified.matched() + classified.unmatched, urls.len());
        }
    }

    #[test]
    fn environments_are_listed_in_rule_order() {
        assert_eq!(
            RuleSet::default_rules().environments(),
            vec![PRODUCTION, STAGING]
        );
        assert_eq!(
            RuleSet::explorer_preprod_rules().environments(),
            vec![EXPLORER_PREPROD, PRODUCTION, STAGING]
        );
        assert!(RuleSet::builtin("nope").is_none());
    }
}
