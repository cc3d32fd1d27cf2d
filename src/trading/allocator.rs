//! Conversion rules and the allocation of received amounts

use crate::{config::ConversionConfig, trading::TradeJob};
use indexmap::IndexMap;

/// One destination of a conversion rule
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Destination asset
    pub destination: String,
    /// Share of each received amount, in percent
    pub percent: f64,
}

/// A job produced for one target of a rule
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Percentage that produced the job
    pub percent: f64,
    /// The job itself
    pub job: TradeJob,
}

/// Immutable source asset -> targets mapping
#[derive(Debug, Clone, Default)]
pub struct ConversionRules {
    rules: IndexMap<String, Vec<Target>>,
}

impl ConversionRules {
    /// Build rules from configuration, normalizing asset case
    pub fn from_config(config: &ConversionConfig) -> Self {
        config
            .rules
            .iter()
            .fold(Self::default(), |rules, (source, targets)| {
                let targets: Vec<(&str, f64)> =
                    targets.iter().map(|(d, p)| (d.as_str(), *p)).collect();
                rules.with_rule(source, &targets)
            })
    }

    /// Add (or replace) the rule for `source`
    pub fn with_rule(mut self, source: &str, targets: &[(&str, f64)]) -> Self {
        let targets = targets
            .iter()
            .map(|(destination, percent)| Target {
                destination: destination.to_uppercase(),
                percent: *percent,
            })
            .collect();
        self.rules.insert(source.to_uppercase(), targets);
        self
    }

    /// Targets configured for an asset
    pub fn targets(&self, asset: &str) -> Option<&[Target]> {
        self.rules.get(&asset.to_uppercase()).map(Vec::as_slice)
    }

    /// Whether any rule exists for an asset
    pub fn covers(&self, asset: &str) -> bool {
        self.targets(asset).is_some()
    }

    /// Split a received amount into jobs, one per target, in rule order.
    ///
    /// Percentages are applied as configured; nothing checks that they stay
    /// within 100.
    pub fn allocate(&self, asset: &str, amount: f64) -> Vec<Allocation> {
        if amount.is_nan() || amount <= 0.0 {
            return Vec::new();
        }
        let Some(targets) = self.targets(asset) else {
            return Vec::new();
        };

        targets
            .iter()
            .map(|target| Allocation {
                percent: target.percent,
                job: TradeJob::new(asset, &target.destination, amount * target.percent / 100.0),
            })
            .collect()
    }

    /// Source assets with a rule
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule is configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
