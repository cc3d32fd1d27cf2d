//! Trade jobs and their routing state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a job sits in a conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Requested conversion; may still be routed through the bridge asset
    Direct,
    /// First leg into the bridge asset, remembering the final destination
    ToBridge {
        /// Asset originally requested
        destination: String,
    },
    /// Final leg out of the bridge asset; never routed further
    FromBridge,
}

/// A request to convert `amount` of `from` into `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeJob {
    /// Source asset
    pub from: String,
    /// Destination asset
    pub to: String,
    /// Quantity of the source asset
    pub amount: f64,
    /// Routing state
    pub route: Route,
}

impl TradeJob {
    /// A fresh conversion request
    pub fn new(from: &str, to: &str, amount: f64) -> Self {
        Self {
            from: from.to_uppercase(),
            to: to.to_uppercase(),
            amount,
            route: Route::Direct,
        }
    }

    /// Destination to continue to once this leg settles
    pub fn continuation(&self) -> Option<&str> {
        match &self.route {
            Route::ToBridge { destination } => Some(destination),
            _ => None,
        }
    }

    /// Only untouched requests may be routed through the bridge
    pub fn can_bridge(&self, bridge: &str) -> bool {
        matches!(self.route, Route::Direct)
            && !self.from.eq_ignore_ascii_case(bridge)
            && !self.to.eq_ignore_ascii_case(bridge)
    }

    /// First leg of a two-hop conversion: same amount of `from` into `bridge`
    pub fn bridge_leg(&self, bridge: &str) -> TradeJob {
        TradeJob {
            from: self.from.clone(),
            to: bridge.to_uppercase(),
            amount: self.amount,
            route: Route::ToBridge {
                destination: self.to.clone(),
            },
        }
    }

    /// Terminal leg funded with what this leg actually received
    pub fn continue_with(&self, proceeds: f64) -> Option<TradeJob> {
        self.continuation().map(|destination| TradeJob {
            from: self.to.clone(),
            to: destination.to_string(),
            amount: proceeds,
            route: Route::FromBridge,
        })
    }
}

impl fmt::Display for TradeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.amount, self.from, self.to)?;
        if let Some(destination) = self.continuation() {
            write!(f, " (then -> {})", destination)?;
        }
        Ok(())
    }
}
