//! Tradable symbols and their quantity precision

use crate::{connectors::MetadataSource, ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// A tradable pair with its quantity step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSymbol {
    /// Exchange symbol, e.g. `ETHUSDT`
    pub symbol: String,
    /// Base asset, e.g. `ETH`
    pub base_asset: String,
    /// Quote asset, e.g. `USDT`
    pub quote_asset: String,
    /// Smallest order quantity increment, 0 when unknown
    pub quantity_step: f64,
}

impl AssetSymbol {
    /// Create a symbol from its parts
    pub fn new(base: &str, quote: &str, quantity_step: f64) -> Self {
        let base_asset = base.to_uppercase();
        let quote_asset = quote.to_uppercase();
        Self {
            symbol: format!("{}{}", base_asset, quote_asset),
            base_asset,
            quote_asset,
            quantity_step,
        }
    }

    /// Decimal places usable for order quantities
    pub fn precision(&self) -> u32 {
        precision_from_step(self.quantity_step)
    }
}

/// Number of decimals implied by a quantity step.
///
/// `0.001` gives 3, while any step of 1 or more (or an unknown step) gives 0.
pub fn precision_from_step(step: f64) -> u32 {
    if !step.is_finite() || step <= 0.0 || step >= 1.0 {
        return 0;
    }
    step.log10().abs().round() as u32
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LotSizeFilter {
    step_size: String,
}

/// Extract the `LOT_SIZE` step from raw exchange filters.
///
/// Malformed entries are logged and yield 0 (precision 0) instead of failing
/// the whole metadata load.
pub fn quantity_step_from_filters(symbol: &str, filters: &[serde_json::Value]) -> f64 {
    let lot_size = filters
        .iter()
        .find(|f| f.get("filterType").and_then(|t| t.as_str()) == Some("LOT_SIZE"));

    let Some(filter) = lot_size else {
        return 0.0;
    };

    let parsed = serde_json::from_value::<LotSizeFilter>(filter.clone())
        .map_err(|e| e.to_string())
        .and_then(|f| f.step_size.parse::<f64>().map_err(|e| e.to_string()));

    match parsed {
        Ok(step) if step.is_finite() && step >= 0.0 => step,
        Ok(step) => {
            warn!(symbol, step, "Ignoring invalid LOT_SIZE step, using precision 0");
            0.0
        }
        Err(e) => {
            warn!(symbol, error = %e, "Malformed LOT_SIZE filter, using precision 0");
            0.0
        }
    }
}

/// Which way round a pair matched a (from, to) query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Base is the first asset of the query
    Forward,
    /// Base is the second asset of the query
    Reverse,
}

/// Result of a pair lookup
#[derive(Debug, Clone, Copy)]
pub struct PairMatch<'a> {
    /// Matching symbol
    pub symbol: &'a AssetSymbol,
    /// Orientation relative to the query
    pub orientation: Orientation,
}

/// Immutable snapshot of the exchange's tradable symbols
#[derive(Debug, Clone, Default)]
pub struct SymbolCatalog {
    by_pair: HashMap<(String, String), AssetSymbol>,
}

impl SymbolCatalog {
    /// Build a catalog from a symbol list
    pub fn new(symbols: Vec<AssetSymbol>) -> Self {
        let by_pair = symbols
            .into_iter()
            .map(|s| ((s.base_asset.to_uppercase(), s.quote_asset.to_uppercase()), s))
            .collect();
        Self { by_pair }
    }

    /// Fetch the full symbol list once. Any failure is fatal for the caller.
    pub async fn load(source: &dyn MetadataSource) -> Result<Self> {
        let symbols = source
            .fetch_symbols()
            .await
            .map_err(|e| ConvertError::Metadata(format!("Failed to load exchange info: {}", e)))?;

        if symbols.is_empty() {
            return Err(ConvertError::Metadata("Exchange returned no tradable symbols".to_string()).into());
        }

        let catalog = Self::new(symbols);
        info!("Loaded {} tradable symbols", catalog.len());
        Ok(catalog)
    }

    /// Find the pair trading `a` against `b` in either orientation
    pub fn lookup(&self, a: &str, b: &str) -> Option<PairMatch<'_>> {
        let a = a.to_uppercase();
        let b = b.to_uppercase();

        if let Some(symbol) = self.by_pair.get(&(a.clone(), b.clone())) {
            return Some(PairMatch {
                symbol,
                orientation: Orientation::Forward,
            });
        }
        self.by_pair.get(&(b, a)).map(|symbol| PairMatch {
            symbol,
            orientation: Orientation::Reverse,
        })
    }

    /// Quantity precision for a symbol
    pub fn precision_of(&self, symbol: &AssetSymbol) -> u32 {
        symbol.precision()
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    /// Whether the catalog holds no symbols
    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }
}
