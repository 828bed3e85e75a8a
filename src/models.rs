//! # Models
//!
//! Records exchanged with the trading backend and the chat transcript entries
//! built from them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Content of the transient entry shown while a chat request is outstanding
pub const PLACEHOLDER_CONTENT: &str = "Thinking ...";

/// Seed message every transcript starts with
pub const WELCOME_MESSAGE: &str = "I'm Quantumic, an AI-powered trading bot on ICP. I can analyze markets, execute trades, and answer questions.\n\nHere's what I can help with:\n- Portfolio analysis\n- Market trends\n- Trade execution\n- Risk assessment\n\nTry asking:\n1. What's my portfolio performance?\n2. Show me market trends for BTC\n3. Execute a trade for 0.5 ETH";

// ============================================================================
// CHAT
// ============================================================================

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    System,
}

/// One transcript entry. Content is stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Speaker,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::System,
            content: content.into(),
        }
    }

    pub fn placeholder() -> Self {
        Self::system(PLACEHOLDER_CONTENT)
    }

    pub fn welcome() -> Self {
        Self::system(WELCOME_MESSAGE)
    }

    pub fn is_placeholder(&self) -> bool {
        self.role == Speaker::System && self.content == PLACEHOLDER_CONTENT
    }
}

// ============================================================================
// PORTFOLIO & MARKET DATA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub total_value: f64,
    /// `(asset, quantity)` pairs in backend order
    pub balances: Vec<(String, f64)>,
}

/// A portfolio balance together with its value at the current market price
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedBalance {
    pub asset: String,
    pub quantity: f64,
    pub value: f64,
}

impl Portfolio {
    /// Value each balance against `market`. Assets without a quote are valued at 0.
    pub fn valued_balances(&self, market: &MarketDataset) -> Vec<ValuedBalance> {
        self.balances
            .iter()
            .map(|(asset, quantity)| {
                let price = market.price_of(asset).unwrap_or(0.0);
                ValuedBalance {
                    asset: asset.clone(),
                    quantity: *quantity,
                    value: quantity * price,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDatum {
    pub asset: String,
    pub price: f64,
    #[serde(rename = "change24h")]
    pub change_24h: f64,
    pub volume: f64,
}

/// Market data keyed by asset. Never holds two entries for the same asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketDataset {
    data: Vec<MarketDatum>,
}

impl MarketDataset {
    /// Build from a backend response. A repeated asset overwrites the earlier
    /// entry in place, so first-seen order is kept.
    pub fn from_data(data: Vec<MarketDatum>) -> Self {
        let mut dataset: Vec<MarketDatum> = Vec::with_capacity(data.len());
        for datum in data {
            match dataset.iter_mut().find(|d| d.asset == datum.asset) {
                Some(existing) => {
                    warn!("Duplicate market datum for {}, keeping latest", datum.asset);
                    *existing = datum;
                }
                None => dataset.push(datum),
            }
        }
        Self { data: dataset }
    }

    pub fn get(&self, asset: &str) -> Option<&MarketDatum> {
        self.data.iter().find(|d| d.asset == asset)
    }

    pub fn price_of(&self, asset: &str) -> Option<f64> {
        self.get(asset).map(|d| d.price)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketDatum> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ============================================================================
// TRADES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TradeDirection::Buy => "BUY",
            TradeDirection::Sell => "SELL",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Nanoseconds since the Unix epoch
    pub timestamp: u64,
    pub direction: TradeDirection,
    pub asset: String,
    pub amount: f64,
    pub price: f64,
    pub reason: String,
}

impl Trade {
    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        let nanos = i64::try_from(self.timestamp).ok()?;
        Some(DateTime::from_timestamp_nanos(nanos))
    }

    /// Narrative line appended to the transcript after an automated trade
    pub fn narrative(&self) -> String {
        format!(
            "Executed auto trade: {} {} {} at ${:.2}. Reason: {}",
            self.direction, self.amount, self.asset, self.price, self.reason
        )
    }
}
