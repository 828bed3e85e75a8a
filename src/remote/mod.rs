//! # Remote Module
//!
//! Typed boundary to the Quantumic trading backend. Everything the client
//! knows about the backend goes through [`RemoteService`]; the HTTP adapter
//! in [`http_client`] is one implementation of it.

pub mod http_client;

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{MarketDatum, Message, Portfolio, Trade};

pub use http_client::HttpRemoteService;

/// Category tag attached to a recognised backend fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FaultCategory {
    SysTransient,
    CanisterReject,
}

impl fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultCategory::SysTransient => write!(f, "SysTransient"),
            FaultCategory::CanisterReject => write!(f, "CanisterReject"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{category}: {message}")]
    Fault {
        category: FaultCategory,
        message: String,
    },

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl RemoteError {
    /// Human-readable reason, present only for recognised backend faults
    pub fn user_message(&self) -> Option<&str> {
        match self {
            RemoteError::Fault { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// The five backend operations the client consumes
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Send the conversation (without the seed welcome message) and get the reply
    async fn chat(&self, messages: &[Message]) -> Result<String, RemoteError>;

    async fn get_portfolio(&self) -> Result<Portfolio, RemoteError>;

    async fn get_market_data(&self) -> Result<Vec<MarketDatum>, RemoteError>;

    async fn get_trade_history(&self) -> Result<Vec<Trade>, RemoteError>;

    /// Execute one automated trade and return it
    async fn auto_trade(&self) -> Result<Trade, RemoteError>;
}
