//! # Quantumic Client
//!
//! Client-side state machine for the Quantumic trading assistant: a chat
//! transcript with optimistic placeholders, a single busy flag shared by
//! chat and automated trading, and a cancellable loop that keeps portfolio,
//! market data and trade history fresh.
//!
//! ## Architecture
//! - `remote`: typed boundary to the backend (`RemoteService`) and its HTTP adapter
//! - `transcript`: ordered chat history and its change events
//! - `busy`: the `Idle`/`Pending` gate
//! - `conversation`: chat submission and reconciliation
//! - `sync`: resource caches and the periodic refresh loop
//! - `dispatcher`: the automated trade action
//! - `client`: wires all of the above together
//! - `config`: environment configuration

pub mod busy;
pub mod client;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod models;
pub mod remote;
pub mod sync;
pub mod transcript;

pub use client::QuantumicClient;
pub use config::Config;
pub use models::{MarketDatum, MarketDataset, Message, Portfolio, Speaker, Trade, TradeDirection};
pub use remote::{RemoteError, RemoteService};
