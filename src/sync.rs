use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{MarketDataset, Portfolio, Trade};
use crate::remote::RemoteService;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Last successfully fetched value of one backend resource.
///
/// Writes always replace the whole value; a failed fetch never touches it.
#[derive(Debug)]
pub struct ResourceCache<T> {
    state: RwLock<CacheState<T>>,
}

#[derive(Debug)]
struct CacheState<T> {
    value: Option<Arc<T>>,
    generation: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl<T> ResourceCache<T> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CacheState {
                value: None,
                generation: 0,
                updated_at: None,
            }),
        }
    }

    /// `None` until the first successful fetch
    pub fn get(&self) -> Option<Arc<T>> {
        self.state.read().value.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().value.is_some()
    }

    /// Value, generation and timestamp change together
    pub fn replace(&self, value: T) {
        let mut state = self.state.write();
        state.value = Some(Arc::new(value));
        state.generation += 1;
        state.updated_at = Some(Utc::now());
    }

    /// Current value with the generation it was written at
    pub fn versioned(&self) -> Option<(Arc<T>, u64)> {
        let state = self.state.read();
        state.value.clone().map(|value| (value, state.generation))
    }

    /// Number of successful replacements so far
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().updated_at
    }
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the portfolio, market data and trade history caches fresh
#[derive(Clone)]
pub struct PollingSynchronizer {
    remote: Arc<dyn RemoteService>,
    portfolio: Arc<ResourceCache<Portfolio>>,
    market_data: Arc<ResourceCache<MarketDataset>>,
    trade_history: Arc<ResourceCache<Vec<Trade>>>,
    ticks: Arc<AtomicU64>,
}

impl PollingSynchronizer {
    pub fn new(remote: Arc<dyn RemoteService>) -> Self {
        Self {
            remote,
            portfolio: Arc::new(ResourceCache::new()),
            market_data: Arc::new(ResourceCache::new()),
            trade_history: Arc::new(ResourceCache::new()),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn portfolio(&self) -> &ResourceCache<Portfolio> {
        &self.portfolio
    }

    pub fn market_data(&self) -> &ResourceCache<MarketDataset> {
        &self.market_data
    }

    pub fn trade_history(&self) -> &ResourceCache<Vec<Trade>> {
        &self.trade_history
    }

    pub async fn refresh_portfolio(&self) {
        match self.remote.get_portfolio().await {
            Ok(portfolio) => {
                debug!("Portfolio refreshed: total value {:.2}", portfolio.total_value);
                self.portfolio.replace(portfolio);
            }
            Err(e) => warn!("Failed to fetch portfolio: {}", e),
        }
    }

    pub async fn refresh_market_data(&self) {
        match self.remote.get_market_data().await {
            Ok(data) => {
                let dataset = MarketDataset::from_data(data);
                debug!("Market data refreshed: {} assets", dataset.len());
                self.market_data.replace(dataset);
            }
            Err(e) => warn!("Failed to fetch market data: {}", e),
        }
    }

    pub async fn refresh_trade_history(&self) {
        match self.remote.get_trade_history().await {
            Ok(trades) => {
                debug!("Trade history refreshed: {} trades", trades.len());
                self.trade_history.replace(trades);
            }
            Err(e) => warn!("Failed to fetch trade history: {}", e),
        }
    }

    /// Refresh all three caches concurrently
    pub async fn refresh_all(&self) {
        futures::future::join3(
            self.refresh_portfolio(),
            self.refresh_market_data(),
            self.refresh_trade_history(),
        )
        .await;
    }

    /// Refresh immediately, then once per `period` until the handle is shut down
    pub fn start(&self, period: Duration) -> PollingHandle {
        let cancel = CancellationToken::new();
        let synchronizer = self.clone();
        let token = cancel.clone();

        info!("Starting polling synchronizer every {:?}", period);

        let task = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = timer.tick() => {}
                }

                synchronizer.refresh_all().await;
                let ticks = synchronizer.ticks.fetch_add(1, Ordering::AcqRel) + 1;
                debug!("Refresh tick {} complete", ticks);
            }

            info!("Polling synchronizer stopped");
        });

        PollingHandle {
            cancel,
            task: Some(task),
        }
    }

    pub fn stats(&self, is_running: bool) -> SyncStats {
        SyncStats {
            is_running,
            ticks_completed: self.ticks.load(Ordering::Acquire),
            portfolio_generation: self.portfolio.generation(),
            market_data_generation: self.market_data.generation(),
            trade_history_generation: self.trade_history.generation(),
        }
    }
}

/// Disposal handle for a running refresh loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct PollingHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollingHandle {
    /// Stop scheduling ticks. A refresh already in flight may still finish.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            info!("Polling synchronizer stop signal sent");
        }
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Shut down and wait for the loop to exit
    pub async fn join(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Polling task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SyncStats {
    pub is_running: bool,
    pub ticks_completed: u64,
    pub portfolio_generation: u64,
    pub market_data_generation: u64,
    pub trade_history_generation: u64,
}
