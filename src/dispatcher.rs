//! Manually triggered automated trade.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info};

use crate::busy::BusyFlag;
use crate::models::{Message, Trade};
use crate::remote::{RemoteError, RemoteService};
use crate::sync::PollingSynchronizer;
use crate::transcript::Transcript;

pub const AUTO_TRADE_FAILED: &str = "Auto trade failed. See logs for details.";

#[derive(Debug)]
pub enum AutoTradeOutcome {
    /// Another request was outstanding; nothing happened
    Busy,
    Executed(Trade),
    Failed(RemoteError),
}

#[derive(Clone)]
pub struct ActionDispatcher {
    remote: Arc<dyn RemoteService>,
    transcript: Arc<Mutex<Transcript>>,
    busy: BusyFlag,
    synchronizer: PollingSynchronizer,
}

impl ActionDispatcher {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        transcript: Arc<Mutex<Transcript>>,
        busy: BusyFlag,
        synchronizer: PollingSynchronizer,
    ) -> Self {
        Self {
            remote,
            transcript,
            busy,
            synchronizer,
        }
    }

    /// Execute one automated trade, re-sync the caches it affects and
    /// narrate the result in the transcript
    pub async fn execute_auto_trade(&self) -> AutoTradeOutcome {
        let Some(_guard) = self.busy.try_acquire() else {
            info!("Auto trade ignored while a request is pending");
            return AutoTradeOutcome::Busy;
        };

        info!("Executing auto trade");

        match self.remote.auto_trade().await {
            Ok(trade) => {
                futures::future::join(
                    self.synchronizer.refresh_portfolio(),
                    self.synchronizer.refresh_trade_history(),
                )
                .await;

                info!("Auto trade executed: {} {} {}", trade.direction, trade.amount, trade.asset);
                self.transcript.lock().append(Message::system(trade.narrative()));
                AutoTradeOutcome::Executed(trade)
            }
            Err(e) => {
                error!("Auto trade failed: {}", e);
                self.transcript.lock().append(Message::system(AUTO_TRADE_FAILED));
                AutoTradeOutcome::Failed(e)
            }
        }
    }
}
