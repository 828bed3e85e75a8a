//! # Client
//!
//! Wires the transcript, busy flag, conversation controller, polling
//! synchronizer and action dispatcher into one handle that a front-end
//! mounts at startup and tears down on exit.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::info;

use crate::busy::{BusyFlag, RequestState};
use crate::config::Config;
use crate::conversation::{ConversationController, Notifier, SubmitOutcome};
use crate::dispatcher::{ActionDispatcher, AutoTradeOutcome};
use crate::models::Message;
use crate::remote::{HttpRemoteService, RemoteError, RemoteService};
use crate::sync::{PollingHandle, PollingSynchronizer, SyncStats};
use crate::transcript::{Transcript, TranscriptEvent};

pub struct QuantumicClient {
    transcript: Arc<Mutex<Transcript>>,
    busy: BusyFlag,
    conversation: ConversationController,
    synchronizer: PollingSynchronizer,
    dispatcher: ActionDispatcher,
    refresh_interval: Duration,
    polling: Mutex<Option<PollingHandle>>,
}

impl QuantumicClient {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        notifier: Arc<dyn Notifier>,
        refresh_interval: Duration,
    ) -> Self {
        let transcript = Arc::new(Mutex::new(Transcript::new()));
        let busy = BusyFlag::new();
        let synchronizer = PollingSynchronizer::new(Arc::clone(&remote));
        let conversation = ConversationController::new(
            Arc::clone(&remote),
            Arc::clone(&transcript),
            busy.clone(),
            notifier,
        );
        let dispatcher = ActionDispatcher::new(
            remote,
            Arc::clone(&transcript),
            busy.clone(),
            synchronizer.clone(),
        );

        Self {
            transcript,
            busy,
            conversation,
            synchronizer,
            dispatcher,
            refresh_interval,
            polling: Mutex::new(None),
        }
    }

    /// Client talking to the HTTP backend named in `config`
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, RemoteError> {
        let remote = HttpRemoteService::new(&config.backend_url, config.request_timeout)?;
        info!("Using backend at {}", remote.base_url());
        Ok(Self::new(Arc::new(remote), notifier, config.refresh_interval))
    }

    /// Start the refresh loop. Calling it again while mounted does nothing.
    pub fn mount(&self) {
        let mut polling = self.polling.lock();
        if polling.is_some() {
            return;
        }
        *polling = Some(self.synchronizer.start(self.refresh_interval));
    }

    /// Stop the refresh loop. In-flight chat or trade requests still settle.
    pub fn teardown(&self) {
        if let Some(handle) = self.polling.lock().take() {
            handle.shutdown();
            info!("Client torn down");
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.polling.lock().is_some()
    }

    pub async fn submit(&self, text: impl Into<String>) -> SubmitOutcome {
        self.conversation.submit(text).await
    }

    pub async fn execute_auto_trade(&self) -> AutoTradeOutcome {
        self.dispatcher.execute_auto_trade().await
    }

    pub fn conversation(&self) -> &ConversationController {
        &self.conversation
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn synchronizer(&self) -> &PollingSynchronizer {
        &self.synchronizer
    }

    pub fn request_state(&self) -> RequestState {
        self.busy.state()
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.transcript.lock().snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.transcript.lock().subscribe()
    }

    pub fn stats(&self) -> ClientStats {
        let is_mounted = self.is_mounted();
        ClientStats {
            transcript_len: self.transcript.lock().len(),
            request_pending: self.busy.is_pending(),
            sync: self.synchronizer.stats(is_mounted),
        }
    }
}

impl Drop for QuantumicClient {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ClientStats {
    pub transcript_len: usize,
    pub request_pending: bool,
    pub sync: SyncStats,
}
