//! # Conversation
//!
//! Turns user input into an optimistic transcript update plus exactly one
//! outstanding `chat` request, then reconciles the transcript once the
//! request settles.
//!
//! ## Protocol
//! 1. append the user message and a `"Thinking ..."` placeholder
//! 2. clear the input buffer and mark the busy flag `Pending`
//! 3. send everything after the seed welcome message
//! 4. success: the placeholder becomes the reply
//! 5. failure: the placeholder is removed and a recognised fault is shown to the user
//!
//! Steps 1 and 2 happen in [`ConversationController::begin`], which never
//! suspends, so a second submission always observes `Pending`. A front-end
//! that spawns the request can call `begin` first and spawn only
//! [`PendingChat::settle`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::busy::{BusyFlag, BusyGuard, RequestState};
use crate::models::Message;
use crate::remote::{RemoteError, RemoteService};
use crate::transcript::Transcript;

/// Blocking user notification, shown when a chat request fails with a
/// recognised backend fault
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that only logs
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        error!("Notification: {}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    BlankInput,
    Busy,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Nothing changed
    Rejected(Rejection),
    Answered(String),
    Failed(RemoteError),
}

#[derive(Clone)]
pub struct ConversationController {
    remote: Arc<dyn RemoteService>,
    transcript: Arc<Mutex<Transcript>>,
    busy: BusyFlag,
    input: Arc<Mutex<String>>,
    notifier: Arc<dyn Notifier>,
}

impl ConversationController {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        transcript: Arc<Mutex<Transcript>>,
        busy: BusyFlag,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            remote,
            transcript,
            busy,
            input: Arc::new(Mutex::new(String::new())),
            notifier,
        }
    }

    pub fn state(&self) -> RequestState {
        self.busy.state()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        *self.input.lock() = text.into();
    }

    pub fn input(&self) -> String {
        self.input.lock().clone()
    }

    /// Submit whatever is in the input buffer
    pub async fn submit_input(&self) -> SubmitOutcome {
        let text = self.input();
        self.submit(text).await
    }

    pub async fn submit(&self, text: impl Into<String>) -> SubmitOutcome {
        match self.begin(text) {
            Ok(pending) => pending.settle().await,
            Err(rejection) => SubmitOutcome::Rejected(rejection),
        }
    }

    /// Start a submission from the input buffer. See [`Self::begin`].
    pub fn begin_input(&self) -> Result<PendingChat, Rejection> {
        let text = self.input();
        self.begin(text)
    }

    /// Run steps 1 and 2 of the protocol without suspending. The returned
    /// request holds the busy flag until it is settled or dropped.
    pub fn begin(&self, text: impl Into<String>) -> Result<PendingChat, Rejection> {
        let text = text.into();
        if text.trim().is_empty() {
            debug!("Ignoring blank chat submission");
            return Err(Rejection::BlankInput);
        }

        let Some(guard) = self.busy.try_acquire() else {
            debug!("Ignoring chat submission while a request is pending");
            return Err(Rejection::Busy);
        };

        let payload = {
            let mut transcript = self.transcript.lock();
            let user_message = Message::user(text);
            let mut payload = transcript.conversation_payload();
            payload.push(user_message.clone());
            transcript.append(user_message);
            transcript.append(Message::placeholder());
            payload
        };
        self.input.lock().clear();

        Ok(PendingChat {
            controller: self.clone(),
            payload,
            _guard: guard,
        })
    }
}

/// A chat request whose optimistic transcript update is already visible
#[must_use = "the placeholder stays in the transcript until the request is settled"]
pub struct PendingChat {
    controller: ConversationController,
    payload: Vec<Message>,
    _guard: BusyGuard,
}

impl PendingChat {
    /// Messages sent to the backend
    pub fn payload(&self) -> &[Message] {
        &self.payload
    }

    /// Send the request and reconcile the transcript with its result
    pub async fn settle(self) -> SubmitOutcome {
        let controller = &self.controller;
        info!("Sending chat request with {} messages", self.payload.len());

        match controller.remote.chat(&self.payload).await {
            Ok(response) => {
                controller
                    .transcript
                    .lock()
                    .replace_last(Message::system(response.clone()));
                SubmitOutcome::Answered(response)
            }
            Err(e) => {
                error!("Chat request failed: {}", e);
                controller.transcript.lock().drop_last();
                if let Some(reason) = e.user_message() {
                    controller.notifier.notify(reason);
                }
                SubmitOutcome::Failed(e)
            }
        }
    }
}
