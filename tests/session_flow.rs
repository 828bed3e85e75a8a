use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use quantumic_client::busy::RequestState;
use quantumic_client::conversation::{Notifier, Rejection, SubmitOutcome};
use quantumic_client::dispatcher::AutoTradeOutcome;
use quantumic_client::remote::FaultCategory;
use quantumic_client::transcript::TranscriptEvent;
use quantumic_client::{
    MarketDatum, Message, Portfolio, QuantumicClient, RemoteError, RemoteService, Speaker, Trade,
    TradeDirection,
};

/// In-memory backend with counters for every endpoint
#[derive(Default)]
struct FakeBackend {
    chat_replies: Mutex<Vec<Result<String, RemoteError>>>,
    portfolio_calls: AtomicUsize,
    market_calls: AtomicUsize,
    history_calls: AtomicUsize,
    trades: Mutex<Vec<Trade>>,
    trade_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    entered: Notify,
    chat_gate: Mutex<Option<oneshot::Receiver<()>>>,
    trade_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeBackend {
    fn with_chat_replies(replies: Vec<Result<String, RemoteError>>) -> Arc<Self> {
        Arc::new(Self {
            chat_replies: Mutex::new(replies),
            ..Default::default()
        })
    }

    fn hold_chat(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.chat_gate.lock() = Some(rx);
        tx
    }

    fn hold_trade(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.trade_gate.lock() = Some(rx);
        tx
    }
}

async fn wait_for_release(gate: &Mutex<Option<oneshot::Receiver<()>>>) {
    let gate = gate.lock().take();
    if let Some(gate) = gate {
        let _ = gate.await;
    }
}

#[async_trait]
impl RemoteService for FakeBackend {
    async fn chat(&self, _messages: &[Message]) -> Result<String, RemoteError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        wait_for_release(&self.chat_gate).await;
        let mut replies = self.chat_replies.lock();
        if replies.is_empty() {
            Ok("no comment".to_string())
        } else {
            replies.remove(0)
        }
    }

    async fn get_portfolio(&self) -> Result<Portfolio, RemoteError> {
        self.portfolio_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Portfolio {
            total_value: 1000.0,
            balances: vec![("BTC".to_string(), 0.01)],
        })
    }

    async fn get_market_data(&self) -> Result<Vec<MarketDatum>, RemoteError> {
        self.market_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![MarketDatum {
            asset: "BTC".to_string(),
            price: 60000.0,
            change_24h: -1.2,
            volume: 2.5e10,
        }])
    }

    async fn get_trade_history(&self) -> Result<Vec<Trade>, RemoteError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.trades.lock().clone())
    }

    async fn auto_trade(&self) -> Result<Trade, RemoteError> {
        self.trade_calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        wait_for_release(&self.trade_gate).await;
        let trade = Trade {
            timestamp: 1_700_000_000_000_000_000,
            direction: TradeDirection::Buy,
            asset: "ETH".to_string(),
            amount: 0.5,
            price: 2000.0,
            reason: "momentum".to_string(),
        };
        self.trades.lock().push(trade.clone());
        Ok(trade)
    }
}

#[derive(Default)]
struct Alerts(Mutex<Vec<String>>);

impl Notifier for Alerts {
    fn notify(&self, message: &str) {
        self.0.lock().push(message.to_string());
    }
}

fn client(backend: Arc<FakeBackend>, alerts: Arc<Alerts>) -> QuantumicClient {
    QuantumicClient::new(backend, alerts, Duration::from_secs(30))
}

#[tokio::test]
async fn test_chat_round_trip_and_rollback() {
    let backend = FakeBackend::with_chat_replies(vec![
        Ok("BTC is trading sideways".to_string()),
        Err(RemoteError::Fault {
            category: FaultCategory::CanisterReject,
            message: "Too many requests".to_string(),
        }),
    ]);
    let alerts = Arc::new(Alerts::default());
    let client = client(backend, alerts.clone());
    let mut events = client.subscribe();

    let outcome = client.submit("How is BTC?").await;
    assert!(matches!(outcome, SubmitOutcome::Answered(_)));
    assert_eq!(client.transcript().len(), 3);
    assert_eq!(
        client.transcript().last(),
        Some(&Message::system("BTC is trading sideways"))
    );

    let outcome = client.submit("And ETH?").await;
    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_eq!(client.transcript().len(), 4);
    assert_eq!(client.transcript().last(), Some(&Message::user("And ETH?")));
    assert_eq!(*alerts.0.lock(), vec!["Too many requests".to_string()]);
    assert_eq!(client.request_state(), RequestState::Idle);

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(
        received,
        vec![
            TranscriptEvent::Appended {
                newest: 1,
                entry: Message::user("How is BTC?")
            },
            TranscriptEvent::Appended {
                newest: 2,
                entry: Message::placeholder()
            },
            TranscriptEvent::ReplacedLast {
                newest: 2,
                entry: Message::system("BTC is trading sideways")
            },
            TranscriptEvent::Appended {
                newest: 3,
                entry: Message::user("And ETH?")
            },
            TranscriptEvent::Appended {
                newest: 4,
                entry: Message::placeholder()
            },
            TranscriptEvent::DroppedLast { newest: 3 },
        ]
    );
}

#[tokio::test]
async fn test_auto_trade_narrates_after_chat() {
    let backend = FakeBackend::with_chat_replies(vec![Ok("Sure".to_string())]);
    let client = client(backend.clone(), Arc::new(Alerts::default()));

    client.submit("Trade something").await;
    let outcome = client.execute_auto_trade().await;

    assert!(matches!(outcome, AutoTradeOutcome::Executed(_)));
    assert_eq!(backend.portfolio_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.history_calls.load(Ordering::SeqCst), 1);

    let transcript = client.transcript();
    assert_eq!(transcript.len(), 4);
    let narrative = &transcript[3];
    assert_eq!(narrative.role, Speaker::System);
    assert_eq!(
        narrative.content,
        "Executed auto trade: BUY 0.5 ETH at $2000.00. Reason: momentum"
    );
    let history = client.synchronizer().trade_history().get().unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_mounted_client_polls_until_teardown() {
    let backend = FakeBackend::with_chat_replies(vec![]);
    let client = client(backend.clone(), Arc::new(Alerts::default()));

    client.mount();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let sync = client.synchronizer();
    assert_eq!(sync.portfolio().get().unwrap().total_value, 1000.0);
    assert_eq!(sync.market_data().get().unwrap().price_of("BTC"), Some(60000.0));
    assert!(sync.trade_history().get().unwrap().is_empty());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.market_calls.load(Ordering::SeqCst), 2);
    assert!(client.stats().sync.is_running);

    client.teardown();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(backend.market_calls.load(Ordering::SeqCst), 2);
    assert_eq!(backend.portfolio_calls.load(Ordering::SeqCst), 2);
    assert!(!client.stats().sync.is_running);
}

#[tokio::test]
async fn test_pending_auto_trade_blocks_chat() {
    let backend = FakeBackend::with_chat_replies(vec![Ok("Now I can answer".to_string())]);
    let release = backend.hold_trade();
    let client = Arc::new(client(backend.clone(), Arc::new(Alerts::default())));

    let trade = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.execute_auto_trade().await })
    };
    backend.entered.notified().await;
    assert_eq!(client.request_state(), RequestState::Pending);
    let before = client.transcript();

    let outcome = client.submit("x").await;
    assert!(matches!(outcome, SubmitOutcome::Rejected(Rejection::Busy)));
    assert_eq!(client.transcript(), before);
    assert_eq!(backend.chat_calls.load(Ordering::SeqCst), 0);

    release.send(()).unwrap();
    assert!(matches!(trade.await.unwrap(), AutoTradeOutcome::Executed(_)));
    assert_eq!(client.request_state(), RequestState::Idle);

    let outcome = client.submit("x").await;
    assert!(matches!(outcome, SubmitOutcome::Answered(_)));
}

#[tokio::test]
async fn test_pending_chat_blocks_auto_trade() {
    let backend = FakeBackend::with_chat_replies(vec![Ok("Done thinking".to_string())]);
    let release = backend.hold_chat();
    let client = Arc::new(client(backend.clone(), Arc::new(Alerts::default())));

    let chat = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.submit("Should I buy?").await })
    };
    backend.entered.notified().await;
    assert_eq!(client.request_state(), RequestState::Pending);
    let before = client.transcript();

    let outcome = client.execute_auto_trade().await;
    assert!(matches!(outcome, AutoTradeOutcome::Busy));
    assert_eq!(client.transcript(), before);
    assert_eq!(backend.trade_calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.portfolio_calls.load(Ordering::SeqCst), 0);

    release.send(()).unwrap();
    assert!(matches!(chat.await.unwrap(), SubmitOutcome::Answered(_)));
    assert_eq!(client.request_state(), RequestState::Idle);
    assert!(matches!(client.execute_auto_trade().await, AutoTradeOutcome::Executed(_)));
}
