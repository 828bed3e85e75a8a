//! # Quantumic
//!
//! Line-oriented terminal front-end for the Quantumic trading assistant.
//!
//! ## Environment Setup
//! Copy `.env.example` to `.env` or export the variables directly:
//! ```bash
//! QUANTUMIC_BACKEND_URL=http://127.0.0.1:4943/api
//! QUANTUMIC_REFRESH_INTERVAL_SECS=30
//! ```
//!
//! ## Commands
//! - any text: ask the assistant
//! - `/trade`: execute an automated trade
//! - `/portfolio`, `/market`, `/history`: show the cached resources
//! - `/stats`: client statistics
//! - `/quit`: exit

use std::sync::Arc;

use anyhow::Context;
use quantumic_client::conversation::{Notifier, Rejection};
use quantumic_client::dispatcher::AutoTradeOutcome;
use quantumic_client::models::Speaker;
use quantumic_client::transcript::TranscriptEvent;
use quantumic_client::{Config, QuantumicClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        eprintln!("\n⚠️  {}\n", message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    tracing::info!("🏁 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration from environment")?;
    let client = Arc::new(
        QuantumicClient::from_config(&config, Arc::new(TerminalNotifier))
            .context("Failed to create backend client")?,
    );

    for message in client.transcript() {
        print_message(message.role, &message.content);
    }
    let renderer = tokio::spawn(render_transcript(client.subscribe()));

    client.mount();
    run_input_loop(Arc::clone(&client)).await?;

    client.teardown();
    renderer.abort();
    tracing::info!("👋 Bye");
    Ok(())
}

async fn run_input_loop(client: Arc<QuantumicClient>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read user input")? {
        match line.trim() {
            "/quit" | "exit" => break,
            "/trade" => {
                let client = Arc::clone(&client);
                tokio::spawn(async move {
                    if let AutoTradeOutcome::Busy = client.execute_auto_trade().await {
                        println!("Still waiting on the previous request, auto trade ignored");
                    }
                });
            }
            "/portfolio" => show_portfolio(&client),
            "/market" => show_market(&client),
            "/history" => show_history(&client),
            "/stats" => match serde_json::to_string_pretty(&client.stats()) {
                Ok(stats) => println!("{}", stats),
                Err(e) => tracing::warn!("Failed to render stats: {}", e),
            },
            _ => match client.conversation().begin(line.clone()) {
                Ok(pending) => {
                    tokio::spawn(pending.settle());
                }
                Err(Rejection::Busy) => {
                    println!("Still waiting on the previous request, ignored: {}", line);
                }
                Err(Rejection::BlankInput) => {}
            },
        }
    }

    Ok(())
}

/// Print each new or replaced transcript entry as it lands
async fn render_transcript(mut events: broadcast::Receiver<TranscriptEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(message) = event.entry() {
                    print_message(message.role, &message.content);
                }
            }
            Err(RecvError::Lagged(skipped)) => tracing::debug!("Renderer skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_message(role: Speaker, content: &str) {
    let name = match role {
        Speaker::User => "You",
        Speaker::System => "Quantumic",
    };
    println!("[{}] {}", name, content);
}

fn show_portfolio(client: &QuantumicClient) {
    let sync = client.synchronizer();
    let Some(portfolio) = sync.portfolio().get() else {
        println!("Loading portfolio...");
        return;
    };
    let market = sync.market_data().get().unwrap_or_default();

    println!("Total value: {:.2}", portfolio.total_value);
    for balance in portfolio.valued_balances(&market) {
        println!("  {:<8} {:>14.4}  value {:.2}", balance.asset, balance.quantity, balance.value);
    }
}

fn show_market(client: &QuantumicClient) {
    let Some(market) = client.synchronizer().market_data().get() else {
        println!("Loading market data...");
        return;
    };
    for datum in market.iter() {
        println!(
            "  {:<8} {:>14.2} {:>+8.2}% vol {:.2}",
            datum.asset, datum.price, datum.change_24h, datum.volume
        );
    }
}

fn show_history(client: &QuantumicClient) {
    let Some(trades) = client.synchronizer().trade_history().get() else {
        println!("Loading trade history...");
        return;
    };
    for trade in trades.iter() {
        let when = trade
            .executed_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!(
            "  {} {:<4} {:<8} {:>12.4} @ {:.2}  {}",
            when, trade.direction, trade.asset, trade.amount, trade.price, trade.reason
        );
    }
}
