use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::models::{MarketDatum, Message, Portfolio, Trade};
use crate::remote::{FaultCategory, RemoteError, RemoteService};

/// JSON-over-HTTP adapter for the trading backend
#[derive(Debug, Clone)]
pub struct HttpRemoteService {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    response: String,
}

#[derive(Debug, Deserialize)]
struct FaultBody {
    category: FaultCategory,
    message: String,
}

impl HttpRemoteService {
    /// Build an adapter for `base_url`. No timeout is applied unless one is given.
    pub fn new(base_url: &str, request_timeout: Option<Duration>) -> Result<Self, RemoteError> {
        let parsed = Url::parse(base_url).map_err(|e| RemoteError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(base_url.to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = self.endpoint(path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<T, RemoteError> {
        let url = self.endpoint(path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(&payload).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(classify_failure(status.as_u16(), body));
    }

    Ok(serde_json::from_str(&body)?)
}

/// Turn a non-2xx response into a typed fault when the body has the fault shape
pub(crate) fn classify_failure(status: u16, body: String) -> RemoteError {
    match serde_json::from_str::<FaultBody>(&body) {
        Ok(fault) => RemoteError::Fault {
            category: fault.category,
            message: fault.message,
        },
        Err(_) => RemoteError::Status { status, body },
    }
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn chat(&self, messages: &[Message]) -> Result<String, RemoteError> {
        let reply: ChatReply = self.post_json("chat", json!({ "messages": messages })).await?;
        Ok(reply.response)
    }

    async fn get_portfolio(&self) -> Result<Portfolio, RemoteError> {
        self.get_json("portfolio").await
    }

    async fn get_market_data(&self) -> Result<Vec<MarketDatum>, RemoteError> {
        self.get_json("market-data").await
    }

    async fn get_trade_history(&self) -> Result<Vec<Trade>, RemoteError> {
        self.get_json("trade-history").await
    }

    async fn auto_trade(&self) -> Result<Trade, RemoteError> {
        self.post_json("auto-trade", json!({})).await
    }
}
