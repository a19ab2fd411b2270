/*
[INPUT]:  HTTP configuration (base URL, timeouts, channel name)
[OUTPUT]: Configured reqwest client plus JSON envelope decoding
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::http::{LighterError, Result};
use crate::types::ResultCode;

/// Base URL for the Lighter mainnet API
const DEFAULT_BASE_URL: &str = "https://mainnet.zklighter.elliot.ai";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Sent as `Channel-Name` on transaction submission
    pub channel_name: String,
    /// When disabled, `sendTx` asks the exchange to skip fat-finger price checks
    pub price_protection: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            channel_name: String::new(),
            price_protection: true,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Main HTTP client for the Lighter REST API
#[derive(Debug, Clone)]
pub struct LighterClient {
    http_client: Client,
    base_url: Url,
    channel_name: String,
    price_protection: bool,
}

impl LighterClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(&config.base_url)?,
            channel_name: config.channel_name,
            price_protection: config.price_protection,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn price_protection(&self) -> bool {
        self.price_protection
    }

    /// Build request builder for an endpoint path
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// GET with query string, decoded through the status envelope
    pub(crate) async fn get_json<T>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let builder = self.request(Method::GET, endpoint)?.query(params);
        self.send_json(builder).await
    }

    /// POST with URL-encoded form body, decoded through the status envelope
    pub(crate) async fn post_form<T>(&self, endpoint: &str, form: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut builder = self.request(Method::POST, endpoint)?.form(form);
        if !self.channel_name.is_empty() {
            builder = builder.header("Channel-Name", &self.channel_name);
        }
        self.send_json(builder).await
    }

    /// Send a request and decode its JSON body.
    ///
    /// Non-200 status surfaces the raw body; a decoded `code != 200` surfaces its message.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "rest response");
        decode_body(status, &body)
    }
}

pub(crate) fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    if status != StatusCode::OK {
        return Err(LighterError::api_error(status, body));
    }

    let result: ResultCode = serde_json::from_str(body)?;
    if !result.is_ok() {
        return Err(LighterError::Api {
            code: result.code,
            message: result.message.unwrap_or_else(|| body.to_string()),
        });
    }

    Ok(serde_json::from_str(body)?)
}
