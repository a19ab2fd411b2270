/*
[INPUT]:  Market identifiers and query parameters
[OUTPUT]: Market data (order book listings and details, funding rates, system status)
[POS]:    HTTP layer - public market data endpoints (no auth required)
[UPDATE]: When adding new public endpoints or changing response format
*/

use crate::http::{LighterClient, Result};
use crate::types::{
    FundingRatesResponse, OrderBookDetailsResponse, OrderBooksResponse, SystemInfo, SystemStatus,
};

const NO_PARAMS: &[(&str, String)] = &[];

impl LighterClient {
    /// List markets and their trading configuration
    ///
    /// GET /api/v1/orderBooks
    pub async fn order_books(&self) -> Result<OrderBooksResponse> {
        self.get_json("/api/v1/orderBooks", NO_PARAMS).await
    }

    /// Market details; `None` returns every market
    ///
    /// GET /api/v1/orderBookDetails?market_id={market_id}
    pub async fn order_book_details(&self, market_id: Option<u8>) -> Result<OrderBookDetailsResponse> {
        let params: Vec<(&str, String)> = market_id
            .map(|id| vec![("market_id", id.to_string())])
            .unwrap_or_default();
        self.get_json("/api/v1/orderBookDetails", params.as_slice()).await
    }

    /// GET /api/v1/funding-rates
    pub async fn funding_rates(&self) -> Result<FundingRatesResponse> {
        self.get_json("/api/v1/funding-rates", NO_PARAMS).await
    }

    /// GET /
    pub async fn status(&self) -> Result<SystemStatus> {
        self.get_json("/", NO_PARAMS).await
    }

    /// GET /info
    pub async fn info(&self) -> Result<SystemInfo> {
        self.get_json("/info", NO_PARAMS).await
    }
}
