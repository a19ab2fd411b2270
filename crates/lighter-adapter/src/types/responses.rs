/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust response structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use super::models::{AccountInfo, ApiKey, FundingRate, Order, OrderBookDetail, OrderBookMarket};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextNonce {
    pub nonce: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountApiKeys {
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxHash {
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxHashBatch {
    #[serde(default)]
    pub tx_hash: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFeeInfo {
    #[serde(rename = "transfer_fee_usdc")]
    pub transfer_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedAccounts {
    #[serde(default, alias = "accounts")]
    pub detailed_accounts: Vec<AccountInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L1Accounts {
    #[serde(default)]
    pub l1_address: String,
    #[serde(default)]
    pub sub_accounts: Vec<AccountInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBooksResponse {
    #[serde(default)]
    pub order_books: Vec<OrderBookMarket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookDetailsResponse {
    #[serde(default)]
    pub order_book_details: Vec<OrderBookDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersResponse {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRatesResponse {
    #[serde(default)]
    pub funding_rates: Vec<FundingRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub network_id: i32,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub deposit_amount_available: String,
}
