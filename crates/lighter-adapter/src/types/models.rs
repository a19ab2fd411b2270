/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::Side;

/// Status envelope embedded in every REST body; `code == 200` means success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultCode {
    #[serde(default)]
    pub code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub const CODE_OK: i32 = 200;

impl ResultCode {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub account_index: i64,
    pub api_key_index: u8,
    pub nonce: i64,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMarketStats {
    #[serde(default)]
    pub market_id: u8,
    #[serde(default)]
    pub open_order_count: i64,
    #[serde(default)]
    pub sign: i8,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub position: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub avg_entry_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub position_value: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub unrealized_pnl: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub realized_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub account_type: u8,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub l1_address: String,
    #[serde(default)]
    pub cancel_all_time: i64,
    #[serde(default)]
    pub total_order_count: i64,
    #[serde(default)]
    pub total_isolated_order_count: i64,
    #[serde(default)]
    pub pending_order_count: i64,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub available_balance: Decimal,
    #[serde(default)]
    pub status: u8,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub last_active_at: i64,
    #[serde(default)]
    pub market_stats: Vec<AccountMarketStats>,
}

/// Market configuration as listed by `api/v1/orderBooks`.
///
/// Carries no depth; resting levels live in [`PriceLevel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookMarket {
    pub market_id: u8,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub supported_size_decimals: u32,
    #[serde(default)]
    pub supported_price_decimals: u32,
    #[serde(default)]
    pub supported_quote_decimals: u32,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub min_base_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub min_quote_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub taker_fee: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub maker_fee: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub liquidation_fee: Decimal,
    #[serde(default)]
    pub status: String,
}

/// Per-market detail from `api/v1/orderBookDetails`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookDetail {
    #[serde(flatten)]
    pub market: OrderBookMarket,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub last_trade_price: Decimal,
    #[serde(default)]
    pub daily_trades_count: i64,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub open_interest: Decimal,
}

/// One resting level; price and quantity keep the exchange's decimal text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: String,
    pub quantity: String,
}

impl PriceLevel {
    pub fn new(price: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            quantity: quantity.into(),
        }
    }

    /// Parse the price for display or arithmetic; the stored text is untouched
    pub fn price_decimal(&self) -> Result<Decimal, rust_decimal::Error> {
        self.price.parse()
    }

    pub fn quantity_decimal(&self) -> Result<Decimal, rust_decimal::Error> {
        self.quantity.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, alias = "order_id")]
    pub id: String,
    #[serde(default)]
    pub account_index: i64,
    #[serde(default)]
    pub market_id: u8,
    #[serde(default)]
    pub client_order_index: i64,
    #[serde(default)]
    pub is_ask: u8,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub base_quantity: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(default)]
    pub order_type: u8,
    #[serde(default)]
    pub time_in_force: u8,
    #[serde(default)]
    pub reduce_only: u8,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub trigger_price: Decimal,
    #[serde(default)]
    pub order_expiry: i64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub filled_quantity: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub remaining_quantity: Decimal,
}

impl Order {
    pub fn side(&self) -> Side {
        Side::from_is_ask(self.is_ask)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    pub market_id: u8,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub rate: Decimal,
}
