/*
[INPUT]:  Caller parameters for REST queries and transaction submission
[OUTPUT]: Query pairs and URL-encoded form fields
[POS]:    Data layer - request marshaling for API communication
[UPDATE]: When endpoint parameters change
*/

use serde::{Deserialize, Serialize};

/// Default page size for `accountInactiveOrders`
pub const DEFAULT_INACTIVE_ORDER_LIMIT: u32 = 50;

/// Query for `api/v1/accountInactiveOrders`; `market_id: None` spans all markets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InactiveOrdersQuery {
    pub account_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_id: Option<u8>,
    pub auth: String,
    pub limit: u32,
}

impl InactiveOrdersQuery {
    pub fn new(account_index: i64, auth: impl Into<String>) -> Self {
        Self {
            account_index,
            market_id: None,
            auth: auth.into(),
            limit: DEFAULT_INACTIVE_ORDER_LIMIT,
        }
    }

    pub fn market(mut self, market_id: u8) -> Self {
        self.market_id = Some(market_id);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("account_index", self.account_index.to_string()),
            ("auth", self.auth.clone()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(market_id) = self.market_id {
            params.push(("market_id", market_id.to_string()));
        }
        params
    }
}
