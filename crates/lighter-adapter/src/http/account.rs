/*
[INPUT]:  Account indices, API key indices and auth tokens
[OUTPUT]: Account data (nonces, API keys, accounts, orders, transfer fees)
[POS]:    HTTP layer - account endpoints
[UPDATE]: When adding new account endpoints or changing query parameters
*/

use crate::http::{LighterClient, Result};
use crate::types::{
    AccountApiKeys, AccountLookup, DetailedAccounts, InactiveOrdersQuery, L1Accounts, NextNonce,
    OrdersResponse, TransferFeeInfo,
};

impl LighterClient {
    /// Next usable nonce for an API key
    ///
    /// GET /api/v1/nextNonce?account_index={account_index}&api_key_index={api_key_index}
    pub async fn next_nonce(&self, account_index: i64, api_key_index: u8) -> Result<i64> {
        let params = [
            ("account_index", account_index.to_string()),
            ("api_key_index", api_key_index.to_string()),
        ];
        let result: NextNonce = self.get_json("/api/v1/nextNonce", &params).await?;
        Ok(result.nonce)
    }

    /// GET /api/v1/apikeys?account_index={account_index}&api_key_index={api_key_index}
    pub async fn api_keys(&self, account_index: i64, api_key_index: u8) -> Result<AccountApiKeys> {
        let params = [
            ("account_index", account_index.to_string()),
            ("api_key_index", api_key_index.to_string()),
        ];
        self.get_json("/api/v1/apikeys", &params).await
    }

    /// GET /api/v1/account?by={by}&value={value}
    pub async fn account(&self, lookup: &AccountLookup) -> Result<DetailedAccounts> {
        let (by, value) = lookup.query();
        let params = [("by", by.to_string()), ("value", value)];
        self.get_json("/api/v1/account", &params).await
    }

    /// GET /api/v1/accountsByL1Address?l1_address={l1_address}
    pub async fn accounts_by_l1_address(&self, l1_address: &str) -> Result<L1Accounts> {
        let params = [("l1_address", l1_address.to_string())];
        self.get_json("/api/v1/accountsByL1Address", &params).await
    }

    /// GET /api/v1/accountActiveOrders?account_index={account_index}&market_id={market_id}&auth={auth}
    pub async fn active_orders(
        &self,
        account_index: i64,
        market_id: u8,
        auth: &str,
    ) -> Result<OrdersResponse> {
        let params = [
            ("account_index", account_index.to_string()),
            ("market_id", market_id.to_string()),
            ("auth", auth.to_string()),
        ];
        self.get_json("/api/v1/accountActiveOrders", &params).await
    }

    /// GET /api/v1/accountInactiveOrders
    pub async fn inactive_orders(&self, query: &InactiveOrdersQuery) -> Result<OrdersResponse> {
        let params = query.to_query();
        self.get_json("/api/v1/accountInactiveOrders", &params).await
    }

    /// GET /api/v1/transferFeeInfo?account_index={account_index}&to_account_index={to}&auth={auth}
    pub async fn transfer_fee_info(
        &self,
        account_index: i64,
        to_account_index: i64,
        auth: &str,
    ) -> Result<TransferFeeInfo> {
        let params = [
            ("account_index", account_index.to_string()),
            ("to_account_index", to_account_index.to_string()),
            ("auth", auth.to_string()),
        ];
        self.get_json("/api/v1/transferFeeInfo", &params).await
    }
}

#[cfg(test)]
mod tests {
    use crate::http::{ClientConfig, LighterClient};
    use crate::types::{AccountLookup, InactiveOrdersQuery};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> LighterClient {
        LighterClient::with_config(ClientConfig::default().with_base_url(server.uri()))
            .expect("client init")
    }

    #[tokio::test]
    async fn test_next_nonce() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/nextNonce"))
            .and(query_param("account_index", "3"))
            .and(query_param("api_key_index", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"code": 200, "nonce": 722}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let nonce = client_for(&server).next_nonce(3, 1).await.expect("next_nonce failed");
        assert_eq!(nonce, 722);
    }

    #[tokio::test]
    async fn test_account_by_index() {
        let server = MockServer::start().await;
        let mock_response = r#"{
            "code": 200,
            "accounts": [
                { "index": 3, "l1_address": "0xabc", "available_balance": "1520.330000", "market_stats": [] }
            ]
        }"#;
        Mock::given(method("GET"))
            .and(path("/api/v1/account"))
            .and(query_param("by", "index"))
            .and(query_param("value", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(mock_response, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .account(&AccountLookup::Index(3))
            .await
            .expect("account failed");

        assert_eq!(response.detailed_accounts[0].index, 3);
        assert_eq!(
            response.detailed_accounts[0].available_balance.to_string(),
            "1520.330000"
        );
    }

    #[tokio::test]
    async fn test_inactive_orders_default_limit() {
        let server = MockServer::start().await;
        let mock_response = r#"{
            "code": 200,
            "orders": [
                { "order_id": "281474976710657", "market_id": 3, "is_ask": 0, "price": "3000.10",
                  "base_quantity": "0.5", "filled_quantity": "0.5", "status": "filled" }
            ]
        }"#;
        Mock::given(method("GET"))
            .and(path("/api/v1/accountInactiveOrders"))
            .and(query_param("account_index", "3"))
            .and(query_param("auth", "token"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(mock_response, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .inactive_orders(&InactiveOrdersQuery::new(3, "token"))
            .await
            .expect("inactive_orders failed");

        let order = &response.orders[0];
        assert_eq!(order.id, "281474976710657");
        assert_eq!(order.price.to_string(), "3000.10");
        assert_eq!(order.status, "filled");
    }
}
