/*
[INPUT]:  Mock HTTP responses
[OUTPUT]: Test results for HTTP client
[POS]:    Integration tests - HTTP endpoints
[UPDATE]: When HTTP endpoints change
*/

mod common;

use common::{mock_auth_token, setup_mock_server};
use lighter_adapter::{
    AccountLookup, ClientConfig, ErrorKind, InactiveOrdersQuery, LighterClient, LighterError, RawTx, SignedTx,
    TxType,
};
use rstest::rstest;
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> LighterClient {
    assert_ok!(LighterClient::with_config(
        ClientConfig::default().with_base_url(server.uri())
    ))
}

#[test]
fn test_client_creation() {
    let client = assert_ok!(LighterClient::new());
    assert_eq!(client.base_url().as_str(), "https://mainnet.zklighter.elliot.ai/");
}

#[tokio::test]
async fn test_account_lookup_by_index() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account"))
        .and(query_param("by", "index"))
        .and(query_param("value", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "accounts": [{
                "index": 42,
                "l1_address": "0x8d7f03fde1a626223364e592740a233b72395235",
                "available_balance": "1520.25",
                "market_stats": []
            }]
        })))
        .mount(&server)
        .await;

    let accounts = assert_ok!(client_for(&server).account(&AccountLookup::Index(42)).await);
    assert_eq!(accounts.detailed_accounts.len(), 1);
    assert_eq!(accounts.detailed_accounts[0].available_balance.to_string(), "1520.25");
}

#[tokio::test]
async fn test_inactive_orders_default_limit() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/accountInactiveOrders"))
        .and(query_param("account_index", "42"))
        .and(query_param("limit", "50"))
        .and(query_param("auth", mock_auth_token()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "orders": [{ "order_id": "9001", "market_id": 3, "is_ask": 0, "price": "101.5" }]
        })))
        .mount(&server)
        .await;

    let query = InactiveOrdersQuery::new(42, mock_auth_token());
    let orders = assert_ok!(client_for(&server).inactive_orders(&query).await);
    assert_eq!(orders.orders[0].id, "9001");
}

#[tokio::test]
async fn test_send_tx_submits_signed_payload() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sendTx"))
        .and(header("Channel-Name", "desk-7"))
        .and(body_string_contains("tx_type=14"))
        .and(body_string_contains("price_protection=false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 200, "tx_hash": "0xabc" })))
        .mount(&server)
        .await;

    let config = ClientConfig {
        channel_name: "desk-7".to_string(),
        price_protection: false,
        ..ClientConfig::default().with_base_url(server.uri())
    };
    let client = assert_ok!(LighterClient::with_config(config));
    let tx = RawTx::new(TxType::CreateOrder, r#"{"MarketIndex":3}"#);
    let hash = assert_ok!(client.send_tx(&tx as &dyn SignedTx).await);
    assert_eq!(hash, "0xabc");
}

#[rstest]
#[case(500, json!("upstream unavailable"), 500)]
#[case(200, json!({ "code": 21104, "message": "invalid nonce" }), 21104)]
#[tokio::test]
async fn test_errors_surface_code_and_message(
    #[case] status: u16,
    #[case] body: serde_json::Value,
    #[case] expected_code: i32,
) {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/nextNonce"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .next_nonce(42, 2)
        .await
        .expect_err("request should fail");
    assert_eq!(err.kind(), ErrorKind::Application);
    match err {
        LighterError::Api { code, message } => {
            assert_eq!(code, expected_code);
            assert!(!message.is_empty());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let listener = assert_ok!(std::net::TcpListener::bind("127.0.0.1:0"));
    let addr = assert_ok!(listener.local_addr());
    drop(listener);

    let config = ClientConfig::default().with_base_url(format!("http://{addr}"));
    let client = assert_ok!(LighterClient::with_config(config));
    let err = client.status().await.expect_err("nothing listening");
    assert!(matches!(err, LighterError::Http(_)));
    assert!(err.is_retryable());
}
