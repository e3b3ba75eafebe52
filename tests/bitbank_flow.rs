mod common;

use buy_btc::exchange::signing::bitbank_signature;
use buy_btc::handler::{handle, InvocationRequest};
use common::{bitbank_config, closed_base, route, store_with_budget, CannedExchange, API_KEY, API_SECRET};

const TICKER_300K: &str = r#"{"success":1,"data":{"sell":"300100","buy":"299900","open":"295000","high":"305000","low":"290000","last":"300000","vol":"1234.5678","timestamp":1700000000123}}"#;
const TICKER_100M: &str = r#"{"success":1,"data":{"sell":"100000001","buy":"99999999","high":"100000000","low":"100000000","last":"100000000","vol":"1","timestamp":1700000000123}}"#;
const ORDER_OK: &str = r#"{"success":1,"data":{"order_id":123456,"pair":"eth_jpy","side":"buy","type":"market","start_amount":"0.0333","remaining_amount":"0.0333","executed_amount":"0.0000","price":"","post_only":false,"average_price":"0","ordered_at":1700000000000,"status":"UNFILLED"}}"#;
const ORDER_REJECTED: &str = r#"{"success":0,"data":{"code":60001}}"#;

#[tokio::test]
async fn buys_budget_worth_at_last_price() {
    let ex = CannedExchange::start(vec![
        route("/eth_jpy/ticker", TICKER_300K),
        route("/v1/user/spot/order", ORDER_OK),
    ])
    .await;
    let cfg = bitbank_config(&ex.base);

    let resp = handle(&cfg, &store_with_budget("10000"), &InvocationRequest::default()).await;
    assert_eq!(resp.status_code, 200, "body: {}", resp.body);
    assert!(resp.body.starts_with("res:"));
    assert!(resp.body.contains("order_id:123456"));

    let ticker = ex.request_to("/eth_jpy/ticker").expect("ticker request");
    assert_eq!(ticker.method, "GET");
    assert!(ticker.headers.get("access-key").is_none());

    let order = ex.request_to("/v1/user/spot/order").expect("order request");
    assert_eq!(order.method, "POST");
    assert_eq!(
        order.body,
        r#"{"pair":"eth_jpy","amount":"0.0333","side":"buy","type":"market"}"#
    );
    assert_eq!(order.headers["access-key"], API_KEY);

    let nonce = &order.headers["access-nonce"];
    assert!(nonce.chars().all(|c| c.is_ascii_digit()));
    let expected = bitbank_signature(API_SECRET, nonce, order.body.as_bytes()).unwrap();
    assert_eq!(order.headers["access-signature"], expected);
}

#[tokio::test]
async fn small_budget_floors_to_minimum_size() {
    let ex = CannedExchange::start(vec![
        route("/eth_jpy/ticker", TICKER_100M),
        route("/v1/user/spot/order", ORDER_OK),
    ])
    .await;

    let resp = handle(&bitbank_config(&ex.base), &store_with_budget("100"), &InvocationRequest::default()).await;
    assert_eq!(resp.status_code, 200, "body: {}", resp.body);

    let order = ex.request_to("/v1/user/spot/order").unwrap();
    assert!(order.body.contains(r#""amount":"0.0001""#), "body: {}", order.body);
}

#[tokio::test]
async fn rejected_order_surfaces_raw_body() {
    let ex = CannedExchange::start(vec![
        route("/eth_jpy/ticker", TICKER_300K),
        route("/v1/user/spot/order", ORDER_REJECTED),
    ])
    .await;

    let resp = handle(&bitbank_config(&ex.base), &store_with_budget("10000"), &InvocationRequest::default()).await;
    assert_eq!(resp.status_code, 400);
    assert_eq!(resp.body, ORDER_REJECTED);
}

#[tokio::test]
async fn malformed_ticker_fails_before_ordering() {
    let ex = CannedExchange::start(vec![
        route("/eth_jpy/ticker", "<html>maintenance</html>"),
        route("/v1/user/spot/order", ORDER_OK),
    ])
    .await;

    let resp = handle(&bitbank_config(&ex.base), &store_with_budget("10000"), &InvocationRequest::default()).await;
    assert_eq!(resp.status_code, 400);
    assert!(!resp.body.is_empty());
    assert!(ex.request_to("/v1/user/spot/order").is_none());
}

#[tokio::test]
async fn unreachable_exchange_is_a_failure() {
    let cfg = bitbank_config(&closed_base());
    let resp = handle(&cfg, &store_with_budget("10000"), &InvocationRequest::default()).await;
    assert_eq!(resp.status_code, 400);
    assert!(!resp.body.is_empty());
}

#[tokio::test]
async fn non_positive_budget_never_reaches_exchange() {
    let ex = CannedExchange::start(vec![
        route("/eth_jpy/ticker", TICKER_300K),
        route("/v1/user/spot/order", ORDER_OK),
    ])
    .await;

    let resp = handle(&bitbank_config(&ex.base), &store_with_budget("0"), &InvocationRequest::default()).await;
    assert_eq!(resp.status_code, 400);
    assert_eq!(resp.body, "invalid budget: 0");
    assert!(ex.request_to("/v1/user/spot/order").is_none());
}
