//! HTTP adapter for toncenter-compatible v2 APIs

use crate::{LedgerClient, LedgerError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tonwallet_core::{Address, Balance, SignedTransfer};

/// Response envelope shared by every v2 method
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetMethodResult {
    exit_code: i32,
    #[serde(default)]
    stack: Vec<Value>,
}

/// Failure of a single API call, before it is mapped per operation
#[derive(Debug)]
enum CallError {
    Transport(String),
    Api { status: StatusCode, message: String },
}

impl From<CallError> for LedgerError {
    fn from(e: CallError) -> Self {
        match e {
            CallError::Transport(msg) => LedgerError::Unreachable(msg),
            CallError::Api { status, message } => {
                LedgerError::Unreachable(format!("HTTP {}: {}", status.as_u16(), message))
            }
        }
    }
}

/// toncenter v2 JSON API client
#[derive(Debug, Clone)]
pub struct TonCenterClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl TonCenterClient {
    /// Create a client for `endpoint` (e.g. `https://toncenter.com/api/v2`)
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, LedgerError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        if !endpoint.starts_with("https://") {
            log::warn!("Ledger endpoint {} is not using TLS", endpoint);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LedgerError::Unreachable(e.to_string()))?;
        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint, method)
    }

    async fn call(&self, request: reqwest::RequestBuilder) -> Result<Value, CallError> {
        let request = match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let envelope: Envelope = serde_json::from_str(&body).map_err(|_| {
            CallError::Transport(format!("HTTP {}: malformed response", status.as_u16()))
        })?;
        if !envelope.ok {
            return Err(CallError::Api {
                status,
                message: envelope.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        envelope
            .result
            .ok_or_else(|| CallError::Transport("response without result".into()))
    }
}

#[async_trait]
impl LedgerClient for TonCenterClient {
    async fn get_balance(&self, address: &Address) -> Result<Balance, LedgerError> {
        let request = self
            .client
            .get(self.url("getAddressBalance"))
            .query(&[("address", address.to_raw())]);
        let result = self.call(request).await?;
        parse_nanos(&result)
            .map(Balance::from_nano)
            .ok_or_else(|| LedgerError::Unreachable(format!("unexpected balance: {}", result)))
    }

    async fn get_sequence_number(&self, address: &Address) -> Result<u32, LedgerError> {
        let request = self.client.post(self.url("runGetMethod")).json(&json!({
            "address": address.to_raw(),
            "method": "seqno",
            "stack": [],
        }));
        let result = self.call(request).await?;
        parse_seqno(result)
    }

    async fn submit(&self, transfer: &SignedTransfer) -> Result<(), LedgerError> {
        let request = self
            .client
            .post(self.url("sendBoc"))
            .json(&json!({ "boc": transfer.to_base64() }));

        match self.call(request).await {
            Ok(_) => {
                log::info!("Submitted message {}", transfer.hash_hex());
                Ok(())
            }
            Err(CallError::Api { status, message }) if !is_transient(status) => {
                log::warn!("Ledger rejected message {}: {}", transfer.hash_hex(), message);
                Err(LedgerError::SubmissionRejected(message))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Gateway and rate-limit statuses say nothing about the message itself
fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Nanoton values arrive as decimal strings or plain numbers
fn parse_nanos(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn parse_seqno(result: Value) -> Result<u32, LedgerError> {
    let result: GetMethodResult = serde_json::from_value(result)
        .map_err(|e| LedgerError::Unreachable(format!("unexpected get-method result: {}", e)))?;

    // Undeployed contracts fail the get-method
    if result.exit_code != 0 {
        log::debug!("seqno exited with {}, treating wallet as undeployed", result.exit_code);
        return Ok(0);
    }

    // [["num", "0x1a"]]
    let entry = result
        .stack
        .first()
        .and_then(|item| item.get(1))
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::Unreachable("empty seqno stack".into()))?;
    let parsed = match entry.strip_prefix("0x") {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => entry.parse(),
    };
    parsed.map_err(|_| LedgerError::Unreachable(format!("bad seqno value: {}", entry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{default_endpoint, Network};
    use axum::extract::Query;
    use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
    use axum::Router;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;
    use tonwallet_core::parse_address;

    const ADDR: &str = "UQDQGmFYcDpYloyZVEQ8yg9d_uQ5GVL-U6wtD10z66STZ2-b";

    /// One request as the server saw it
    #[derive(Debug, Clone)]
    struct Seen {
        method: Method,
        path: String,
        query: HashMap<String, String>,
        headers: HeaderMap,
        body: String,
    }

    impl Seen {
        fn json(&self) -> Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    type SeenLog = Arc<Mutex<Vec<Seen>>>;

    /// Answer every request with a canned status and body, logging what arrives
    async fn serve(status: StatusCode, body: &str) -> (String, SeenLog) {
        let seen: SeenLog = Arc::default();
        let log = seen.clone();
        let body = body.to_string();
        let app = Router::new().fallback(
            move |method: Method,
                  uri: Uri,
                  Query(query): Query<HashMap<String, String>>,
                  headers: HeaderMap,
                  payload: String| async move {
                log.lock().unwrap().push(Seen {
                    method,
                    path: uri.path().to_string(),
                    query,
                    headers,
                    body: payload,
                });
                (status, [(header::CONTENT_TYPE, "application/json")], body)
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (url, seen)
    }

    fn only_request(seen: &SeenLog) -> Seen {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        seen[0].clone()
    }

    fn address() -> Address {
        parse_address(ADDR).unwrap()
    }

    fn transfer() -> SignedTransfer {
        SignedTransfer {
            boc: vec![0xb5, 0xee, 0x9c, 0x72],
            message_hash: [7u8; 32],
        }
    }

    #[tokio::test]
    async fn test_get_balance() {
        let (url, seen) = serve(StatusCode::OK, r#"{"ok":true,"result":"1500000000"}"#).await;
        let client = TonCenterClient::new(url, Some("secret-key".into()), 5).unwrap();
        let balance = client.get_balance(&address()).await.unwrap();
        assert_eq!(balance.as_nano(), 1_500_000_000);

        let request = only_request(&seen);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/getAddressBalance");
        assert_eq!(request.query["address"], address().to_raw());
        assert_eq!(request.headers["x-api-key"], "secret-key");
    }

    #[tokio::test]
    async fn test_seqno_deployed() {
        let body = r#"{"ok":true,"result":{"gas_used":100,"stack":[["num","0x1a"]],"exit_code":0}}"#;
        let (url, seen) = serve(StatusCode::OK, body).await;
        let client = TonCenterClient::new(url, None, 5).unwrap();
        assert_eq!(client.get_sequence_number(&address()).await.unwrap(), 26);

        let request = only_request(&seen);
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/runGetMethod");
        assert_eq!(request.json()["method"], "seqno");
        assert!(!request.headers.contains_key("x-api-key"));
    }

    #[tokio::test]
    async fn test_seqno_undeployed_is_zero() {
        let body = r#"{"ok":true,"result":{"gas_used":0,"stack":[],"exit_code":-13}}"#;
        let (url, _seen) = serve(StatusCode::OK, body).await;
        let client = TonCenterClient::new(url, None, 5).unwrap();
        assert_eq!(client.get_sequence_number(&address()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_submit_ok() {
        let (url, seen) = serve(StatusCode::OK, r#"{"ok":true,"result":{"@type":"ok"}}"#).await;
        let client = TonCenterClient::new(url, None, 5).unwrap();
        client.submit(&transfer()).await.unwrap();

        let request = only_request(&seen);
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/sendBoc");
        assert_eq!(request.json(), json!({ "boc": "te6ccg==" }));
    }

    #[tokio::test]
    async fn test_submit_rejected() {
        let body = r#"{"ok":false,"error":"cannot apply external message","code":500}"#;
        let (url, _seen) = serve(StatusCode::INTERNAL_SERVER_ERROR, body).await;
        let client = TonCenterClient::new(url, None, 5).unwrap();
        assert_eq!(
            client.submit(&transfer()).await,
            Err(LedgerError::SubmissionRejected("cannot apply external message".into()))
        );
    }

    #[tokio::test]
    async fn test_rate_limit_is_unreachable() {
        let body = r#"{"ok":false,"error":"Ratelimit exceed","code":429}"#;
        let (url, _seen) = serve(StatusCode::TOO_MANY_REQUESTS, body).await;
        let client = TonCenterClient::new(url, None, 5).unwrap();
        assert!(matches!(
            client.submit(&transfer()).await,
            Err(LedgerError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_unreachable() {
        let (url, _seen) = serve(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").await;
        let client = TonCenterClient::new(url, None, 5).unwrap();
        assert!(matches!(
            client.get_balance(&address()).await,
            Err(LedgerError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let client = TonCenterClient::new(url, None, 2).unwrap();
        assert!(matches!(
            client.get_sequence_number(&address()).await,
            Err(LedgerError::Unreachable(_))
        ));
    }

    #[test]
    fn test_parse_seqno_values() {
        let decimal = json!({"exit_code": 0, "stack": [["num", "42"]]});
        assert_eq!(parse_seqno(decimal).unwrap(), 42);
        let empty = json!({"exit_code": 0, "stack": []});
        assert!(parse_seqno(empty).is_err());
        assert!(parse_seqno(json!("nope")).is_err());
    }

    #[test]
    fn test_parse_nanos() {
        assert_eq!(parse_nanos(&json!("0")), Some(0));
        assert_eq!(parse_nanos(&json!(12)), Some(12));
        assert_eq!(parse_nanos(&json!("-1")), None);
        assert_eq!(parse_nanos(&json!(null)), None);
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let client = TonCenterClient::new("https://example.org/api/v2/", None, 5).unwrap();
        assert_eq!(client.endpoint(), "https://example.org/api/v2");
        assert_eq!(client.url("sendBoc"), "https://example.org/api/v2/sendBoc");
    }

    // Integration tests require network access
    // Run with: cargo test --package tonwallet-ledger -- --ignored

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_testnet_balance() {
        let client = TonCenterClient::new(default_endpoint(Network::Testnet), None, 20).unwrap();
        let balance = client.get_balance(&address()).await;
        assert!(balance.is_ok());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_testnet_seqno_of_fresh_wallet() {
        let client = TonCenterClient::new(default_endpoint(Network::Testnet), None, 20).unwrap();
        let fresh = tonwallet_core::derive_address(&[42u8; 32], Default::default(), 0).unwrap();
        assert_eq!(client.get_sequence_number(&fresh).await.unwrap(), 0);
    }
}
