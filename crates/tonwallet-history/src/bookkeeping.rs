//! Bookkeeping service: off-chain transaction log
//!
//! Wire format of the HTTP function:
//!
//! ```text
//! GET  <url>?address=<addr>  -> {"transactions": [{id, transaction_type, amount,
//!                                  address, status, created_at}], "balance": ..}
//! POST <url> {type, amount, address} -> {"id": 12, "status": "pending"}
//! ```

use crate::record::{Direction, NewTxRecord, TxId, TxRecord, TxStatus};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tonwallet_core::{Address, Amount};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookkeepingError {
    #[error("Bookkeeping unreachable: {0}")]
    Unreachable(String),
}

/// Off-chain transaction log the session reads and appends to
#[async_trait]
pub trait Bookkeeping: Send + Sync {
    async fn list_transactions(&self, address: &Address) -> Result<Vec<TxRecord>, BookkeepingError>;

    /// Store a new pending record, returning the id bookkeeping assigned
    async fn record_transaction(&self, record: &NewTxRecord) -> Result<TxId, BookkeepingError>;
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    transactions: Vec<WireRecord>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    id: u64,
    transaction_type: String,
    amount: Value,
    address: String,
    status: String,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    amount: String,
    address: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: u64,
}

/// JSON-over-HTTP bookkeeping client
#[derive(Debug, Clone)]
pub struct HttpBookkeeping {
    url: String,
    client: reqwest::Client,
}

impl HttpBookkeeping {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, BookkeepingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BookkeepingError::Unreachable(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BookkeepingError> {
        let status = response.status();
        if !status.is_success() {
            return Err(BookkeepingError::Unreachable(format!("HTTP {}", status.as_u16())));
        }
        response
            .json()
            .await
            .map_err(|e| BookkeepingError::Unreachable(format!("malformed response: {}", e)))
    }
}

#[async_trait]
impl Bookkeeping for HttpBookkeeping {
    async fn list_transactions(&self, address: &Address) -> Result<Vec<TxRecord>, BookkeepingError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("address", address.to_string())])
            .send()
            .await
            .map_err(|e| BookkeepingError::Unreachable(e.to_string()))?;
        let list: ListResponse = Self::read_json(response).await?;

        let records: Vec<TxRecord> = list
            .transactions
            .into_iter()
            .filter_map(|wire| {
                let id = wire.id;
                let record = from_wire(wire);
                if record.is_none() {
                    log::warn!("Skipping unreadable bookkeeping record {}", id);
                }
                record
            })
            .collect();
        log::debug!("Bookkeeping returned {} records", records.len());
        Ok(records)
    }

    async fn record_transaction(&self, record: &NewTxRecord) -> Result<TxId, BookkeepingError> {
        let body = CreateRequest {
            kind: record.direction.as_str(),
            amount: record.amount.to_decimal_string(),
            address: &record.counterparty,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BookkeepingError::Unreachable(e.to_string()))?;
        let created: CreateResponse = Self::read_json(response).await?;
        Ok(TxId::Assigned(created.id))
    }
}

fn from_wire(wire: WireRecord) -> Option<TxRecord> {
    let direction = match wire.transaction_type.to_ascii_lowercase().as_str() {
        "sent" => Direction::Sent,
        "received" => Direction::Received,
        _ => return None,
    };
    let amount = match &wire.amount {
        Value::String(s) => Amount::from_decimal_str(s).ok()?,
        Value::Number(n) => Amount::from_decimal_str(&n.to_string()).ok()?,
        _ => return None,
    };
    Some(TxRecord {
        id: TxId::Assigned(wire.id),
        direction,
        amount,
        counterparty: wire.address,
        status: TxStatus::parse(&wire.status)?,
        timestamp: parse_timestamp(&wire.created_at)?,
    })
}

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS[.f]` taken as UTC
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use axum::extract::{Query, State};
    use axum::http::{header, HeaderMap, Method, StatusCode};
    use axum::routing::any;
    use axum::Router;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;
    use tonwallet_core::parse_address;

    const WALLET: &str = "UQDQGmFYcDpYloyZVEQ8yg9d_uQ5GVL-U6wtD10z66STZ2-b";
    const DEST: &str = "UQDnuKfcBFbPfcUm63GjmeMRmT9b7JcVhjwVik-YHCrmMQsb";

    #[derive(Clone)]
    struct Canned {
        status: StatusCode,
        body: String,
        seen: Arc<Mutex<Vec<(Method, HashMap<String, String>, HeaderMap, String)>>>,
    }

    async fn transactions(
        State(canned): State<Canned>,
        method: Method,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
        canned.seen.lock().unwrap().push((method, query, headers, body));
        (
            canned.status,
            [(header::CONTENT_TYPE, "application/json")],
            canned.body,
        )
    }

    /// Bookkeeping stand-in serving `/transactions`
    async fn serve(status: StatusCode, body: &str) -> (String, Canned) {
        let canned = Canned {
            status,
            body: body.to_string(),
            seen: Arc::default(),
        };
        let app = Router::new()
            .route("/transactions", any(transactions))
            .with_state(canned.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/transactions", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (url, canned)
    }

    #[tokio::test]
    async fn test_list_transactions() {
        let body = r#"{
            "transactions": [
                {"id": 2, "transaction_type": "sent", "amount": "1.5", "address": "UQDnuKfcBFbPfcUm63GjmeMRmT9b7JcVhjwVik-YHCrmMQsb",
                 "status": "pending", "created_at": "2024-05-01T10:00:00.123456"},
                {"id": 1, "transaction_type": "received", "amount": 3, "address": "EQsomeone",
                 "status": "completed", "created_at": "2024-04-30 09:00:00"},
                {"id": 0, "transaction_type": "swap", "amount": "1", "address": "x",
                 "status": "completed", "created_at": "2024-04-30 09:00:00"}
            ],
            "balance": 12.5
        }"#;
        let (url, canned) = serve(StatusCode::OK, body).await;
        let bookkeeping = HttpBookkeeping::new(url, 5).unwrap();
        let records = bookkeeping
            .list_transactions(&parse_address(WALLET).unwrap())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, TxId::Assigned(2));
        assert_eq!(records[0].amount.as_nano(), 1_500_000_000);
        assert_eq!(records[0].status, TxStatus::Pending);
        assert_eq!(records[1].direction, Direction::Received);
        assert_eq!(records[1].amount.as_nano(), 3_000_000_000);
        assert_eq!(
            records[1].timestamp,
            Utc.with_ymd_and_hms(2024, 4, 30, 9, 0, 0).unwrap()
        );

        let seen = canned.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (method, query, _, _) = &seen[0];
        assert_eq!(*method, Method::GET);
        assert_eq!(query["address"], WALLET);
    }

    #[tokio::test]
    async fn test_record_transaction() {
        let (url, canned) = serve(StatusCode::OK, r#"{"id": 42, "status": "pending"}"#).await;
        let bookkeeping = HttpBookkeeping::new(url, 5).unwrap();
        let record = NewTxRecord::sent(Amount::from_decimal_str("1.5").unwrap(), DEST);
        let id = bookkeeping.record_transaction(&record).await.unwrap();
        assert_eq!(id, TxId::Assigned(42));

        let seen = canned.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (method, _, headers, body) = &seen[0];
        assert_eq!(*method, Method::POST);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        let posted: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(
            posted,
            serde_json::json!({ "type": "sent", "amount": "1.5", "address": DEST })
        );
    }

    #[tokio::test]
    async fn test_server_error_is_unreachable() {
        let (url, _canned) = serve(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"db down"}"#).await;
        let bookkeeping = HttpBookkeeping::new(url, 5).unwrap();
        let record = NewTxRecord::sent(Amount::from_nano(1).unwrap(), DEST);
        assert_eq!(
            bookkeeping.record_transaction(&record).await,
            Err(BookkeepingError::Unreachable("HTTP 500".into()))
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_unreachable() {
        let (url, _canned) = serve(StatusCode::OK, "not json").await;
        let bookkeeping = HttpBookkeeping::new(url, 5).unwrap();
        assert!(bookkeeping
            .list_transactions(&parse_address(WALLET).unwrap())
            .await
            .is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp("2024-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T05:04:05+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
