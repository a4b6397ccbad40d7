//! tonwallet Ledger Client
//!
//! Read and write access to the TON ledger:
//! - Balance lookup
//! - Wallet sequence number (`seqno` get-method; 0 for undeployed wallets)
//! - Signed message submission
//!
//! The session only sees the [`LedgerClient`] trait; [`TonCenterClient`] is
//! the HTTP adapter for toncenter-compatible v2 APIs.
//!
//! # Example
//!
//! ```ignore
//! use tonwallet_ledger::{default_endpoint, LedgerClient, Network, TonCenterClient};
//!
//! let client = TonCenterClient::new(default_endpoint(Network::Testnet), None, 10)?;
//! let balance = client.get_balance(&address).await?;
//! ```

mod toncenter;

pub use toncenter::TonCenterClient;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tonwallet_core::{Address, Balance, SignedTransfer};

/// Errors from ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger unreachable: {0}")]
    Unreachable(String),

    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),
}

/// Which chain the wallet lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Testnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(format!("Unknown network: {}", other)),
        }
    }
}

/// Ledger operations the wallet session depends on
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current balance of `address`
    async fn get_balance(&self, address: &Address) -> Result<Balance, LedgerError>;

    /// Current wallet `seqno`; 0 when the contract is not deployed yet
    async fn get_sequence_number(&self, address: &Address) -> Result<u32, LedgerError>;

    /// Submit a signed external message
    async fn submit(&self, transfer: &SignedTransfer) -> Result<(), LedgerError>;
}

/// Default toncenter v2 endpoint for each network
pub fn default_endpoint(network: Network) -> &'static str {
    match network {
        Network::Mainnet => "https://toncenter.com/api/v2",
        Network::Testnet => "https://testnet.toncenter.com/api/v2",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        assert!(default_endpoint(Network::Mainnet).starts_with("https://toncenter.com"));
        assert!(default_endpoint(Network::Testnet).contains("testnet"));
    }

    #[test]
    fn test_network_parse() {
        assert_eq!("Mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert!("regtest".parse::<Network>().is_err());
        assert_eq!(Network::Testnet.to_string(), "testnet");
        assert!(Network::Testnet.is_testnet());
    }
}
