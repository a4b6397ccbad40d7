//! Wallet contract addresses
//!
//! An account id is the representation hash of the contract's initial
//! `StateInit` (code + data). The user-facing form is 36 bytes, base64url:
//!
//! ```text
//! [tag (1)][workchain (1)][account id (32)][crc16-xmodem (2)]
//! ```
//!
//! `tag` is `0x11` for bounceable, `0x51` for non-bounceable, with `0x80` set
//! on testnet-only addresses.

use crate::cell::{deserialize_boc, Cell, CellBuilder, CellError};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET: u8 = 0x80;

const FRIENDLY_LEN: usize = 48;
const RAW_LEN: usize = 36;

/// Base subwallet id shared by the standard wallet contracts
pub const DEFAULT_WALLET_ID: u32 = 698_983_191;

/// Wallet contract v3 revision 2, as a single-cell bag of cells
const V3R2_CODE_BOC: &str = "te6cckEBAQEAcQAA3v8AIN0gggFMl7ohggEznLqxn3Gw7UTQ0x/THzHXC//jBOCk8mCDCNcYINMf0x/TH/gjE7vyY+1E0NMf0x/T/9FRMrryoVFEuvKiBPkBVBBV+RDyo/gAkyDXSpbTB9QC+wDo0QGkyMsfyx/L/8ntVBC9ba0=";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Malformed address: expected 48 characters or <workchain>:<hex>, got {0} characters")]
    InvalidLength(usize),
    #[error("Malformed address: invalid encoding")]
    InvalidEncoding,
    #[error("Malformed address: checksum mismatch")]
    InvalidChecksum,
    #[error("Malformed address: unknown tag 0x{0:02x}")]
    InvalidTag(u8),
    #[error("Malformed address: bad workchain {0}")]
    InvalidWorkchain(String),
    #[error("Contract template error: {0}")]
    Template(#[from] CellError),
}

/// Wallet contract template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WalletVersion {
    #[default]
    V3R2,
}

impl WalletVersion {
    pub fn code(&self) -> Result<Arc<Cell>, AddressError> {
        let boc = match self {
            WalletVersion::V3R2 => V3R2_CODE_BOC,
        };
        let bytes = STANDARD.decode(boc).map_err(|_| AddressError::InvalidEncoding)?;
        Ok(deserialize_boc(&bytes)?)
    }

    /// Subwallet id the contract is initialised with on `workchain`
    pub fn wallet_id(&self, workchain: i8) -> u32 {
        DEFAULT_WALLET_ID.wrapping_add(workchain as i32 as u32)
    }
}

impl fmt::Display for WalletVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletVersion::V3R2 => f.write_str("v3r2"),
        }
    }
}

impl FromStr for WalletVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v3r2" => Ok(WalletVersion::V3R2),
            other => Err(format!("Unsupported wallet version: {}", other)),
        }
    }
}

/// An account address on the TON chain
///
/// Equality and hashing consider only the workchain and account id; the
/// bounce and testnet flags are display hints.
#[derive(Debug, Clone, Copy)]
pub struct Address {
    pub workchain: i8,
    pub hash: [u8; 32],
    pub bounceable: bool,
    pub testnet: bool,
}

impl Address {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self {
            workchain,
            hash,
            bounceable: true,
            testnet: false,
        }
    }

    pub fn with_flags(mut self, bounceable: bool, testnet: bool) -> Self {
        self.bounceable = bounceable;
        self.testnet = testnet;
        self
    }

    /// User-friendly base64url form
    pub fn to_friendly(&self, bounceable: bool, testnet: bool) -> String {
        let mut tag = if bounceable { TAG_BOUNCEABLE } else { TAG_NON_BOUNCEABLE };
        if testnet {
            tag |= TAG_TESTNET;
        }
        let mut raw = Vec::with_capacity(RAW_LEN);
        raw.push(tag);
        raw.push(self.workchain as u8);
        raw.extend_from_slice(&self.hash);
        raw.extend_from_slice(&crc16(&raw).to_be_bytes());
        URL_SAFE.encode(raw)
    }

    /// Raw `<workchain>:<hex>` form
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.workchain == other.workchain && self.hash == other.hash
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.workchain.hash(state);
        self.hash.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_friendly(self.bounceable, self.testnet))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_address(s)
    }
}

/// The contract's initial data cell: `seqno:u32 wallet_id:u32 public_key:bits256`
pub fn initial_data(public_key: &[u8; 32], wallet_id: u32) -> Result<Arc<Cell>, AddressError> {
    let mut b = CellBuilder::new();
    b.store_u32(0)?.store_u32(wallet_id)?.store_bytes(public_key)?;
    Ok(Arc::new(b.build()?))
}

/// `StateInit` deploying the wallet contract for `public_key`
pub fn state_init(
    public_key: &[u8; 32],
    version: WalletVersion,
    workchain: i8,
) -> Result<Arc<Cell>, AddressError> {
    let code = version.code()?;
    let data = initial_data(public_key, version.wallet_id(workchain))?;

    // split_depth:nothing special:nothing code:just data:just library:empty
    let mut b = CellBuilder::new();
    b.store_uint(0b00110, 5)?.store_ref(code)?.store_ref(data)?;
    Ok(Arc::new(b.build()?))
}

/// Derive the wallet address for a public key and contract version
///
/// The result is flagged non-bounceable, the display convention for wallets.
pub fn derive_address(
    public_key: &[u8; 32],
    version: WalletVersion,
    workchain: i8,
) -> Result<Address, AddressError> {
    let init = state_init(public_key, version, workchain)?;
    Ok(Address::new(workchain, init.hash()).with_flags(false, false))
}

/// Parse a user-friendly or raw address, verifying its checksum
pub fn parse_address(text: &str) -> Result<Address, AddressError> {
    let text = text.trim();
    if let Some((wc, digits)) = text.split_once(':') {
        return parse_raw(wc, digits);
    }
    if text.len() != FRIENDLY_LEN {
        return Err(AddressError::InvalidLength(text.len()));
    }

    let bytes = URL_SAFE
        .decode(text)
        .or_else(|_| STANDARD.decode(text))
        .map_err(|_| AddressError::InvalidEncoding)?;
    if bytes.len() != RAW_LEN {
        return Err(AddressError::InvalidEncoding);
    }

    let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
    if crc16(&bytes[..34]) != expected {
        return Err(AddressError::InvalidChecksum);
    }

    let tag = bytes[0];
    let testnet = tag & TAG_TESTNET != 0;
    let bounceable = match tag & !TAG_TESTNET {
        TAG_BOUNCEABLE => true,
        TAG_NON_BOUNCEABLE => false,
        _ => return Err(AddressError::InvalidTag(tag)),
    };

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[2..34]);
    Ok(Address::new(bytes[1] as i8, hash).with_flags(bounceable, testnet))
}

fn parse_raw(wc: &str, digits: &str) -> Result<Address, AddressError> {
    let workchain: i8 = wc
        .parse()
        .map_err(|_| AddressError::InvalidWorkchain(wc.to_string()))?;
    let mut hash = [0u8; 32];
    hex::decode_to_slice(digits, &mut hash).map_err(|_| AddressError::InvalidEncoding)?;
    Ok(Address::new(workchain, hash))
}

/// CRC-16/XMODEM
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x1021 } else { crc << 1 };
        }
    }
    crc
}
