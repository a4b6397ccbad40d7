//! Signed transfer construction
//!
//! A transfer is an external message addressed to our own wallet contract.
//! Its body carries an Ed25519 signature over a signing body that wraps one
//! internal message to the destination:
//!
//! ```text
//! external: ext_in_msg_info$10 src:none dest:<wallet> import_fee:0
//!           init:(StateInit if seqno == 0) body:^(signature || signing body)
//! signing:  wallet_id:u32 valid_until:u32 seqno:u32 send_mode:u8 ^internal
//! internal: int_msg_info$0 ihr_disabled:1 bounce bounced:0 src:none dest
//!           value extra:0 ihr_fee:0 fwd_fee:0 created_lt:0 created_at:0
//!           init:0 body
//! ```

use crate::address::{derive_address, state_init, Address, AddressError, WalletVersion};
use crate::amount::{Amount, AmountError};
use crate::cell::{serialize_boc, Cell, CellBuilder, CellError};
use crate::keys::KeyPair;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Opcode prefix of a plain text comment body
const COMMENT_OP: u32 = 0;

/// Bytes of payload that fit in one cell (1023 bits)
const CELL_BYTES: usize = 127;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
    #[error("Wallet contract error: {0}")]
    Contract(#[from] AddressError),
    #[error("Message encoding failed: {0}")]
    Encoding(#[from] CellError),
}

/// Wallet `send_mode` flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendMode(u8);

impl SendMode {
    pub const ORDINARY: SendMode = SendMode(0);
    pub const PAY_FEES_SEPARATELY: SendMode = SendMode(1);
    pub const IGNORE_ERRORS: SendMode = SendMode(2);
    pub const DESTROY_IF_ZERO: SendMode = SendMode(32);
    pub const CARRY_REMAINING_VALUE: SendMode = SendMode(64);
    pub const CARRY_ALL_BALANCE: SendMode = SendMode(128);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: SendMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for SendMode {
    fn default() -> Self {
        Self::PAY_FEES_SEPARATELY | Self::IGNORE_ERRORS
    }
}

impl std::ops::BitOr for SendMode {
    type Output = SendMode;

    fn bitor(self, rhs: SendMode) -> SendMode {
        SendMode(self.0 | rhs.0)
    }
}

/// Internal message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Comment(String),
}

/// Which wallet contract signs the transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalletContract {
    pub version: WalletVersion,
    pub workchain: i8,
}

impl WalletContract {
    pub fn address(&self, public_key: &[u8; 32]) -> Result<Address, AddressError> {
        derive_address(public_key, self.version, self.workchain)
    }
}

/// One outgoing transfer, consumed by [`build_transfer`]
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub destination: Address,
    pub amount: Amount,
    pub sequence_number: u32,
    pub send_mode: SendMode,
    pub payload: Option<Payload>,
    /// Unix time after which the wallet contract rejects the message
    pub valid_until: u32,
}

/// A serialized, signed external message ready for submission
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub boc: Vec<u8>,
    pub message_hash: [u8; 32],
}

impl SignedTransfer {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.boc)
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.message_hash)
    }
}

impl fmt::Debug for SignedTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTransfer")
            .field("boc_len", &self.boc.len())
            .field("message_hash", &self.hash_hex())
            .finish()
    }
}

/// Build and sign a transfer from `keys`' wallet
pub fn build_transfer(
    request: TransferRequest,
    keys: &KeyPair,
    wallet: WalletContract,
) -> Result<SignedTransfer, TransferError> {
    if request.amount.as_nano() == 0 {
        return Err(AmountError::NotPositive.into());
    }

    let public_key = keys.public_key();
    let wallet_address = wallet.address(&public_key)?;

    let internal = internal_message(&request)?;

    let mut signing = CellBuilder::new();
    signing
        .store_u32(wallet.version.wallet_id(wallet.workchain))?
        .store_u32(request.valid_until)?
        .store_u32(request.sequence_number)?
        .store_u8(request.send_mode.bits())?
        .store_ref(internal)?;
    let signing = signing.build()?;
    let signature = keys.sign(&signing.hash());

    let mut body = CellBuilder::new();
    body.store_bytes(&signature)?;
    append_cell(&mut body, &signing)?;
    let body = Arc::new(body.build()?);

    let mut external = CellBuilder::new();
    external.store_uint(0b10, 2)?.store_uint(0b00, 2)?;
    store_address(&mut external, &wallet_address)?;
    external.store_coins(0)?;
    if request.sequence_number == 0 {
        external
            .store_bit(true)?
            .store_bit(true)?
            .store_ref(state_init(&public_key, wallet.version, wallet.workchain)?)?;
    } else {
        external.store_bit(false)?;
    }
    external.store_bit(true)?.store_ref(body)?;
    let external = Arc::new(external.build()?);

    Ok(SignedTransfer {
        boc: serialize_boc(&external),
        message_hash: external.hash(),
    })
}

fn internal_message(request: &TransferRequest) -> Result<Arc<Cell>, TransferError> {
    let mut b = CellBuilder::new();
    b.store_bit(false)? // int_msg_info$0
        .store_bit(true)? // ihr_disabled
        .store_bit(request.destination.bounceable)?
        .store_bit(false)? // bounced
        .store_uint(0b00, 2)?;
    store_address(&mut b, &request.destination)?;
    b.store_coins(u128::from(request.amount.as_nano()))?
        .store_bit(false)? // extra currencies
        .store_coins(0)? // ihr_fee
        .store_coins(0)? // fwd_fee
        .store_u64(0)?
        .store_u32(0)?
        .store_bit(false)?; // init

    match &request.payload {
        Some(Payload::Comment(text)) => {
            b.store_bit(true)?.store_ref(comment_cell(text)?)?;
        }
        None => {
            b.store_bit(false)?;
        }
    }
    Ok(Arc::new(b.build()?))
}

/// `op:u32 = 0` followed by UTF-8 text, spilling into chained ref cells
fn comment_cell(text: &str) -> Result<Arc<Cell>, TransferError> {
    let bytes = text.as_bytes();
    let head_len = bytes.len().min(CELL_BYTES - 4);
    let (head, rest) = bytes.split_at(head_len);

    let mut tail: Option<Arc<Cell>> = None;
    for chunk in rest.chunks(CELL_BYTES).rev() {
        let mut b = CellBuilder::new();
        b.store_bytes(chunk)?;
        if let Some(next) = tail.take() {
            b.store_ref(next)?;
        }
        tail = Some(Arc::new(b.build()?));
    }

    let mut b = CellBuilder::new();
    b.store_u32(COMMENT_OP)?.store_bytes(head)?;
    if let Some(next) = tail {
        b.store_ref(next)?;
    }
    Ok(Arc::new(b.build()?))
}

/// `addr_std$10 anycast:nothing workchain_id:int8 address:bits256`
fn store_address(b: &mut CellBuilder, address: &Address) -> Result<(), CellError> {
    b.store_uint(0b10, 2)?
        .store_bit(false)?
        .store_u8(address.workchain as u8)?
        .store_bytes(&address.hash)?;
    Ok(())
}

fn append_cell(b: &mut CellBuilder, cell: &Cell) -> Result<(), CellError> {
    for i in 0..cell.bit_len() {
        let byte = cell.data()[i / 8];
        b.store_bit(byte & (0x80 >> (i % 8)) != 0)?;
    }
    for r in cell.refs() {
        b.store_ref(r.clone())?;
    }
    Ok(())
}
