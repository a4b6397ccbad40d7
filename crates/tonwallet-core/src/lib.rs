//! tonwallet Core
//!
//! Identity and transfer primitives for a non-custodial TON wallet.
//!
//! # Key Derivation
//!
//! From a single 24-word BIP-39 phrase:
//! - Seed expansion via BIP-39 PBKDF2 (empty passphrase)
//! - Ed25519 keys via SLIP-10: m/44'/607'/0'
//! - Wallet address via the V3R2 contract `StateInit` hash
//!
//! # Encrypted Storage
//!
//! Phrases are encrypted at rest using Argon2id + AES-256-GCM.

pub mod address;
pub mod amount;
pub mod cell;
pub mod crypto;
pub mod keys;
pub mod seed;
pub mod transfer;

pub use address::{derive_address, parse_address, Address, AddressError, WalletVersion};
pub use amount::{Amount, AmountError, Balance};
pub use crypto::{decrypt_secret, encrypt_secret, CryptoError, EncryptedSecret};
pub use keys::{derive_keypair, verify_signature, KeyError, KeyPair};
pub use seed::{
    decode_phrase, encode_seed, generate_phrase, parse_phrase, MnemonicPhrase, SecretSeed, SeedError,
};
pub use transfer::{
    build_transfer, Payload, SendMode, SignedTransfer, TransferError, TransferRequest,
    WalletContract,
};
