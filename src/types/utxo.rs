//! UTXO-related types for the reservation engine
//!
//! This module defines the identifiers (hashes, asset ids, account ids,
//! outpoints) and the immutable `Utxo` record read from the store.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Error returned when a hex-encoded 32-byte identifier fails to parse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid 32-byte hex identifier '{input}': {reason}")]
pub struct ParseIdError {
    input: String,
    reason: String,
}

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Construct from raw bytes
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw bytes of the identifier
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(s.trim(), &mut bytes).map_err(|e| ParseIdError {
                    input: s.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Self(bytes))
            }
        }
    };
}

hex_id!(
    /// Transaction hash (32 bytes, displayed as lowercase hex)
    Hash
);

hex_id!(
    /// Asset identifier (32 bytes, displayed as lowercase hex)
    AssetId
);

/// Account identifier
///
/// Opaque to the engine. Backed by `Arc<str>` so that the many copies held
/// by UTXOs, reservations and lock domains share one allocation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(Arc<str>);

impl AccountId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// Identifier of a UTXO: the transaction that created it and its output index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Outpoint {
    pub hash: Hash,
    pub index: u32,
}

impl Outpoint {
    pub fn new(hash: Hash, index: u32) -> Self {
        Self { hash, index }
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.index)
    }
}

/// A confirmed, spendable output as read from the UTXO store
///
/// The engine never mutates a `Utxo`; it only tracks reservation state
/// about its outpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// (transaction hash, output index)
    pub outpoint: Outpoint,

    /// Asset carried by this output
    pub asset_id: AssetId,

    /// Amount of `asset_id` carried by this output
    pub amount: u64,

    /// Account that controls this output
    pub account_id: AccountId,

    /// Spending script / control program
    pub control_program: Vec<u8>,

    /// Position of `control_program` in the account's key-derivation sequence
    pub control_program_index: u64,
}
