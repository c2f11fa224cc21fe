//! Shared types and identifiers for pier.
//!
//! This crate defines the core types used across the pier workspace:
//! identifiers ([`PieceCommitment`], [`BlockHash`], [`ShardKey`]),
//! piece-size arithmetic ([`UnpaddedPieceSize`], [`PaddedPieceSize`]),
//! and the shard observation types ([`ShardState`], [`OpKind`], [`Trace`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod piece;
pub mod trace;

pub use piece::{PaddedPieceSize, SEGMENT_ENTRY_SIZE, UnpaddedPieceSize};
pub use trace::{OpKind, ShardState, Trace};

/// Errors produced when parsing identifiers from their string form.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseIdError {
    /// The input is not valid lowercase hex of the expected length.
    #[error("invalid commitment string: expected 64 hex characters, got {0:?}")]
    InvalidCommitment(String),
}

// ---------------------------------------------------------------------------
// PieceCommitment
// ---------------------------------------------------------------------------

/// Content commitment for a piece: a 32-byte digest identifying the piece's
/// bytes. Every shard is addressed by the commitment of its backing piece.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PieceCommitment([u8; 32]);

impl PieceCommitment {
    /// Create a commitment by hashing arbitrary data with BLAKE3.
    pub fn from_data(data: &[u8]) -> Self {
        Self(blake3::hash(data).into())
    }

    /// Return the raw 32-byte representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive the stable shard key for this commitment.
    ///
    /// The key is the lowercase hex form of the commitment and never changes
    /// for a given piece.
    pub fn to_shard_key(&self) -> ShardKey {
        ShardKey(self.to_string())
    }
}

impl From<[u8; 32]> for PieceCommitment {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for PieceCommitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PieceCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PieceCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PieceCommitment({self})")
    }
}

impl FromStr for PieceCommitment {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes =
            hex_to_bytes(s).ok_or_else(|| ParseIdError::InvalidCommitment(s.to_string()))?;
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// ShardKey
// ---------------------------------------------------------------------------

/// Stable string key identifying a shard inside the shard-store engine.
///
/// Derived deterministically from a [`PieceCommitment`] (its hex form) and
/// never mutated. The reverse direction, [`ShardKey::to_commitment`], fails
/// on keys that did not originate from a commitment.
#[derive(Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ShardKey(String);

impl ShardKey {
    /// Build the key for a piece commitment.
    pub fn from_commitment(commitment: &PieceCommitment) -> Self {
        commitment.to_shard_key()
    }

    /// Parse the key back into the commitment it was derived from.
    pub fn to_commitment(&self) -> Result<PieceCommitment, ParseIdError> {
        self.0.parse()
    }

    /// Return the key's string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ShardKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardKey({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// BlockHash
// ---------------------------------------------------------------------------

/// Multihash code for BLAKE3 digests.
pub const CODE_BLAKE3: u64 = 0x1e;
/// Multihash code for identity "hashes" (the digest is the payload itself).
pub const CODE_IDENTITY: u64 = 0x00;

/// A multihash addressing one block inside a shard's archive.
///
/// Carries the hash function code and the digest. Identity hashes embed the
/// block payload directly as the digest and may be any length; hashed forms
/// are fixed-width.
#[derive(Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BlockHash {
    code: u64,
    digest: Vec<u8>,
}

impl BlockHash {
    /// Hash a block payload with BLAKE3.
    pub fn blake3(data: &[u8]) -> Self {
        Self {
            code: CODE_BLAKE3,
            digest: blake3::hash(data).as_bytes().to_vec(),
        }
    }

    /// Wrap a payload as an identity hash (digest == payload).
    pub fn identity(payload: &[u8]) -> Self {
        Self {
            code: CODE_IDENTITY,
            digest: payload.to_vec(),
        }
    }

    /// Reconstruct a hash from its code and digest.
    pub fn from_parts(code: u64, digest: Vec<u8>) -> Self {
        Self { code, digest }
    }

    /// The hash function code.
    pub fn code(&self) -> u64 {
        self.code
    }

    /// The digest bytes.
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Whether this is an identity hash.
    pub fn is_identity(&self) -> bool {
        self.code == CODE_IDENTITY
    }

    /// Encode as `varint(code) ++ varint(len) ++ digest`.
    pub fn encoded(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.digest.len() + 4);
        write_uvarint(&mut out, self.code);
        write_uvarint(&mut out, self.digest.len() as u64);
        out.extend_from_slice(&self.digest);
        out
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.encoded() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({self})")
    }
}

fn write_uvarint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Decode a 64-character lowercase/uppercase hex string into `[u8; 32]`.
fn hex_to_bytes(hex: &str) -> Option<[u8; 32]> {
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut bytes = [0u8; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        let hi = hex_nibble(hex.as_bytes()[i * 2])?;
        let lo = hex_nibble(hex.as_bytes()[i * 2 + 1])?;
        *byte = (hi << 4) | lo;
    }
    Some(bytes)
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
