//! Piece-size arithmetic: the padding rule and the data-segment table layout.
//!
//! Piece byte streams are bit-padded for commitment computation: every 127
//! bytes of payload expand to 128 bytes on disk, and padded piece sizes are
//! powers of two (128 bytes minimum). Aggregated pieces additionally carry a
//! data-segment table in their tail whose position is a fixed function of
//! the padded size. Both formulas are part of the piece-size scheme and are
//! not configurable.

use serde::{Deserialize, Serialize};

/// Size in bytes of one data-segment table entry.
pub const SEGMENT_ENTRY_SIZE: u64 = 64;

/// A size in unpadded (payload) bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize, Default,
)]
pub struct UnpaddedPieceSize(pub u64);

/// A size in padded bytes: always a power of two, 128 minimum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize, Default,
)]
pub struct PaddedPieceSize(pub u64);

impl UnpaddedPieceSize {
    /// Compute the padded size of a raw byte stream.
    ///
    /// Expands by the 127/128 padding ratio, then rounds up to the next
    /// power of two (128 minimum) so the result is a well-formed padded
    /// piece size for any input length.
    pub fn padded(self) -> PaddedPieceSize {
        let expanded = self.0 + self.0 / 127;
        PaddedPieceSize(expanded.next_power_of_two().max(128))
    }
}

impl PaddedPieceSize {
    /// The payload bytes contained in a padded piece of this size.
    pub fn unpadded(self) -> UnpaddedPieceSize {
        UnpaddedPieceSize(self.0 - self.0 / 128)
    }

    /// Maximum number of data-segment table entries for a piece of this
    /// size: one 64-byte entry per 2048-byte slot of the table region,
    /// rounded up to a power of two, never fewer than four.
    pub fn max_index_entries(self) -> u64 {
        let entries = (self.0 / 2048 / SEGMENT_ENTRY_SIZE).next_power_of_two();
        entries.max(4)
    }

    /// Unpadded start offset of the data-segment table inside the piece.
    ///
    /// The table occupies the final `max_index_entries() * 64` payload bytes.
    /// Returns `None` when the piece is too small to hold a table at all,
    /// which callers treat as "not aggregated".
    pub fn segment_table_offset(self) -> Option<u64> {
        let table_bytes = self.max_index_entries() * SEGMENT_ENTRY_SIZE;
        self.unpadded().0.checked_sub(table_bytes)
    }
}
