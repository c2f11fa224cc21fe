//! The data-segment table: descriptors of sub-archives inside an aggregated
//! piece.
//!
//! The table lives at a fixed, size-derived offset in the piece tail (see
//! [`PaddedPieceSize::segment_table_offset`]) and holds a fixed number of
//! 64-byte entries. Unused slots contain garbage or zeros; a checksum over
//! each entry's first 48 bytes separates real descriptors from filler.
//!
//! Entry layout, little-endian:
//!
//! ```text
//! [0..32)  segment piece commitment
//! [32..40) unpadded byte offset of the segment
//! [40..48) unpadded byte length of the segment
//! [48..64) checksum: blake3(entry[0..48]) truncated to 16 bytes
//! ```

use std::io::Read;

use pier_types::{PaddedPieceSize, SEGMENT_ENTRY_SIZE};

use crate::error::IndexError;

/// Bytes of checksum stored per entry.
const CHECKSUM_SIZE: usize = 16;

/// One data-segment descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentEntry {
    /// Commitment of the segment's own piece.
    pub commitment: [u8; 32],
    /// Unpadded byte offset of the segment within the aggregate.
    pub unpadded_offset: u64,
    /// Unpadded byte length of the segment.
    pub unpadded_len: u64,
    /// Truncated checksum over the first 48 entry bytes.
    pub checksum: [u8; CHECKSUM_SIZE],
}

impl SegmentEntry {
    /// Build a well-formed entry, computing its checksum.
    pub fn new(commitment: [u8; 32], unpadded_offset: u64, unpadded_len: u64) -> Self {
        let mut entry = Self {
            commitment,
            unpadded_offset,
            unpadded_len,
            checksum: [0u8; CHECKSUM_SIZE],
        };
        entry.checksum = entry.expected_checksum();
        entry
    }

    /// Decode an entry from its 64-byte wire form.
    pub fn parse(buf: &[u8; SEGMENT_ENTRY_SIZE as usize]) -> Self {
        let mut commitment = [0u8; 32];
        commitment.copy_from_slice(&buf[0..32]);
        let unpadded_offset = u64::from_le_bytes(buf[32..40].try_into().expect("8 bytes"));
        let unpadded_len = u64::from_le_bytes(buf[40..48].try_into().expect("8 bytes"));
        let mut checksum = [0u8; CHECKSUM_SIZE];
        checksum.copy_from_slice(&buf[48..64]);
        Self {
            commitment,
            unpadded_offset,
            unpadded_len,
            checksum,
        }
    }

    /// Encode the entry to its 64-byte wire form.
    pub fn encode(&self) -> [u8; SEGMENT_ENTRY_SIZE as usize] {
        let mut buf = [0u8; SEGMENT_ENTRY_SIZE as usize];
        buf[0..32].copy_from_slice(&self.commitment);
        buf[32..40].copy_from_slice(&self.unpadded_offset.to_le_bytes());
        buf[40..48].copy_from_slice(&self.unpadded_len.to_le_bytes());
        buf[48..64].copy_from_slice(&self.checksum);
        buf
    }

    /// A descriptor is valid when its checksum matches and it describes a
    /// non-empty segment. Unused table slots fail this check.
    pub fn is_valid(&self) -> bool {
        self.unpadded_len > 0 && self.checksum == self.expected_checksum()
    }

    fn expected_checksum(&self) -> [u8; CHECKSUM_SIZE] {
        let mut head = [0u8; 48];
        head[0..32].copy_from_slice(&self.commitment);
        head[32..40].copy_from_slice(&self.unpadded_offset.to_le_bytes());
        head[40..48].copy_from_slice(&self.unpadded_len.to_le_bytes());

        let digest = blake3::hash(&head);
        let mut checksum = [0u8; CHECKSUM_SIZE];
        checksum.copy_from_slice(&digest.as_bytes()[..CHECKSUM_SIZE]);
        checksum
    }
}

/// A parsed data-segment table, in table order, unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentTable {
    entries: Vec<SegmentEntry>,
}

impl SegmentTable {
    /// Read the full table region for a piece of the given padded size.
    ///
    /// The reader must be positioned at the table start offset. Fails on
    /// short reads; the caller treats any failure as "not aggregated".
    pub fn parse<R: Read>(reader: &mut R, padded: PaddedPieceSize) -> Result<Self, IndexError> {
        let count = padded.max_index_entries();
        let mut entries = Vec::with_capacity(count as usize);
        let mut buf = [0u8; SEGMENT_ENTRY_SIZE as usize];
        for _ in 0..count {
            reader.read_exact(&mut buf)?;
            entries.push(SegmentEntry::parse(&buf));
        }
        Ok(Self { entries })
    }

    /// All entries, including invalid filler slots.
    pub fn entries(&self) -> &[SegmentEntry] {
        &self.entries
    }

    /// The valid descriptors, in table order.
    pub fn valid_entries(&self) -> Vec<SegmentEntry> {
        self.entries.iter().filter(|e| e.is_valid()).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_entry_roundtrips_through_wire_form() {
        let entry = SegmentEntry::new([7u8; 32], 1024, 2048);
        let decoded = SegmentEntry::parse(&entry.encode());
        assert_eq!(entry, decoded);
        assert!(decoded.is_valid());
    }

    #[test]
    fn test_zero_filled_slot_is_invalid() {
        let entry = SegmentEntry::parse(&[0u8; SEGMENT_ENTRY_SIZE as usize]);
        assert!(!entry.is_valid());
    }

    #[test]
    fn test_corrupted_checksum_is_invalid() {
        let mut buf = SegmentEntry::new([1u8; 32], 0, 512).encode();
        buf[50] ^= 0xff;
        assert!(!SegmentEntry::parse(&buf).is_valid());
    }

    #[test]
    fn test_zero_length_entry_is_invalid_even_with_checksum() {
        let entry = SegmentEntry::new([2u8; 32], 128, 0);
        assert!(!entry.is_valid());
    }

    #[test]
    fn test_parse_filters_filler_slots() {
        let padded = PaddedPieceSize(128); // 4 entries
        let mut region = Vec::new();
        region.extend_from_slice(&SegmentEntry::new([1u8; 32], 0, 100).encode());
        region.extend_from_slice(&SegmentEntry::new([2u8; 32], 100, 200).encode());
        region.extend_from_slice(&[0u8; 64]);
        region.extend_from_slice(&[0xa5u8; 64]);

        let table = SegmentTable::parse(&mut Cursor::new(region), padded).unwrap();
        assert_eq!(table.entries().len(), 4);

        let valid = table.valid_entries();
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].unpadded_offset, 0);
        assert_eq!(valid[1].unpadded_offset, 100);
    }

    #[test]
    fn test_parse_short_region_fails() {
        let padded = PaddedPieceSize(128);
        let mut short = Cursor::new(vec![0u8; 100]);
        assert!(SegmentTable::parse(&mut short, padded).is_err());
    }
}
