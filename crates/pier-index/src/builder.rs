//! The segment-aware index builder.

use std::io::{Read, Seek, SeekFrom};

use pier_types::UnpaddedPieceSize;
use tracing::{debug, warn};

use crate::decoder::{ArchiveDecoder, DecodeOptions};
use crate::error::IndexError;
use crate::index::BlockOffsetIndex;
use crate::section::SectionReader;
use crate::segment::SegmentTable;

/// Builds a [`BlockOffsetIndex`] for a shard's byte stream.
///
/// Aggregated pieces are indexed segment by segment through bounded views
/// and merged with offsets shifted to the aggregate's coordinate space.
/// Pieces without a usable data-segment table (no room for one, a short or
/// corrupt table region, or zero valid descriptors) are indexed as one
/// whole stream instead; none of those conditions is an error.
pub struct SegmentIndexer<D> {
    decoder: D,
}

impl<D: ArchiveDecoder> SegmentIndexer<D> {
    /// Create an indexer driving the given archive decoder.
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    /// Index the stream, whose total length is `total_size` bytes.
    pub fn build<R: Read + Seek + Send>(
        &self,
        source: &mut R,
        total_size: u64,
    ) -> Result<BlockOffsetIndex, IndexError> {
        match self.aggregated_index(source, total_size) {
            Ok(index) => Ok(index),
            Err(err) => {
                debug!(error = %err, "no usable segment table, indexing whole stream");
                source.seek(SeekFrom::Start(0))?;
                self.decoder.decode_index(source, DecodeOptions::indexing())
            }
        }
    }

    /// Try the aggregated path. Any error here means "fall back".
    fn aggregated_index<R: Read + Seek + Send>(
        &self,
        source: &mut R,
        total_size: u64,
    ) -> Result<BlockOffsetIndex, IndexError> {
        let padded = UnpaddedPieceSize(total_size).padded();
        let table_offset = padded
            .segment_table_offset()
            .ok_or(IndexError::NotAggregated)?;

        source.seek(SeekFrom::Start(table_offset))?;
        let table = SegmentTable::parse(source, padded)?;

        let segments = table.valid_entries();
        if segments.is_empty() {
            return Err(IndexError::NotAggregated);
        }

        let mut combined = BlockOffsetIndex::new();
        let mut indexed = 0usize;
        for segment in &segments {
            let mut section =
                SectionReader::new(&mut *source, segment.unpadded_offset, segment.unpadded_len)?;
            match self
                .decoder
                .decode_index(&mut section, DecodeOptions::indexing())
            {
                Ok(segment_index) => {
                    for (hash, local_offset) in segment_index.iter() {
                        combined
                            .insert_no_replace(hash.clone(), segment.unpadded_offset + local_offset);
                    }
                    indexed += 1;
                    debug!(
                        offset = segment.unpadded_offset,
                        len = segment.unpadded_len,
                        blocks = segment_index.len(),
                        "indexed segment"
                    );
                }
                Err(err) => {
                    warn!(
                        offset = segment.unpadded_offset,
                        len = segment.unpadded_len,
                        error = %err,
                        "skipping undecodable segment"
                    );
                }
            }
        }

        if indexed == 0 {
            return Err(IndexError::NoIndexableSegments);
        }
        Ok(combined)
    }
}
