//! Segment-aware block indexing for pier shards.
//!
//! A shard is an archive-formatted byte stream. This crate turns such a
//! stream into a [`BlockOffsetIndex`] mapping every block's multihash to its
//! byte offset. Aggregated shards, archives that concatenate independently
//! decodable sub-archives, carry a data-segment table in their tail; the
//! [`SegmentIndexer`] parses that table, indexes each segment through a
//! bounded view, and merges the results, falling back to whole-stream
//! indexing when no usable table exists.
//!
//! The archive format decoder itself is consumed through the
//! [`ArchiveDecoder`] trait; this crate only fixes its policy flags.

mod builder;
mod decoder;
mod error;
mod index;
mod section;
mod segment;

pub use builder::SegmentIndexer;
pub use decoder::{ArchiveDecoder, DecodeOptions, ReadSeek};
pub use error::IndexError;
pub use index::BlockOffsetIndex;
pub use section::SectionReader;
pub use segment::{SegmentEntry, SegmentTable};
