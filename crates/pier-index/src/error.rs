//! Error types for indexing.

/// Errors that can occur while building or parsing shard indices.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// An I/O error while reading the byte source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive decoder rejected the stream.
    #[error("archive decode failed: {0}")]
    Decode(String),

    /// The piece carries no usable data-segment table.
    ///
    /// Internal signal: the indexer catches this and falls back to
    /// whole-stream indexing.
    #[error("piece is not aggregated")]
    NotAggregated,

    /// Every segment of an aggregated piece failed to decode.
    #[error("no segment of the aggregated piece could be indexed")]
    NoIndexableSegments,
}
