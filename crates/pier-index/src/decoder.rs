//! Contract for the archive-format decoder.
//!
//! pier does not implement the archive format. Whatever decoder the
//! embedder supplies is driven through [`ArchiveDecoder`], with the two
//! policy flags indexing requires fixed by [`DecodeOptions::indexing`].

use std::io::{Read, Seek};

use crate::error::IndexError;
use crate::index::BlockOffsetIndex;

/// A readable, seekable byte source. Blanket-implemented.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Policy flags passed to the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Treat a zero-length logical section as a normal end of stream
    /// instead of a decode error.
    pub zero_length_section_as_eof: bool,
    /// Admit identity-coded (single-hash) content identifiers into the
    /// index instead of rejecting them.
    pub admit_identity_blocks: bool,
}

impl DecodeOptions {
    /// The flags every indexing pass uses.
    pub fn indexing() -> Self {
        Self {
            zero_length_section_as_eof: true,
            admit_identity_blocks: true,
        }
    }
}

/// Decodes one archive stream into a block-offset index.
///
/// Offsets in the returned index are relative to the start of the stream
/// handed in; callers shift them when the stream is a bounded view into a
/// larger piece.
pub trait ArchiveDecoder: Send + Sync {
    /// Decode the stream and return its index.
    fn decode_index(
        &self,
        source: &mut dyn ReadSeek,
        opts: DecodeOptions,
    ) -> Result<BlockOffsetIndex, IndexError>;
}
