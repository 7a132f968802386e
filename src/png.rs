//! Chunk-level PNG codec.
//!
//! Splits a PNG byte stream into its raw chunk sequence and reassembles it,
//! without touching pixel data. This is all the card pipeline needs: it
//! rewrites `tEXt` chunks and passes everything else through untouched.
//!
//! Decoding walks the entire buffer rather than stopping at `IEND`, because
//! embedded metadata is appended at the end of the sequence and must still
//! be found on a re-run. An `IEND` chunk is required to appear somewhere,
//! and every chunk CRC is verified.

use thiserror::Error;

/// Fixed 8-byte PNG file signature.
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Chunk type carrying a `keyword\0value` text payload.
pub const TEXT_TYPE: [u8; 4] = *b"tEXt";

const END_TYPE: [u8; 4] = *b"IEND";

/// Per-chunk overhead: 4-byte length + 4-byte type + 4-byte CRC.
const CHUNK_OVERHEAD: usize = 12;

/// Chunk decoding errors.
#[derive(Debug, Error)]
pub enum PngError {
    #[error("not a PNG file (bad signature)")]
    BadSignature,

    #[error("truncated chunk at byte {0}")]
    Truncated(usize),

    #[error("CRC mismatch in `{kind}` chunk at byte {offset}")]
    CrcMismatch { kind: String, offset: usize },

    #[error("no IEND chunk found")]
    MissingEnd,
}

/// One typed segment of a PNG chunk sequence.
///
/// The CRC is not stored; it is verified during [`decode`] and recomputed
/// by [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: [u8; 4],
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(kind: [u8; 4], data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// CRC-32 over the chunk type and data, as stored on disk.
    fn crc(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.kind);
        hasher.update(&self.data);
        hasher.finalize()
    }

    fn kind_lossy(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }
}

/// Read a big-endian u32, `None` if the buffer is too short.
fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(raw))
}

/// Decode a PNG byte stream into its chunk sequence.
///
/// Walks the whole buffer, so chunks appended after `IEND` are included.
pub fn decode(bytes: &[u8]) -> Result<Vec<Chunk>, PngError> {
    if bytes.len() < SIGNATURE.len() || bytes[..SIGNATURE.len()] != SIGNATURE {
        return Err(PngError::BadSignature);
    }

    let mut chunks = Vec::new();
    let mut ended = false;
    let mut offset = SIGNATURE.len();

    while offset < bytes.len() {
        let length = read_u32(bytes, offset).ok_or(PngError::Truncated(offset))? as usize;
        let kind: [u8; 4] = bytes
            .get(offset + 4..offset + 8)
            .and_then(|raw| raw.try_into().ok())
            .ok_or(PngError::Truncated(offset))?;

        let data_start = offset + 8;
        let data = bytes
            .get(data_start..data_start + length)
            .ok_or(PngError::Truncated(offset))?;
        let stored_crc =
            read_u32(bytes, data_start + length).ok_or(PngError::Truncated(offset))?;

        let chunk = Chunk::new(kind, data.to_vec());
        if chunk.crc() != stored_crc {
            return Err(PngError::CrcMismatch {
                kind: chunk.kind_lossy(),
                offset,
            });
        }

        ended |= chunk.kind == END_TYPE;
        chunks.push(chunk);
        offset = data_start + length + 4;
    }

    if !ended {
        return Err(PngError::MissingEnd);
    }

    Ok(chunks)
}

/// Encode a chunk sequence back into PNG bytes, recomputing every CRC.
pub fn encode(chunks: &[Chunk]) -> Vec<u8> {
    let total = SIGNATURE.len()
        + chunks
            .iter()
            .map(|c| c.data.len() + CHUNK_OVERHEAD)
            .sum::<usize>();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&SIGNATURE);
    for chunk in chunks {
        out.extend_from_slice(&(chunk.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&chunk.kind);
        out.extend_from_slice(&chunk.data);
        out.extend_from_slice(&chunk.crc().to_be_bytes());
    }
    out
}

/// Build a `tEXt` chunk from a keyword and value.
///
/// The keyword must not contain NUL; the value is stored as UTF-8 bytes.
pub fn text_chunk(keyword: &str, value: &str) -> Chunk {
    let mut data = Vec::with_capacity(keyword.len() + 1 + value.len());
    data.extend_from_slice(keyword.as_bytes());
    data.push(0);
    data.extend_from_slice(value.as_bytes());
    Chunk::new(TEXT_TYPE, data)
}

/// Decoded keyword of a `tEXt` chunk, `None` for any other chunk type.
pub fn text_keyword(chunk: &Chunk) -> Option<&str> {
    if chunk.kind != TEXT_TYPE {
        return None;
    }
    let end = chunk
        .data
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(chunk.data.len());
    std::str::from_utf8(&chunk.data[..end]).ok()
}

/// Value bytes of a `tEXt` chunk (everything after the NUL separator).
pub fn text_value(chunk: &Chunk) -> Option<&[u8]> {
    if chunk.kind != TEXT_TYPE {
        return None;
    }
    let sep = chunk.data.iter().position(|&b| b == 0)?;
    Some(&chunk.data[sep + 1..])
}

// ============================================================================
// Tests
// ============================================================================
