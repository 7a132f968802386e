//! Card metadata embedding.
//!
//! A card's JSON document travels inside its portrait as a `tEXt` chunk
//! with the reserved keyword `chara`. Embedding strips every existing
//! `chara` chunk and appends a fresh one holding the compact JSON
//! serialization, so the operation is idempotent: re-running it on an
//! already-embedded image never accumulates duplicates.

use crate::png::{self, Chunk, PngError};
use serde_json::Value;

/// Reserved `tEXt` keyword carrying embedded card metadata.
pub const METADATA_KEYWORD: &str = "chara";

/// A parsed card: base-name key plus its metadata document.
#[derive(Debug, Clone)]
pub struct Card {
    pub key: String,
    pub metadata: Value,
}

/// True for `tEXt` chunks with the reserved metadata keyword.
///
/// Text chunks under any other keyword are somebody else's and pass
/// through untouched.
fn is_metadata_chunk(chunk: &Chunk) -> bool {
    png::text_keyword(chunk) == Some(METADATA_KEYWORD)
}

/// Rewrite a PNG so its chunk sequence carries `metadata` as the single
/// `chara` text chunk, appended at the end of the sequence.
pub fn embed_metadata(image: &[u8], metadata: &Value) -> Result<Vec<u8>, PngError> {
    let mut chunks: Vec<Chunk> = png::decode(image)?
        .into_iter()
        .filter(|chunk| !is_metadata_chunk(chunk))
        .collect();
    chunks.push(png::text_chunk(METADATA_KEYWORD, &metadata.to_string()));
    Ok(png::encode(&chunks))
}

/// Read back the embedded metadata document, if any.
///
/// Returns `None` when no `chara` chunk exists or its value is not valid
/// JSON.
pub fn extract_metadata(image: &[u8]) -> Result<Option<Value>, PngError> {
    let chunks = png::decode(image)?;
    Ok(chunks
        .iter()
        .find(|chunk| is_metadata_chunk(chunk))
        .and_then(png::text_value)
        .and_then(|value| serde_json::from_slice(value).ok()))
}

// ============================================================================
// Tests
// ============================================================================
