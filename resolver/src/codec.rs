//! Codec for single-key blobs: a JSON object of strings, gzip compressed
//! and base64 encoded.
use crate::types::ResolvedDocument;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use flate2::Compression;
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("invalid gzip stream: {0}")]
    Compression(String),
    #[error("could not read decompressed stream: {0}")]
    Stream(#[from] io::Error),
    #[error("invalid JSON document: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("could not serialize document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decodes a stored blob into a flat document. Each stage fails with its own
/// error and nothing is returned on failure.
pub fn decode(encoded: &str) -> Result<ResolvedDocument, DecodeError> {
    let compressed = STANDARD.decode(encoded.trim().as_bytes())?;

    // The bufread decoder parses the first header eagerly, so a missing header
    // is visible before the body is read. Concatenated members are read as one
    // stream.
    let mut decoder = MultiGzDecoder::new(compressed.as_slice());
    if decoder.header().is_none() {
        return Err(DecodeError::Compression("missing or invalid gzip header".into()));
    }

    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;

    let document: ResolvedDocument = serde_json::from_slice(&json)?;
    Ok(document)
}

/// Inverse of [`decode`].
pub fn encode(document: &ResolvedDocument) -> Result<String, EncodeError> {
    let json = serde_json::to_vec(document)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    Ok(STANDARD.encode(compressed))
}
