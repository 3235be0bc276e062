//! Document loading.
//!
//! Turns bytes, a byte stream, or text into validated PDF content. The
//! ranking pipeline treats the result as an opaque blob; only a short hex
//! preview ends up in the candidate record.

use std::io::Read;
use thiserror::Error;

/// Every accepted document starts with these bytes.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Errors from document loading.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Provided data does not appear to be a PDF (missing %PDF- header)")]
    InvalidHeader,

    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

/// Validated PDF bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    bytes: Vec<u8>,
}

impl Document {
    /// Accept raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, DocumentError> {
        let bytes = bytes.into();
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(DocumentError::InvalidHeader);
        }
        Ok(Self { bytes })
    }

    /// Read a whole stream.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, DocumentError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    /// Accept text produced by reading binary content in text mode.
    ///
    /// Each character maps to one byte (Latin-1), so code points above
    /// U+00FF cannot have come from raw bytes and are rejected.
    pub fn from_text(text: &str) -> Result<Self, DocumentError> {
        let bytes = text
            .chars()
            .map(|c| {
                u8::try_from(u32::from(c)).map_err(|_| {
                    DocumentError::UnsupportedInput(format!(
                        "character {:?} cannot be encoded as a single byte",
                        c
                    ))
                })
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercase hex of the leading bytes, cut to `max_chars` characters.
    pub fn hex_preview(&self, max_chars: usize) -> String {
        let mut preview = String::with_capacity(max_chars + 1);
        for byte in self.bytes.iter().take(max_chars.div_ceil(2)) {
            preview.push_str(&format!("{:02x}", byte));
        }
        preview.truncate(max_chars);
        preview
    }
}

impl AsRef<[u8]> for Document {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
