use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsnJrnlError {
    #[error("Structural parse error at offset {offset}: {reason}")]
    StructuralParseError {
        offset: u64,
        reason: String,
        raw: Vec<u8>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    OtherError(String),
}

impl UsnJrnlError {
    /// Check if this error is recoverable (the caller may keep pulling records)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, UsnJrnlError::StructuralParseError { .. })
    }

    /// Stream offset of the record that failed to parse.
    pub fn offset(&self) -> Option<u64> {
        match self {
            UsnJrnlError::StructuralParseError { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Raw bytes of the record that failed to parse.
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        match self {
            UsnJrnlError::StructuralParseError { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
