use thiserror::Error;

/// Why a piece of scanned or typed text did not yield a code.
///
/// These are user mistakes (wrong QR code, typo), never system faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("No code was provided")]
    Empty,
    #[error("The link does not contain an attendance code")]
    NoCodeInUrl,
    #[error("Code is longer than {max} characters")]
    TooLong { max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Code prefix must be non-empty ASCII letters or digits, got {0:?}")]
    InvalidPrefix(String),
    #[error("Code length must be between {min} and {max}, got {got}")]
    InvalidLength { min: usize, max: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Text does not fit in a QR symbol: {0}")]
    Symbol(#[from] qrcode::types::QrError),
    #[error("Failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Camera unavailable: {0}")]
    Camera(String),
    #[error("Decoder failed: {0}")]
    Decoder(String),
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),
}
