//! Attendance code symbols: the code format, turning scanned or typed text back into a
//! code, QR encoding and decoding, and the camera scanning loop.

pub mod client;
pub mod decode;
pub mod encode;
pub mod error;
pub mod extract;
pub mod pattern;
pub mod scanner;
pub mod sources;

pub use decode::{Frame, decode_frame};
pub use encode::{QrMatrix, encode};
pub use error::{EncodeError, ExtractError, PatternError, ScanError};
pub use extract::extract_code;
pub use pattern::CodePattern;
