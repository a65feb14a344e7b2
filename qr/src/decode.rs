use image::GrayImage;
use rqrr::PreparedImage;

use crate::error::ScanError;

/// One greyscale camera frame.
pub type Frame = GrayImage;

/// Returns the text of the first QR symbol found in `frame`, if any.
///
/// CPU-bound; callers on an async runtime should run it on the blocking pool.
pub fn decode_frame(frame: &Frame) -> Option<String> {
    let (w, h) = frame.dimensions();
    let mut prepared = PreparedImage::prepare_from_greyscale(w as usize, h as usize, |x, y| {
        frame.get_pixel(x as u32, y as u32).0[0]
    });

    prepared
        .detect_grids()
        .into_iter()
        .find_map(|grid| match grid.decode() {
            Ok((_, content)) => Some(content),
            Err(e) => {
                tracing::trace!(error = ?e, "Found a grid that did not decode");
                None
            }
        })
}

/// Loads an encoded image (PNG or JPEG) and converts it to a greyscale frame.
pub fn load_frame(bytes: &[u8]) -> Result<Frame, ScanError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_luma8())
        .map_err(|e| ScanError::Camera(format!("unreadable frame: {e}")))
}
