use std::fmt::Write as _;
use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::EncodeError;

/// Light border around the symbol, in modules, required by scanners.
pub const QUIET_ZONE: usize = 4;

/// Pixel size of one module is clamped to this range.
pub const MODULE_PX_RANGE: std::ops::RangeInclusive<u32> = 1..=64;

/// Square grid of dark/light modules for one QR symbol, without the quiet zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    width: usize,
    modules: Vec<bool>,
}

/// Encodes `text` as a QR symbol at error-correction level M.
///
/// Deterministic: the same text always yields the same matrix.
pub fn encode(text: &str) -> Result<QrMatrix, EncodeError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M)?;
    let width = code.width();
    let modules = code
        .to_colors()
        .into_iter()
        .map(|c| c == Color::Dark)
        .collect();
    Ok(QrMatrix { width, modules })
}

impl QrMatrix {
    /// Modules per side, excluding the quiet zone.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether the module at `(x, y)` is dark. Out-of-range coordinates are light.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && self.modules.get(y * self.width + x).copied().unwrap_or(false)
    }

    fn side_px(&self, module_px: u32) -> u32 {
        (self.width + 2 * QUIET_ZONE) as u32 * module_px
    }

    /// Renders the symbol as a greyscale bitmap including the quiet zone.
    pub fn to_image(&self, module_px: u32) -> GrayImage {
        let module_px = module_px.clamp(*MODULE_PX_RANGE.start(), *MODULE_PX_RANGE.end());
        let side = self.side_px(module_px);
        GrayImage::from_fn(side, side, |px, py| {
            let mx = (px / module_px) as usize;
            let my = (py / module_px) as usize;
            let dark = mx >= QUIET_ZONE
                && my >= QUIET_ZONE
                && self.is_dark(mx - QUIET_ZONE, my - QUIET_ZONE);
            if dark { Luma([0]) } else { Luma([255]) }
        })
    }

    pub fn to_png(&self, module_px: u32) -> Result<Vec<u8>, EncodeError> {
        let mut bytes = Vec::new();
        self.to_image(module_px)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Renders the symbol as a standalone SVG document, one `<rect>` per run of dark
    /// modules in a row.
    pub fn to_svg(&self, module_px: u32) -> String {
        let module_px = module_px.clamp(*MODULE_PX_RANGE.start(), *MODULE_PX_RANGE.end());
        let side = self.side_px(module_px);
        let mut svg = format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{side}" height="{side}" viewBox="0 0 {side} {side}" shape-rendering="crispEdges"><rect width="{side}" height="{side}" fill="#ffffff"/>"##
        );

        for y in 0..self.width {
            let mut x = 0;
            while x < self.width {
                if !self.is_dark(x, y) {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < self.width && self.is_dark(x, y) {
                    x += 1;
                }
                let _ = write!(
                    svg,
                    r##"<rect x="{}" y="{}" width="{}" height="{}" fill="#000000"/>"##,
                    (start + QUIET_ZONE) as u32 * module_px,
                    (y + QUIET_ZONE) as u32 * module_px,
                    (x - start) as u32 * module_px,
                    module_px
                );
            }
        }

        svg.push_str("</svg>");
        svg
    }
}
