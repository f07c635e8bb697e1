use std::fmt;

use image::{GenericImageView, ImageFormat};

use crate::errors::{Result, SignError};

/// The uploaded signature image, decoded once and immutable afterwards.
///
/// Only PNG is accepted: it is the one common upload format that carries an
/// alpha channel, which lets the page content show through around the ink.
#[derive(Clone, PartialEq)]
pub struct SignatureAsset {
    width: u32,
    height: u32,
    /// RGBA8, row-major
    pixels: Vec<u8>,
    has_alpha: bool,
}

impl fmt::Debug for SignatureAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureAsset")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &self.pixels.len())
            .field("has_alpha", &self.has_alpha)
            .finish()
    }
}

impl SignatureAsset {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes)
            .map_err(|e| SignError::InvalidSignature(e.to_string()))?;
        if format != ImageFormat::Png {
            return Err(SignError::InvalidSignature(format!(
                "expected a PNG image, got {}",
                format.extensions_str().first().copied().unwrap_or("unknown")
            )));
        }

        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| SignError::InvalidSignature(e.to_string()))?;
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(SignError::InvalidSignature("image has no pixels".to_string()));
        }

        let has_alpha = decoded.color().has_alpha();
        Ok(Self {
            width,
            height,
            pixels: decoded.to_rgba8().into_raw(),
            has_alpha,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// RGBA8 pixels, for painting the preview
    pub fn rgba(&self) -> &[u8] {
        &self.pixels
    }

    /// Splits the pixels into RGB8 color data and, for images with an alpha
    /// channel, a separate 8-bit alpha plane to be used as `/SMask`.
    pub fn rgb_and_alpha(&self) -> (Vec<u8>, Option<Vec<u8>>) {
        let px = self.pixels.len() / 4;
        let mut rgb = Vec::with_capacity(px * 3);
        let mut alpha = Vec::with_capacity(if self.has_alpha { px } else { 0 });
        for chunk in self.pixels.chunks_exact(4) {
            rgb.extend_from_slice(&chunk[..3]);
            if self.has_alpha {
                alpha.push(chunk[3]);
            }
        }
        (rgb, self.has_alpha.then_some(alpha))
    }
}
