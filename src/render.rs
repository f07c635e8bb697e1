//! Page rasterization, as seen from this crate.
//!
//! Parsing and painting PDF content is not done here: a [`PageRenderer`]
//! (pdf.js in the browser) turns a page into RGBA pixels, this crate only
//! stores and composites the result.

use std::{fmt, future::Future, pin::Pin};

use serde_derive::{Deserialize, Serialize};

use crate::errors::Result;
use crate::geometry::BitmapSize;

/// 1-based page number, the way pages are presented to the user
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageIndex(pub u32);

impl PageIndex {
    pub const FIRST: PageIndex = PageIndex(1);

    /// `None` for 0
    pub fn new(page: u32) -> Option<Self> {
        (page >= 1).then_some(PageIndex(page))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn zero_based(self) -> usize {
        self.0.saturating_sub(1) as usize
    }

    pub fn next(self) -> Self {
        PageIndex(self.0.saturating_add(1))
    }

    pub fn previous(self) -> Option<Self> {
        PageIndex::new(self.0.saturating_sub(1))
    }

    pub fn is_within(self, page_count: usize) -> bool {
        self.0 >= 1 && (self.0 as usize) <= page_count
    }
}

impl Default for PageIndex {
    fn default() -> Self {
        PageIndex::FIRST
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rasterized page: non-premultiplied RGBA8, row-major, top row first
#[derive(Clone, PartialEq, Eq)]
pub struct PageBitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl fmt::Debug for PageBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &self.pixels.len())
            .finish()
    }
}

impl PageBitmap {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> std::result::Result<Self, String> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 {
            return Err(format!("empty bitmap ({width}x{height})"));
        }
        if pixels.len() != expected {
            return Err(format!(
                "expected {expected} bytes for a {width}x{height} RGBA bitmap, got {}",
                pixels.len()
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Opaque white bitmap
    pub fn blank(size: BitmapSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            pixels: vec![0xff; size.width as usize * size.height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> BitmapSize {
        BitmapSize::new(self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<PageBitmap>> + 'a>>;

/// Rasterizes the pages of one loaded document.
///
/// Implementations report failures as [`crate::SignError::RenderFailure`].
pub trait PageRenderer {
    fn page_count(&self) -> usize;

    /// `scale` is canvas pixels per PDF unit
    fn render_page(&self, page: PageIndex, scale: f32) -> RenderFuture<'_>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_index_is_one_based() {
        assert_eq!(PageIndex::new(0), None);
        assert_eq!(PageIndex::new(3).map(PageIndex::zero_based), Some(2));
        assert_eq!(PageIndex::FIRST.previous(), None);
        assert_eq!(PageIndex(2).previous(), Some(PageIndex::FIRST));
        assert!(PageIndex(3).is_within(3));
        assert!(!PageIndex(4).is_within(3));
    }

    #[test]
    fn bitmap_checks_buffer_length() {
        assert!(PageBitmap::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(PageBitmap::from_rgba(2, 2, vec![0; 12]).is_err());
        assert!(PageBitmap::from_rgba(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn blank_bitmap_is_white() {
        let bmp = PageBitmap::blank(BitmapSize::new(3, 2));
        assert_eq!(bmp.size(), BitmapSize::new(3, 2));
        assert!(bmp.pixels().iter().all(|b| *b == 0xff));
    }
}
