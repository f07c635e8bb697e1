//! Immediate-mode drawing of the preview canvas.
//!
//! Every redraw paints the whole frame again: the page bitmap, then the
//! committed placement for that page, then the live drag rectangle.

use crate::geometry::{BitmapSize, CanvasRect};
use crate::placement::Placement;
use crate::render::PageBitmap;
use crate::signature::SignatureAsset;

/// Something that can show a page and signatures on top of it, in canvas pixels
pub trait Surface {
    /// Resizes the backing bitmap to `size` and erases it
    fn clear(&mut self, size: BitmapSize);

    fn draw_page(&mut self, page: &PageBitmap);

    /// Draws the signature stretched to `rect`. The rectangle may have negative
    /// extents while a drag is in progress, implementations must accept that.
    fn draw_signature(&mut self, signature: &SignatureAsset, rect: CanvasRect);
}

/// Paints one frame
pub fn compose_frame<S: Surface + ?Sized>(
    surface: &mut S,
    page: &PageBitmap,
    signature: Option<&SignatureAsset>,
    committed: Option<&Placement>,
    live: Option<CanvasRect>,
) {
    surface.clear(page.size());
    surface.draw_page(page);

    let Some(signature) = signature else {
        return;
    };

    if let Some(placement) = committed {
        surface.draw_signature(signature, placement.rect);
    }
    if let Some(rect) = live {
        surface.draw_signature(signature, rect);
    }
}
