//! Coordinate spaces and the transforms between them.
//!
//! Three spaces are involved when a signature is placed:
//!
//! - *display* coordinates: CSS pixels of the `<canvas>` element as laid out by the browser
//! - *canvas* coordinates: pixels of the canvas backing bitmap, origin top-left, y pointing down
//! - *document* coordinates: PDF user space of the page, origin bottom-left, y pointing up
//!
//! Pointer input is converted display -> canvas before any drag arithmetic happens.
//! The canvas -> document transform only runs once, when the signed file is written.

use serde_derive::{Deserialize, Serialize};

use crate::units::{Pt, Px};

/// A position in canvas bitmap pixels
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasPoint {
    pub x: Px,
    pub y: Px,
}

impl CanvasPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x: Px(x), y: Px(y) }
    }

    /// Nearest point inside a bitmap of `size`, edges included
    pub fn clamped_to(self, size: BitmapSize) -> Self {
        Self {
            x: Px(self.x.0.clamp(0.0, size.width as f32)),
            y: Px(self.y.0.clamp(0.0, size.height as f32)),
        }
    }
}

/// Rectangle in canvas bitmap pixels, `(x, y)` is the top left corner once normalized.
///
/// While the user is still dragging, `width` and `height` are allowed to be negative.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasRect {
    pub x: Px,
    pub y: Px,
    pub width: Px,
    pub height: Px,
}

impl CanvasRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x: Px(x),
            y: Px(y),
            width: Px(width),
            height: Px(height),
        }
    }

    /// Rectangle from the drag anchor to the current pointer, not normalized.
    pub fn spanning(anchor: CanvasPoint, to: CanvasPoint) -> Self {
        Self {
            x: anchor.x,
            y: anchor.y,
            width: to.x - anchor.x,
            height: to.y - anchor.y,
        }
    }

    /// Same area with the minimum corner first and non-negative extents
    pub fn normalized(&self) -> Self {
        let a = CanvasPoint { x: self.x, y: self.y };
        let b = CanvasPoint {
            x: self.x + self.width,
            y: self.y + self.height,
        };
        normalize(a, b)
    }

    /// True if the normalized rectangle has no area
    pub fn is_degenerate(&self) -> bool {
        let n = self.normalized();
        !(n.width.0 > 0.0 && n.height.0 > 0.0)
    }
}

/// Axis-aligned rectangle spanned by two arbitrary corners.
///
/// `normalize(a, b) == normalize(b, a)` and the extents are never negative.
pub fn normalize(a: CanvasPoint, b: CanvasPoint) -> CanvasRect {
    CanvasRect {
        x: a.x.min(b.x),
        y: a.y.min(b.y),
        width: (b.x - a.x).abs(),
        height: (b.y - a.y).abs(),
    }
}

/// Pixel dimensions of a rendered page bitmap
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitmapSize {
    pub width: u32,
    pub height: u32,
}

impl BitmapSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Bitmap size of a page rasterized at `scale` canvas pixels per point
    pub fn for_page(page: &PageBox, scale: f32) -> Self {
        Self {
            width: (page.displayed_width().0 * scale).floor().max(1.0) as u32,
            height: (page.displayed_height().0 * scale).floor().max(1.0) as u32,
        }
    }
}

/// Clockwise rotation applied to a page when it is displayed (`/Rotate`)
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageRotation {
    #[default]
    Upright,
    Quarter,
    Half,
    ThreeQuarters,
}

impl PageRotation {
    /// Values that are not a multiple of 90 are treated as 0, like viewers do
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            90 => PageRotation::Quarter,
            180 => PageRotation::Half,
            270 => PageRotation::ThreeQuarters,
            _ => PageRotation::Upright,
        }
    }

    pub fn degrees(&self) -> u16 {
        match self {
            PageRotation::Upright => 0,
            PageRotation::Quarter => 90,
            PageRotation::Half => 180,
            PageRotation::ThreeQuarters => 270,
        }
    }

    /// True if the displayed page has width and height swapped
    pub fn is_sideways(&self) -> bool {
        matches!(self, PageRotation::Quarter | PageRotation::ThreeQuarters)
    }

    /// `cm` operands that draw a unit-square image into `rect` so that it
    /// appears upright once the page is rotated for display.
    pub fn image_matrix(&self, rect: &DocumentRect) -> [Pt; 6] {
        let DocumentRect {
            x,
            y,
            width: w,
            height: h,
        } = *rect;
        let zero = Pt(0.0);
        match self {
            PageRotation::Upright => [w, zero, zero, h, x, y],
            PageRotation::Quarter => [zero, h, -w, zero, x + w, y],
            PageRotation::Half => [-w, zero, zero, -h, x + w, y + h],
            PageRotation::ThreeQuarters => [zero, -h, w, zero, x, y + h],
        }
    }
}

/// Visible area of a page in document units
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub llx: Pt,
    pub lly: Pt,
    pub urx: Pt,
    pub ury: Pt,
    #[serde(default)]
    pub rotation: PageRotation,
}

impl Default for PageBox {
    fn default() -> Self {
        Self::US_LETTER
    }
}

impl PageBox {
    pub const US_LETTER: PageBox = PageBox {
        llx: Pt(0.0),
        lly: Pt(0.0),
        urx: Pt(612.0),
        ury: Pt(792.0),
        rotation: PageRotation::Upright,
    };

    /// Page box with the origin at `(0, 0)`
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            llx: Pt(0.0),
            lly: Pt(0.0),
            urx: Pt(width),
            ury: Pt(height),
            rotation: PageRotation::Upright,
        }
    }

    /// Reorders the corners, PDF allows any two diagonally opposite corners
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            llx: Pt(x1.min(x2)),
            lly: Pt(y1.min(y2)),
            urx: Pt(x1.max(x2)),
            ury: Pt(y1.max(y2)),
            rotation: PageRotation::Upright,
        }
    }

    pub fn with_rotation(self, rotation: PageRotation) -> Self {
        Self { rotation, ..self }
    }

    pub fn width(&self) -> Pt {
        self.urx - self.llx
    }

    pub fn height(&self) -> Pt {
        self.ury - self.lly
    }

    /// Width of the page as it appears on screen, after rotation
    pub fn displayed_width(&self) -> Pt {
        if self.rotation.is_sideways() {
            self.height()
        } else {
            self.width()
        }
    }

    pub fn displayed_height(&self) -> Pt {
        if self.rotation.is_sideways() {
            self.width()
        } else {
            self.height()
        }
    }
}

/// Rectangle in document space, `(x, y)` is the lower left corner
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRect {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
}

impl DocumentRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x: Pt(x),
            y: Pt(y),
            width: Pt(width),
            height: Pt(height),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width.0 > 0.0 && self.height.0 > 0.0)
    }
}

/// Converts pointer positions from CSS pixels of the displayed element
/// into pixels of the canvas backing bitmap.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DisplayTransform {
    scale_x: f32,
    scale_y: f32,
}

impl Default for DisplayTransform {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl DisplayTransform {
    /// A zero displayed extent (element hidden / not laid out yet) keeps that axis unscaled.
    pub fn new(bitmap: BitmapSize, displayed_width: f32, displayed_height: f32) -> Self {
        let axis = |px: u32, shown: f32| {
            if shown > 0.0 && shown.is_finite() {
                px as f32 / shown
            } else {
                1.0
            }
        };
        Self {
            scale_x: axis(bitmap.width, displayed_width),
            scale_y: axis(bitmap.height, displayed_height),
        }
    }

    /// `display_x` / `display_y` are relative to the element's top left corner
    pub fn to_canvas(&self, display_x: f32, display_y: f32) -> CanvasPoint {
        CanvasPoint::new(display_x * self.scale_x, display_y * self.scale_y)
    }
}

/// Canvas pixels per document unit. Rendering preserves the aspect ratio,
/// so the horizontal ratio is used for both axes.
fn px_per_pt(bitmap: BitmapSize, page: &PageBox) -> f32 {
    debug_assert!(page.width().0 > 0.0, "page box without width");
    bitmap.width as f32 / page.displayed_width().0
}

/// Maps a committed canvas rectangle onto the page it was drawn on.
///
/// The rectangle is normalized first. Canvas offsets are measured from the top
/// left corner of the page as displayed, which for a rotated page is a
/// different corner of the page box. The result is anchored at its lower left
/// corner in PDF user space.
pub fn canvas_to_document(rect: &CanvasRect, bitmap: BitmapSize, page: &PageBox) -> DocumentRect {
    let rect = rect.normalized();
    let scale = px_per_pt(bitmap, page);

    // offsets from the displayed top left corner, in points
    let left = rect.x.into_pt(scale);
    let top = rect.y.into_pt(scale);
    let across = rect.width.into_pt(scale);
    let down = rect.height.into_pt(scale);
    let right = left + across;
    let bottom = top + down;

    match page.rotation {
        PageRotation::Upright => DocumentRect {
            x: page.llx + left,
            y: page.ury - bottom,
            width: across,
            height: down,
        },
        PageRotation::Quarter => DocumentRect {
            x: page.llx + top,
            y: page.lly + left,
            width: down,
            height: across,
        },
        PageRotation::Half => DocumentRect {
            x: page.urx - right,
            y: page.lly + top,
            width: across,
            height: down,
        },
        PageRotation::ThreeQuarters => DocumentRect {
            x: page.urx - bottom,
            y: page.ury - right,
            width: down,
            height: across,
        },
    }
}

/// Inverse of [`canvas_to_document`]
pub fn document_to_canvas(rect: &DocumentRect, bitmap: BitmapSize, page: &PageBox) -> CanvasRect {
    let scale = px_per_pt(bitmap, page);
    let DocumentRect { x, y, width, height } = *rect;

    let (left, top, across, down) = match page.rotation {
        PageRotation::Upright => (x - page.llx, page.ury - (y + height), width, height),
        PageRotation::Quarter => (y - page.lly, x - page.llx, height, width),
        PageRotation::Half => (page.urx - (x + width), y - page.lly, width, height),
        PageRotation::ThreeQuarters => (page.ury - (y + height), page.urx - (x + width), height, width),
    };

    CanvasRect {
        x: left.into_px(scale),
        y: top.into_px(scale),
        width: across.into_px(scale),
        height: down.into_px(scale),
    }
}
