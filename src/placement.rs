//! Pointer-drag state machine that turns a dragged rectangle into a placement.
//!
//! ```text
//! Idle ──down──> Dragging ──up (area > 0)──> Committed
//!                   │  ^                         │
//!                   │  └──────────down───────────┘
//!                   └──up (no area)──> Idle
//! ```
//!
//! All coordinates are canvas bitmap pixels; the display -> canvas conversion
//! happens before events reach the mapper.

use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::geometry::{canvas_to_document, normalize, BitmapSize, CanvasPoint, CanvasRect, DocumentRect, PageBox};
use crate::render::PageIndex;

/// A committed signature rectangle
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub page: PageIndex,
    /// Normalized, strictly positive extents
    pub rect: CanvasRect,
    /// Size of the page bitmap the rectangle was drawn on
    pub bitmap: BitmapSize,
}

impl Placement {
    pub fn to_document(&self, page_box: &PageBox) -> DocumentRect {
        canvas_to_document(&self.rect, self.bitmap, page_box)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        page: PageIndex,
        anchor: CanvasPoint,
        current: CanvasPoint,
    },
    Committed(Placement),
}

/// How many committed placements survive a new drag
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementMode {
    /// One placement per page, other pages keep theirs
    #[default]
    PerPage,
    /// One placement in the whole document
    Single,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerDown {
    Started,
    /// Nothing to place yet, the user has to upload a signature first
    SignatureMissing,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DragEnd {
    Committed(Placement),
    /// Zero-area drag, nothing was committed
    Discarded,
    NotDragging,
}

#[derive(Debug, Clone)]
pub struct PlacementMapper {
    mode: PlacementMode,
    state: DragState,
    committed: BTreeMap<PageIndex, Placement>,
}

impl Default for PlacementMapper {
    fn default() -> Self {
        Self::new(PlacementMode::default())
    }
}

impl PlacementMapper {
    pub fn new(mode: PlacementMode) -> Self {
        Self {
            mode,
            state: DragState::Idle,
            committed: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> PlacementMode {
        self.mode
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn pointer_down(&mut self, page: PageIndex, at: CanvasPoint, has_signature: bool) -> PointerDown {
        if !has_signature {
            return PointerDown::SignatureMissing;
        }

        match self.mode {
            PlacementMode::PerPage => {
                self.committed.remove(&page);
            }
            PlacementMode::Single => self.committed.clear(),
        }

        self.state = DragState::Dragging {
            page,
            anchor: at,
            current: at,
        };
        PointerDown::Started
    }

    /// Returns the live rectangle (not normalized) while dragging
    pub fn pointer_move(&mut self, at: CanvasPoint) -> Option<CanvasRect> {
        match &mut self.state {
            DragState::Dragging { anchor, current, .. } => {
                *current = at;
                Some(CanvasRect::spanning(*anchor, at))
            }
            _ => None,
        }
    }

    pub fn pointer_up(&mut self, at: CanvasPoint, bitmap: BitmapSize) -> DragEnd {
        let DragState::Dragging { page, anchor, .. } = self.state else {
            return DragEnd::NotDragging;
        };

        let rect = normalize(anchor, at);
        if rect.is_degenerate() {
            self.state = DragState::Idle;
            return DragEnd::Discarded;
        }

        let placement = Placement { page, rect, bitmap };
        self.committed.insert(page, placement);
        self.state = DragState::Committed(placement);
        DragEnd::Committed(placement)
    }

    /// Abandons a drag in progress (pointer cancelled, page switched)
    pub fn cancel(&mut self) {
        if let DragState::Dragging { page, .. } = self.state {
            self.enter_page(page);
        }
    }

    /// Live rectangle of the drag in progress, not normalized
    pub fn live_rect(&self) -> Option<(PageIndex, CanvasRect)> {
        match self.state {
            DragState::Dragging {
                page,
                anchor,
                current,
            } => Some((page, CanvasRect::spanning(anchor, current))),
            _ => None,
        }
    }

    /// Resets the state to whatever is committed on `page`
    pub fn enter_page(&mut self, page: PageIndex) {
        self.state = match self.committed.get(&page) {
            Some(p) => DragState::Committed(*p),
            None => DragState::Idle,
        };
    }

    /// Commits a placement that did not come from a drag
    pub fn insert(&mut self, placement: Placement) {
        if self.mode == PlacementMode::Single {
            self.committed.clear();
        }
        self.committed.insert(placement.page, placement);
        self.state = DragState::Committed(placement);
    }

    pub fn committed(&self, page: PageIndex) -> Option<&Placement> {
        self.committed.get(&page)
    }

    /// All committed placements, ordered by page
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.committed.values()
    }

    pub fn clear_page(&mut self, page: PageIndex) -> Option<Placement> {
        let removed = self.committed.remove(&page);
        if matches!(self.state, DragState::Committed(p) if p.page == page) {
            self.state = DragState::Idle;
        }
        removed
    }

    pub fn reset(&mut self) {
        self.committed.clear();
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BITMAP: BitmapSize = BitmapSize {
        width: 918,
        height: 1188,
    };

    fn p(x: f32, y: f32) -> CanvasPoint {
        CanvasPoint::new(x, y)
    }

    #[test]
    fn drag_commits_normalized_rect() {
        let mut mapper = PlacementMapper::default();
        assert_eq!(mapper.pointer_down(PageIndex(1), p(300.0, 150.0), true), PointerDown::Started);
        assert_eq!(
            mapper.pointer_move(p(200.0, 120.0)),
            Some(CanvasRect::new(300.0, 150.0, -100.0, -30.0))
        );

        let end = mapper.pointer_up(p(100.0, 100.0), BITMAP);
        let expected = Placement {
            page: PageIndex(1),
            rect: CanvasRect::new(100.0, 100.0, 200.0, 50.0),
            bitmap: BITMAP,
        };
        assert_eq!(end, DragEnd::Committed(expected));
        assert_eq!(mapper.state(), &DragState::Committed(expected));
        assert_eq!(mapper.committed(PageIndex(1)), Some(&expected));
    }

    #[test]
    fn pointer_down_without_signature_is_a_noop() {
        let mut mapper = PlacementMapper::default();
        assert_eq!(
            mapper.pointer_down(PageIndex(1), p(1.0, 1.0), false),
            PointerDown::SignatureMissing
        );
        assert_eq!(mapper.state(), &DragState::Idle);
        assert_eq!(mapper.pointer_move(p(5.0, 5.0)), None);
    }

    #[test]
    fn zero_area_drag_is_discarded() {
        let mut mapper = PlacementMapper::default();
        mapper.pointer_down(PageIndex(1), p(100.0, 100.0), true);
        assert_eq!(mapper.pointer_up(p(100.0, 180.0), BITMAP), DragEnd::Discarded);
        assert_eq!(mapper.state(), &DragState::Idle);
        assert_eq!(mapper.placements().count(), 0);

        mapper.pointer_down(PageIndex(1), p(100.0, 100.0), true);
        assert_eq!(mapper.pointer_up(p(140.0, 100.0), BITMAP), DragEnd::Discarded);
    }

    #[test]
    fn pointer_up_without_drag() {
        let mut mapper = PlacementMapper::default();
        assert_eq!(mapper.pointer_up(p(1.0, 1.0), BITMAP), DragEnd::NotDragging);
    }

    #[test]
    fn per_page_mode_keeps_other_pages() {
        let mut mapper = PlacementMapper::new(PlacementMode::PerPage);
        mapper.pointer_down(PageIndex(1), p(0.0, 0.0), true);
        mapper.pointer_up(p(10.0, 10.0), BITMAP);
        mapper.pointer_down(PageIndex(2), p(0.0, 0.0), true);
        mapper.pointer_up(p(20.0, 20.0), BITMAP);
        assert_eq!(mapper.placements().count(), 2);

        // redrawing on page 1 drops only page 1's old placement
        mapper.pointer_down(PageIndex(1), p(5.0, 5.0), true);
        assert_eq!(mapper.committed(PageIndex(1)), None);
        assert!(mapper.committed(PageIndex(2)).is_some());
    }

    #[test]
    fn single_mode_keeps_one_placement() {
        let mut mapper = PlacementMapper::new(PlacementMode::Single);
        mapper.pointer_down(PageIndex(1), p(0.0, 0.0), true);
        mapper.pointer_up(p(10.0, 10.0), BITMAP);
        mapper.pointer_down(PageIndex(2), p(0.0, 0.0), true);
        mapper.pointer_up(p(20.0, 20.0), BITMAP);

        let pages = mapper.placements().map(|p| p.page).collect::<Vec<_>>();
        assert_eq!(pages, vec![PageIndex(2)]);
    }

    #[test]
    fn cancel_and_page_switch_restore_committed_state() {
        let mut mapper = PlacementMapper::default();
        mapper.pointer_down(PageIndex(2), p(0.0, 0.0), true);
        let DragEnd::Committed(on_two) = mapper.pointer_up(p(30.0, 30.0), BITMAP) else {
            panic!("expected a commit");
        };

        mapper.enter_page(PageIndex(1));
        assert_eq!(mapper.state(), &DragState::Idle);

        mapper.pointer_down(PageIndex(1), p(0.0, 0.0), true);
        mapper.cancel();
        assert_eq!(mapper.state(), &DragState::Idle);

        mapper.enter_page(PageIndex(2));
        assert_eq!(mapper.state(), &DragState::Committed(on_two));
    }

    #[test]
    fn clear_page_returns_to_idle() {
        let mut mapper = PlacementMapper::default();
        mapper.pointer_down(PageIndex(1), p(0.0, 0.0), true);
        mapper.pointer_up(p(30.0, 30.0), BITMAP);
        assert!(mapper.clear_page(PageIndex(1)).is_some());
        assert_eq!(mapper.state(), &DragState::Idle);
        assert!(mapper.clear_page(PageIndex(1)).is_none());
    }
}
