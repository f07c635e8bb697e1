mod common;

use common::assert_close;
use proptest::prelude::*;
use signpdf::{
    canvas_to_document, document_to_canvas, normalize, BitmapSize, CanvasPoint, CanvasRect, DisplayTransform,
    DragEnd, PageBox, PageIndex, PlacementMapper,
};

#[test]
fn scale_three_example() {
    let bitmap = BitmapSize::new(600, 800);
    let page = PageBox::from_size(200.0, 800.0 / 3.0);

    let doc = canvas_to_document(&CanvasRect::new(300.0, 100.0, 60.0, 40.0), bitmap, &page);
    assert_close(doc.x.0, 100.0, 1e-3);
    assert_close(doc.width.0, 20.0, 1e-3);
    assert_close(doc.height.0, 13.333, 1e-3);
    assert_close(doc.y.0, 220.0, 1e-3);
}

#[test]
fn letter_at_one_and_a_half() {
    let page = PageBox::US_LETTER;
    let bitmap = BitmapSize::for_page(&page, 1.5);
    assert_eq!(bitmap, BitmapSize::new(918, 1188));

    let rect = normalize(CanvasPoint::new(100.0, 100.0), CanvasPoint::new(300.0, 150.0));
    let doc = canvas_to_document(&rect, bitmap, &page);
    assert_close(doc.x.0, 66.7, 0.1);
    assert_close(doc.width.0, 133.3, 0.1);
    assert_close(doc.height.0, 33.3, 0.1);
    assert_close(doc.y.0, 692.0, 0.1);
}

#[test]
fn css_scaled_canvas_precedes_drag_math() {
    // 918px bitmap shown 459 CSS pixels wide
    let transform = DisplayTransform::new(BitmapSize::new(918, 1188), 459.0, 594.0);
    let mut mapper = PlacementMapper::default();
    mapper.pointer_down(PageIndex::FIRST, transform.to_canvas(50.0, 50.0), true);
    let DragEnd::Committed(placement) = mapper.pointer_up(transform.to_canvas(150.0, 75.0), BitmapSize::new(918, 1188))
    else {
        panic!("expected a committed placement");
    };
    assert_eq!(placement.rect, CanvasRect::new(100.0, 100.0, 200.0, 50.0));
}

#[test]
fn degenerate_drags_are_not_committed() {
    for end in [(100.0, 100.0), (100.0, 200.0), (250.0, 100.0)] {
        let mut mapper = PlacementMapper::default();
        mapper.pointer_down(PageIndex::FIRST, CanvasPoint::new(100.0, 100.0), true);
        let result = mapper.pointer_up(CanvasPoint::new(end.0, end.1), BitmapSize::new(10, 10));
        assert_eq!(result, DragEnd::Discarded, "drag to {end:?}");
        assert_eq!(mapper.placements().count(), 0);
    }
}

fn point() -> impl Strategy<Value = CanvasPoint> {
    (-2000.0f32..2000.0, -2000.0f32..2000.0).prop_map(|(x, y)| CanvasPoint::new(x, y))
}

proptest! {
    #[test]
    fn normalize_is_symmetric_and_non_negative(a in point(), b in point()) {
        let ab = normalize(a, b);
        prop_assert_eq!(ab, normalize(b, a));
        prop_assert!(ab.width.0 >= 0.0);
        prop_assert!(ab.height.0 >= 0.0);
    }

    #[test]
    fn drag_direction_does_not_change_document_rect(a in point(), b in point()) {
        let page = PageBox::US_LETTER;
        let bitmap = BitmapSize::for_page(&page, 1.5);
        let forward = canvas_to_document(&CanvasRect::spanning(a, b), bitmap, &page);
        let backward = canvas_to_document(&CanvasRect::spanning(b, a), bitmap, &page);
        for (f, r) in [
            (forward.x, backward.x),
            (forward.y, backward.y),
            (forward.width, backward.width),
            (forward.height, backward.height),
        ] {
            prop_assert!((f.0 - r.0).abs() < 0.01, "{:?} != {:?}", forward, backward);
        }
    }

    #[test]
    fn canvas_document_round_trip(
        x in 0.0f32..900.0,
        y in 0.0f32..1100.0,
        w in 1.0f32..200.0,
        h in 1.0f32..200.0,
        llx in -100.0f32..100.0,
        lly in -100.0f32..100.0,
    ) {
        let page = PageBox::from_corners(llx, lly, llx + 612.0, lly + 792.0);
        let bitmap = BitmapSize::for_page(&page, 1.5);
        let rect = CanvasRect::new(x, y, w, h);

        let back = document_to_canvas(&canvas_to_document(&rect, bitmap, &page), bitmap, &page);
        for (a, b) in [(back.x, rect.x), (back.y, rect.y), (back.width, rect.width), (back.height, rect.height)] {
            prop_assert!((a.0 - b.0).abs() < 0.01, "{:?} != {:?}", back, rect);
        }
    }

    #[test]
    fn selection_inside_bitmap_stays_on_page(a in (0.0f32..918.0, 0.0f32..1188.0), b in (0.0f32..918.0, 0.0f32..1188.0)) {
        let page = PageBox::US_LETTER;
        let bitmap = BitmapSize::new(918, 1188);
        let doc = canvas_to_document(
            &normalize(CanvasPoint::new(a.0, a.1), CanvasPoint::new(b.0, b.1)),
            bitmap,
            &page,
        );
        prop_assert!(doc.x.0 >= -0.01 && doc.x.0 + doc.width.0 <= 612.01);
        prop_assert!(doc.y.0 >= -0.01 && doc.y.0 + doc.height.0 <= 792.01);
    }
}
