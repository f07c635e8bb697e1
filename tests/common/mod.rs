#![allow(dead_code)]

use std::cell::Cell;
use std::io::Cursor;
use std::rc::Rc;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, Stream};
use signpdf::{BitmapSize, PageBitmap, PageBox, PageIndex, PageRenderer, RenderFuture, SignError};

/// PDF with one page per entry in `sizes`, every page has a little content
pub fn pdf_with_pages(sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids = sizes
        .iter()
        .map(|(w, h)| {
            let content = doc.add_object(Stream::new(Dictionary::new(), b"0 0 m 10 10 l S".to_vec()));
            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![0.into(), 0.into(), Object::Real(*w), Object::Real(*h)]),
                ),
                ("Contents", Object::Reference(content)),
            ]);
            Object::Reference(doc.add_object(page))
        })
        .collect::<Vec<_>>();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn letter_pdf() -> Vec<u8> {
    pdf_with_pages(&[(612.0, 792.0)])
}

/// Semi-transparent PNG of the given size
pub fn signature_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([20, 20, 120, 180]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// Renders blank pages of the right size, counting calls
/// The counters are shared so tests can keep a handle after the session takes the renderer.
pub struct FakeRenderer {
    pub boxes: Vec<PageBox>,
    pub calls: Rc<Cell<usize>>,
    pub failing: Rc<Cell<Option<PageIndex>>>,
}

impl FakeRenderer {
    pub fn new(sizes: &[(f32, f32)]) -> Self {
        Self {
            boxes: sizes.iter().map(|(w, h)| PageBox::from_size(*w, *h)).collect(),
            calls: Rc::new(Cell::new(0)),
            failing: Rc::new(Cell::new(None)),
        }
    }
}

impl PageRenderer for FakeRenderer {
    fn page_count(&self) -> usize {
        self.boxes.len()
    }

    fn render_page(&self, page: PageIndex, scale: f32) -> RenderFuture<'_> {
        self.calls.set(self.calls.get() + 1);
        let fail = self.failing.get() == Some(page);
        let page_box = self.boxes[page.zero_based()];
        Box::pin(async move {
            if fail {
                return Err(SignError::RenderFailure {
                    page,
                    reason: "broken content stream".to_string(),
                });
            }
            Ok(PageBitmap::blank(BitmapSize::for_page(&page_box, scale)))
        })
    }
}

/// An image drawn on a page of a signed document
#[derive(Debug)]
pub struct DrawnImage {
    /// Operands of the `cm` right before the `Do`
    pub matrix: Vec<f32>,
    pub width: i64,
    pub height: i64,
    pub has_smask: bool,
}

/// Every image XObject painted on `page` (1-based)
pub fn drawn_images(pdf: &[u8], page: u32) -> Vec<DrawnImage> {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = *doc.get_pages().get(&page).unwrap();
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();

    let page_dict = doc.get_dictionary(page_id).unwrap();
    let resources = resolve(&doc, page_dict.get(b"Resources").unwrap()).as_dict().unwrap();
    let xobjects = resolve(&doc, resources.get(b"XObject").unwrap()).as_dict().unwrap();

    let mut matrix = Vec::new();
    let mut drawn = Vec::new();
    for op in &content.operations {
        match op.operator.as_str() {
            "cm" => matrix = op.operands.iter().map(|o| o.as_float().unwrap()).collect(),
            "Do" => {
                let name = op.operands[0].as_name().unwrap();
                let id = xobjects.get(name).unwrap().as_reference().unwrap();
                let image = doc.get_object(id).unwrap().as_stream().unwrap();
                drawn.push(DrawnImage {
                    matrix: matrix.clone(),
                    width: image.dict.get(b"Width").unwrap().as_i64().unwrap(),
                    height: image.dict.get(b"Height").unwrap().as_i64().unwrap(),
                    has_smask: image.dict.has(b"SMask"),
                });
            }
            _ => {}
        }
    }
    drawn
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap(),
        other => other,
    }
}

pub fn assert_close(actual: f32, expected: f32, tolerance: f32) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
