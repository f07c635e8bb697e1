//! The uploaded PDF document.
//!
//! Parsing uses lopdf, the same library that later writes the signed copy.
//! Only the page boxes are kept around; the original bytes are reloaded into a
//! fresh mutable document on export so that a failed export never leaves a
//! half-modified document behind.

use std::fmt;

use lopdf::{Dictionary as LoDictionary, Document as LoDocument, Object, ObjectId};

use crate::errors::{Result, SignError};
use crate::geometry::{PageBox, PageRotation};
use crate::render::PageIndex;

/// How far up the page tree inherited attributes are searched
const MAX_INHERITANCE_DEPTH: usize = 32;

#[derive(Clone)]
pub struct DocumentHandle {
    bytes: Vec<u8>,
    pages: Vec<PageBox>,
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("bytes", &self.bytes.len())
            .field("pages", &self.pages)
            .finish()
    }
}

impl DocumentHandle {
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        let doc = load_document(&bytes)?;
        let pages = doc
            .get_pages()
            .values()
            .map(|id| page_box(&doc, *id))
            .collect::<Vec<_>>();

        if pages.is_empty() {
            return Err(SignError::InvalidDocument("document has no pages".to_string()));
        }

        Ok(Self { bytes, pages })
    }

    /// The document exactly as it was uploaded
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_box(&self, page: PageIndex) -> Result<PageBox> {
        self.pages
            .get(page.zero_based())
            .filter(|_| page.is_within(self.pages.len()))
            .copied()
            .ok_or(SignError::PageOutOfRange {
                page,
                page_count: self.pages.len(),
            })
    }
}

pub(crate) fn load_document(bytes: &[u8]) -> Result<LoDocument> {
    let doc = LoDocument::load_mem(bytes)
        .map_err(|e| SignError::InvalidDocument(format!("failed to load PDF: {e}")))?;

    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(SignError::InvalidDocument(
            "encrypted documents are not supported".to_string(),
        ));
    }

    Ok(doc)
}

/// Visible page area: the CropBox if present, the MediaBox otherwise.
/// Both are inheritable through the page tree; US Letter if neither exists.
/// The box carries the page's display rotation.
pub(crate) fn page_box(doc: &LoDocument, page_id: ObjectId) -> PageBox {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return PageBox::US_LETTER;
    };

    inherited(doc, page, b"CropBox")
        .and_then(|obj| parse_rect(doc, obj))
        .or_else(|| inherited(doc, page, b"MediaBox").and_then(|obj| parse_rect(doc, obj)))
        .filter(|b| b.width().0 > 0.0 && b.height().0 > 0.0)
        .unwrap_or(PageBox::US_LETTER)
        .with_rotation(rotation(doc, page))
}

/// Inheritable `/Rotate`, upright when missing or malformed
pub(crate) fn rotation(doc: &LoDocument, page: &LoDictionary) -> PageRotation {
    let degrees = match inherited(doc, page, b"Rotate") {
        Some(Object::Integer(i)) => Some(*i),
        Some(Object::Real(r)) => Some(*r as i64),
        Some(Object::Reference(id)) => doc.get_object(*id).ok().and_then(|o| o.as_i64().ok()),
        _ => None,
    };
    PageRotation::from_degrees(degrees.unwrap_or(0))
}

/// Looks up `key` on the page, then on its ancestors
pub(crate) fn inherited<'a>(
    doc: &'a LoDocument,
    page: &'a LoDictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn parse_rect(doc: &LoDocument, obj: &Object) -> Option<PageBox> {
    let arr = match obj {
        Object::Array(arr) => arr,
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
        _ => return None,
    };

    let values = arr
        .iter()
        .filter_map(|o| match o {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            Object::Reference(id) => match doc.get_object(*id).ok()? {
                Object::Integer(i) => Some(*i as f32),
                Object::Real(r) => Some(*r),
                _ => None,
            },
            _ => None,
        })
        .collect::<Vec<_>>();

    match values.as_slice() {
        [x1, y1, x2, y2] => Some(PageBox::from_corners(*x1, *y1, *x2, *y2)),
        _ => None,
    }
}
