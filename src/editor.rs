//! Writing the signature into the PDF.
//!
//! [`DocumentEditor`] is the seam between the session and the library that
//! mutates and serializes PDF files; [`PdfEditor`] implements it with lopdf.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use lopdf::content::{Content, Operation};
use lopdf::Dictionary as LoDictionary;
use lopdf::Document as LoDocument;
use lopdf::Object;
use lopdf::Stream as LoStream;
use lopdf::{ObjectId, StringFormat};
use serde_derive::{Deserialize, Serialize};

use crate::document::{inherited, load_document, rotation};
use crate::errors::{MissingInput, Result, SignError};
use crate::geometry::DocumentRect;
use crate::render::PageIndex;
use crate::signature::SignatureAsset;

const PRODUCER: &str = concat!("signpdf ", env!("CARGO_PKG_VERSION"));

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveOptions {
    /// Flate-compress all streams when saving
    pub compress: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { compress: true }
    }
}

/// Loads a document, embeds an image, draws it and writes the result.
pub trait DocumentEditor: Sized {
    /// Handle of an image embedded in the document
    type Image;

    fn load(bytes: &[u8]) -> Result<Self>;

    fn embed_signature(&mut self, signature: &SignatureAsset) -> Result<Self::Image>;

    /// `rect` is in PDF user space, anchored at its lower left corner.
    /// The image is drawn upright as the page is displayed, honoring `/Rotate`.
    fn draw_image(&mut self, page: PageIndex, image: &Self::Image, rect: DocumentRect) -> Result<()>;

    fn serialize(self, options: &SaveOptions) -> Result<Vec<u8>>;
}

/// Embeds `signature` once and draws it at every `(page, rect)`.
pub fn stamp_signature<E: DocumentEditor>(
    bytes: &[u8],
    signature: &SignatureAsset,
    placements: &[(PageIndex, DocumentRect)],
    options: &SaveOptions,
) -> Result<Vec<u8>> {
    if placements.is_empty() {
        return Err(MissingInput::Placement.into());
    }
    if placements.iter().any(|(_, rect)| rect.is_degenerate()) {
        return Err(SignError::DegenerateSelection);
    }

    let mut editor = E::load(bytes)?;
    let image = editor.embed_signature(signature)?;
    for (page, rect) in placements {
        debug!(
            "drawing signature on page {page} at x={} y={} w={} h={}",
            rect.x.0, rect.y.0, rect.width.0, rect.height.0
        );
        editor.draw_image(*page, &image, *rect)?;
    }

    let out = editor.serialize(options)?;
    info!("signed {} page(s), {} bytes written", placements.len(), out.len());
    Ok(out)
}

/// lopdf implementation of [`DocumentEditor`]
pub struct PdfEditor {
    doc: LoDocument,
    pages: BTreeMap<u32, ObjectId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    id: ObjectId,
}

impl DocumentEditor for PdfEditor {
    type Image = EmbeddedImage;

    fn load(bytes: &[u8]) -> Result<Self> {
        let doc = load_document(bytes)?;
        let pages = doc.get_pages();
        Ok(Self { doc, pages })
    }

    fn embed_signature(&mut self, signature: &SignatureAsset) -> Result<EmbeddedImage> {
        let stream = image_to_stream(signature, &mut self.doc);
        let id = self.doc.add_object(stream);
        Ok(EmbeddedImage { id })
    }

    fn draw_image(&mut self, page: PageIndex, image: &EmbeddedImage, rect: DocumentRect) -> Result<()> {
        let page_id = *self
            .pages
            .get(&page.get())
            .ok_or(SignError::PageOutOfRange {
                page,
                page_count: self.pages.len(),
            })?;

        let rotation = self
            .doc
            .get_dictionary(page_id)
            .map(|page| rotation(&self.doc, page))
            .unwrap_or_default();
        let name = self.add_xobject_to_page(page_id, image.id)?;

        let content = Content {
            operations: vec![
                Operation::new("Q", vec![]),
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    rotation.image_matrix(&rect).into_iter().map(Object::from).collect(),
                ),
                Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        };
        // streams are concatenated as-is, the leading newline keeps the
        // last operator of the existing content separate from ours
        let mut encoded = b"\n".to_vec();
        encoded.extend(
            content
                .encode()
                .map_err(|e| SignError::SerializationFailure(format!("failed to encode page content: {e}")))?,
        );

        self.wrap_page_content(page_id, encoded)
    }

    fn serialize(mut self, options: &SaveOptions) -> Result<Vec<u8>> {
        self.set_producer();

        if options.compress {
            self.doc.compress();
        }

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| SignError::SerializationFailure(e.to_string()))?;
        Ok(bytes)
    }
}

impl PdfEditor {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Gives the page its own `/Resources` (copied from whatever it inherits)
    /// and registers the image under a name no other XObject on the page uses.
    fn add_xobject_to_page(&mut self, page_id: ObjectId, image_id: ObjectId) -> Result<String> {
        let page = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| SignError::InvalidDocument(format!("page object is not a dictionary: {e}")))?;

        let mut resources = match inherited(&self.doc, page, b"Resources") {
            Some(Object::Dictionary(d)) => d.clone(),
            Some(Object::Reference(id)) => self.doc.get_dictionary(*id).cloned().unwrap_or_default(),
            _ => LoDictionary::new(),
        };

        let mut xobjects = match resources.get(b"XObject") {
            Ok(Object::Dictionary(d)) => d.clone(),
            Ok(Object::Reference(id)) => self.doc.get_dictionary(*id).cloned().unwrap_or_default(),
            _ => LoDictionary::new(),
        };

        let mut n = 0;
        let name = loop {
            let candidate = format!("SigIm{n}");
            if !xobjects.has(candidate.as_bytes()) {
                break candidate;
            }
            n += 1;
        };

        xobjects.set(name.clone(), Object::Reference(image_id));
        resources.set("XObject", Object::Dictionary(xobjects));

        self.doc
            .get_dictionary_mut(page_id)
            .map_err(|e| SignError::InvalidDocument(format!("page object is not a dictionary: {e}")))?
            .set("Resources", Object::Dictionary(resources));

        Ok(name)
    }

    /// Contents become `[q, <existing...>, <appended>]`, `appended` starts with
    /// the matching `Q` so the existing content cannot leave a transform behind.
    fn wrap_page_content(&mut self, page_id: ObjectId, appended: Vec<u8>) -> Result<()> {
        let existing = self
            .doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|page| page.get(b"Contents").ok())
            .cloned();

        let mut contents = match existing {
            Some(Object::Reference(id)) => match self.doc.get_object(id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(id)],
            },
            Some(Object::Array(arr)) => arr,
            Some(_) => {
                warn!("page contents are neither a stream nor an array, replacing them");
                Vec::new()
            }
            None => Vec::new(),
        };

        let open = self.doc.add_object(LoStream::new(LoDictionary::new(), b"q\n".to_vec()));
        let close = self.doc.add_object(LoStream::new(LoDictionary::new(), appended));
        contents.insert(0, Object::Reference(open));
        contents.push(Object::Reference(close));

        self.doc
            .get_dictionary_mut(page_id)
            .map_err(|e| SignError::InvalidDocument(format!("page object is not a dictionary: {e}")))?
            .set("Contents", Object::Array(contents));

        Ok(())
    }

    fn set_producer(&mut self) {
        let producer = Object::String(PRODUCER.as_bytes().to_vec(), StringFormat::Literal);
        match self.doc.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => {
                let id = *id;
                if let Ok(info) = self.doc.get_dictionary_mut(id) {
                    info.set("Producer", producer);
                }
            }
            Ok(Object::Dictionary(_)) => {
                if let Ok(Object::Dictionary(info)) = self.doc.trailer.get_mut(b"Info") {
                    info.set("Producer", producer);
                }
            }
            _ => {
                let info_id = self
                    .doc
                    .add_object(LoDictionary::from_iter(vec![("Producer", producer)]));
                self.doc.trailer.set("Info", Object::Reference(info_id));
            }
        }
    }
}

/// RGB image XObject, with the alpha channel split off into a `/SMask`
fn image_to_stream(signature: &SignatureAsset, doc: &mut LoDocument) -> LoStream {
    let (rgb, alpha) = signature.rgb_and_alpha();
    let width = Object::Integer(signature.width() as i64);
    let height = Object::Integer(signature.height() as i64);

    let mut dict = LoDictionary::from_iter(vec![
        ("Type", Object::Name("XObject".into())),
        ("Subtype", Object::Name("Image".into())),
        ("Width", width.clone()),
        ("Height", height.clone()),
        ("BitsPerComponent", Object::Integer(8)),
        ("ColorSpace", Object::Name("DeviceRGB".into())),
        ("Interpolate", Object::Boolean(true)),
    ]);

    if let Some(alpha) = alpha {
        let smask_dict = LoDictionary::from_iter(vec![
            ("Type", Object::Name("XObject".into())),
            ("Subtype", Object::Name("Image".into())),
            ("Width", width),
            ("Height", height),
            ("Interpolate", Object::Boolean(true)),
            ("BitsPerComponent", Object::Integer(8)),
            ("ColorSpace", Object::Name("DeviceGray".into())),
        ]);

        let mut stream = LoStream::new(smask_dict, alpha).with_compression(true);
        if let Err(e) = stream.compress() {
            warn!("failed to compress signature alpha channel: {e}");
        }

        dict.set("SMask", Object::Reference(doc.add_object(stream)));
    }

    let mut stream = LoStream::new(dict, rgb).with_compression(true);
    if let Err(e) = stream.compress() {
        warn!("failed to compress signature image: {e}");
    }

    stream
}
