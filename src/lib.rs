//! # signpdf
//!
//! signpdf places a signature image on a page of an existing PDF document.
//! The user drags a rectangle over a rendered preview of the page; the
//! rectangle is converted from canvas pixels into PDF user space and the
//! signature is embedded there as an image XObject.
//!
//! # Getting started
//!
//! ## Interactive use
//!
//! A [`Session`] owns the uploaded document, the signature and the placement
//! state. Page rasterization is delegated to a [`PageRenderer`] (pdf.js in the
//! browser, see [`wasm::api::SignerApp`] on wasm32), painting to a [`Surface`].
//!
//! ```rust,ignore
//! use signpdf::*;
//!
//! let mut session = Session::new(SessionOptions::default())?;
//! session.load_document(pdf_bytes, renderer)?;
//! session.set_signature(&png_bytes)?;
//! session.show_page(PageIndex::FIRST).await?;
//!
//! // canvas pixels of the page bitmap, origin top left
//! session.pointer_down(CanvasPoint::new(100.0, 100.0))?;
//! session.pointer_move(CanvasPoint::new(300.0, 150.0));
//! session.pointer_up(CanvasPoint::new(300.0, 150.0));
//!
//! let signed = session.export()?;
//! std::fs::write(&signed.file_name, &signed.bytes)?;
//! ```
//!
//! ## Stamping without a UI
//!
//! When the position is already known in PDF units:
//!
//! ```rust,ignore
//! use signpdf::*;
//!
//! let signature = SignatureAsset::from_bytes(&png_bytes)?;
//! let placements = [(PageIndex(1), DocumentRect::new(66.7, 692.0, 133.3, 33.3))];
//! let signed = stamp_signature::<PdfEditor>(&pdf_bytes, &signature, &placements, &SaveOptions::default())?;
//! ```
//!
//! The same operation is available as JSON through
//! [`wasm::structs::stamp_document`] and as the `signpdf` command line tool.
//!
//! # Limitations
//!
//! Encrypted documents are rejected.
//!
//! Pages with a `/Rotate` entry are supported: canvas coordinates are taken
//! relative to the page as displayed, and the signature is drawn upright in
//! that orientation.

pub mod cache;
pub mod document;
pub mod editor;
pub mod errors;
pub mod geometry;
pub mod logging;
pub mod placement;
pub mod render;
pub mod session;
pub mod signature;
pub mod surface;
pub mod units;
/// WASM / JS API
pub mod wasm;

pub use crate::cache::PageImageCache;
pub use crate::document::DocumentHandle;
pub use crate::editor::{stamp_signature, DocumentEditor, EmbeddedImage, PdfEditor, SaveOptions};
pub use crate::errors::{MissingInput, Result, SignError};
pub use crate::geometry::{
    canvas_to_document, document_to_canvas, normalize, BitmapSize, CanvasPoint, CanvasRect, DisplayTransform,
    DocumentRect, PageBox, PageRotation,
};
pub use crate::placement::{DragEnd, DragState, Placement, PlacementMapper, PlacementMode, PointerDown};
pub use crate::render::{PageBitmap, PageIndex, PageRenderer, RenderFuture};
pub use crate::session::{LoadedPage, PageLoad, PageShown, Session, SessionOptions, SignedDocument};
pub use crate::signature::SignatureAsset;
pub use crate::surface::{compose_frame, Surface};
pub use crate::units::{Pt, Px};
