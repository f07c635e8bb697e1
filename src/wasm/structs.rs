//! Datastructures for the JSON stamping API. Usable on every target, the
//! wasm-bindgen wrappers in `api` only add the JS string boundary.

use base64::Engine;
use serde_derive::{Deserialize, Serialize};

use crate::document::DocumentHandle;
use crate::editor::{stamp_signature, PdfEditor, SaveOptions};
use crate::errors::{SignError, Result as SignResult};
use crate::geometry::{canvas_to_document, BitmapSize, CanvasRect, DocumentRect};
use crate::render::PageIndex;
use crate::signature::SignatureAsset;

/// Bytes coming from JS: either a base64 string (a `data:...;base64,` URL is
/// fine too) or a plain byte array. Untagged, so both forms deserialize.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(untagged)]
pub enum Base64OrRaw {
    B64(String),
    Raw(Vec<u8>),
}

impl Default for Base64OrRaw {
    fn default() -> Self {
        Base64OrRaw::Raw(Vec::new())
    }
}

impl Base64OrRaw {
    pub fn decode_bytes(&self) -> Result<Vec<u8>, String> {
        match self {
            Base64OrRaw::B64(s) => base64::prelude::BASE64_STANDARD
                .decode(strip_data_url(s))
                .map_err(|e| e.to_string()),
            Base64OrRaw::Raw(r) => Ok(r.clone()),
        }
    }
}

fn strip_data_url(input: &str) -> &str {
    match input.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((meta, payload)) if meta.contains("base64") => payload,
        _ => input,
    }
}

/// Coordinate space of [`StampPlacement`] rectangles
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
#[serde(tag = "space", rename_all = "kebab-case")]
pub enum PlacementSpace {
    /// PDF user space, origin bottom left, `(x, y)` is the lower left corner
    #[default]
    Document,
    /// Pixels of the page rendered at `scale` pixels per point, origin top
    /// left, `(x, y)` is the drag anchor and extents may be negative
    Canvas { scale: f32 },
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StampPlacement {
    pub page: PageIndex,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StampInput {
    /// Required: the PDF to sign
    pub pdf: Base64OrRaw,
    /// Required: PNG signature image
    pub signature: Base64OrRaw,
    /// Required: where to draw the signature, at least one entry
    pub placements: Vec<StampPlacement>,
    /// Optional: coordinate space of `placements`, default: document
    #[serde(default)]
    pub coordinates: PlacementSpace,
    /// Optional: save options, default: compressed
    #[serde(default)]
    pub options: SaveOptions,
    /// Optional: return the raw bytes instead of a base64 string. Default: false
    #[serde(default)]
    pub return_byte_array: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StampOutput {
    /// Signed PDF, base64 or raw depending on `return_byte_array`
    pub bytes: Base64OrRaw,
    /// Where the signature ended up, in document units
    pub placements: Vec<StampedPlacement>,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StampedPlacement {
    pub page: PageIndex,
    pub rect: DocumentRect,
}

/// Maps every placement into document space and checks it against the document
pub fn resolve_placements(
    doc: &DocumentHandle,
    placements: &[StampPlacement],
    space: PlacementSpace,
) -> SignResult<Vec<(PageIndex, DocumentRect)>> {
    if let PlacementSpace::Canvas { scale } = space {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(SignError::InvalidOptions(format!(
                "canvas scale must be a positive number, got {scale}"
            )));
        }
    }

    placements
        .iter()
        .map(|p| {
            let page_box = doc.page_box(p.page)?;
            let rect = match space {
                PlacementSpace::Document => DocumentRect::new(p.x, p.y, p.width, p.height),
                PlacementSpace::Canvas { scale } => {
                    let rect = CanvasRect::new(p.x, p.y, p.width, p.height);
                    if rect.is_degenerate() {
                        return Err(SignError::DegenerateSelection);
                    }
                    canvas_to_document(&rect, BitmapSize::for_page(&page_box, scale), &page_box)
                }
            };
            if rect.is_degenerate() {
                return Err(SignError::DegenerateSelection);
            }
            Ok((p.page, rect))
        })
        .collect()
}

pub fn stamp_document(input: StampInput) -> Result<StampOutput, String> {
    let pdf = input
        .pdf
        .decode_bytes()
        .map_err(|e| format!("failed to decode PDF bytes: {e}"))?;
    let signature = input
        .signature
        .decode_bytes()
        .map_err(|e| format!("failed to decode signature bytes: {e}"))?;

    let stamped = stamp_inner(pdf, &signature, &input.placements, input.coordinates, &input.options)
        .map_err(|e| e.to_string())?;

    Ok(StampOutput {
        bytes: if input.return_byte_array {
            Base64OrRaw::Raw(stamped.0)
        } else {
            Base64OrRaw::B64(base64::prelude::BASE64_STANDARD.encode(&stamped.0))
        },
        placements: stamped.1,
    })
}

pub async fn stamp_document_async(input: StampInput) -> Result<StampOutput, String> {
    stamp_document(input)
}

fn stamp_inner(
    pdf: Vec<u8>,
    signature: &[u8],
    placements: &[StampPlacement],
    space: PlacementSpace,
    options: &SaveOptions,
) -> SignResult<(Vec<u8>, Vec<StampedPlacement>)> {
    let signature = SignatureAsset::from_bytes(signature)?;
    let doc = DocumentHandle::parse(pdf)?;
    let resolved = resolve_placements(&doc, placements, space)?;
    let bytes = stamp_signature::<PdfEditor>(doc.bytes(), &signature, &resolved, options)?;

    let placements = resolved
        .into_iter()
        .map(|(page, rect)| StampedPlacement { page, rect })
        .collect();
    Ok((bytes, placements))
}
