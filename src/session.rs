//! Everything one user works on between page reloads.
//!
//! A [`Session`] owns the uploaded document and signature, the page cache and
//! the placement state. The UI controller owns the session and forwards
//! pointer events to it; nothing here is global.
//!
//! Page loads are split in three steps so that the UI can release its borrow of
//! the session while a page is rasterizing:
//!
//! ```rust,ignore
//! let load = session.borrow_mut().begin_page_load(page)?;
//! let loaded = load.run().await;
//! session.borrow_mut().finish_page_load(loaded)?;
//! ```
//!
//! Every `begin_page_load` (and every new document) hands out a new ticket.
//! A load that finishes with an older ticket is reported as
//! [`PageShown::Stale`] and does not change what is displayed.

use std::rc::Rc;

use log::{debug, info, warn};
use serde_derive::{Deserialize, Serialize};

use crate::cache::PageImageCache;
use crate::document::DocumentHandle;
use crate::editor::{stamp_signature, DocumentEditor, PdfEditor, SaveOptions};
use crate::errors::{MissingInput, Result, SignError};
use crate::geometry::{document_to_canvas, BitmapSize, CanvasPoint, CanvasRect, DocumentRect};
use crate::placement::{DragEnd, Placement, PlacementMapper, PlacementMode, PointerDown};
use crate::render::{PageBitmap, PageIndex, PageRenderer};
use crate::signature::SignatureAsset;
use crate::surface::{compose_frame, Surface};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionOptions {
    /// Canvas pixels per document unit used to rasterize pages
    pub render_scale: f32,
    /// Name offered for the downloaded file
    pub output_file_name: String,
    pub placement_mode: PlacementMode,
    pub save: SaveOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            render_scale: 1.5,
            output_file_name: "signed-document.pdf".to_string(),
            placement_mode: PlacementMode::default(),
            save: SaveOptions::default(),
        }
    }
}

impl SessionOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.render_scale.is_finite() && self.render_scale > 0.0) {
            return Err(SignError::InvalidOptions(format!(
                "render scale must be a positive number, got {}",
                self.render_scale
            )));
        }
        if self.output_file_name.trim().is_empty() {
            return Err(SignError::InvalidOptions("output file name is empty".to_string()));
        }
        Ok(())
    }
}

/// The result of an export, ready to be offered as a download
#[derive(Debug, Clone, PartialEq)]
pub struct SignedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PageShown {
    Shown(PageIndex),
    /// Another page (or document) was requested while this one was loading
    Stale(PageIndex),
}

/// A page rasterization that has been scheduled but not awaited
pub struct PageLoad<R> {
    cache: Rc<PageImageCache>,
    renderer: Rc<R>,
    page: PageIndex,
    ticket: u64,
}

impl<R: PageRenderer> PageLoad<R> {
    pub fn page(&self) -> PageIndex {
        self.page
    }

    pub async fn run(self) -> LoadedPage {
        let result = self.cache.get(&*self.renderer, self.page).await;
        LoadedPage {
            page: self.page,
            ticket: self.ticket,
            result,
        }
    }
}

/// Outcome of [`PageLoad::run`], to be handed back to [`Session::finish_page_load`]
#[derive(Debug)]
pub struct LoadedPage {
    page: PageIndex,
    ticket: u64,
    result: Result<Rc<PageBitmap>>,
}

struct OpenDocument<R> {
    handle: DocumentHandle,
    renderer: Rc<R>,
}

pub struct Session<R> {
    options: SessionOptions,
    document: Option<OpenDocument<R>>,
    signature: Option<SignatureAsset>,
    cache: Rc<PageImageCache>,
    current: PageIndex,
    /// Bitmap on screen and the page it belongs to
    displayed: Option<(PageIndex, Rc<PageBitmap>)>,
    mapper: PlacementMapper,
    ticket: u64,
}

impl<R: PageRenderer> Session<R> {
    pub fn new(options: SessionOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            cache: Rc::new(PageImageCache::new(options.render_scale)),
            mapper: PlacementMapper::new(options.placement_mode),
            options,
            document: None,
            signature: None,
            current: PageIndex::FIRST,
            displayed: None,
            ticket: 0,
        })
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Replaces the current document. On error the previous document stays open.
    ///
    /// `renderer` must rasterize the same bytes; all cached pages and
    /// placements of the previous document are dropped.
    pub fn load_document(&mut self, bytes: Vec<u8>, renderer: R) -> Result<()> {
        let handle = DocumentHandle::parse(bytes)?;
        if renderer.page_count() != handle.page_count() {
            warn!(
                "renderer reports {} pages, document has {}",
                renderer.page_count(),
                handle.page_count()
            );
        }

        info!("loaded document with {} page(s)", handle.page_count());
        self.cache.invalidate_all();
        self.mapper.reset();
        self.current = PageIndex::FIRST;
        self.displayed = None;
        self.ticket += 1;
        self.document = Some(OpenDocument {
            handle,
            renderer: Rc::new(renderer),
        });
        Ok(())
    }

    /// Replaces the signature. On error the previous signature is kept.
    pub fn set_signature(&mut self, bytes: &[u8]) -> Result<()> {
        let signature = SignatureAsset::from_bytes(bytes)?;
        info!("signature image {}x{}", signature.width(), signature.height());
        self.signature = Some(signature);
        Ok(())
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref().map(|d| &d.handle)
    }

    pub fn signature(&self) -> Option<&SignatureAsset> {
        self.signature.as_ref()
    }

    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.handle.page_count())
    }

    pub fn current_page(&self) -> PageIndex {
        self.current
    }

    /// The page bitmap on screen, if it belongs to the current page
    pub fn displayed_bitmap(&self) -> Option<&Rc<PageBitmap>> {
        self.displayed
            .as_ref()
            .filter(|(page, _)| *page == self.current)
            .map(|(_, bitmap)| bitmap)
    }

    pub fn mapper(&self) -> &PlacementMapper {
        &self.mapper
    }

    /// Makes `page` the current page and schedules its rasterization
    pub fn begin_page_load(&mut self, page: PageIndex) -> Result<PageLoad<R>> {
        let doc = self.document.as_ref().ok_or(MissingInput::Document)?;
        let page_count = doc.handle.page_count();
        if !page.is_within(page_count) {
            return Err(SignError::PageOutOfRange { page, page_count });
        }

        self.mapper.cancel();
        self.mapper.enter_page(page);
        self.current = page;
        self.ticket += 1;

        Ok(PageLoad {
            cache: Rc::clone(&self.cache),
            renderer: Rc::clone(&doc.renderer),
            page,
            ticket: self.ticket,
        })
    }

    pub fn finish_page_load(&mut self, loaded: LoadedPage) -> Result<PageShown> {
        if loaded.ticket != self.ticket {
            debug!("page {} finished loading after another page was requested", loaded.page);
            return Ok(PageShown::Stale(loaded.page));
        }

        let bitmap = match loaded.result {
            Ok(bitmap) => bitmap,
            Err(e) => {
                self.return_to_displayed_page();
                return Err(e);
            }
        };
        self.displayed = Some((loaded.page, bitmap));
        Ok(PageShown::Shown(loaded.page))
    }

    /// After a failed load the page still on screen becomes current again
    fn return_to_displayed_page(&mut self) {
        let Some(shown) = self.displayed.as_ref().map(|(page, _)| *page) else {
            return;
        };
        if shown != self.current {
            debug!("page {} failed to load, staying on page {shown}", self.current);
            self.current = shown;
            self.mapper.enter_page(shown);
        }
    }

    /// Loads and displays `page` in one go
    pub async fn show_page(&mut self, page: PageIndex) -> Result<PageShown> {
        let load = self.begin_page_load(page)?;
        let loaded = load.run().await;
        self.finish_page_load(loaded)
    }

    /// Page after the current one, if there is one
    pub fn next_page(&self) -> Option<PageIndex> {
        let next = self.current.next();
        next.is_within(self.page_count()).then_some(next)
    }

    /// Page before the current one, if there is one
    pub fn previous_page(&self) -> Option<PageIndex> {
        self.current
            .previous()
            .filter(|p| p.is_within(self.page_count()))
    }

    /// Starts a drag on the displayed page.
    ///
    /// Does nothing while no page is displayed. Without a signature nothing is
    /// started and `MissingInput::Signature` is returned for the UI to show.
    pub fn pointer_down(&mut self, at: CanvasPoint) -> Result<()> {
        let Some(bitmap) = self.displayed_bitmap().map(|b| b.size()) else {
            return Ok(());
        };
        match self
            .mapper
            .pointer_down(self.current, at.clamped_to(bitmap), self.signature.is_some())
        {
            PointerDown::Started => Ok(()),
            PointerDown::SignatureMissing => Err(MissingInput::Signature.into()),
        }
    }

    /// Live rectangle to preview, `None` when not dragging.
    ///
    /// Pointer positions outside the page bitmap are pulled back onto its edge.
    pub fn pointer_move(&mut self, at: CanvasPoint) -> Option<CanvasRect> {
        let bitmap = self.displayed_bitmap()?.size();
        self.mapper.pointer_move(at.clamped_to(bitmap))
    }

    pub fn pointer_up(&mut self, at: CanvasPoint) -> DragEnd {
        let Some(bitmap) = self.displayed_bitmap().map(|b| b.size()) else {
            self.mapper.cancel();
            return DragEnd::NotDragging;
        };
        let end = self.mapper.pointer_up(at.clamped_to(bitmap), bitmap);
        if let DragEnd::Committed(p) = &end {
            debug!(
                "placement on page {} at canvas ({}, {}) {}x{}",
                p.page, p.rect.x.0, p.rect.y.0, p.rect.width.0, p.rect.height.0
            );
        }
        end
    }

    pub fn pointer_cancel(&mut self) {
        self.mapper.cancel();
    }

    /// Commits a placement given in document units, as if it had been dragged
    pub fn place_at(&mut self, page: PageIndex, rect: DocumentRect) -> Result<Placement> {
        let doc = self.document.as_ref().ok_or(MissingInput::Document)?;
        if rect.is_degenerate() {
            return Err(SignError::DegenerateSelection);
        }

        let page_box = doc.handle.page_box(page)?;
        let bitmap = match self.cache.peek(page) {
            Some(bitmap) => bitmap.size(),
            None => BitmapSize::for_page(&page_box, self.cache.scale()),
        };

        let placement = Placement {
            page,
            rect: document_to_canvas(&rect, bitmap, &page_box).normalized(),
            bitmap,
        };

        self.mapper.cancel();
        self.mapper.insert(placement);
        self.mapper.enter_page(self.current);
        Ok(placement)
    }

    pub fn clear_placement(&mut self, page: PageIndex) -> Option<Placement> {
        self.mapper.clear_page(page)
    }

    /// Committed placements in document units, ordered by page
    pub fn placements(&self) -> Result<Vec<(PageIndex, DocumentRect)>> {
        let doc = self.document.as_ref().ok_or(MissingInput::Document)?;
        self.mapper
            .placements()
            .map(|p| Ok((p.page, p.to_document(&doc.handle.page_box(p.page)?))))
            .collect()
    }

    /// Repaints the current page. Returns `false` while it is still loading.
    pub fn redraw<S: Surface + ?Sized>(&self, surface: &mut S) -> bool {
        let Some(bitmap) = self.displayed_bitmap() else {
            return false;
        };

        let live = self
            .mapper
            .live_rect()
            .filter(|(page, _)| *page == self.current)
            .map(|(_, rect)| rect);

        compose_frame(
            surface,
            bitmap,
            self.signature.as_ref(),
            self.mapper.committed(self.current),
            live,
        );
        true
    }

    /// Writes the signed document with lopdf
    pub fn export(&self) -> Result<SignedDocument> {
        self.export_with::<PdfEditor>()
    }

    /// Writes the signed document with `E`. Missing inputs are reported before
    /// `E` is touched.
    pub fn export_with<E: DocumentEditor>(&self) -> Result<SignedDocument> {
        let doc = self.document.as_ref().ok_or(MissingInput::Document)?;
        let signature = self.signature.as_ref().ok_or(MissingInput::Signature)?;
        let placements = self.placements()?;
        if placements.is_empty() {
            return Err(MissingInput::Placement.into());
        }

        let bytes = stamp_signature::<E>(doc.handle.bytes(), signature, &placements, &self.options.save)?;
        Ok(SignedDocument {
            file_name: self.options.output_file_name.clone(),
            bytes,
        })
    }
}
