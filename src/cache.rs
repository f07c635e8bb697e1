//! Memoized page bitmaps for the document that is currently loaded.
//!
//! Entries are never evicted while a document is open; loading another
//! document calls [`PageImageCache::invalidate_all`]. All state sits behind
//! `Cell` / `RefCell` because the cache lives on the single UI thread and is
//! shared between the session and in-flight page loads.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use log::debug;

use crate::errors::{Result, SignError};
use crate::render::{PageBitmap, PageIndex, PageRenderer};

#[derive(Debug)]
pub struct PageImageCache {
    scale: f32,
    entries: RefCell<BTreeMap<PageIndex, Rc<PageBitmap>>>,
    /// Bumped on every invalidation, renders that started in an older epoch are not stored
    epoch: Cell<u64>,
}

impl PageImageCache {
    /// `scale` is fixed for the lifetime of the cache
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            entries: RefCell::new(BTreeMap::new()),
            epoch: Cell::new(0),
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Returns the bitmap for `page`, rasterizing it on the first request.
    ///
    /// A failed render is not stored, so asking again retries.
    pub async fn get<R>(&self, renderer: &R, page: PageIndex) -> Result<Rc<PageBitmap>>
    where
        R: PageRenderer + ?Sized,
    {
        let page_count = renderer.page_count();
        if !page.is_within(page_count) {
            return Err(SignError::PageOutOfRange { page, page_count });
        }

        if let Some(hit) = self.peek(page) {
            return Ok(hit);
        }

        let epoch = self.epoch.get();
        debug!("rasterizing page {page} at scale {}", self.scale);
        let bitmap = Rc::new(renderer.render_page(page, self.scale).await?);

        if self.epoch.get() != epoch {
            debug!("page {page} finished after the cache was invalidated, not storing it");
            return Ok(bitmap);
        }

        // another load of the same page may have finished first
        let mut entries = self.entries.borrow_mut();
        Ok(entries.entry(page).or_insert(bitmap).clone())
    }

    /// Cached bitmap without rendering
    pub fn peek(&self, page: PageIndex) -> Option<Rc<PageBitmap>> {
        self.entries.borrow().get(&page).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn invalidate_all(&self) {
        self.entries.borrow_mut().clear();
        self.epoch.set(self.epoch.get().wrapping_add(1));
    }
}
