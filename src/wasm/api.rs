#![allow(non_snake_case)]

//! Entrypoint for the WASM API: the JSON stamping functions and the
//! interactive [`SignerApp`] canvas controller. The JSON datastructures live in
//! `mod structs` so they can be used without JS.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::{future::Future, pin::Pin};

use log::{debug, warn};
use serde_derive::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{
    Blob, BlobPropertyBag, CanvasRenderingContext2d, HtmlAnchorElement, HtmlCanvasElement, ImageData,
    PointerEvent, Url,
};

use crate::errors::SignError;
use crate::geometry::{BitmapSize, CanvasPoint, CanvasRect, DisplayTransform};
use crate::placement::DragEnd;
use crate::render::{PageBitmap, PageIndex, PageRenderer, RenderFuture};
use crate::session::{PageShown, Session, SessionOptions};
use crate::signature::SignatureAsset;
use crate::surface::Surface;

/// Generalized API return for WASM / JS
#[derive(Serialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub struct PdfApiReturn<T: serde::Serialize> {
    /// If "status" is 0, then data contains the processed data
    /// If non-zero, data is the error string.
    pub status: usize,
    /// Data or error of the function called
    pub data: StatusOrData<T>,
}

/// Data or error of the output of the function.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(untagged)]
pub enum StatusOrData<T: serde::Serialize> {
    Ok(T),
    Error(String),
}

/// Draws the signature onto the given pages and returns the signed PDF.
///
/// ```js,no_run,ignore
/// let input = JSON.stringify({
///     pdf: pdfBase64,
///     signature: pngBase64,
///     placements: [{ page: 1, x: 66.7, y: 692, width: 133.3, height: 33.3 }],
/// });
/// let result = JSON.parse(Pdf_StampSignatureSync(input));
/// // { status: 0, data: { bytes: "JVBERi0...", placements: [...] } }
/// ```
#[cfg_attr(target_family = "wasm", wasm_bindgen::prelude::wasm_bindgen)]
pub fn Pdf_StampSignatureSync(input: String) -> String {
    api_inner(&input, crate::wasm::structs::stamp_document)
}

#[cfg_attr(target_family = "wasm", wasm_bindgen::prelude::wasm_bindgen)]
pub async fn Pdf_StampSignature(input: String) -> String {
    api_inner_async(&input, |x| {
        Box::pin(crate::wasm::structs::stamp_document_async(x))
    })
    .await
}

/// Routes `log` output to the browser console
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(verbose: bool) {
    console_error_panic_hook::set_once();
    crate::logging::init(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });
}

fn api_inner<'a, T, Q>(input: &'a str, f: fn(Q) -> Result<T, String>) -> String
where
    T: serde::Serialize,
    Q: serde::Deserialize<'a>,
{
    serde_json::to_string(&match serde_json::from_str::<Q>(input) {
        Ok(input) => match (f)(input) {
            Ok(o) => PdfApiReturn {
                status: 0,
                data: StatusOrData::Ok(o),
            },
            Err(e) => PdfApiReturn {
                status: 2,
                data: StatusOrData::Error(e),
            },
        },
        Err(e) => PdfApiReturn {
            status: 1,
            data: StatusOrData::Error(format!("failed to deserialize input: {e}")),
        },
    })
    .unwrap_or_default()
}

async fn api_inner_async<T, Q>(
    input: &str,
    f: fn(Q) -> Pin<Box<dyn Future<Output = Result<T, String>>>>,
) -> String
where
    T: serde::Serialize,
    Q: for<'de> serde::Deserialize<'de>,
{
    let ret = match serde_json::from_str::<Q>(input) {
        Ok(input_obj) => match f(input_obj).await {
            Ok(data) => PdfApiReturn {
                status: 0,
                data: StatusOrData::Ok(data),
            },
            Err(e) => PdfApiReturn {
                status: 2,
                data: StatusOrData::Error(e),
            },
        },
        Err(e) => PdfApiReturn {
            status: 1,
            data: StatusOrData::Error(format!("failed to deserialize input: {e}")),
        },
    };
    serde_json::to_string(&ret).unwrap_or_default()
}

#[wasm_bindgen(module = "/js/pdfjs_bridge.js")]
extern "C" {
    #[wasm_bindgen(catch, js_name = openDocument)]
    async fn pdfjs_open_document(bytes: &[u8]) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = pageCount)]
    fn pdfjs_page_count(doc: &JsValue) -> u32;

    #[wasm_bindgen(catch, js_name = renderPage)]
    async fn pdfjs_render_page(doc: &JsValue, page: u32, scale: f32) -> Result<JsValue, JsValue>;
}

fn js_error_message(e: &JsValue) -> String {
    e.dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| e.as_string())
        .unwrap_or_else(|| format!("{e:?}"))
}

/// Rasterizes pages with pdf.js
pub struct PdfJsRenderer {
    doc: JsValue,
    pages: usize,
}

impl PdfJsRenderer {
    pub async fn open(bytes: &[u8]) -> Result<Self, SignError> {
        let doc = pdfjs_open_document(bytes)
            .await
            .map_err(|e| SignError::InvalidDocument(js_error_message(&e)))?;
        let pages = pdfjs_page_count(&doc) as usize;
        Ok(Self { doc, pages })
    }
}

impl PageRenderer for PdfJsRenderer {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn render_page(&self, page: PageIndex, scale: f32) -> RenderFuture<'_> {
        Box::pin(async move {
            let failure = |reason: String| SignError::RenderFailure { page, reason };
            let value = pdfjs_render_page(&self.doc, page.get(), scale)
                .await
                .map_err(|e| failure(js_error_message(&e)))?;
            let data = value
                .dyn_into::<ImageData>()
                .map_err(|_| failure("renderer did not return ImageData".to_string()))?;
            PageBitmap::from_rgba(data.width(), data.height(), data.data().0).map_err(failure)
        })
    }
}

/// [`Surface`] backed by a `<canvas>` 2d context
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    /// Offscreen canvas holding the signature pixels, scaled onto `canvas`
    scratch: HtmlCanvasElement,
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| JsValue::from_str("canvas has no 2d context"))
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = context_2d(&canvas)?;
        let scratch = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        Ok(Self { canvas, ctx, scratch })
    }

    fn put_pixels(ctx: &CanvasRenderingContext2d, pixels: &[u8], width: u32, height: u32) {
        let drawn = ImageData::new_with_u8_clamped_array_and_sh(Clamped(pixels), width, height)
            .and_then(|data| ctx.put_image_data(&data, 0.0, 0.0));
        if let Err(e) = drawn {
            warn!("failed to draw pixels: {}", js_error_message(&e));
        }
    }
}

impl Surface for CanvasSurface {
    fn clear(&mut self, size: BitmapSize) {
        if self.canvas.width() != size.width || self.canvas.height() != size.height {
            self.canvas.set_width(size.width);
            self.canvas.set_height(size.height);
        }
        self.ctx
            .clear_rect(0.0, 0.0, size.width as f64, size.height as f64);
    }

    fn draw_page(&mut self, page: &PageBitmap) {
        Self::put_pixels(&self.ctx, page.pixels(), page.width(), page.height());
    }

    fn draw_signature(&mut self, signature: &SignatureAsset, rect: CanvasRect) {
        let rect = rect.normalized();
        if self.scratch.width() != signature.width() || self.scratch.height() != signature.height() {
            self.scratch.set_width(signature.width());
            self.scratch.set_height(signature.height());
        }
        let scratch_ctx = match context_2d(&self.scratch) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("{}", js_error_message(&e));
                return;
            }
        };
        Self::put_pixels(&scratch_ctx, signature.rgba(), signature.width(), signature.height());

        let drawn = self.ctx.draw_image_with_html_canvas_element_and_dw_and_dh(
            &self.scratch,
            rect.x.0 as f64,
            rect.y.0 as f64,
            rect.width.0 as f64,
            rect.height.0 as f64,
        );
        if let Err(e) = drawn {
            warn!("failed to draw signature preview: {}", js_error_message(&e));
        }
    }
}

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

/// Shows `e` to the user and turns it into a rejection value
fn report(e: SignError) -> JsValue {
    alert(&e.to_string());
    JsValue::from_str(&e.to_string())
}

fn download(bytes: &[u8], file_name: &str) -> Result<(), JsValue> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(bytes));
    let options = BlobPropertyBag::new();
    options.set_type("application/pdf");
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;

    let url = Url::create_object_url_with_blob(&blob)?;
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let a = document
        .create_element("a")?
        .dyn_into::<HtmlAnchorElement>()?;
    a.set_href(&url);
    a.set_download(file_name);
    a.set_attribute("style", "display:none;")?;

    if let Some(body) = document.body() {
        body.append_child(&a)?;
        a.click();
        a.remove();
    } else {
        a.click();
    }

    Url::revoke_object_url(&url)
}

struct Inner {
    canvas: HtmlCanvasElement,
    session: RefCell<Session<PdfJsRenderer>>,
    surface: RefCell<CanvasSurface>,
}

impl Inner {
    fn redraw(&self) {
        let session = self.session.borrow();
        session.redraw(&mut *self.surface.borrow_mut());
    }

    /// Converts client coordinates of `ev` into canvas bitmap pixels
    fn canvas_point(&self, ev: &PointerEvent) -> Option<CanvasPoint> {
        let size = self.session.borrow().displayed_bitmap()?.size();
        let bounds = self.canvas.get_bounding_client_rect();
        let transform = DisplayTransform::new(size, bounds.width() as f32, bounds.height() as f32);
        Some(transform.to_canvas(
            (ev.client_x() as f64 - bounds.left()) as f32,
            (ev.client_y() as f64 - bounds.top()) as f32,
        ))
    }

    async fn show_page(&self, page: PageIndex) -> Result<PageShown, SignError> {
        let load = self.session.borrow_mut().begin_page_load(page)?;
        let loaded = load.run().await;
        let shown = self.session.borrow_mut().finish_page_load(loaded)?;
        if let PageShown::Shown(_) = shown {
            self.redraw();
        }
        Ok(shown)
    }

    fn on_pointer_down(&self, ev: &PointerEvent) {
        let Some(at) = self.canvas_point(ev) else {
            return;
        };
        let result = self.session.borrow_mut().pointer_down(at);
        match result {
            Ok(()) => {
                ev.prevent_default();
                let _ = self.canvas.set_pointer_capture(ev.pointer_id());
                self.redraw();
            }
            Err(e) => alert(&e.to_string()),
        }
    }

    fn on_pointer_move(&self, ev: &PointerEvent) {
        let Some(at) = self.canvas_point(ev) else {
            return;
        };
        let live = self.session.borrow_mut().pointer_move(at);
        if live.is_some() {
            ev.prevent_default();
            self.redraw();
        }
    }

    fn on_pointer_up(&self, ev: &PointerEvent) {
        let _ = self.canvas.release_pointer_capture(ev.pointer_id());
        let Some(at) = self.canvas_point(ev) else {
            self.session.borrow_mut().pointer_cancel();
            return;
        };
        let end = self.session.borrow_mut().pointer_up(at);
        if end != DragEnd::NotDragging {
            self.redraw();
        }
    }

    fn on_pointer_cancel(&self, ev: &PointerEvent) {
        let _ = self.canvas.release_pointer_capture(ev.pointer_id());
        self.session.borrow_mut().pointer_cancel();
        self.redraw();
    }
}

type PointerListener = Closure<dyn FnMut(PointerEvent)>;

/// Interactive signing on a `<canvas>`: shows pages, lets the user drag the
/// signature into place and downloads the signed file.
///
/// ```js,no_run,ignore
/// const app = new SignerApp(document.getElementById("pdf-canvas"), JSON.stringify({ renderScale: 1.5 }));
/// await app.loadDocument(new Uint8Array(await pdfFile.arrayBuffer()));
/// app.loadSignature(new Uint8Array(await pngFile.arrayBuffer()));
/// // ...the user drags a rectangle...
/// app.exportPdf();
/// ```
#[wasm_bindgen]
pub struct SignerApp {
    inner: Rc<Inner>,
    listeners: Vec<(&'static str, PointerListener)>,
}

#[wasm_bindgen]
impl SignerApp {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, options_json: Option<String>) -> Result<SignerApp, JsValue> {
        console_error_panic_hook::set_once();

        let options = match options_json.as_deref() {
            Some(json) if !json.trim().is_empty() => serde_json::from_str::<SessionOptions>(json)
                .map_err(|e| JsValue::from_str(&format!("failed to deserialize options: {e}")))?,
            _ => SessionOptions::default(),
        };
        let session = Session::new(options).map_err(|e| JsValue::from_str(&e.to_string()))?;

        let inner = Rc::new(Inner {
            surface: RefCell::new(CanvasSurface::new(canvas.clone())?),
            canvas,
            session: RefCell::new(session),
        });

        let mut app = SignerApp {
            inner,
            listeners: Vec::new(),
        };
        app.listen("pointerdown", Inner::on_pointer_down)?;
        app.listen("pointermove", Inner::on_pointer_move)?;
        app.listen("pointerup", Inner::on_pointer_up)?;
        app.listen("pointercancel", Inner::on_pointer_cancel)?;
        Ok(app)
    }

    /// Parses the PDF, replaces the current document and shows its first page
    #[wasm_bindgen(js_name = loadDocument)]
    pub fn load_document(&self, bytes: Vec<u8>) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        wasm_bindgen_futures::future_to_promise(async move {
            let renderer = PdfJsRenderer::open(&bytes).await.map_err(report)?;
            inner
                .session
                .borrow_mut()
                .load_document(bytes, renderer)
                .map_err(report)?;
            inner.show_page(PageIndex::FIRST).await.map_err(report)?;
            let page_count = inner.session.borrow().page_count() as u32;
            Ok(JsValue::from(page_count))
        })
    }

    /// Replaces the signature image (PNG only)
    #[wasm_bindgen(js_name = loadSignature)]
    pub fn load_signature(&self, bytes: &[u8]) -> Result<(), JsValue> {
        self.inner
            .session
            .borrow_mut()
            .set_signature(bytes)
            .map_err(report)?;
        self.inner.redraw();
        Ok(())
    }

    /// Resolves to `true` once page `page` (1-based) is on screen, `false` if
    /// another page was requested in the meantime
    #[wasm_bindgen(js_name = showPage)]
    pub fn show_page(&self, page: u32) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        wasm_bindgen_futures::future_to_promise(async move {
            let page = PageIndex::new(page).ok_or_else(|| {
                report(SignError::PageOutOfRange {
                    page: PageIndex(page),
                    page_count: inner.session.borrow().page_count(),
                })
            })?;
            let shown = inner.show_page(page).await.map_err(report)?;
            Ok(JsValue::from_bool(matches!(shown, PageShown::Shown(_))))
        })
    }

    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&self) -> js_sys::Promise {
        let target = self.inner.session.borrow().next_page();
        self.show_target(target)
    }

    #[wasm_bindgen(js_name = previousPage)]
    pub fn previous_page(&self) -> js_sys::Promise {
        let target = self.inner.session.borrow().previous_page();
        self.show_target(target)
    }

    #[wasm_bindgen(js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.inner.session.borrow().page_count() as u32
    }

    /// 1-based
    #[wasm_bindgen(js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.inner.session.borrow().current_page().get()
    }

    /// Removes the placement on the current page
    #[wasm_bindgen(js_name = clearPlacement)]
    pub fn clear_placement(&self) {
        {
            let mut session = self.inner.session.borrow_mut();
            let page = session.current_page();
            session.clear_placement(page);
        }
        self.inner.redraw();
    }

    /// Writes the signed PDF and offers it as a download
    #[wasm_bindgen(js_name = exportPdf)]
    pub fn export_pdf(&self) -> Result<(), JsValue> {
        let signed = self.inner.session.borrow().export().map_err(report)?;
        debug!("downloading {} ({} bytes)", signed.file_name, signed.bytes.len());
        download(&signed.bytes, &signed.file_name)
    }
}

impl SignerApp {
    fn listen(&mut self, event: &'static str, handler: fn(&Inner, &PointerEvent)) -> Result<(), JsValue> {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let closure = Closure::<dyn FnMut(PointerEvent)>::new(move |ev: PointerEvent| {
            if let Some(inner) = weak.upgrade() {
                handler(&inner, &ev);
            }
        });
        self.inner
            .canvas
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        self.listeners.push((event, closure));
        Ok(())
    }

    fn show_target(&self, target: Option<PageIndex>) -> js_sys::Promise {
        match target {
            Some(page) => self.show_page(page.get()),
            None => js_sys::Promise::resolve(&JsValue::FALSE),
        }
    }
}

impl Drop for SignerApp {
    fn drop(&mut self) {
        for (event, closure) in self.listeners.drain(..) {
            let _ = self
                .inner
                .canvas
                .remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
        }
    }
}
