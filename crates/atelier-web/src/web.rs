//! WebAssembly entry point and browser bindings.
//!
//! The page owns the DOM (toolbar, canvas, result panel) and forwards
//! events to [`WebApp`]. Pixels go back through `putImageData`.

use std::cell::RefCell;

use atelier_core::analysis::{ANALYZE_PATH, AnalysisError, AnalyzeRequest, Critique, PROGRESS_MESSAGE, parse_response};
use atelier_core::input::{InputResponse, PointerEvent, TouchEvent};
use atelier_core::surface::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use atelier_core::{RasterImage, ToolKind};
use chrono::{DateTime, Utc};
use kurbo::Point;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData, KeyboardEvent, MouseEvent};

use crate::app::{Action, PaintApp, brush_preview_size};
use crate::shortcuts::ShortcutRegistry;

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default()
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

fn put_image(canvas: &HtmlCanvasElement, image: &RasterImage) -> Result<(), JsValue> {
    if canvas.width() != image.width || canvas.height() != image.height {
        canvas.set_width(image.width);
        canvas.set_height(image.height);
    }
    let data = ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(image.pixels.as_slice()),
        image.width,
        image.height,
    )?;
    context_2d(canvas)?.put_image_data(&data, 0.0, 0.0)
}

fn touch_points(event: &web_sys::TouchEvent) -> Vec<Point> {
    let touches = event.touches();
    (0..touches.length())
        .filter_map(|i| touches.get(i))
        .map(|t| Point::new(t.client_x() as f64, t.client_y() as f64))
        .collect()
}

fn download_binary_file(filename: &str, data: &[u8], mime_type: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;

    let uint8_array = js_sys::Uint8Array::from(data);
    let blob_parts = js_sys::Array::new();
    blob_parts.push(&uint8_array);

    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime_type);

    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&blob_parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let a = document
        .create_element("a")?
        .dyn_into::<web_sys::HtmlAnchorElement>()?;
    a.set_href(&url);
    a.set_download(filename);
    a.click();

    web_sys::Url::revoke_object_url(&url).ok();
    Ok(())
}

/// POST the canvas to the analysis proxy and parse the answer.
async fn post_analysis(data_url: String) -> Result<Critique, AnalysisError> {
    let network = |e: JsValue| AnalysisError::Network(format!("{e:?}"));
    let window = web_sys::window().ok_or_else(|| AnalysisError::Network("no window".into()))?;

    let body = serde_json::to_string(&AnalyzeRequest::new(data_url))
        .map_err(|e| AnalysisError::Malformed(e.to_string()))?;
    let headers = web_sys::Headers::new().map_err(network)?;
    headers.set("Content-Type", "application/json").map_err(network)?;

    let init = web_sys::RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(&body));

    let response = JsFuture::from(window.fetch_with_str_and_init(ANALYZE_PATH, &init))
        .await
        .map_err(network)?
        .dyn_into::<web_sys::Response>()
        .map_err(network)?;
    let status = response.status();
    let text = JsFuture::from(response.text().map_err(network)?)
        .await
        .map_err(network)?
        .as_string()
        .unwrap_or_default();

    parse_response(status, &text)
}

/// Browser-facing handle to the paint application.
#[wasm_bindgen]
pub struct WebApp {
    app: RefCell<PaintApp>,
    canvas: HtmlCanvasElement,
    preview: Option<HtmlCanvasElement>,
}

#[wasm_bindgen]
impl WebApp {
    /// Attach to the canvas with the given element id.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, preview_id: Option<String>) -> Result<WebApp, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("No document")?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("#{canvas_id} not found")))?
            .dyn_into::<HtmlCanvasElement>()?;
        let preview = match preview_id {
            Some(id) => Some(
                document
                    .get_element_by_id(&id)
                    .ok_or_else(|| JsValue::from_str(&format!("#{id} not found")))?
                    .dyn_into::<HtmlCanvasElement>()?,
            ),
            None => None,
        };

        let app = PaintApp::new(DEFAULT_WIDTH, DEFAULT_HEIGHT).map_err(js_error)?;
        let web = WebApp {
            app: RefCell::new(app),
            canvas,
            preview,
        };
        web.sync_origin();
        web.render()?;
        Ok(web)
    }

    fn sync_origin(&self) {
        let rect = self.canvas.get_bounding_client_rect();
        self.app.borrow_mut().set_canvas_origin(rect.left(), rect.top());
    }

    fn pointer(&self, event: PointerEvent) -> Result<InputResponse, JsValue> {
        let response = self.app.borrow_mut().pointer(event).map_err(js_error)?;
        self.render()?;
        Ok(response)
    }

    fn touch(&self, event: &web_sys::TouchEvent, translated: TouchEvent) -> Result<(), JsValue> {
        let response = self.app.borrow_mut().touch(translated).map_err(js_error)?;
        if response.prevent_default {
            event.prevent_default();
        }
        self.render()
    }

    pub fn mouse_down(&self, event: &MouseEvent) -> Result<(), JsValue> {
        self.sync_origin();
        let position = Point::new(event.client_x() as f64, event.client_y() as f64);
        self.pointer(PointerEvent::Down { position }).map(|_| ())
    }

    pub fn mouse_move(&self, event: &MouseEvent) -> Result<(), JsValue> {
        let position = Point::new(event.client_x() as f64, event.client_y() as f64);
        self.pointer(PointerEvent::Move { position }).map(|_| ())
    }

    pub fn mouse_up(&self) -> Result<(), JsValue> {
        self.pointer(PointerEvent::Up).map(|_| ())
    }

    pub fn mouse_leave(&self) -> Result<(), JsValue> {
        self.pointer(PointerEvent::Leave).map(|_| ())
    }

    pub fn touch_start(&self, event: &web_sys::TouchEvent) -> Result<(), JsValue> {
        self.sync_origin();
        self.touch(event, TouchEvent::Start { touches: touch_points(event) })
    }

    pub fn touch_move(&self, event: &web_sys::TouchEvent) -> Result<(), JsValue> {
        self.touch(event, TouchEvent::Move { touches: touch_points(event) })
    }

    pub fn touch_end(&self, event: &web_sys::TouchEvent) -> Result<(), JsValue> {
        self.touch(event, TouchEvent::End)
    }

    pub fn touch_cancel(&self, event: &web_sys::TouchEvent) -> Result<(), JsValue> {
        self.touch(event, TouchEvent::Cancel)
    }

    /// Run a named toolbar action (`undo`, `redo`, `save`, `pen`, `eraser`).
    pub fn action(&self, name: &str) -> Result<(), JsValue> {
        let action = match name {
            "undo" => Action::Undo,
            "redo" => Action::Redo,
            "save" => Action::Save,
            "pen" => Action::SelectPen,
            "eraser" => Action::SelectEraser,
            other => return Err(JsValue::from_str(&format!("unknown action: {other}"))),
        };
        self.perform(action)
    }

    fn perform(&self, action: Action) -> Result<(), JsValue> {
        let export = self.app.borrow_mut().perform(action, now()).map_err(js_error)?;
        if let Some(export) = export {
            download_binary_file(&export.file_name, &export.png, "image/png")?;
            log::info!("Saved {}", export.file_name);
        }
        self.render()
    }

    /// Handle a keydown event. Returns true when a shortcut fired.
    pub fn key_down(&self, event: &KeyboardEvent) -> Result<bool, JsValue> {
        let ctrl = event.ctrl_key() || event.meta_key();
        let Some(action) = ShortcutRegistry::lookup(&event.key(), ctrl, event.shift_key()) else {
            return Ok(false);
        };
        event.prevent_default();
        self.perform(action)?;
        Ok(true)
    }

    /// Ask for confirmation, then wipe the canvas.
    pub fn clear(&self) -> Result<bool, JsValue> {
        let window = web_sys::window().ok_or("No window")?;
        let confirm = |message: &str| window.confirm_with_message(message).unwrap_or(false);
        let cleared = self.app.borrow_mut().clear(&confirm).map_err(js_error)?;
        if cleared {
            log::info!("Canvas cleared");
        }
        self.render()?;
        Ok(cleared)
    }

    pub fn set_tool(&self, tool: &str) -> Result<(), JsValue> {
        let tool: ToolKind = tool.parse().map_err(js_error)?;
        self.app.borrow_mut().select_tool(tool);
        Ok(())
    }

    pub fn set_color(&self, hex: &str) -> Result<(), JsValue> {
        self.app.borrow_mut().select_color(hex).map_err(js_error)
    }

    /// Returns the brush preview diameter for the new size.
    pub fn set_brush_size(&self, size: u32) -> u32 {
        let mut app = self.app.borrow_mut();
        app.set_brush_size(size);
        brush_preview_size(app.toolbar().brush_size)
    }

    /// Refit the canvas to its container after a window resize.
    pub fn resize(&self, container_width: f64, container_height: f64) -> Result<(), JsValue> {
        self.app
            .borrow_mut()
            .resize_to_container(container_width, container_height)
            .map_err(js_error)?;
        self.sync_origin();
        self.render()
    }

    /// Toolbar state as a plain JS object.
    pub fn toolbar(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.app.borrow().toolbar()).map_err(js_error)
    }

    pub fn is_analyzing(&self) -> bool {
        self.app.borrow().is_analyzing()
    }

    /// Text for the result panel while a critique is pending.
    pub fn progress_message(&self) -> String {
        PROGRESS_MESSAGE.to_string()
    }

    /// Submit the canvas for critique.
    ///
    /// Resolves to `{ title, body }`; rejects with a user-facing message.
    pub fn analyze(&self) -> js_sys::Promise {
        if let Err(e) = self.draw_preview() {
            log::warn!("Failed to draw preview: {:?}", e);
        }
        let started = self.app.borrow().begin_analysis();
        future_to_promise(async move {
            let (ticket, data_url) = started.map_err(|e| JsValue::from_str(&e.user_message()))?;
            let result = post_analysis(data_url).await;
            drop(ticket);
            match result {
                Ok(critique) => serde_wasm_bindgen::to_value(&critique).map_err(js_error),
                Err(e) => {
                    log::error!("Analysis failed: {}", e);
                    Err(JsValue::from_str(&e.user_message()))
                }
            }
        })
    }

    fn render(&self) -> Result<(), JsValue> {
        let mut app = self.app.borrow_mut();
        if !app.take_redraw() {
            return Ok(());
        }
        put_image(&self.canvas, &app.session().surface().to_image())
    }

    /// Paint the framed artwork into the preview canvas, if any.
    fn draw_preview(&self) -> Result<(), JsValue> {
        let Some(preview) = &self.preview else {
            return Ok(());
        };
        let image = self.app.borrow().framed_preview().map_err(js_error)?;
        put_image(preview, &image)
    }
}

/// Initialize logging for the WASM module.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }
    log::info!("Starting Atelier (WASM)");
}
