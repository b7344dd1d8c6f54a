use std::cell::RefCell;
use std::rc::Rc;

use log::{error, info, warn};
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{AddEventListenerOptions, Blob, BlobPropertyBag, CanvasRenderingContext2d, Document, Event, EventTarget, HtmlAnchorElement,
    HtmlButtonElement, HtmlCanvasElement, HtmlElement, HtmlFormElement, HtmlInputElement, ImageData, KeyboardEvent, MouseEvent, TouchEvent,
    Url, Window};

use crate::config::{self, ClientConfig};
use crate::controller::{Controller, Settlement};
use crate::geometry::{PixelRect, Point2D, Size2D};
use crate::pointer::{map_to_canvas, CanvasBounds, PointerInput};
use crate::request;
use crate::state::Style;
use crate::surface::{CANVAS_HEIGHT, CANVAS_WIDTH};

pub const DOWNLOAD_NAME: &str = "codrawing.png";

thread_local! {
    static CONTROLLER: Rc<RefCell<Controller>> = Rc::new(RefCell::new(Controller::new()));
}

fn with_controller<R>(f: impl FnOnce(&mut Controller) -> R) -> R {
    CONTROLLER.with(|controller| f(&mut controller.borrow_mut()))
}

/// Elements of the host page the app talks to.
struct Page {
    window: Window,
    document: Document,
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    color_button: HtmlButtonElement,
    color_picker: HtmlInputElement,
    style_button: HtmlButtonElement,
    style_label: HtmlElement,
    style_list: HtmlElement,
    clear_button: HtmlButtonElement,
    download_button: HtmlButtonElement,
    prompt_form: HtmlFormElement,
    prompt_input: HtmlInputElement,
    submit_button: HtmlButtonElement,
    error_modal: HtmlElement,
    error_text: HtmlElement,
    error_close: HtmlButtonElement,
}

impl Page {
    fn lookup(window: Window) -> Result<Self, JsValue> {
        let document = window.document().ok_or("Should have a document on window")?;

        let canvas: HtmlCanvasElement = element(&document, "drawing-canvas")?;
        let context = canvas
            .get_context("2d")?
            .ok_or("Failed to get 2D context")?
            .dyn_into::<CanvasRenderingContext2d>()?;

        Ok(Page {
            color_button: element(&document, "color-button")?,
            color_picker: element(&document, "color-picker")?,
            style_button: element(&document, "style-button")?,
            style_label: element(&document, "style-label")?,
            style_list: element(&document, "style-list")?,
            clear_button: element(&document, "clear-btn")?,
            download_button: element(&document, "download-btn")?,
            prompt_form: element(&document, "prompt-form")?,
            prompt_input: element(&document, "prompt-input")?,
            submit_button: element(&document, "submit-btn")?,
            error_modal: element(&document, "error-modal")?,
            error_text: element(&document, "error-text")?,
            error_close: element(&document, "error-close")?,
            window,
            document,
            canvas,
            context,
        })
    }
}

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("#{id} not found")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{id} has an unexpected element type")))
}

pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let window = web_sys::window().ok_or("No global window exists")?;
    let page = Rc::new(Page::lookup(window)?);

    page.canvas.set_width(CANVAS_WIDTH);
    page.canvas.set_height(CANVAS_HEIGHT);
    present(&page, None)?;

    setup_mouse_events(&page)?;
    setup_touch_events(&page)?;
    setup_toolbar(&page)?;
    setup_style_menu(&page)?;
    setup_prompt_form(&page)?;
    setup_error_modal(&page)?;

    render_ui(&page);
    info!("co-drawing ready ({}x{})", CANVAS_WIDTH, CANVAS_HEIGHT);
    Ok(())
}

/// Override the generation service settings. Only effective before the first request.
#[wasm_bindgen]
pub fn configure(options: JsValue) -> Result<bool, JsValue> {
    let config: ClientConfig = serde_wasm_bindgen::from_value(options)?;
    Ok(config::install(config))
}

#[wasm_bindgen]
pub fn set_api_key(key: String) -> bool {
    config::install(ClientConfig { api_key: Some(key), ..ClientConfig::default() })
}

/// Current UI state as a plain object.
#[wasm_bindgen]
pub fn ui_state() -> Result<JsValue, JsValue> {
    let snapshot = with_controller(|c| c.snapshot());
    Ok(serde_wasm_bindgen::to_value(&snapshot)?)
}

fn add_listener<E, F>(target: &EventTarget, event_type: &str, callback: F) -> Result<(), JsValue>
where
    E: FromWasmAbi + 'static,
    F: FnMut(E) + 'static,
{
    let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut(E)>);
    target.add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

// touch listeners must be non-passive for preventDefault to stop scrolling
fn add_active_listener<E, F>(target: &EventTarget, event_type: &str, callback: F) -> Result<(), JsValue>
where
    E: FromWasmAbi + 'static,
    F: FnMut(E) + 'static,
{
    let options = AddEventListenerOptions::new();
    options.set_passive(false);

    let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut(E)>);
    target.add_event_listener_with_callback_and_add_event_listener_options(event_type, closure.as_ref().unchecked_ref(), &options)?;
    closure.forget();
    Ok(())
}

fn canvas_bounds(canvas: &HtmlCanvasElement) -> CanvasBounds {
    let rect = canvas.get_bounding_client_rect();
    CanvasBounds { left: rect.left(), top: rect.top(), width: rect.width(), height: rect.height() }
}

fn internal_size(canvas: &HtmlCanvasElement) -> Size2D {
    Size2D::from_pixels(canvas.width(), canvas.height())
}

fn mouse_point(canvas: &HtmlCanvasElement, event: &MouseEvent) -> Option<Point2D> {
    let input = PointerInput::Mouse { offset: Point2D::new(event.offset_x() as f64, event.offset_y() as f64) };
    map_to_canvas(&input, &canvas_bounds(canvas), internal_size(canvas))
}

fn touch_point(canvas: &HtmlCanvasElement, event: &TouchEvent) -> Option<Point2D> {
    let list = event.touches();
    let touches = (0..list.length())
        .filter_map(|i| list.get(i))
        .map(|touch| Point2D::new(touch.client_x() as f64, touch.client_y() as f64))
        .collect();
    map_to_canvas(&PointerInput::Touch { touches }, &canvas_bounds(canvas), internal_size(canvas))
}

/// Copy the surface (or just `rect` of it) onto the visible canvas.
fn present(page: &Page, rect: Option<PixelRect>) -> Result<(), JsValue> {
    let (rect, bytes) = with_controller(|c| {
        let surface = c.surface();
        let rect = rect.unwrap_or_else(|| surface.full_rect());
        (rect, surface.region_rgba(&rect))
    });

    let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(bytes.as_slice()), rect.width, rect.height)?;
    page.context.put_image_data(&data, rect.x as f64, rect.y as f64)
}

fn stroke_to(page: &Page, point: Point2D) {
    if let Some(dirty) = with_controller(|c| c.pointer_move(point)) {
        if let Err(e) = present(page, Some(dirty)) {
            error!("failed to present stroke: {:?}", e);
        }
    }
}

fn setup_mouse_events(page: &Rc<Page>) -> Result<(), JsValue> {
    let canvas = page.canvas.clone();

    {
        let page = Rc::clone(page);
        add_listener(&canvas, "mousedown", move |event: MouseEvent| {
            if let Some(point) = mouse_point(&page.canvas, &event) {
                with_controller(|c| c.pointer_down(point));
            }
        })?;
    }

    {
        let page = Rc::clone(page);
        add_listener(&canvas, "mousemove", move |event: MouseEvent| {
            if !with_controller(|c| c.is_drawing()) {
                return;
            }
            if let Some(point) = mouse_point(&page.canvas, &event) {
                stroke_to(&page, point);
            }
        })?;
    }

    for event_type in ["mouseup", "mouseleave"] {
        add_listener(&canvas, event_type, move |_event: MouseEvent| {
            with_controller(|c| c.pointer_up());
        })?;
    }

    Ok(())
}

fn setup_touch_events(page: &Rc<Page>) -> Result<(), JsValue> {
    let canvas = page.canvas.clone();

    {
        let page = Rc::clone(page);
        add_active_listener(&canvas, "touchstart", move |event: TouchEvent| {
            event.prevent_default();
            if let Some(point) = touch_point(&page.canvas, &event) {
                with_controller(|c| c.pointer_down(point));
            }
        })?;
    }

    {
        let page = Rc::clone(page);
        add_active_listener(&canvas, "touchmove", move |event: TouchEvent| {
            if !with_controller(|c| c.is_drawing()) {
                return;
            }
            event.prevent_default();
            if let Some(point) = touch_point(&page.canvas, &event) {
                stroke_to(&page, point);
            }
        })?;
    }

    for event_type in ["touchend", "touchcancel"] {
        add_listener(&canvas, event_type, move |_event: TouchEvent| {
            with_controller(|c| c.pointer_up());
        })?;
    }

    Ok(())
}

fn setup_toolbar(page: &Rc<Page>) -> Result<(), JsValue> {
    // 색상 선택
    {
        let picker = page.color_picker.clone();
        add_listener(&page.color_button, "click", move |_event: MouseEvent| {
            picker.click();
        })?;
    }
    {
        let picker = page.color_picker.clone();
        add_listener(&page.color_button, "keydown", move |event: KeyboardEvent| {
            let key = event.key();
            if key == "Enter" || key == " " {
                event.prevent_default();
                picker.click();
            }
        })?;
    }
    {
        let handler_page = Rc::clone(page);
        add_listener(&page.color_picker, "input", move |event: Event| {
            let Some(input) = event.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok()) else {
                return;
            };
            if let Err(err) = with_controller(|c| c.set_pen_color(&input.value())) {
                warn!("{err}");
            }
            render_ui(&handler_page);
        })?;
    }

    // 지우기
    {
        let handler_page = Rc::clone(page);
        add_listener(&page.clear_button, "click", move |_event: MouseEvent| {
            with_controller(|c| c.clear());
            if let Err(e) = present(&handler_page, None) {
                error!("failed to repaint canvas: {:?}", e);
            }
            render_ui(&handler_page);
        })?;
    }

    // 저장
    {
        let handler_page = Rc::clone(page);
        add_listener(&page.download_button, "click", move |_event: MouseEvent| {
            if let Err(e) = download(&handler_page) {
                error!("download failed: {:?}", e);
            }
        })?;
    }

    Ok(())
}

fn download(page: &Page) -> Result<(), JsValue> {
    let bytes = with_controller(|c| c.export_png()).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes.as_slice()));
    let options = BlobPropertyBag::new();
    options.set_type("image/png");
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    let link = page.document.create_element("a")?.dyn_into::<HtmlAnchorElement>()?;
    link.set_download(DOWNLOAD_NAME);
    link.set_href(&url);
    link.click();
    info!("saved {} ({} bytes)", DOWNLOAD_NAME, bytes.len());

    let revoke = Closure::once_into_js(move || {
        if let Err(e) = Url::revoke_object_url(&url) {
            error!("failed to revoke download url: {:?}", e);
        }
    });
    page.window.set_timeout_with_callback_and_timeout_and_arguments_0(revoke.unchecked_ref(), 0)?;
    Ok(())
}

fn setup_style_menu(page: &Rc<Page>) -> Result<(), JsValue> {
    {
        let handler_page = Rc::clone(page);
        add_listener(&page.style_button, "click", move |_event: MouseEvent| {
            with_controller(|c| c.toggle_style_dropdown());
            render_ui(&handler_page);
        })?;
    }

    for style in Style::ALL {
        let item = page.document.create_element("li")?;
        item.set_text_content(Some(style.label()));
        item.set_attribute("data-style", style.label())?;

        let handler_page = Rc::clone(page);
        add_listener(&item, "click", move |_event: MouseEvent| {
            with_controller(|c| c.select_style(style));
            render_ui(&handler_page);
        })?;
        page.style_list.append_child(&item)?;
    }

    Ok(())
}

fn setup_prompt_form(page: &Rc<Page>) -> Result<(), JsValue> {
    let handler_page = Rc::clone(page);
    add_listener(&page.prompt_form, "submit", move |event: Event| {
        event.prevent_default();
        submit(&handler_page);
    })
}

fn submit(page: &Rc<Page>) {
    let prompt = page.prompt_input.value();
    let ticket = match with_controller(|c| c.begin_generation(&prompt)) {
        Ok(ticket) => ticket,
        Err(err) => {
            warn!("submission refused: {err}");
            render_ui(page);
            return;
        }
    };
    render_ui(page);

    let page = Rc::clone(page);
    wasm_bindgen_futures::spawn_local(async move {
        let outcome = request::generate_content(config::get(), &ticket.request).await;
        let settlement = with_controller(|c| c.complete_generation(ticket.request_id, outcome));

        if let Settlement::Generated { .. } = settlement {
            if let Err(e) = present(&page, None) {
                error!("failed to present generated image: {:?}", e);
            }
        }
        render_ui(&page);
    });
}

fn setup_error_modal(page: &Rc<Page>) -> Result<(), JsValue> {
    let handler_page = Rc::clone(page);
    add_listener(&page.error_close, "click", move |_event: MouseEvent| {
        with_controller(|c| c.dismiss_error());
        render_ui(&handler_page);
    })
}

/// Mirror the controller state into the page.
fn render_ui(page: &Page) {
    let snapshot = with_controller(|c| c.snapshot());

    page.submit_button.set_disabled(snapshot.loading);
    if let Err(e) = page.submit_button.class_list().toggle_with_force("loading", snapshot.loading) {
        error!("failed to toggle loading class: {:?}", e);
    }

    page.style_label.set_text_content(Some(snapshot.style));
    page.style_list.set_hidden(!snapshot.style_dropdown_open);

    if let Err(e) = page.color_button.style().set_property("background-color", &snapshot.pen_color) {
        error!("failed to paint color button: {:?}", e);
    }
    page.color_picker.set_value(&snapshot.pen_color);

    page.error_modal.set_hidden(!snapshot.show_error_modal);
    page.error_text.set_text_content(Some(&snapshot.error_message));
}
