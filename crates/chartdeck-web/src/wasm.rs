#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use chartdeck_core::role::{self, DomEvent, ENTRY_ROLE, EMPTY_STATE_ROLE, ROLE_ATTRIBUTE, Role};
use chartdeck_core::surface::PLOT_PROMPT;
use chartdeck_core::{ChartType, Gesture, ListSurface, PlotSurface, SurfaceError, UploadFile};
use chartdeck_runtime::{
    Body, ClientConfig, Completion, GestureError, HttpRequest, HttpResponse, Runtime, StepResult,
    Transport, TransportError,
};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use js_sys::{Array, Uint8Array};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    Blob, Document, Element, Event, EventTarget, File, FormData, HtmlInputElement,
    HtmlSelectElement,
};
use web_time::Instant;

use crate::notices::{self, NOTICE_ID_ATTRIBUTE};

/// Interval between host time advances.
const TICK_MS: u32 = 250;

fn js_error(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document available"))
}

fn element_by_id(document: &Document, id: &str) -> Result<Element, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id {id:?}")))
}

// ---------------------------------------------------------------------------
// Surfaces
// ---------------------------------------------------------------------------

/// Entry rows under the list container element.
struct DomListSurface {
    container: Element,
}

impl DomListSurface {
    fn rows(&self) -> Vec<Element> {
        let Ok(nodes) = self
            .container
            .query_selector_all(&format!("[{ROLE_ATTRIBUTE}=\"{ENTRY_ROLE}\"]"))
        else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn row(&self, id: &str) -> Result<Element, SurfaceError> {
        self.rows()
            .into_iter()
            .find(|row| row.id() == id)
            .ok_or_else(|| SurfaceError::UnknownRow(id.to_string()))
    }

    fn options(row: &Element) -> Vec<Element> {
        let Ok(nodes) = row.query_selector_all("option") else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }
}

impl ListSurface for DomListSurface {
    fn row_ids(&self) -> Vec<String> {
        self.rows().iter().map(Element::id).collect()
    }

    fn swap_adjacent(&mut self, earlier: &str, later: &str) -> Result<(), SurfaceError> {
        let ids = self.row_ids();
        let at = ids.iter().position(|id| id == earlier);
        if at.and_then(|i| ids.get(i + 1)).map(String::as_str) != Some(later) {
            return Err(SurfaceError::NotAdjacent {
                earlier: earlier.to_string(),
                later: later.to_string(),
            });
        }
        let first = self.row(earlier)?;
        let second = self.row(later)?;
        let parent = second
            .parent_node()
            .ok_or_else(|| SurfaceError::Dom(format!("row {later:?} is detached")))?;
        parent
            .insert_before(&second, Some(&first))
            .map(|_| ())
            .map_err(|e| SurfaceError::Dom(js_error(&e)))
    }

    fn remove_row(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.row(id)?.remove();
        Ok(())
    }

    fn replace_contents(&mut self, html: &str) -> Result<(), SurfaceError> {
        self.container.set_inner_html(html);
        Ok(())
    }

    // The `selected` attribute is the default selection, which user picks
    // leave alone; only confirmed types move it.
    fn chart_type(&self, id: &str) -> Option<ChartType> {
        let row = self.row(id).ok()?;
        let option = row.query_selector("option[selected]").ok()??;
        option.get_attribute("value").map(ChartType::new)
    }

    fn set_chart_type(&mut self, id: &str, chart_type: &ChartType) -> Result<(), SurfaceError> {
        let row = self.row(id)?;
        let options = Self::options(&row);
        if !options
            .iter()
            .any(|o| o.get_attribute("value").as_deref() == Some(chart_type.as_str()))
        {
            return Err(SurfaceError::UnknownOption {
                id: id.to_string(),
                value: chart_type.to_string(),
            });
        }
        for option in &options {
            let marked = if option.get_attribute("value").as_deref() == Some(chart_type.as_str()) {
                option.set_attribute("selected", "")
            } else {
                option.remove_attribute("selected")
            };
            marked.map_err(|e| SurfaceError::Dom(js_error(&e)))?;
        }
        let control = row
            .query_selector(&format!(
                "[{ROLE_ATTRIBUTE}=\"{}\"]",
                Role::ChartType.data_role()
            ))
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlSelectElement>().ok());
        if let Some(control) = control {
            control.set_value(chart_type.as_str());
        }
        Ok(())
    }

    fn is_showing_empty_state(&self) -> bool {
        self.container
            .query_selector(&format!("[{ROLE_ATTRIBUTE}=\"{EMPTY_STATE_ROLE}\"]"))
            .ok()
            .flatten()
            .is_some()
    }
}

/// The viewer region: a title heading above the plot image.
struct DomPlotSurface {
    document: Document,
    region: Element,
}

impl DomPlotSurface {
    fn child(&self, tag: &str, class: &str) -> Result<Element, SurfaceError> {
        let el = self
            .document
            .create_element(tag)
            .map_err(|e| SurfaceError::Dom(js_error(&e)))?;
        el.set_class_name(class);
        Ok(el)
    }

    fn set_children(&self, children: &[&Element]) -> Result<(), SurfaceError> {
        self.region.set_inner_html("");
        for child in children {
            self.region
                .append_child(child)
                .map_err(|e| SurfaceError::Dom(js_error(&e)))?;
        }
        Ok(())
    }
}

impl PlotSurface for DomPlotSurface {
    fn show_plot(&mut self, title: &str, plot_url: &str) -> Result<(), SurfaceError> {
        let heading = self.child("h3", "chart-title")?;
        heading.set_text_content(Some(title));
        let image = self.child("img", "chart-plot")?;
        for (name, value) in [("src", plot_url), ("alt", title)] {
            image
                .set_attribute(name, value)
                .map_err(|e| SurfaceError::Dom(js_error(&e)))?;
        }
        self.set_children(&[&heading, &image])
    }

    fn show_prompt(&mut self) -> Result<(), SurfaceError> {
        let prompt = self.child("p", "plot-prompt")?;
        prompt.set_text_content(Some(PLOT_PROMPT));
        self.set_children(&[&prompt])
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Issues requests with `fetch` and wakes the host once each completion has
/// been queued.
struct FetchTransport {
    wake: Rc<dyn Fn()>,
}

impl FetchTransport {
    fn prepare(request: &HttpRequest) -> Result<Request, TransportError> {
        let builder = Request::post(&request.path);
        let builder = match request.content_type() {
            Some(content_type) => builder.header("Content-Type", content_type),
            None => builder,
        };
        let prepared = match &request.body {
            Body::Json(text) => builder.body(text.as_str()),
            Body::Multipart { field, file } => {
                let form = form_data(field, file)
                    .map_err(|e| TransportError::Unavailable(js_error(&e)))?;
                builder.body(form)
            }
        };
        prepared.map_err(|e| TransportError::Unavailable(e.to_string()))
    }
}

fn form_data(field: &str, file: &UploadFile) -> Result<FormData, JsValue> {
    let bytes = Uint8Array::from(file.bytes.as_slice());
    let blob = Blob::new_with_u8_array_sequence(&Array::of1(&bytes))?;
    let form = FormData::new()?;
    form.append_with_blob_and_filename(field, &blob, &file.name)?;
    Ok(form)
}

impl Transport for FetchTransport {
    fn send(&mut self, request: HttpRequest, on_complete: Completion) -> Result<(), TransportError> {
        if web_sys::window().is_none() {
            return Err(TransportError::Unavailable("no window".into()));
        }
        let prepared = Self::prepare(&request)?;
        let wake = Rc::clone(&self.wake);
        spawn_local(async move {
            let outcome = match prepared.send().await {
                Ok(response) => {
                    let status = response.status();
                    response
                        .text()
                        .await
                        .map(|body| HttpResponse::new(status, body))
                        .map_err(|e| TransportError::Network(e.to_string()))
                }
                Err(e) => Err(TransportError::Network(e.to_string())),
            };
            on_complete(outcome);
            wake();
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

type PageRuntime = Runtime<FetchTransport, DomListSurface, DomPlotSurface>;

struct Page {
    runtime: PageRuntime,
    notice_region: Option<Element>,
    last_tick: Instant,
}

impl Page {
    fn dispatch(&mut self, gesture: Gesture) {
        let result = self.runtime.dispatch(gesture);
        self.after(result);
    }

    fn step(&mut self) {
        let result = self.runtime.step();
        self.after(result);
    }

    fn tick(&mut self) {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        let result = self.runtime.advance_time(dt);
        self.after(result);
    }

    fn report(&mut self, err: &GestureError) {
        let result = self.runtime.report(err);
        self.after(result);
    }

    fn dismiss(&mut self, id: &str) {
        if let Some(id) = notices::parse_id(id)
            && self.runtime.dismiss_notice(id)
        {
            self.render_notices();
        }
    }

    fn after(&mut self, result: StepResult) {
        if result.notices_changed {
            self.render_notices();
        }
    }

    fn render_notices(&self) {
        if let Some(region) = &self.notice_region {
            region.set_inner_html(&notices::render(self.runtime.notices()));
        }
    }
}

/// Runs `f` on the page if it is still mounted and not already borrowed.
/// A skipped wake is picked up by the next tick.
fn with_page(page: &Weak<RefCell<Page>>, f: impl FnOnce(&mut Page)) {
    if let Some(page) = page.upgrade()
        && let Ok(mut page) = page.try_borrow_mut()
    {
        f(&mut page);
    }
}

fn gesture_from_event(kind: DomEvent, event: &Event) -> Option<Gesture> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let control = target.closest(&format!("[{ROLE_ATTRIBUTE}]")).ok()??;
    let row = target
        .closest(&format!("[{ROLE_ATTRIBUTE}=\"{ENTRY_ROLE}\"]"))
        .ok()??;
    let value = control
        .dyn_ref::<HtmlSelectElement>()
        .map(HtmlSelectElement::value);
    role::resolve(
        kind,
        control.get_attribute(ROLE_ATTRIBUTE).as_deref(),
        Some(&row.id()),
        value.as_deref(),
    )
}

/// Read every picked file. Unreadable ones come back as errors so the page
/// can raise a notice for each.
async fn read_files(files: Vec<File>) -> (Vec<UploadFile>, Vec<GestureError>) {
    let mut uploads = Vec::with_capacity(files.len());
    let mut failures = Vec::new();
    for file in files {
        match JsFuture::from(file.array_buffer()).await {
            Ok(buffer) => {
                uploads.push(UploadFile::new(file.name(), Uint8Array::new(&buffer).to_vec()));
            }
            Err(e) => failures.push(GestureError::FileRead {
                file: file.name(),
                detail: js_error(&e),
            }),
        }
    }
    (uploads, failures)
}

struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn attach(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let closure = Closure::<dyn FnMut(Event)>::wrap(Box::new(handler));
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            closure,
        })
    }

    fn detach(&self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref());
    }
}

/// Chart list page controller for the browser.
///
/// ```js
/// const deck = new ChartDeckWeb('{"request_timeout_ms": 10000}');
/// deck.mount("chart-list", "chart-viewer", "upload-input", "notices");
/// ```
#[wasm_bindgen]
pub struct ChartDeckWeb {
    config: ClientConfig,
    page: Option<Rc<RefCell<Page>>>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl ChartDeckWeb {
    /// Create an unmounted client. `config` is a JSON `ClientConfig`
    /// document; missing fields take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<ChartDeckWeb, JsValue> {
        let config = ClientConfig::from_json(config.as_deref().unwrap_or_default())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self {
            config,
            page: None,
            listeners: Vec::new(),
        })
    }

    /// Take over the list container, viewer region and optional upload
    /// input and notice region, all by element id.
    pub fn mount(
        &mut self,
        list_id: &str,
        plot_id: &str,
        upload_input_id: Option<String>,
        notice_id: Option<String>,
    ) -> Result<(), JsValue> {
        self.destroy();
        let document = document()?;
        let container = element_by_id(&document, list_id)?;
        let region = element_by_id(&document, plot_id)?;
        let upload_input = upload_input_id
            .map(|id| element_by_id(&document, &id))
            .transpose()?;
        let notice_region = notice_id
            .map(|id| element_by_id(&document, &id))
            .transpose()?;

        let config = self.config.clone();
        let page = Rc::new_cyclic(|weak: &Weak<RefCell<Page>>| {
            let weak = weak.clone();
            let wake: Rc<dyn Fn()> = Rc::new(move || with_page(&weak, Page::step));
            RefCell::new(Page {
                runtime: Runtime::new(
                    DomListSurface {
                        container: container.clone(),
                    },
                    DomPlotSurface {
                        document: document.clone(),
                        region,
                    },
                    FetchTransport { wake },
                    config,
                ),
                notice_region: notice_region.clone(),
                last_tick: Instant::now(),
            })
        });

        for kind in DomEvent::ALL {
            let weak = Rc::downgrade(&page);
            self.listeners.push(Listener::attach(&container, kind.name(), move |event| {
                if let Some(gesture) = gesture_from_event(kind, &event) {
                    with_page(&weak, |page| page.dispatch(gesture));
                }
            })?);
        }

        if let Some(input) = upload_input {
            let weak = Rc::downgrade(&page);
            self.listeners.push(Listener::attach(&input, "change", move |event| {
                let Some(input) = event
                    .target()
                    .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
                else {
                    return;
                };
                let Some(list) = input.files() else {
                    return;
                };
                let files: Vec<File> = (0..list.length()).filter_map(|i| list.get(i)).collect();
                // Clearing lets the same file be picked again.
                input.set_value("");
                if files.is_empty() {
                    return;
                }
                let weak = weak.clone();
                spawn_local(async move {
                    let (uploads, failures) = read_files(files).await;
                    with_page(&weak, |page| {
                        for err in &failures {
                            page.report(err);
                        }
                        if !uploads.is_empty() {
                            page.dispatch(Gesture::Upload(uploads));
                        }
                    });
                });
            })?);
        }

        if let Some(region) = &notice_region {
            let weak = Rc::downgrade(&page);
            self.listeners.push(Listener::attach(region, "click", move |event| {
                let id = event
                    .target()
                    .and_then(|t| t.dyn_into::<Element>().ok())
                    .and_then(|el| el.closest(&format!("[{NOTICE_ID_ATTRIBUTE}]")).ok().flatten())
                    .and_then(|el| el.get_attribute(NOTICE_ID_ATTRIBUTE));
                if let Some(id) = id {
                    with_page(&weak, |page| page.dismiss(&id));
                }
            })?);
        }

        let weak = Rc::downgrade(&page);
        spawn_local(async move {
            loop {
                TimeoutFuture::new(TICK_MS).await;
                if weak.strong_count() == 0 {
                    break;
                }
                with_page(&weak, Page::tick);
            }
        });

        self.page = Some(page);
        Ok(())
    }

    /// Reset the viewer to its prompt.
    #[wasm_bindgen(js_name = clearViewer)]
    pub fn clear_viewer(&mut self) {
        if let Some(page) = &self.page
            && let Ok(mut page) = page.try_borrow_mut()
        {
            let result = page.runtime.clear_viewer();
            page.after(result);
        }
    }

    /// Apply any completions that have arrived. The fetch transport already
    /// does this on its own; hosts rarely need to call it.
    pub fn step(&mut self) {
        if let Some(page) = &self.page {
            with_page(&Rc::downgrade(page), Page::step);
        }
    }

    /// Requests awaiting an answer.
    #[wasm_bindgen(js_name = inFlight)]
    pub fn in_flight(&self) -> usize {
        self.page
            .as_ref()
            .and_then(|page| page.try_borrow().ok().map(|p| p.runtime.in_flight()))
            .unwrap_or(0)
    }

    /// Title shown in the viewer, if any.
    #[wasm_bindgen(js_name = viewerTitle)]
    pub fn viewer_title(&self) -> Option<String> {
        let page = self.page.as_ref()?.try_borrow().ok()?;
        page.runtime.viewer().title().map(str::to_string)
    }

    /// Detach every listener and stop the timer. Completions still in flight
    /// are dropped when they arrive.
    pub fn destroy(&mut self) {
        for listener in self.listeners.drain(..) {
            listener.detach();
        }
        self.page = None;
    }
}

impl Drop for ChartDeckWeb {
    fn drop(&mut self) {
        self.destroy();
    }
}
