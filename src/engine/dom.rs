//! Browser plumbing: owned event listeners, a cancellable frame loop and the
//! HTML label layer.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Element, Event, EventTarget, HtmlElement, HtmlImageElement, Node};

use crate::engine::labels::{Label, LabelPlacement};
use crate::engine::pass::{LabelPass, Viewport};
use crate::error::ViewerError;

/// An event listener that is removed again when dropped.
pub struct EventSubscription {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventSubscription {
    pub fn listen(target: &EventTarget, kind: &'static str, handler: impl FnMut(Event) + 'static) -> Result<Self, JsValue> {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
        Ok(EventSubscription { target: target.clone(), kind, callback })
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref())
            .ok();
    }
}

/// requestAnimationFrame loop that keeps rescheduling itself until cancelled.
pub struct FrameLoop {
    callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
    pending: Rc<Cell<Option<i32>>>,
}

impl FrameLoop {
    pub fn start(mut tick: impl FnMut() + 'static) -> Result<Self, JsValue> {
        let callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
        let pending = Rc::new(Cell::new(None));

        let f = callback.clone();
        let p = pending.clone();
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            p.set(None);
            tick();
            // a cancelled loop has already dropped its closure
            let next = f.borrow().as_ref().and_then(|cb| request_animation_frame(cb).ok());
            p.set(next);
        }) as Box<dyn FnMut()>));

        let first = match callback.borrow().as_ref() {
            Some(cb) => request_animation_frame(cb)?,
            None => return Err(JsValue::from_str("frame callback missing")),
        };
        pending.set(Some(first));

        Ok(FrameLoop { callback, pending })
    }

    pub fn is_running(&self) -> bool {
        self.callback.borrow().is_some()
    }

    /// Stops the loop. Must not be called from inside the tick itself.
    pub fn cancel(&self) {
        if let Some(id) = self.pending.take() {
            if let Some(window) = web_sys::window() {
                window.cancel_animation_frame(id).ok();
            }
        }
        // drops the closure and with it the self-reference keeping it alive
        self.callback.borrow_mut().take();
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn request_animation_frame(f: &Closure<dyn FnMut()>) -> Result<i32, JsValue> {
    web_sys::window()
        .ok_or("No window")?
        .request_animation_frame(f.as_ref().unchecked_ref())
}

pub fn document() -> Result<Document, ViewerError> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| ViewerError::Setup("No document".into()))
}

pub fn find_container(document: &Document, id: &str) -> Result<HtmlElement, ViewerError> {
    document
        .get_element_by_id(id)
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        .ok_or_else(|| ViewerError::ContainerNotFound(id.to_string()))
}

pub fn client_viewport(element: &Element) -> Viewport {
    Viewport::new(element.client_width().max(0) as u32, element.client_height().max(0) as u32)
}

/// True when `target` is inside `container`.
pub fn contains_target(container: &Element, target: Option<&EventTarget>) -> bool {
    target
        .and_then(|t| t.dyn_ref::<Node>())
        .map(|node| container.contains(Some(node)))
        .unwrap_or(false)
}

pub fn is_body_target(document: &Document, target: Option<&EventTarget>) -> bool {
    match (document.body(), target.and_then(|t| t.dyn_ref::<Node>())) {
        (Some(body), Some(node)) => body.is_same_node(Some(node)),
        _ => false,
    }
}

const INSTRUCTIONS: &str = "Kontrollet:<br>\
    W/S - Lëviz para/prapa<br>\
    A/D - Lëviz majtas/djathtas<br>\
    &larr;/&rarr; - Rrotullo majtas/djathtas<br>\
    &uarr;/&darr; - Shiko lart/poshtë";

pub fn append_instructions(document: &Document, container: &Element) -> Result<(), JsValue> {
    let panel = document.create_element("div")?;
    panel.set_attribute(
        "style",
        "position: absolute; bottom: 10px; left: 10px; background-color: rgba(0, 0, 0, 0.7); \
         padding: 10px; border-radius: 5px; color: white; font-size: 13px;",
    )?;
    panel.set_inner_html(INSTRUCTIONS);
    container.append_child(&panel)?;
    Ok(())
}

/// Replaces the container contents with a readable error.
pub fn show_error(document: &Document, container: &Element, title: &str, err: &ViewerError) {
    container.set_inner_html("");
    if let Ok(message) = document.create_element("div") {
        message.set_class_name("p-4 text-red-500");
        message.set_text_content(Some(&format!("Error initializing {title}: {err}")));
        container.append_child(&message).ok();
    }
}

/// Fetches and decodes an image. Cross-origin so it can be uploaded to WebGL.
pub async fn load_image(url: &str) -> Result<HtmlImageElement, JsValue> {
    let img = HtmlImageElement::new()?;
    img.set_cross_origin(Some("anonymous"));
    img.set_src(url);
    JsFuture::from(img.decode()).await?;
    Ok(img)
}

/// Absolutely positioned layer of HTML labels over the canvas.
pub struct LabelLayer {
    document: Document,
    root: HtmlElement,
    nodes: Vec<HtmlElement>,
    texts: Vec<String>,
}

impl LabelLayer {
    pub fn new(document: &Document, container: &Element, viewport: Viewport) -> Result<Self, JsValue> {
        let root = document.create_element("div")?.dyn_into::<HtmlElement>()?;
        let style = root.style();
        style.set_property("position", "absolute")?;
        style.set_property("top", "0")?;
        style.set_property("left", "0")?;
        style.set_property("overflow", "hidden")?;
        style.set_property("pointer-events", "none")?;
        container.append_child(&root)?;

        let mut layer = LabelLayer { document: document.clone(), root, nodes: Vec::new(), texts: Vec::new() };
        layer.resize(viewport);
        Ok(layer)
    }

    fn sync(&mut self, labels: &[Label]) -> Result<(), JsValue> {
        let unchanged = self.texts.len() == labels.len()
            && self.texts.iter().zip(labels).all(|(t, l)| *t == l.text);
        if unchanged {
            return Ok(());
        }

        for node in self.nodes.drain(..) {
            node.remove();
        }
        self.texts.clear();

        for label in labels {
            let node = self.document.create_element("div")?.dyn_into::<HtmlElement>()?;
            node.set_class_name(label.style.class_name());
            node.set_attribute("style", label.style.css())?;
            node.set_text_content(Some(&label.text));
            self.root.append_child(&node)?;
            self.nodes.push(node);
            self.texts.push(label.text.clone());
        }
        Ok(())
    }
}

impl LabelPass for LabelLayer {
    fn resize(&mut self, viewport: Viewport) {
        let style = self.root.style();
        style.set_property("width", &format!("{}px", viewport.width)).ok();
        style.set_property("height", &format!("{}px", viewport.height)).ok();
    }

    fn draw_labels(&mut self, labels: &[Label], placements: &[LabelPlacement]) {
        if let Err(err) = self.sync(labels) {
            log::warn!("label layer out of sync: {:?}", err);
            return;
        }
        for (node, placement) in self.nodes.iter().zip(placements) {
            let style = node.style();
            match placement.screen {
                Some((x, y)) => {
                    style.set_property("display", "block").ok();
                    style
                        .set_property("transform", &format!("translate(-50%, -50%) translate({x:.1}px, {y:.1}px)"))
                        .ok();
                    style.set_property("opacity", &placement.opacity.to_string()).ok();
                }
                None => {
                    style.set_property("display", "none").ok();
                }
            }
        }
    }
}

impl Drop for LabelLayer {
    fn drop(&mut self) {
        self.root.remove();
    }
}
