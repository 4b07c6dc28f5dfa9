//! Attaches a visualization to a page container and keeps it running.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event, HtmlCanvasElement, HtmlElement, KeyboardEvent, WebGlRenderingContext, WebGlTexture};

use crate::config::{NightSkyConfig, SolarSystemConfig};
use crate::engine::dom::{
    self, append_instructions, client_viewport, contains_target, is_body_target, load_image, EventSubscription,
    FrameLoop, LabelLayer,
};
use crate::engine::input::KeyPhase;
use crate::engine::pass::{ScenePass, Viewport};
use crate::engine::renderer::{Lighting, Renderer};
use crate::engine::rgb;
use crate::error::{Result, ViewerError};
use crate::viz::night_sky::NightSky;
use crate::viz::solar_system::SolarSystem;
use crate::viz::textures::{glow_pixels, solid_pixels, ResolveOutcome};
use crate::viz::{SceneController, Visualization};

const GLOW_TEXTURE_SIZE: u32 = 64;

/// A running viewer. Dropping it stops the frame loop and detaches every
/// listener.
pub struct Mount {
    frame_loop: FrameLoop,
    _subscriptions: Vec<EventSubscription>,
}

impl Mount {
    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn shutdown(self) {
        self.frame_loop.cancel();
    }
}

/// Canvas, GL renderer and label layer created inside a container.
struct Surface {
    document: Document,
    container: HtmlElement,
    renderer: Rc<RefCell<Renderer>>,
    labels: Rc<RefCell<LabelLayer>>,
    viewport: Viewport,
}

impl Surface {
    fn create(document: &Document, container: HtmlElement) -> Result<Self> {
        container.style().set_property("position", "relative")?;
        let viewport = client_viewport(&container);

        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| ViewerError::Setup("created element is not a canvas".into()))?;
        canvas.style().set_property("display", "block")?;
        container.append_child(&canvas)?;

        let gl = canvas
            .get_context("webgl")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<WebGlRenderingContext>().ok())
            .ok_or_else(|| ViewerError::SurfaceUnavailable("WebGL is not available".into()))?;
        let mut renderer =
            Renderer::new(gl).map_err(|e| ViewerError::SurfaceUnavailable(ViewerError::from(e).to_string()))?;
        renderer.resize(viewport);

        let labels = LabelLayer::new(document, &container, viewport)?;
        append_instructions(document, &container)?;

        log::debug!("surface ready at {}x{}", viewport.width, viewport.height);
        Ok(Surface {
            document: document.clone(),
            container,
            renderer: Rc::new(RefCell::new(renderer)),
            labels: Rc::new(RefCell::new(labels)),
            viewport,
        })
    }

    /// Wires input and resize events and starts the frame loop.
    fn run<V>(self, controller: Rc<RefCell<SceneController<V>>>) -> Result<Mount>
    where
        V: Visualization<Texture = WebGlTexture> + 'static,
    {
        let window = web_sys::window().ok_or_else(|| ViewerError::Setup("No window".into()))?;
        let container: Element = self.container.clone().into();
        let mut subscriptions = Vec::new();

        for (kind, phase) in [("keydown", KeyPhase::Down), ("keyup", KeyPhase::Up)] {
            let (ctrl, doc, scope) = (controller.clone(), self.document.clone(), container.clone());
            subscriptions.push(EventSubscription::listen(&window, kind, move |event: Event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else { return };
                let target = event.target();
                let route = ctrl.borrow_mut().key_event(
                    phase,
                    &event.key(),
                    contains_target(&scope, target.as_ref()),
                    is_body_target(&doc, target.as_ref()),
                );
                if route.prevent_default {
                    event.prevent_default();
                }
            })?);
        }

        let (ctrl, renderer, labels, scope) =
            (controller.clone(), self.renderer.clone(), self.labels.clone(), container.clone());
        subscriptions.push(EventSubscription::listen(&window, "resize", move |_| {
            let viewport = client_viewport(&scope);
            let mut renderer = renderer.borrow_mut();
            let mut labels = labels.borrow_mut();
            ctrl.borrow_mut().on_resize(viewport.width, viewport.height, &mut *renderer, &mut *labels);
        })?);

        subscriptions.push(EventSubscription::listen(&self.container, "wheel", |event: Event| {
            event.stop_propagation();
        })?);

        let (renderer, labels) = (self.renderer, self.labels);
        let frame_loop = FrameLoop::start(move || {
            let mut renderer = renderer.borrow_mut();
            let mut labels = labels.borrow_mut();
            controller.borrow_mut().step_frame(&mut *renderer, &mut *labels);
        })?;

        Ok(Mount { frame_loop, _subscriptions: subscriptions })
    }
}

/// Looks up the container, runs `mount` and turns any error other than a
/// missing container into a message inside the container.
pub fn mount_or_report(container_id: &str, title: &str, mount: impl FnOnce(&Document, HtmlElement) -> Result<Mount>) -> Result<Mount> {
    let document = dom::document()?;
    let container = match dom::find_container(&document, container_id) {
        Ok(container) => container,
        Err(err) => {
            log::error!("{title}: {err}");
            return Err(err);
        }
    };

    mount(&document, container.clone()).map_err(|err| {
        log::error!("{title} failed to start: {err}");
        if err.is_reportable() {
            dom::show_error(&document, &container, title, &err);
        }
        err
    })
}

pub fn mount_solar_system(document: &Document, container: HtmlElement, config: SolarSystemConfig) -> Result<Mount> {
    let surface = Surface::create(document, container)?;

    let mut scene = SolarSystem::new(config, surface.viewport.aspect());
    {
        let renderer = surface.renderer.borrow();
        renderer.set_lighting(&Lighting { ambient: rgb(scene.config().ambient_light), ..Lighting::default() });
        match renderer.texture_from_pixels(GLOW_TEXTURE_SIZE, GLOW_TEXTURE_SIZE, &glow_pixels(GLOW_TEXTURE_SIZE)) {
            Ok(glow) => scene.set_glow_texture(glow),
            Err(err) => log::warn!("sun glow disabled: {}", ViewerError::from(err)),
        }
    }

    let fallback_size = scene.config().fallback_texture_size;
    let pending = scene.pending_textures();
    log::info!("solar system: {} bodies, fetching {} textures", scene.bodies().len(), pending.len());

    let controller = Rc::new(RefCell::new(SceneController::new(scene, surface.viewport)));
    for (slot, name, url) in pending {
        let controller = controller.clone();
        let renderer = surface.renderer.clone();
        spawn_local(async move {
            let loaded = match load_image(&url).await {
                Ok(img) => renderer.borrow().texture_from_image(&img),
                Err(err) => Err(err),
            };
            if let Err(err) = &loaded {
                log::warn!("texture for {name} unavailable, using fallback color: {}", ViewerError::from(err.clone()));
            }

            let outcome = controller.borrow_mut().scene_mut().resolve_texture(slot, loaded, |color| {
                renderer
                    .borrow()
                    .texture_from_pixels(fallback_size, fallback_size, &solid_pixels(color, fallback_size))
                    .ok()
            });
            match outcome {
                ResolveOutcome::Pending { resolved, total } => log::debug!("texture {name} resolved ({resolved}/{total})"),
                ResolveOutcome::Complete => log::info!("all textures resolved, final bodies in place"),
                ResolveOutcome::Ignored => log::debug!("duplicate resolution for {name} ignored"),
            }
        });
    }

    surface.run(controller)
}

pub fn mount_night_sky(document: &Document, container: HtmlElement, config: NightSkyConfig) -> Result<Mount> {
    let surface = Surface::create(document, container)?;

    let scene: NightSky<WebGlTexture> = NightSky::new(config, surface.viewport.aspect());
    log::info!(
        "night sky: {} stars, {} constellations",
        scene.star_count(),
        scene.constellations().len()
    );

    let controller = Rc::new(RefCell::new(SceneController::new(scene, surface.viewport)));
    surface.run(controller)
}
