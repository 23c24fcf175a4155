use super::audio::{WebAudioCue, CUE_URL};
use super::canvas::{viewport, WebCanvas, WebTextRasterizer};
use super::events::Listeners;
use crate::command::Command;
use crate::config::EngineConfig;
use crate::director::Director;
use crate::shape::{ShapeController, TouchPoint};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{window, Element, EventTarget, HtmlInputElement, KeyboardEvent, MouseEvent, TouchEvent, TouchList};

type WebDirector = Director<WebCanvas, WebTextRasterizer, WebAudioCue>;
type FrameClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Text shown once the page is up.
const GREETING: &str = "?";
const INPUT_ID: &str = "input";

fn now() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Read a JS config object. Anything missing, malformed or out of range
/// falls back to the defaults.
pub fn load_config(config: JsValue) -> EngineConfig {
    if config.is_undefined() || config.is_null() {
        return EngineConfig::default();
    }
    let config: EngineConfig = match serde_wasm_bindgen::from_value(config) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("ignoring invalid config: {}", e);
            return EngineConfig::default();
        }
    };
    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            log::warn!("ignoring config: {}", e);
            EngineConfig::default()
        }
    }
}

fn touch_points(list: TouchList) -> Vec<TouchPoint> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .map(|t| TouchPoint {
            id: t.identifier(),
            x: t.client_x() as f64,
            y: t.client_y() as f64,
        })
        .collect()
}

/// Drives the director from `requestAnimationFrame` while it is alive.
struct FrameLoop {
    frame: FrameClosure,
    running: Rc<Cell<bool>>,
}

impl FrameLoop {
    fn new(director: Rc<RefCell<WebDirector>>) -> Self {
        let frame: FrameClosure = Rc::new(RefCell::new(None));
        let running = Rc::new(Cell::new(false));

        // The closure reschedules itself through `f`; storing it inside an
        // `Option` lets it be created before it can refer to itself.
        let f = frame.clone();
        let r = running.clone();
        *frame.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            let mut director = director.borrow_mut();
            if let Err(e) = director.advance(now()) {
                log::warn!("frame failed: {}", e);
            }

            if !director.shape().is_alive() {
                log::info!("render loop stopped");
                r.set(false);
                return;
            }
            request_frame(&f);
        }) as Box<dyn FnMut()>));

        Self { frame, running }
    }

    /// Schedule the next frame unless the loop is already running.
    fn ensure_running(&self) {
        if self.running.replace(true) {
            return;
        }
        request_frame(&self.frame);
    }
}

fn request_frame(frame: &FrameClosure) {
    let (Some(w), Some(closure)) = (window(), frame.borrow().as_ref().map(|c| c.as_ref().clone())) else {
        return;
    };
    if let Err(e) = w.request_animation_frame(closure.unchecked_ref()) {
        log::error!("requestAnimationFrame failed: {:?}", e);
    }
}

/// Bind the viewport and pointer listeners on `target`.
fn bind_pointer(target: &EventTarget, director: &Rc<RefCell<WebDirector>>, page: &mut Listeners) -> Result<(), JsValue> {
    {
        let director = director.clone();
        page.add(target, "resize", move |_: web_sys::Event| {
            director.borrow_mut().shape_mut().resize(viewport(), now());
        })?;
    }

    {
        let director = director.clone();
        page.add(target, "mousedown", move |e: MouseEvent| {
            let result = director
                .borrow_mut()
                .shape_mut()
                .pointer_down(e.client_x() as f64, e.client_y() as f64, now());
            if let Err(e) = result {
                log::debug!("mousedown ignored: {}", e);
            }
        })?;
    }

    {
        let director = director.clone();
        page.add(target, "mousemove", move |e: MouseEvent| {
            let result = director
                .borrow_mut()
                .shape_mut()
                .pointer_move(e.client_x() as f64, e.client_y() as f64, now());
            if let Err(e) = result {
                log::debug!("mousemove ignored: {}", e);
            }
        })?;
    }

    {
        let director = director.clone();
        page.add(target, "touchstart", move |e: TouchEvent| {
            let touches = touch_points(e.touches());
            if let Err(e) = director.borrow_mut().shape_mut().touch_start(&touches, now()) {
                log::debug!("touchstart ignored: {}", e);
            }
        })?;
    }

    {
        // Non-passive so the page does not scroll under the ink.
        let director = director.clone();
        page.add_active(target, "touchmove", move |e: TouchEvent| {
            e.prevent_default();
            let touches = touch_points(e.touches());
            if let Err(e) = director.borrow_mut().shape_mut().touch_move(&touches, now()) {
                log::debug!("touchmove ignored: {}", e);
            }
        })?;
    }

    {
        let director = director.clone();
        page.add(target, "touchend", move |e: TouchEvent| {
            let ended: Vec<i32> = touch_points(e.changed_touches()).iter().map(|t| t.id).collect();
            director.borrow_mut().shape_mut().touch_end(Some(&ended));
        })?;
    }

    log::debug!("{} page listeners bound", page.len());
    Ok(())
}

/// Build the engine over `container`, wire the page events and start
/// rendering.
pub fn start(container: Element, config: JsValue) -> Result<(), JsValue> {
    let window = window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;

    let config = load_config(config);
    let vp = viewport();
    let seed = (js_sys::Math::random() * u64::MAX as f64) as u64;

    let shape = ShapeController::new(
        config,
        WebCanvas::new(None)?,
        WebCanvas::new(Some(container))?,
        WebTextRasterizer::new(vp)?,
        vp,
        seed,
    );
    let director = Rc::new(RefCell::new(Director::new(shape, WebAudioCue::new(CUE_URL))));
    let frames = Rc::new(FrameLoop::new(director.clone()));

    {
        let mut d = director.borrow_mut();
        let t = now();
        d.run(Command::Init, t)?;
        d.shape_mut().print(GREETING, t)?;
    }
    frames.ensure_running();

    let target: EventTarget = window.into();
    let page = Rc::new(RefCell::new(Listeners::new()));
    bind_pointer(&target, &director, &mut page.borrow_mut())?;

    let Some(input) = document
        .get_element_by_id(INPUT_ID)
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
    else {
        log::warn!("no #{} field, commands disabled", INPUT_ID);
        // Nothing can destroy the engine now; the page listeners stay for good.
        std::mem::forget(page);
        return Ok(());
    };

    let field = input.clone();
    let command = Closure::wrap(Box::new(move |e: KeyboardEvent| {
        if e.key() != "Enter" {
            return;
        }

        let value = field.value();
        field.set_value("");

        let alive = {
            let mut director = director.borrow_mut();
            if let Err(e) = director.dispatch(&value, now()) {
                log::warn!("{:?} failed: {}", value, e);
            }
            director.shape().is_alive()
        };

        // `#destroy` unbinds the page and stops the loop; `#init` restores both.
        let mut page = page.borrow_mut();
        if !alive {
            page.remove_all();
            return;
        }
        if page.is_empty() {
            if let Err(e) = bind_pointer(&target, &director, &mut page) {
                log::warn!("rebinding page listeners failed: {:?}", e);
            }
        }
        frames.ensure_running();
    }) as Box<dyn FnMut(KeyboardEvent)>);

    let field: &EventTarget = input.as_ref();
    field.add_event_listener_with_callback("keypress", command.as_ref().unchecked_ref())?;
    // The command field is how a destroyed engine comes back, so it lives as
    // long as the page.
    command.forget();

    Ok(())
}
