// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser adapter built on `web-sys`.
//!
//! ## Feature
//!
//! Enable with `web`.
//!
//! ## Pieces
//!
//! - [`WebViewport`]: [`ScrollSource`] over `window.scrollY` (falling back to
//!   `pageYOffset`) and `window.innerHeight`.
//! - [`WebDocument`]: [`Document`] over `querySelectorAll`, bounding client
//!   rects shifted into document coordinates, and `getAttribute`.
//! - [`WebClasses`]: [`ClassList`] over `element.classList`.
//! - [`WebWaypoints`]: a started engine bound to the window `scroll` event.
//!   Trailing throttled checks and delayed class toggles are armed with
//!   `setTimeout`. It is exported to JavaScript as `WebWaypoints.create(options)`.
//!
//! `onPoint` callbacks run after the engine has finished its check, so they
//! may call back into the same [`WebWaypoints`] (for example `stop()` after
//! the first crossing).
//!
//! Failures after setup (a throwing `classList.add`, a rejected timer) are
//! logged and skipped; only setup reports a [`WebError`].

use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::{fmt, mem};

use hashbrown::HashMap;
use kurbo::Rect;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Window};

use crate::classes::{ClassList, ClassToggle, ElementWaypoint};
use crate::engine::{EventName, ScrollEngine, WaypointEvent};
use crate::host::{BindingId, ScrollSource, SignalBinder};
use crate::options::WaypointOptions;
use crate::scan::{Document, register};

/// Errors raised while wiring waypoints into a page.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// There is no global `window` (for example inside a worker).
    #[error("no global `window` is available")]
    NoWindow,
    /// The window has no `document`.
    #[error("the window has no document")]
    NoDocument,
    /// The options object could not be deserialized.
    #[error("invalid waypoint options: {0}")]
    InvalidOptions(String),
}

impl From<WebError> for JsValue {
    fn from(err: WebError) -> Self {
        Self::from_str(&err.to_string())
    }
}

fn js_error(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn now_ms() -> u64 {
    let now = js_sys::Date::now();
    if now.is_finite() && now > 0.0 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Millisecond timestamps fit in u64; the sub-millisecond fraction is dropped."
        )]
        let millis = now as u64;
        millis
    } else {
        0
    }
}

fn set_timeout(window: &Window, callback: &JsValue, delay: u64) -> Result<i32, JsValue> {
    let delay = i32::try_from(delay).unwrap_or(i32::MAX);
    window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay)
}

/// Scroll geometry of a browser window.
#[derive(Clone, Debug)]
pub struct WebViewport {
    window: Window,
}

impl WebViewport {
    /// Wraps `window`.
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl ScrollSource for WebViewport {
    fn scroll_offset(&self) -> f64 {
        self.window
            .scroll_y()
            .or_else(|_| self.window.page_y_offset())
            .unwrap_or_default()
    }

    fn viewport_height(&self) -> f64 {
        self.window
            .inner_height()
            .ok()
            .and_then(|height| height.as_f64())
            .unwrap_or_default()
    }
}

/// Elements of a browser document.
#[derive(Clone, Debug)]
pub struct WebDocument {
    viewport: WebViewport,
    document: web_sys::Document,
}

impl WebDocument {
    /// Wraps the document shown in `window`.
    pub fn new(window: Window) -> Result<Self, WebError> {
        let document = window.document().ok_or(WebError::NoDocument)?;
        Ok(Self {
            viewport: WebViewport::new(window),
            document,
        })
    }
}

impl Document for WebDocument {
    type Element = Element;

    fn query_all(&self, selector: &str) -> Vec<Element> {
        match self.document.query_selector_all(selector) {
            Ok(list) => (0..list.length())
                .filter_map(|index| list.item(index))
                .filter_map(|node| node.dyn_into::<Element>().ok())
                .collect(),
            Err(err) => {
                warn!(selector, error = %js_error(&err), "querySelectorAll failed");
                Vec::new()
            }
        }
    }

    fn bounds(&self, element: &Element) -> Rect {
        let rect = element.get_bounding_client_rect();
        let dx = self.viewport.window.scroll_x().unwrap_or_default();
        let dy = self.viewport.scroll_offset();
        Rect::new(
            rect.left() + dx,
            rect.top() + dy,
            rect.right() + dx,
            rect.bottom() + dy,
        )
    }

    fn attribute(&self, element: &Element, name: &str) -> Option<String> {
        element.get_attribute(name)
    }
}

/// Class lists of live DOM elements.
#[derive(Copy, Clone, Debug, Default)]
pub struct WebClasses;

impl ClassList for WebClasses {
    type Element = Element;

    fn add_class(&mut self, element: &Element, class: &str) {
        if let Err(err) = element.class_list().add_1(class) {
            warn!(class, error = %js_error(&err), "classList.add failed");
        }
    }

    fn remove_class(&mut self, element: &Element, class: &str) {
        if let Err(err) = element.class_list().remove_1(class) {
            warn!(class, error = %js_error(&err), "classList.remove failed");
        }
    }
}

/// Scroll subscription and timers for one [`WebWaypoints`].
struct WebHost {
    viewport: WebViewport,
    shared: Weak<Shared>,
    listeners: HashMap<BindingId, Closure<dyn FnMut()>>,
    next_binding: u64,
    timer_armed: bool,
}

impl WebHost {
    fn window(&self) -> &Window {
        &self.viewport.window
    }

    /// Arms one `setTimeout` for the engine's trailing check, if needed.
    fn arm_trailing(&mut self, deadline: Option<u64>, now: u64) {
        let Some(deadline) = deadline else {
            return;
        };
        if self.timer_armed {
            return;
        }
        let shared = self.shared.clone();
        let callback = Closure::once_into_js(move || {
            if let Some(shared) = shared.upgrade() {
                shared.handle_deadline();
            }
        });
        match set_timeout(self.window(), &callback, deadline.saturating_sub(now)) {
            Ok(_) => self.timer_armed = true,
            Err(err) => warn!(error = %js_error(&err), "failed to arm trailing scroll check"),
        }
    }
}

impl ScrollSource for WebHost {
    fn scroll_offset(&self) -> f64 {
        self.viewport.scroll_offset()
    }

    fn viewport_height(&self) -> f64 {
        self.viewport.viewport_height()
    }
}

impl SignalBinder for WebHost {
    fn bind_scroll(&mut self) -> BindingId {
        self.next_binding += 1;
        let binding = BindingId(self.next_binding);
        let shared = self.shared.clone();
        let listener = Closure::<dyn FnMut()>::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.handle_scroll();
            }
        });
        if let Err(err) = self
            .window()
            .add_event_listener_with_callback("scroll", listener.as_ref().unchecked_ref())
        {
            warn!(error = %js_error(&err), "failed to bind scroll listener");
        }
        self.listeners.insert(binding, listener);
        binding
    }

    fn unbind_scroll(&mut self, binding: BindingId) {
        let Some(listener) = self.listeners.remove(&binding) else {
            return;
        };
        if let Err(err) = self
            .window()
            .remove_event_listener_with_callback("scroll", listener.as_ref().unchecked_ref())
        {
            warn!(error = %js_error(&err), "failed to unbind scroll listener");
        }
    }
}

impl Drop for WebHost {
    fn drop(&mut self) {
        // A dropped closure must not stay registered on the window.
        let bindings: Vec<BindingId> = self.listeners.keys().copied().collect();
        for binding in bindings {
            self.unbind_scroll(binding);
        }
    }
}

struct State {
    engine: ScrollEngine<ElementWaypoint<Element>>,
    host: WebHost,
}

/// A crossing waiting to be reported to `onPoint` callbacks.
struct Fired {
    offset: f64,
    element: Element,
}

struct Shared {
    state: RefCell<State>,
    /// Filled by the engine's `point` handler while `state` is borrowed.
    fired: Rc<RefCell<Vec<Fired>>>,
    callbacks: RefCell<Vec<js_sys::Function>>,
}

impl Shared {
    fn handle_scroll(&self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            let now = now_ms();
            let State { engine, host } = &mut *state;
            engine.on_scroll(&*host, now);
            host.arm_trailing(engine.next_deadline(), now);
        }
        self.deliver();
    }

    fn handle_deadline(&self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            let now = now_ms();
            let State { engine, host } = &mut *state;
            host.timer_armed = false;
            engine.poll(&*host, now);
            host.arm_trailing(engine.next_deadline(), now);
        }
        self.deliver();
    }

    /// Reports queued crossings to JavaScript. Must run with `state` released.
    fn deliver(&self) {
        loop {
            let batch = mem::take(&mut *self.fired.borrow_mut());
            if batch.is_empty() {
                return;
            }
            let callbacks = self.callbacks.borrow().clone();
            for fired in &batch {
                let offset = JsValue::from_f64(fired.offset);
                let element: &JsValue = fired.element.as_ref();
                for callback in &callbacks {
                    if let Err(err) = callback.call2(&JsValue::NULL, &offset, element) {
                        warn!(error = %js_error(&err), "point callback threw");
                    }
                }
            }
        }
    }
}

/// Waypoints scanned from the current page and bound to its scroll event.
#[wasm_bindgen]
pub struct WebWaypoints {
    shared: Rc<Shared>,
}

impl fmt::Debug for WebWaypoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.state.try_borrow() {
            Ok(state) => f
                .debug_struct("WebWaypoints")
                .field("engine", &state.engine)
                .finish_non_exhaustive(),
            Err(_) => f.write_str("WebWaypoints { <busy> }"),
        }
    }
}

impl WebWaypoints {
    /// Scans the current page with `options`, toggles classes as waypoints
    /// fire, and starts listening to scroll events.
    ///
    /// Waypoints already in view fire here, before any `onPoint` callback
    /// can be registered; their class toggles still run.
    pub fn create(options: &WaypointOptions) -> Result<Self, WebError> {
        let window = web_sys::window().ok_or(WebError::NoWindow)?;
        let document = WebDocument::new(window.clone())?;
        let fired = Rc::new(RefCell::new(Vec::new()));
        let shared = Rc::new_cyclic(|weak| Shared {
            state: RefCell::new(State {
                engine: ScrollEngine::new(),
                host: WebHost {
                    viewport: WebViewport::new(window.clone()),
                    shared: weak.clone(),
                    listeners: HashMap::new(),
                    next_binding: 0,
                    timer_armed: false,
                },
            }),
            fired: Rc::clone(&fired),
            callbacks: RefCell::default(),
        });

        {
            let mut guard = shared.state.borrow_mut();
            let State { engine, host } = &mut *guard;
            let ids = register(&document, options, engine);
            debug!(waypoints = ids.len(), "web waypoints registered");

            engine.on(EventName::Point, move |event| {
                let WaypointEvent::Point { waypoint, at } = event else {
                    return;
                };
                let Some(toggle) = ClassToggle::for_point(*at, waypoint.payload()) else {
                    return;
                };
                let delay = toggle.due.saturating_sub(*at);
                let callback = Closure::once_into_js(move || toggle.apply(&mut WebClasses));
                if let Err(err) = set_timeout(&window, &callback, delay) {
                    warn!(error = %js_error(&err), "failed to schedule class toggle");
                }
            });
            engine.on(EventName::Point, move |event| {
                if let WaypointEvent::Point { waypoint, .. } = event {
                    fired.borrow_mut().push(Fired {
                        offset: waypoint.offset(),
                        element: waypoint.payload().element.clone(),
                    });
                }
            });
            engine.start(host, now_ms());
        }
        shared.deliver();

        Ok(Self { shared })
    }

    fn with_state(&self, f: impl FnOnce(&mut ScrollEngine<ElementWaypoint<Element>>, &mut WebHost)) {
        match self.shared.state.try_borrow_mut() {
            Ok(mut guard) => {
                let State { engine, host } = &mut *guard;
                f(engine, host);
            }
            Err(_) => warn!("waypoints are busy; call ignored"),
        }
        self.shared.deliver();
    }
}

#[wasm_bindgen]
impl WebWaypoints {
    /// Creates waypoints from a JavaScript options object.
    ///
    /// Recognized keys: `selector`, `addClass`, `removeClass`, `delay`, `offset`.
    #[wasm_bindgen(js_name = create)]
    pub fn create_js(options: JsValue) -> Result<Self, JsValue> {
        let options = if options.is_undefined() || options.is_null() {
            WaypointOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|err| WebError::InvalidOptions(err.to_string()))?
        };
        Ok(Self::create(&options)?)
    }

    /// Binds the scroll event again after [`stop`](Self::stop).
    pub fn start(&self) {
        self.with_state(|engine, host| engine.start(host, now_ms()));
    }

    /// Unbinds the scroll event.
    pub fn stop(&self) {
        self.with_state(|engine, host| engine.stop(host));
    }

    /// Calls `callback(offset, element)` whenever a waypoint fires.
    #[wasm_bindgen(js_name = onPoint)]
    pub fn on_point(&self, callback: js_sys::Function) {
        self.shared.callbacks.borrow_mut().push(callback);
    }

    /// Number of waypoints that have not fired yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared
            .state
            .try_borrow()
            .map_or(0, |state| state.engine.len())
    }

    /// Returns `true` while bound to the scroll event.
    #[wasm_bindgen(js_name = isRunning)]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared
            .state
            .try_borrow()
            .is_ok_and(|state| state.engine.is_running())
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use crate::engine::DEFAULT_THROTTLE_MS;
    use core::cell::Cell;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    const FIXTURE: &str = r#"
        <div id="near" class="js-waypoint" style="height: 10px"></div>
        <div style="height: 5000px"></div>
        <div id="far" class="js-waypoint" data-waypoint-addClass="reached" style="height: 10px"></div>
        <div style="height: 5000px"></div>
    "#;

    fn window() -> Window {
        web_sys::window().expect("window")
    }

    fn element(id: &str) -> Element {
        window()
            .document()
            .and_then(|document| document.get_element_by_id(id))
            .expect("fixture element")
    }

    fn mount_fixture() {
        let window = window();
        window.scroll_to_with_x_and_y(0.0, 0.0);
        let body = window.document().and_then(|d| d.body()).expect("body");
        body.set_inner_html(FIXTURE);
    }

    fn options() -> WaypointOptions {
        WaypointOptions {
            add_class: Some("seen".into()),
            ..WaypointOptions::default()
        }
    }

    /// Moves the viewport and delivers the `scroll` event synchronously.
    fn scroll_to(y: f64) {
        let window = window();
        window.scroll_to_with_x_and_y(0.0, y);
        let event = web_sys::Event::new("scroll").expect("event");
        window.dispatch_event(&event).expect("dispatch");
    }

    async fn sleep(ms: i32) {
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            window()
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                .expect("setTimeout");
        });
        JsFuture::from(promise).await.expect("timer");
    }

    fn has_class(id: &str, class: &str) -> bool {
        element(id).class_list().contains(class)
    }

    fn listener_count(waypoints: &WebWaypoints) -> usize {
        waypoints.shared.state.borrow().host.listeners.len()
    }

    #[wasm_bindgen_test]
    async fn create_scans_the_page_and_toggles_classes() {
        mount_fixture();
        let waypoints = WebWaypoints::create(&options()).expect("create");
        assert!(waypoints.is_running());
        // `near` is in view at load and fires during `create`.
        assert_eq!(waypoints.pending(), 1);

        sleep(20).await;
        assert!(has_class("near", "seen"));
        assert!(!has_class("far", "reached"));

        scroll_to(5_000.0);
        assert_eq!(waypoints.pending(), 0);
        sleep(20).await;
        // The element attribute overrides the global class.
        assert!(has_class("far", "reached"));
        assert!(!has_class("far", "seen"));
    }

    #[wasm_bindgen_test]
    fn stop_and_start_rebind_the_scroll_listener() {
        mount_fixture();
        let waypoints = WebWaypoints::create(&options()).expect("create");
        assert_eq!(listener_count(&waypoints), 1);

        waypoints.stop();
        assert!(!waypoints.is_running());
        assert_eq!(listener_count(&waypoints), 0);

        // Scrolling while stopped fires nothing.
        scroll_to(5_000.0);
        assert_eq!(waypoints.pending(), 1);

        waypoints.start();
        assert_eq!(listener_count(&waypoints), 1);
        // Starting runs an immediate check at the current position.
        assert_eq!(waypoints.pending(), 0);
    }

    #[wasm_bindgen_test]
    fn dropping_the_handle_releases_the_page() {
        mount_fixture();
        let waypoints = WebWaypoints::create(&options()).expect("create");
        let shared = Rc::downgrade(&waypoints.shared);
        drop(waypoints);
        assert!(shared.upgrade().is_none());

        // The listener is gone, so scrolling reaches no dropped closure.
        scroll_to(5_000.0);
    }

    #[wasm_bindgen_test]
    async fn burst_of_scrolls_arms_one_trailing_timer() {
        mount_fixture();
        let waypoints = WebWaypoints::create(&options()).expect("create");

        scroll_to(100.0);
        scroll_to(200.0);
        scroll_to(300.0);
        {
            let state = waypoints.shared.state.borrow();
            assert!(state.host.timer_armed);
            assert!(state.engine.next_deadline().is_some());
        }

        let interval = i32::try_from(DEFAULT_THROTTLE_MS).expect("throttle window");
        sleep(interval + 50).await;
        let state = waypoints.shared.state.borrow();
        assert!(!state.host.timer_armed);
        assert_eq!(state.engine.next_deadline(), None);
    }

    #[wasm_bindgen_test]
    fn point_callback_can_stop_the_waypoints() {
        mount_fixture();
        let waypoints = Rc::new(WebWaypoints::create(&options()).expect("create"));
        let seen = Rc::new(Cell::new(0));

        let handle = Rc::clone(&waypoints);
        let counter = Rc::clone(&seen);
        let callback = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |_offset, _element| {
            counter.set(counter.get() + 1);
            // Observes the engine after the crossing, then stops it.
            assert_eq!(handle.pending(), 0);
            handle.stop();
        });
        waypoints.on_point(callback.as_ref().unchecked_ref::<js_sys::Function>().clone());

        scroll_to(5_000.0);
        assert_eq!(seen.get(), 1);
        assert!(!waypoints.is_running());
        assert_eq!(listener_count(&waypoints), 0);

        // Releases the handle the callback captured.
        drop(callback);
    }
}
