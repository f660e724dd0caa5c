// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Document scanning: one waypoint per matching element, with class toggles.
//!
//! [`create`] is the batteries-included entry point. It queries the
//! [`Document`] for [`WaypointOptions::selector`], registers a waypoint at each
//! element's top edge plus the resolved offset, wires `point` notifications
//! into a [`ClassSchedule`] and starts the engine.
//!
//! The host keeps driving the returned [`Waypoints`]:
//!
//! - forward scroll signals to [`Waypoints::on_scroll`];
//! - call [`Waypoints::poll`] at [`Waypoints::next_deadline`] so trailing
//!   checks and delayed class toggles run.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::Rect;
use tracing::debug;

use crate::classes::{ClassList, ClassSchedule, ElementWaypoint};
use crate::engine::{EventName, ScrollEngine, WaypointEvent};
use crate::host::{ScrollSource, SignalBinder};
use crate::options::WaypointOptions;
use crate::store::WaypointRef;

/// Read-only view of the elements a page offers as waypoints.
pub trait Document {
    /// Element handle type.
    type Element;

    /// Elements matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Vec<Self::Element>;

    /// Bounds of `element` in document coordinates (y grows downwards).
    fn bounds(&self, element: &Self::Element) -> Rect;

    /// Value of the attribute `name` on `element`, if present.
    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;
}

/// Registers one waypoint per element matching the options' selector.
///
/// The threshold is the element's top edge plus the resolved offset. Returns
/// the handles in document order.
pub fn register<D>(
    document: &D,
    options: &WaypointOptions,
    engine: &mut ScrollEngine<ElementWaypoint<D::Element>>,
) -> Vec<WaypointRef>
where
    D: Document + ?Sized,
{
    let elements = document.query_all(options.selector());
    debug!(selector = options.selector(), matched = elements.len(), "scanning for waypoints");
    elements
        .into_iter()
        .map(|element| {
            let resolved = options.resolve(|name| document.attribute(&element, name));
            let threshold = document.bounds(&element).y0 + resolved.offset;
            engine.add_point(
                threshold,
                ElementWaypoint {
                    element,
                    add_class: resolved.add_class,
                    remove_class: resolved.remove_class,
                    delay: resolved.delay,
                },
            )
        })
        .collect()
}

/// Scans `document`, subscribes class toggling and starts the engine.
pub fn create<D, H>(
    document: &D,
    host: &mut H,
    options: &WaypointOptions,
    now: u64,
) -> Waypoints<D::Element>
where
    D: Document + ?Sized,
    D::Element: Clone + 'static,
    H: ScrollSource + SignalBinder + ?Sized,
{
    let mut engine = ScrollEngine::new();
    register(document, options, &mut engine);

    let toggles = Rc::new(RefCell::new(ClassSchedule::new()));
    let sink = Rc::clone(&toggles);
    engine.on(EventName::Point, move |event| {
        if let WaypointEvent::Point { waypoint, at } = event {
            sink.borrow_mut().schedule(*at, waypoint.payload());
        }
    });
    engine.start(host, now);

    Waypoints { engine, toggles }
}

/// A started engine over document elements plus its pending class toggles.
#[derive(Debug)]
pub struct Waypoints<E> {
    engine: ScrollEngine<ElementWaypoint<E>>,
    toggles: Rc<RefCell<ClassSchedule<E>>>,
}

impl<E> Waypoints<E> {
    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &ScrollEngine<ElementWaypoint<E>> {
        &self.engine
    }

    /// The underlying engine, for subscribing or adding points.
    pub fn engine_mut(&mut self) -> &mut ScrollEngine<ElementWaypoint<E>> {
        &mut self.engine
    }

    /// Number of class toggles not yet applied.
    #[must_use]
    pub fn scheduled_toggles(&self) -> usize {
        self.toggles.borrow().len()
    }

    /// Forwards a scroll signal to the engine.
    pub fn on_scroll<S: ScrollSource + ?Sized>(&mut self, source: &S, now: u64) -> usize {
        self.engine.on_scroll(source, now)
    }

    /// Runs the trailing check if due, then every class toggle due at `now`.
    ///
    /// Returns the number of toggles applied.
    pub fn poll<S, L>(&mut self, source: &S, classes: &mut L, now: u64) -> usize
    where
        S: ScrollSource + ?Sized,
        L: ClassList<Element = E> + ?Sized,
    {
        self.engine.poll(source, now);
        self.run_due(classes, now)
    }

    /// Applies every class toggle due at `now`.
    pub fn run_due<L: ClassList<Element = E> + ?Sized>(&mut self, classes: &mut L, now: u64) -> usize {
        self.toggles.borrow_mut().run_due(now, classes)
    }

    /// Earliest time the host should call [`poll`](Self::poll).
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        let toggles = self.toggles.borrow().next_deadline();
        match (self.engine.next_deadline(), toggles) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Stops the engine. Already scheduled class toggles still run.
    pub fn stop<B: SignalBinder + ?Sized>(&mut self, binder: &mut B) {
        self.engine.stop(binder);
    }
}

#[cfg(test)]
mod tests {
    use super::{create, register};
    use crate::engine::ScrollEngine;
    use crate::options::{ADD_CLASS_ATTR, DELAY_ATTR, OFFSET_ATTR, WaypointOptions};
    use crate::testing::FakePage;
    use alloc::vec::Vec;

    #[test]
    fn register_resolves_thresholds_per_element() {
        let mut page = FakePage::new(0.0, 100.0);
        page.push_element(500.0, &[("class", "js-waypoint")]);
        page.push_element(800.0, &[("class", "js-waypoint"), (OFFSET_ATTR, "-300")]);
        page.push_element(900.0, &[("class", "other")]);

        let options = WaypointOptions {
            offset: 20.0,
            ..WaypointOptions::default()
        };
        let mut engine = ScrollEngine::new();
        let ids = register(&page, &options, &mut engine);
        assert_eq!(ids.len(), 2);

        let thresholds: Vec<f64> = engine.waypoints().map(|point| point.offset()).collect();
        assert_eq!(thresholds, [520.0, 500.0]);
    }

    #[test]
    fn create_starts_and_toggles_classes_after_delay() {
        let mut page = FakePage::new(0.0, 600.0);
        let near = page.push_element(100.0, &[("class", "js-waypoint")]);
        let far = page.push_element(
            1_500.0,
            &[
                ("class", "js-waypoint"),
                (ADD_CLASS_ATTR, "slide-in"),
                (DELAY_ATTR, "50"),
            ],
        );

        let options = WaypointOptions {
            add_class: Some("is-visible".into()),
            remove_class: Some("js-waypoint".into()),
            ..WaypointOptions::default()
        };
        let mut waypoints = create(&page.clone(), &mut page, &options, 0);
        assert!(waypoints.engine().is_running());
        assert_eq!(page.bind_count(), 1);

        // The near element fired during start; its toggle is due immediately.
        assert_eq!(waypoints.scheduled_toggles(), 1);
        assert_eq!(waypoints.next_deadline(), Some(0));
        assert_eq!(waypoints.run_due(&mut page, 0), 1);
        assert!(page.has_class(near, "is-visible"));
        assert!(!page.has_class(near, "js-waypoint"));

        page.scroll_to(1_000.0);
        assert_eq!(waypoints.on_scroll(&page, 1_000), 1);
        assert_eq!(waypoints.next_deadline(), Some(1_050));
        assert_eq!(waypoints.poll(&page.clone(), &mut page, 1_049), 0);
        assert_eq!(waypoints.poll(&page.clone(), &mut page, 1_050), 1);
        assert!(page.has_class(far, "slide-in"));
        assert!(!page.has_class(far, "is-visible"));
        assert!(waypoints.engine().is_empty());

        waypoints.stop(&mut page);
        assert!(page.bound().is_none());
    }
}
