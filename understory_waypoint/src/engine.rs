// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scroll engine: lifecycle, throttled crossing checks and notifications.
//!
//! ## States
//!
//! A [`ScrollEngine`] is either [`EngineState::Stopped`] (initial) or
//! [`EngineState::Running`].
//!
//! - [`ScrollEngine::start`] binds the scroll signal, runs one immediate check
//!   so waypoints that are already satisfied fire without waiting for a
//!   scroll, then emits [`EventName::Start`].
//! - [`ScrollEngine::stop`] releases the same binding, drops any parked
//!   trailing check and emits [`EventName::Stop`].
//!
//! Both are no-ops when the engine is already in the target state.
//!
//! ## Crossing check
//!
//! A check reads the scroll extent `E = scroll_offset + viewport_height`.
//! Every pending waypoint with `offset <= E` is crossed: it is removed from
//! the store and announced with one [`EventName::Point`] notification, in
//! store order. Waypoints with `offset > E` stay pending. Crossed waypoints
//! are never revisited, so each fires at most once, at the first check whose
//! extent reaches it.
//!
//! ## Throttling
//!
//! Scroll signals enter through [`ScrollEngine::on_scroll`], which runs the
//! check through a [`ThrottleGate`]. When a trailing check is parked,
//! [`ScrollEngine::next_deadline`] reports when the host should call
//! [`ScrollEngine::poll`].
//!
//! ```
//! use understory_waypoint::{BindingId, EventName, ScrollEngine, ScrollSource, SignalBinder};
//!
//! struct Page { offset: f64 }
//!
//! impl ScrollSource for Page {
//!     fn scroll_offset(&self) -> f64 { self.offset }
//!     fn viewport_height(&self) -> f64 { 100.0 }
//! }
//!
//! impl SignalBinder for Page {
//!     fn bind_scroll(&mut self) -> BindingId { BindingId(1) }
//!     fn unbind_scroll(&mut self, _binding: BindingId) {}
//! }
//!
//! let mut engine = ScrollEngine::new();
//! engine.add_point(50.0, "intro");
//! engine.add_point(400.0, "footer");
//!
//! let mut page = Page { offset: 0.0 };
//! // The intro is already in view and fires during `start`.
//! engine.start(&mut page, 0);
//! assert_eq!(engine.len(), 1);
//!
//! page.offset = 300.0;
//! assert_eq!(engine.on_scroll(&page, 1_000), 1);
//! assert!(engine.is_empty());
//! ```

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::emitter::{Emitter, HandlerId};
use crate::host::{BindingId, ScrollSource, SignalBinder};
use crate::store::{Waypoint, WaypointRef, WaypointStore};
use crate::throttle::ThrottleGate;

/// Throttle window applied to scroll signals unless configured otherwise.
pub const DEFAULT_THROTTLE_MS: u64 = 200;

/// Lifecycle state of a [`ScrollEngine`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Not bound to the scroll signal.
    Stopped,
    /// Bound to the scroll signal and checking.
    Running,
}

/// Notification names an engine emits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventName {
    /// The engine started.
    Start,
    /// The engine stopped.
    Stop,
    /// A waypoint was crossed.
    Point,
}

/// Arguments delivered with a notification.
#[derive(Clone, Debug, PartialEq)]
pub enum WaypointEvent<P> {
    /// Delivered under [`EventName::Start`].
    Start,
    /// Delivered under [`EventName::Stop`].
    Stop,
    /// Delivered under [`EventName::Point`].
    Point {
        /// The crossed waypoint; it is no longer in the store.
        waypoint: Waypoint<P>,
        /// Timestamp of the check that crossed it, in milliseconds.
        at: u64,
    },
}

impl<P> WaypointEvent<P> {
    /// Name this event is delivered under.
    #[must_use]
    pub const fn name(&self) -> EventName {
        match self {
            Self::Start => EventName::Start,
            Self::Stop => EventName::Stop,
            Self::Point { .. } => EventName::Point,
        }
    }
}

/// Tracks pending waypoints and fires them as the viewport reaches them.
///
/// `P` is opaque caller data handed back with each `point` notification.
pub struct ScrollEngine<P> {
    store: WaypointStore<P>,
    gate: ThrottleGate<()>,
    events: Emitter<EventName, WaypointEvent<P>>,
    binding: Option<BindingId>,
}

impl<P> core::fmt::Debug for ScrollEngine<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScrollEngine")
            .field("pending", &self.store.len())
            .field("gate", &self.gate)
            .field("events", &self.events)
            .field("binding", &self.binding)
            .finish()
    }
}

impl<P> Default for ScrollEngine<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ScrollEngine<P> {
    /// Creates a stopped engine with the default throttle window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_throttle(DEFAULT_THROTTLE_MS)
    }

    /// Creates a stopped engine whose scroll checks run at most once per
    /// `interval` milliseconds.
    #[must_use]
    pub fn with_throttle(interval: u64) -> Self {
        Self {
            store: WaypointStore::new(),
            gate: ThrottleGate::new(interval),
            events: Emitter::new(),
            binding: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> EngineState {
        if self.binding.is_some() {
            EngineState::Running
        } else {
            EngineState::Stopped
        }
    }

    /// Returns `true` while bound to the scroll signal.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.binding.is_some()
    }

    /// Throttle window in milliseconds.
    #[must_use]
    pub const fn throttle_interval(&self) -> u64 {
        self.gate.interval()
    }

    /// Registers a waypoint at `offset` document pixels. Valid in either state.
    pub fn add_point(&mut self, offset: f64, payload: P) -> WaypointRef {
        let id = self.store.add(offset, payload);
        trace!(offset, id = id.get(), "waypoint added");
        id
    }

    /// Removes a pending waypoint. Fired or unknown handles are ignored.
    pub fn remove(&mut self, id: WaypointRef) -> Option<Waypoint<P>> {
        self.store.remove(id)
    }

    /// Looks up a pending waypoint.
    #[must_use]
    pub fn get(&self, id: WaypointRef) -> Option<&Waypoint<P>> {
        self.store.get(id)
    }

    /// Iterates over pending waypoints in registration order.
    pub fn waypoints(&self) -> impl Iterator<Item = &Waypoint<P>> {
        self.store.iter()
    }

    /// Number of pending waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no waypoint is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Subscribes to a notification.
    pub fn on(
        &mut self,
        name: EventName,
        handler: impl FnMut(&WaypointEvent<P>) + 'static,
    ) -> HandlerId {
        self.events.on(name, handler)
    }

    /// Unsubscribes a handler registered with [`on`](Self::on).
    pub fn off(&mut self, name: EventName, id: HandlerId) -> bool {
        self.events.off(&name, id)
    }

    /// Delivers `event` to the handlers subscribed to `name`.
    pub fn emit(&mut self, name: EventName, event: &WaypointEvent<P>) -> usize {
        self.events.emit(&name, event)
    }

    /// Binds the scroll signal, runs an immediate check and emits `start`.
    ///
    /// Does nothing while already running.
    pub fn start<H>(&mut self, host: &mut H, now: u64)
    where
        H: ScrollSource + SignalBinder + ?Sized,
    {
        if self.binding.is_some() {
            debug!("start ignored: already running");
            return;
        }
        let binding = host.bind_scroll();
        self.binding = Some(binding);
        debug!(binding = binding.0, pending = self.store.len(), "waypoints started");
        self.check(&*host, now);
        self.events.emit(&EventName::Start, &WaypointEvent::Start);
    }

    /// Releases the scroll binding and emits `stop`.
    ///
    /// A parked trailing check is dropped. Does nothing while stopped.
    pub fn stop<B: SignalBinder + ?Sized>(&mut self, binder: &mut B) {
        let Some(binding) = self.binding.take() else {
            debug!("stop ignored: not running");
            return;
        };
        binder.unbind_scroll(binding);
        self.gate.cancel();
        debug!(binding = binding.0, pending = self.store.len(), "waypoints stopped");
        self.events.emit(&EventName::Stop, &WaypointEvent::Stop);
    }

    /// Throttled scroll handler.
    ///
    /// Runs a check when the throttle window is open, otherwise parks one for
    /// [`poll`](Self::poll). Ignored while stopped. Returns the number of
    /// waypoints fired.
    pub fn on_scroll<S: ScrollSource + ?Sized>(&mut self, source: &S, now: u64) -> usize {
        if !self.is_running() {
            return 0;
        }
        match self.gate.call(now, ()) {
            Some(()) => self.check(source, now),
            None => 0,
        }
    }

    /// Runs the parked trailing check once its deadline has passed.
    pub fn poll<S: ScrollSource + ?Sized>(&mut self, source: &S, now: u64) -> usize {
        if !self.is_running() {
            return 0;
        }
        match self.gate.poll(now) {
            Some(()) => self.check(source, now),
            None => 0,
        }
    }

    /// When a trailing check is parked, the timestamp at which to [`poll`](Self::poll).
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.gate.deadline()
    }

    /// Unthrottled crossing check against the current scroll extent.
    ///
    /// Returns the number of waypoints fired.
    pub fn check<S: ScrollSource + ?Sized>(&mut self, source: &S, now: u64) -> usize {
        let extent = source.scroll_extent();
        let mut crossed: SmallVec<[WaypointRef; 8]> = SmallVec::new();
        self.store.for_each_pending(|point| {
            if point.is_crossed_by(extent) {
                crossed.push(point.id());
            }
        });
        trace!(extent, crossed = crossed.len(), pending = self.store.len(), "scroll check");
        if crossed.is_empty() {
            return 0;
        }

        let fired = self.store.remove_all(&crossed);
        let count = fired.len();
        for waypoint in fired {
            trace!(offset = waypoint.offset(), id = waypoint.id().get(), "waypoint reached");
            self.events
                .emit(&EventName::Point, &WaypointEvent::Point { waypoint, at: now });
        }
        count
    }
}
