// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_waypoint --heading-base-level=0

//! Understory Waypoint: fire notifications when scrolling reaches document offsets.
//!
//! A waypoint is a vertical document offset paired with caller data. Once the
//! bottom edge of the viewport reaches it (scroll offset plus viewport height,
//! inclusive), the waypoint fires exactly once and is dropped.
//!
//! The core concepts are:
//!
//! - [`ScrollEngine`]: owns the pending waypoints and a start/stop lifecycle.
//!   Scroll signals go through a [`ThrottleGate`]; each check fires every
//!   crossed waypoint as an [`EventName::Point`] notification.
//! - [`WaypointStore`]: the ordered collection of pending waypoints, addressed
//!   by [`WaypointRef`] handles.
//! - [`Emitter`]: the key-addressed publish/subscribe channel the engine
//!   composes for `start`, `stop` and `point` notifications.
//! - [`ScrollSource`] and [`SignalBinder`]: the seams a host implements to
//!   supply scroll geometry and own the platform scroll subscription.
//!
//! On top of the core, [`create`] scans a [`Document`] for marked elements,
//! registers one waypoint per element with [`WaypointOptions`] and per-element
//! `data-waypoint-*` overrides, and toggles CSS classes through a
//! [`ClassSchedule`] when they fire.
//!
//! This crate deliberately does **not** read clocks or schedule timers. Every
//! time-dependent call takes a millisecond timestamp, and deferred work is
//! reported as a deadline ([`ScrollEngine::next_deadline`],
//! [`Waypoints::next_deadline`]) for the host to service.
//!
//! ## Minimal example
//!
//! ```rust
//! use understory_waypoint::{
//!     BindingId, EventName, ScrollEngine, ScrollSource, SignalBinder, WaypointEvent,
//! };
//!
//! struct Page { y: f64, bound: bool }
//!
//! impl ScrollSource for Page {
//!     fn scroll_offset(&self) -> f64 { self.y }
//!     fn viewport_height(&self) -> f64 { 800.0 }
//! }
//!
//! impl SignalBinder for Page {
//!     fn bind_scroll(&mut self) -> BindingId { self.bound = true; BindingId(0) }
//!     fn unbind_scroll(&mut self, _: BindingId) { self.bound = false; }
//! }
//!
//! let mut engine = ScrollEngine::new();
//! engine.on(EventName::Point, |event| {
//!     if let WaypointEvent::Point { waypoint, .. } = event {
//!         assert_eq!(*waypoint.payload(), "pricing");
//!     }
//! });
//! let pricing = engine.add_point(1_200.0, "pricing");
//!
//! let mut page = Page { y: 0.0, bound: false };
//! engine.start(&mut page, 0);
//! assert!(page.bound);
//! assert!(engine.get(pricing).is_some());
//!
//! // The host forwards scroll events with a timestamp.
//! page.y = 400.0;
//! assert_eq!(engine.on_scroll(&page, 16), 1);
//! assert!(engine.get(pricing).is_none());
//!
//! engine.stop(&mut page);
//! assert!(!page.bound);
//! ```
//!
//! ## Features
//!
//! - `std` (default): enables `std` support for dependencies such as `kurbo`.
//! - `libm`: enables `no_std` + `alloc` builds that rely on `libm` for floating-point math.
//! - `serde`: derives `Deserialize` for [`WaypointOptions`] (camelCase keys).
//! - `web`: enables [`adapters::web`], which binds the engine to a browser page
//!   through `wasm-bindgen` and `web-sys`.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod adapters;
mod classes;
mod emitter;
mod engine;
mod host;
mod options;
mod scan;
mod store;
mod throttle;

#[cfg(test)]
mod testing;

pub use classes::{ClassList, ClassSchedule, ClassToggle, ElementWaypoint};
pub use emitter::{Emitter, HandlerId};
pub use engine::{DEFAULT_THROTTLE_MS, EngineState, EventName, ScrollEngine, WaypointEvent};
pub use host::{BindingId, ScrollSource, SignalBinder};
pub use options::{
    ADD_CLASS_ATTR, DEFAULT_SELECTOR, DELAY_ATTR, OFFSET_ATTR, REMOVE_CLASS_ATTR, ResolvedOptions,
    WaypointOptions,
};
pub use scan::{Document, Waypoints, create, register};
pub use store::{Waypoint, WaypointRef, WaypointStore};
pub use throttle::ThrottleGate;
