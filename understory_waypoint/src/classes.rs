// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred class toggles applied when element waypoints fire.
//!
//! A fired [`ElementWaypoint`] becomes a [`ClassToggle`] due at
//! `fired_at + delay`. [`ClassSchedule`] keeps toggles until the host runs
//! them against a [`ClassList`]; once scheduled a toggle is never cancelled.

use alloc::string::String;
use alloc::vec::Vec;

use tracing::trace;

/// Adds and removes CSS classes on elements.
pub trait ClassList {
    /// Element handle type.
    type Element;

    /// Adds `class` to `element`.
    fn add_class(&mut self, element: &Self::Element, class: &str);

    /// Removes `class` from `element`.
    fn remove_class(&mut self, element: &Self::Element, class: &str);
}

/// Payload of a waypoint registered for a document element.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementWaypoint<E> {
    /// Element the waypoint was created from.
    pub element: E,
    /// Class added when the waypoint fires.
    pub add_class: Option<String>,
    /// Class removed when the waypoint fires.
    pub remove_class: Option<String>,
    /// Delay between firing and toggling, in milliseconds.
    pub delay: u64,
}

/// One pending class change.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassToggle<E> {
    /// Element to change.
    pub element: E,
    /// Class to add.
    pub add_class: Option<String>,
    /// Class to remove.
    pub remove_class: Option<String>,
    /// Timestamp at which the change is due, in milliseconds.
    pub due: u64,
}

impl<E> ClassToggle<E> {
    /// The change owed to `point` when it fired at `fired_at`, due after its
    /// delay.
    ///
    /// Returns `None` when the waypoint configures neither class.
    #[must_use]
    pub fn for_point(fired_at: u64, point: &ElementWaypoint<E>) -> Option<Self>
    where
        E: Clone,
    {
        if point.add_class.is_none() && point.remove_class.is_none() {
            return None;
        }
        Some(Self {
            element: point.element.clone(),
            add_class: point.add_class.clone(),
            remove_class: point.remove_class.clone(),
            due: fired_at.saturating_add(point.delay),
        })
    }

    /// Applies the change: add first, then remove.
    pub fn apply<L: ClassList<Element = E> + ?Sized>(&self, classes: &mut L) {
        if let Some(class) = &self.add_class {
            classes.add_class(&self.element, class);
        }
        if let Some(class) = &self.remove_class {
            classes.remove_class(&self.element, class);
        }
    }
}

/// Queue of class toggles waiting for their due time.
#[derive(Clone, Debug)]
pub struct ClassSchedule<E> {
    queue: Vec<ClassToggle<E>>,
}

impl<E> Default for ClassSchedule<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ClassSchedule<E> {
    /// Creates an empty schedule.
    #[must_use]
    pub const fn new() -> Self {
        Self { queue: Vec::new() }
    }

    /// Number of toggles not yet applied.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Earliest due time among scheduled toggles.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.iter().map(|toggle| toggle.due).min()
    }

    /// Schedules the toggle for a waypoint that fired at `fired_at`.
    ///
    /// Waypoints with neither class configured schedule nothing.
    pub fn schedule(&mut self, fired_at: u64, point: &ElementWaypoint<E>)
    where
        E: Clone,
    {
        if let Some(toggle) = ClassToggle::for_point(fired_at, point) {
            trace!(due = toggle.due, "class toggle scheduled");
            self.queue.push(toggle);
        }
    }

    /// Applies every toggle due at `now`, in scheduling order.
    ///
    /// Returns the number applied.
    pub fn run_due<L: ClassList<Element = E> + ?Sized>(&mut self, now: u64, classes: &mut L) -> usize {
        let mut applied = 0;
        self.queue.retain(|toggle| {
            if toggle.due <= now {
                toggle.apply(&mut *classes);
                applied += 1;
                false
            } else {
                true
            }
        });
        applied
    }
}
