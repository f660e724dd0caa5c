// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pending waypoint storage.

use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::mem;

/// Identity of a registered waypoint.
///
/// Handles are unique within the store that issued them. Two waypoints with
/// the same offset and payload still have distinct handles.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaypointRef(u64);

impl WaypointRef {
    /// Returns the raw handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A vertical document offset paired with caller data.
#[derive(Clone, Debug, PartialEq)]
pub struct Waypoint<P> {
    id: WaypointRef,
    offset: f64,
    payload: P,
}

impl<P> Waypoint<P> {
    /// Handle of this waypoint.
    #[must_use]
    pub const fn id(&self) -> WaypointRef {
        self.id
    }

    /// Threshold offset in document pixels.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Caller data supplied at registration.
    #[must_use]
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    /// Consumes the waypoint, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> P {
        self.payload
    }

    /// Returns `true` if a viewport whose bottom edge sits at `extent` has
    /// reached this waypoint. The threshold is inclusive.
    #[must_use]
    pub fn is_crossed_by(&self, extent: f64) -> bool {
        extent >= self.offset
    }
}

/// Ordered collection of waypoints that have not fired yet.
///
/// Handles are issued in increasing order and the store only ever appends,
/// so the backing vector stays sorted by handle.
#[derive(Clone, Debug)]
pub struct WaypointStore<P> {
    points: Vec<Waypoint<P>>,
    next_id: u64,
}

impl<P> Default for WaypointStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> WaypointStore<P> {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            points: Vec::new(),
            next_id: 0,
        }
    }

    /// Appends a pending waypoint and returns its handle.
    pub fn add(&mut self, offset: f64, payload: P) -> WaypointRef {
        let id = WaypointRef(self.next_id);
        self.next_id += 1;
        self.points.push(Waypoint {
            id,
            offset,
            payload,
        });
        id
    }

    /// Visits every pending waypoint once, in insertion order.
    pub fn for_each_pending(&self, mut visitor: impl FnMut(&Waypoint<P>)) {
        for point in &self.points {
            visitor(point);
        }
    }

    /// Keeps only the waypoints not listed in `refs` and returns the others
    /// in store order.
    ///
    /// Runs in one pass over the store when `refs` is sorted, which is the
    /// case for handles collected with [`for_each_pending`](Self::for_each_pending).
    /// Unknown and repeated handles are ignored.
    pub fn remove_all(&mut self, refs: &[WaypointRef]) -> Vec<Waypoint<P>> {
        if refs.is_empty() {
            return Vec::new();
        }
        let wanted: Cow<'_, [WaypointRef]> = if refs.is_sorted() {
            Cow::Borrowed(refs)
        } else {
            let mut sorted = refs.to_vec();
            sorted.sort_unstable();
            Cow::Owned(sorted)
        };
        let mut wanted = wanted.iter().peekable();
        let (removed, kept): (Vec<_>, Vec<_>) = mem::take(&mut self.points)
            .into_iter()
            .partition(|point| {
                while wanted.next_if(|id| **id < point.id).is_some() {}
                wanted.next_if(|id| **id == point.id).is_some()
            });
        self.points = kept;
        removed
    }

    /// Removes a waypoint by handle. Absent handles are ignored.
    pub fn remove(&mut self, id: WaypointRef) -> Option<Waypoint<P>> {
        let index = self
            .points
            .binary_search_by_key(&id, |point| point.id)
            .ok()?;
        Some(self.points.remove(index))
    }

    /// Looks up a pending waypoint by handle.
    #[must_use]
    pub fn get(&self, id: WaypointRef) -> Option<&Waypoint<P>> {
        let index = self
            .points
            .binary_search_by_key(&id, |point| point.id)
            .ok()?;
        self.points.get(index)
    }

    /// Iterates over pending waypoints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint<P>> {
        self.points.iter()
    }

    /// Number of pending waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if no waypoint is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drops every pending waypoint. Handles keep increasing afterwards.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}
