// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Platform seams the engine is driven through.
//!
//! The engine does not know about windows or documents. A host supplies the
//! current scroll geometry through [`ScrollSource`] and owns the platform's
//! scroll subscription through [`SignalBinder`]. Tests use small fakes; the
//! `web` adapter implements both on top of `web-sys`.

/// Identity of one scroll-signal subscription.
///
/// Issued by [`SignalBinder::bind_scroll`] and handed back unchanged to
/// [`SignalBinder::unbind_scroll`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindingId(pub u64);

/// Current vertical scroll geometry.
pub trait ScrollSource {
    /// Vertical scroll offset of the viewport, in document pixels.
    fn scroll_offset(&self) -> f64;

    /// Height of the viewport, in document pixels.
    fn viewport_height(&self) -> f64;

    /// Document offset of the viewport's bottom edge.
    fn scroll_extent(&self) -> f64 {
        self.scroll_offset() + self.viewport_height()
    }
}

/// Subscribes the engine's throttled handler to the platform scroll signal.
///
/// Once bound, the host is expected to forward each scroll signal to
/// [`ScrollEngine::on_scroll`](crate::ScrollEngine::on_scroll) until the
/// binding is released.
pub trait SignalBinder {
    /// Starts delivering scroll signals and returns the subscription identity.
    fn bind_scroll(&mut self) -> BindingId;

    /// Stops delivering scroll signals for `binding`.
    fn unbind_scroll(&mut self, binding: BindingId);
}
