// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Options for document-scanned waypoints and per-element overrides.
//!
//! Global [`WaypointOptions`] apply to every matched element. An element can
//! override the offset, classes and delay with `data-waypoint-*` attributes.
//! [`WaypointOptions::resolve`] applies the precedence once, at registration:
//! a usable attribute value, else the global option, else the default.
//!
//! ```
//! use understory_waypoint::{WaypointOptions, DELAY_ATTR, OFFSET_ATTR};
//!
//! let options = WaypointOptions {
//!     add_class: Some("is-visible".into()),
//!     offset: 40.0,
//!     ..WaypointOptions::default()
//! };
//!
//! let resolved = options.resolve(|name| match name {
//!     OFFSET_ATTR => Some("-120".into()),
//!     DELAY_ATTR => Some("soon".into()),
//!     _ => None,
//! });
//! assert_eq!(resolved.offset, -120.0);
//! // Unparseable values fall back to the global option.
//! assert_eq!(resolved.delay, 0);
//! assert_eq!(resolved.add_class.as_deref(), Some("is-visible"));
//! ```

use alloc::string::String;

use tracing::warn;

/// Selector used when none is configured.
pub const DEFAULT_SELECTOR: &str = ".js-waypoint";

/// Per-element offset override, in pixels.
pub const OFFSET_ATTR: &str = "data-waypoint-offset";
/// Per-element class to add when the waypoint fires.
pub const ADD_CLASS_ATTR: &str = "data-waypoint-addClass";
/// Per-element class to remove when the waypoint fires.
pub const REMOVE_CLASS_ATTR: &str = "data-waypoint-removeClass";
/// Per-element delay override, in milliseconds.
pub const DELAY_ATTR: &str = "data-waypoint-delay";

/// Global options for scanning a document for waypoints.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct WaypointOptions {
    /// Selector matching the elements that become waypoints.
    pub selector: String,
    /// Class added to an element when its waypoint fires.
    pub add_class: Option<String>,
    /// Class removed from an element when its waypoint fires.
    pub remove_class: Option<String>,
    /// Delay between firing and toggling classes, in milliseconds.
    pub delay: u64,
    /// Offset added to each element's top edge, in pixels.
    pub offset: f64,
}

impl Default for WaypointOptions {
    fn default() -> Self {
        Self {
            selector: String::from(DEFAULT_SELECTOR),
            add_class: None,
            remove_class: None,
            delay: 0,
            offset: 0.0,
        }
    }
}

/// Per-element settings after applying attribute overrides.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedOptions {
    /// Class added when the waypoint fires.
    pub add_class: Option<String>,
    /// Class removed when the waypoint fires.
    pub remove_class: Option<String>,
    /// Delay before toggling classes, in milliseconds.
    pub delay: u64,
    /// Offset added to the element's top edge, in pixels.
    pub offset: f64,
}

impl WaypointOptions {
    /// Returns the selector, falling back to [`DEFAULT_SELECTOR`] when blank.
    #[must_use]
    pub fn selector(&self) -> &str {
        if self.selector.trim().is_empty() {
            DEFAULT_SELECTOR
        } else {
            &self.selector
        }
    }

    /// Resolves the settings for one element.
    ///
    /// `attribute` looks up an attribute on the element by name.
    pub fn resolve(&self, attribute: impl Fn(&str) -> Option<String>) -> ResolvedOptions {
        let offset = attribute(OFFSET_ATTR)
            .and_then(|raw| parse_number(&raw))
            .unwrap_or(if self.offset.is_finite() { self.offset } else { 0.0 });
        let delay = attribute(DELAY_ATTR)
            .and_then(|raw| parse_delay(&raw))
            .unwrap_or(self.delay);
        ResolvedOptions {
            add_class: class_name(attribute(ADD_CLASS_ATTR))
                .or_else(|| class_name(self.add_class.clone())),
            remove_class: class_name(attribute(REMOVE_CLASS_ATTR))
                .or_else(|| class_name(self.remove_class.clone())),
            delay,
            offset,
        }
    }
}

fn class_name(raw: Option<String>) -> Option<String> {
    raw.filter(|name| !name.trim().is_empty())
}

fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(value = raw, "ignoring non-numeric waypoint attribute");
            None
        }
    }
}

fn parse_delay(raw: &str) -> Option<u64> {
    let value = parse_number(raw)?;
    if value < 0.0 {
        warn!(value, "ignoring negative waypoint delay");
        return None;
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Delays are whole milliseconds; the fraction is dropped and huge values saturate."
    )]
    let millis = value as u64;
    Some(millis)
}
