// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory page used by unit tests.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use kurbo::Rect;

use crate::classes::ClassList;
use crate::engine::ScrollEngine;
use crate::host::{BindingId, ScrollSource, SignalBinder};
use crate::scan::Document;

#[derive(Clone, Debug)]
struct FakeElement {
    top: f64,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
}

/// A page with a fixed viewport, a scroll position and a flat element list.
///
/// Elements are addressed by their index and are 20px tall.
#[derive(Clone, Debug)]
pub(crate) struct FakePage {
    offset: f64,
    height: f64,
    bound: Option<BindingId>,
    unbound: Vec<BindingId>,
    binds: u64,
    elements: Vec<FakeElement>,
}

impl FakePage {
    pub(crate) fn new(offset: f64, height: f64) -> Self {
        Self {
            offset,
            height,
            bound: None,
            unbound: Vec::new(),
            binds: 0,
            elements: Vec::new(),
        }
    }

    pub(crate) fn scroll_to(&mut self, offset: f64) {
        self.offset = offset;
    }

    pub(crate) fn bind_count(&self) -> u64 {
        self.binds
    }

    pub(crate) fn bound(&self) -> Option<BindingId> {
        self.bound
    }

    pub(crate) fn unbound(&self) -> &[BindingId] {
        &self.unbound
    }

    /// Delivers a scroll signal the way a browser would: only while bound.
    pub(crate) fn dispatch_scroll<P>(&self, engine: &mut ScrollEngine<P>, now: u64) -> usize {
        if self.bound.is_some() {
            engine.on_scroll(self, now)
        } else {
            0
        }
    }

    /// Adds an element whose top edge sits at `top`. A `class` attribute
    /// seeds its class list.
    pub(crate) fn push_element(&mut self, top: f64, attributes: &[(&str, &str)]) -> usize {
        let classes = attributes
            .iter()
            .filter(|(name, _)| *name == "class")
            .flat_map(|&(_, value)| value.split_whitespace())
            .map(ToString::to_string)
            .collect();
        self.elements.push(FakeElement {
            top,
            attributes: attributes
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
            classes,
        });
        self.elements.len() - 1
    }

    pub(crate) fn has_class(&self, element: usize, class: &str) -> bool {
        self.elements
            .get(element)
            .is_some_and(|el| el.classes.iter().any(|c| c == class))
    }
}

impl ScrollSource for FakePage {
    fn scroll_offset(&self) -> f64 {
        self.offset
    }

    fn viewport_height(&self) -> f64 {
        self.height
    }
}

impl SignalBinder for FakePage {
    fn bind_scroll(&mut self) -> BindingId {
        self.binds += 1;
        let binding = BindingId(self.binds);
        self.bound = Some(binding);
        binding
    }

    fn unbind_scroll(&mut self, binding: BindingId) {
        if self.bound == Some(binding) {
            self.bound = None;
        }
        self.unbound.push(binding);
    }
}

impl Document for FakePage {
    type Element = usize;

    /// Supports class selectors (`.name`) only.
    fn query_all(&self, selector: &str) -> Vec<usize> {
        let Some(class) = selector.strip_prefix('.') else {
            return Vec::new();
        };
        (0..self.elements.len())
            .filter(|&index| self.has_class(index, class))
            .collect()
    }

    fn bounds(&self, element: &usize) -> Rect {
        let top = self.elements.get(*element).map_or(0.0, |el| el.top);
        Rect::new(0.0, top, 100.0, top + 20.0)
    }

    fn attribute(&self, element: &usize, name: &str) -> Option<String> {
        self.elements.get(*element).and_then(|el| {
            el.attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        })
    }
}

impl ClassList for FakePage {
    type Element = usize;

    fn add_class(&mut self, element: &usize, class: &str) {
        if let Some(el) = self.elements.get_mut(*element) {
            if !el.classes.iter().any(|c| c == class) {
                el.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&mut self, element: &usize, class: &str) {
        if let Some(el) = self.elements.get_mut(*element) {
            el.classes.retain(|c| c != class);
        }
    }
}
