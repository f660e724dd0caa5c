// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll a simulated article and watch waypoints fire.
//!
//! This example shows how a host drives `understory_waypoint`:
//! - implement `Document` and `ClassList` over its own element storage,
//! - implement `ScrollSource` and `SignalBinder` over its viewport,
//! - forward scroll events and service `next_deadline` with a clock.
//!
//! Run:
//! - `cargo run -p understory_waypoint_demos --example scroll_story`
//! - `RUST_LOG=understory_waypoint=trace cargo run -p understory_waypoint_demos --example scroll_story`

use std::collections::BTreeSet;

use kurbo::Rect;
use tracing_subscriber::EnvFilter;
use understory_waypoint::{
    ADD_CLASS_ATTR, BindingId, ClassList, DELAY_ATTR, Document, EventName, OFFSET_ATTR,
    ScrollSource, SignalBinder, WaypointEvent, WaypointOptions, create,
};

#[derive(Clone)]
struct Section {
    name: &'static str,
    bounds: Rect,
    attributes: Vec<(&'static str, &'static str)>,
    classes: BTreeSet<String>,
}

/// A tall page of stacked sections and an 800px viewport.
#[derive(Clone)]
struct Article {
    sections: Vec<Section>,
    scroll_y: f64,
    listener: Option<BindingId>,
    next_listener: u64,
}

impl Article {
    fn new() -> Self {
        let layout: [(&str, f64, &[(&str, &str)]); 5] = [
            ("hero", 0.0, &[]),
            ("features", 900.0, &[(ADD_CLASS_ATTR, "slide-in")]),
            ("pricing", 1_800.0, &[(DELAY_ATTR, "150")]),
            ("faq", 2_700.0, &[(OFFSET_ATTR, "200")]),
            ("footer", 3_600.0, &[]),
        ];
        let sections = layout
            .iter()
            .map(|&(name, top, attributes)| Section {
                name,
                bounds: Rect::new(0.0, top, 1_200.0, top + 800.0),
                attributes: attributes.to_vec(),
                classes: BTreeSet::from(["js-waypoint".to_string()]),
            })
            .collect();
        Self {
            sections,
            scroll_y: 0.0,
            listener: None,
            next_listener: 0,
        }
    }

    fn describe(&self) -> String {
        self.sections
            .iter()
            .map(|section| {
                let classes: Vec<&str> = section.classes.iter().map(String::as_str).collect();
                format!("{}[{}]", section.name, classes.join(" "))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ScrollSource for Article {
    fn scroll_offset(&self) -> f64 {
        self.scroll_y
    }

    fn viewport_height(&self) -> f64 {
        800.0
    }
}

impl SignalBinder for Article {
    fn bind_scroll(&mut self) -> BindingId {
        self.next_listener += 1;
        let binding = BindingId(self.next_listener);
        self.listener = Some(binding);
        binding
    }

    fn unbind_scroll(&mut self, binding: BindingId) {
        if self.listener == Some(binding) {
            self.listener = None;
        }
    }
}

impl Document for Article {
    type Element = usize;

    fn query_all(&self, selector: &str) -> Vec<usize> {
        let class = selector.trim_start_matches('.');
        (0..self.sections.len())
            .filter(|&index| self.sections[index].classes.contains(class))
            .collect()
    }

    fn bounds(&self, element: &usize) -> Rect {
        self.sections[*element].bounds
    }

    fn attribute(&self, element: &usize, name: &str) -> Option<String> {
        self.sections[*element]
            .attributes
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| (*value).to_string())
    }
}

impl ClassList for Article {
    type Element = usize;

    fn add_class(&mut self, element: &usize, class: &str) {
        self.sections[*element].classes.insert(class.to_string());
    }

    fn remove_class(&mut self, element: &usize, class: &str) {
        self.sections[*element].classes.remove(class);
    }
}

/// Scroll positions the "user" produces, with their timestamps.
const TIMELINE: &[(u64, f64)] = &[
    (1_000, 150.0),
    (1_040, 400.0),
    (1_080, 700.0),
    (1_500, 1_100.0),
    (1_520, 1_900.0),
    (2_400, 2_600.0),
    (3_000, 3_200.0),
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut article = Article::new();
    let options = WaypointOptions {
        add_class: Some("is-visible".into()),
        remove_class: Some("js-waypoint".into()),
        offset: 100.0,
        ..WaypointOptions::default()
    };

    // `create` reads a snapshot of the document while the page serves as the binder.
    let snapshot = article.clone();
    let mut waypoints = create(&snapshot, &mut article, &options, 0);
    waypoints.engine_mut().on(EventName::Point, |event| {
        if let WaypointEvent::Point { waypoint, at } = event {
            println!(
                "  t={at:>5}ms reached y={:>6.1} (section #{})",
                waypoint.offset(),
                waypoint.payload().element
            );
        }
    });
    println!("start:   {}", article.describe());
    waypoints.run_due(&mut article, 0);

    let mut now = 0;
    for &(at, y) in TIMELINE {
        // Service anything that came due before this scroll event.
        while let Some(deadline) = waypoints.next_deadline().filter(|&d| d <= at) {
            now = deadline.max(now);
            let source = ScrollOffset(article.scroll_y);
            waypoints.poll(&source, &mut article, now);
        }
        now = at;
        article.scroll_y = y;
        if article.listener.is_some() {
            waypoints.on_scroll(&article, now);
        }
        waypoints.run_due(&mut article, now);
        println!("y={y:>6.1}: {}", article.describe());
    }

    while let Some(deadline) = waypoints.next_deadline() {
        now = deadline.max(now);
        let source = ScrollOffset(article.scroll_y);
        waypoints.poll(&source, &mut article, now);
    }
    println!("settled: {}", article.describe());
    println!("pending waypoints: {}", waypoints.engine().len());

    waypoints.stop(&mut article);
    assert!(article.listener.is_none(), "stop releases the scroll listener");
}

/// Scroll geometry detached from the article, so the article can be borrowed
/// mutably as the class list during `poll`.
struct ScrollOffset(f64);

impl ScrollSource for ScrollOffset {
    fn scroll_offset(&self) -> f64 {
        self.0
    }

    fn viewport_height(&self) -> f64 {
        800.0
    }
}
