// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adapters that bind the engine to concrete platforms.
//!
//! Each adapter is gated behind a feature flag to keep the core lightweight and `no_std` by default.
//!
//! ## Available Adapters
//!
//! - [`web`] (`web` feature): binds a [`ScrollEngine`](crate::ScrollEngine) to the browser
//!   `window` scroll event through `web-sys`, toggles classes with `classList`, and exports a
//!   small JavaScript API through `wasm-bindgen`.

#[cfg(feature = "web")]
pub mod web;
