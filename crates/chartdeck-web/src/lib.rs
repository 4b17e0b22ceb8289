#![forbid(unsafe_code)]

//! Browser host for ChartDeck.
//!
//! Wires a [`chartdeck_runtime::Runtime`] to the page:
//! - entry rows and the viewer region as real DOM nodes,
//! - one delegated `click`/`change` listener pair on the list container,
//! - requests issued with `fetch`, waking the runtime on completion,
//! - a timer that advances host time for timeouts and notice expiry.
//!
//! The notice markup is plain string rendering and builds everywhere, so it
//! is tested natively.

pub mod notices;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::ChartDeckWeb;

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct ChartDeckWeb;

#[cfg(not(target_arch = "wasm32"))]
impl ChartDeckWeb {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}
