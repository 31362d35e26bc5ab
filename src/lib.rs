// touch_arbiter: touch-ownership arbitration for a touch game launcher.
// Decides which input channel (virtual button, joystick, virtual mouse, native
// pass-through) owns each touch pointer. Rendering and touch capture live elsewhere.

mod context;
mod dispatch;
mod engine;
mod error;
mod rule;
pub mod rules;
mod types;

use wasm_bindgen::prelude::*;

pub use context::ArbitrationContext;
pub use dispatch::{SharedDispatcher, TouchDispatcher, WasmTouchDispatcher};
pub use engine::RuleEngine;
pub use error::ArbiterError;
pub use rule::{shared, Rule, SharedRule};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}
