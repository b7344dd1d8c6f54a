//! Co-drawing canvas: sketch on a fixed 1280x720 raster, send the sketch with a
//! prompt to an image generation model, and draw/download what comes back.

pub mod config;
pub mod controller;
pub mod error;
pub mod gemini;
pub mod geometry;
pub mod pointer;
pub mod state;
pub mod stroke;
pub mod surface;

#[cfg(target_arch = "wasm32")]
pub mod request;
#[cfg(target_arch = "wasm32")]
mod web;

pub use controller::{Controller, GenerationTicket, Settlement};
pub use error::{parse_error, GenerateError, SubmitError};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    web::start()
}
