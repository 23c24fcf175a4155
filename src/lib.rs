//! # glow_grid
//!
//! A grid of glowing cells with electrons wandering along the grid lines,
//! able to spell text, burst it apart and draw spirals.
//!
//! The engine is tick driven: a driver owns the clock and calls
//! [`Director::advance`] once per frame with the current time in
//! milliseconds. Drawing goes through the [`Canvas`] capability, so the same
//! engine runs on the software [`SoftCanvas`] (host builds and tests) and on a
//! browser 2D context (`wasm32` builds).
//!
//! ```ignore
//! use glow_grid::prelude::*;
//!
//! let viewport = Viewport::new(800.0, 600.0, 1.0);
//! let shape = ShapeController::new(
//!     EngineConfig::default(),
//!     SoftCanvas::new(),
//!     SoftCanvas::new(),
//!     BitmapRasterizer::new(viewport),
//!     viewport,
//!     7,
//! );
//! let mut director = Director::new(shape, Silent);
//! director.run(Command::Init, 0.0)?;
//! director.shape_mut().print("HI", 0.0)?;
//! for frame in 0..60 {
//!     director.advance(frame as f64 * 16.0)?;
//! }
//! ```

pub mod cell;
pub mod color;
pub mod command;
pub mod config;
pub mod director;
pub mod electron;
pub mod error;
pub mod font;
pub mod grid;
pub mod pool;
pub mod raster;
pub mod sequence;
pub mod shape;
pub mod surface;
pub mod text;

pub use cell::{Cell, CellOptions};
pub use color::Rgba;
pub use command::Command;
pub use config::{EngineConfig, Palette};
pub use director::Director;
pub use electron::{Electron, ElectronOptions};
pub use error::EngineError;
pub use grid::{Grid, GridCoord};
pub use pool::{CellPool, ElectronPool, Pools};
pub use raster::SoftCanvas;
pub use sequence::{AudioCue, Sequence, Silent};
pub use shape::{Lifecycle, ShapeController, SpiralOptions, TouchPoint};
pub use surface::{Blend, Canvas, Layer, Metrics, Viewport};
pub use text::{BitmapRasterizer, FontSpec, TextRasterizer};

pub mod prelude {
    pub use crate::{
        AudioCue, BitmapRasterizer, Canvas, Command, Director, EngineConfig, EngineError, Layer, ShapeController,
        Silent, SoftCanvas, SpiralOptions, TextRasterizer, Viewport,
    };
}

// Browser glue only exists on wasm32.
#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use wasm_bindgen::prelude::*;

    pub mod audio;
    pub mod canvas;
    pub mod events;
    pub mod render;

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).ok();

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let container = document.body().ok_or("no body")?;

        // Optional overrides, e.g. `window.glowGridConfig = { max_electrons: 60 }`.
        let config = js_sys::Reflect::get(&window, &JsValue::from_str("glowGridConfig")).unwrap_or(JsValue::UNDEFINED);

        render::start(container.into(), config)
    }
}
