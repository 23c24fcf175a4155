//! Engine configuration.
//!
//! Every field has a default matching the stock look of the effect, and
//! deserialization fills in whatever a host leaves out.

use crate::color::Rgba;
use crate::error::EngineError;
use crate::grid::Grid;
use serde::{Deserialize, Serialize};

/// Edge length of a lit square, in CSS pixels.
pub const CELL_SIZE: f64 = 10.0;
/// Thickness of the grid lines between squares.
pub const BORDER_WIDTH: f64 = 2.0;
/// Upper bound on the font size used when rasterizing text.
pub const MAX_FONT_SIZE: f64 = 500.0;
/// Concurrent electron budget for ambient (unforced) spawns.
pub const MAX_ELECTRONS: usize = 30;
/// Default electron speed, pixels per tick.
pub const STEP_LENGTH: f64 = 1.0;

pub const DEFAULT_FONT_FAMILY: &str =
    "Helvetica, Arial, \"Hiragino Sans GB\", \"Microsoft YaHei\", \"WenQuan Yi Micro Hei\", sans-serif";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: Rgba,
    pub border: Rgba,
    pub highlight: Rgba,
    pub electron: Rgba,
    pub font: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgba::rgb(0x1d, 0x22, 0x27),
            border: Rgba::rgb(0x13, 0x19, 0x1f),
            highlight: Rgba::rgb(0x32, 0x8b, 0xf6),
            electron: Rgba::rgb(0x00, 0xb0, 0x7c),
            font: Rgba::rgb(0xff, 0x53, 0x53),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cell_size: f64,
    pub border_width: f64,
    pub max_electrons: usize,
    pub max_font_size: f64,
    /// Window for a cell's next repaint, `[from, to]` ms.
    /// Shorter is brighter but costs more paints per frame.
    pub repaint_interval: [u32; 2],
    /// Cooldown between ambient cells, `[from, to]` ms.
    pub ambient_interval: [u32; 2],
    /// Opacity of the grid wash applied every frame; lower keeps longer trails.
    pub trail_opacity: f64,
    /// Opacity of the grid blended over white when the main surface is primed.
    pub prime_opacity: f64,
    pub resize_debounce_ms: f64,
    pub font_family: String,
    pub palette: Palette,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cell_size: CELL_SIZE,
            border_width: BORDER_WIDTH,
            max_electrons: MAX_ELECTRONS,
            max_font_size: MAX_FONT_SIZE,
            repaint_interval: [300, 500],
            ambient_interval: [300, 1000],
            trail_opacity: 0.05,
            prime_opacity: 0.9,
            resize_debounce_ms: 100.0,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            palette: Palette::default(),
        }
    }
}

fn invalid(msg: String) -> Result<(), EngineError> {
    Err(EngineError::InvalidConfig(msg))
}

impl EngineConfig {
    pub fn grid(&self) -> Grid {
        Grid::new(self.cell_size, self.border_width)
    }

    /// Reject values that would stall or overflow the grid walk, or that are
    /// not meaningful opacities.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, v) in [("cell_size", self.cell_size), ("border_width", self.border_width)] {
            if !v.is_finite() || v < 0.0 {
                return invalid(format!("{name} must be a finite, non-negative length, got {v}"));
            }
        }
        let stride = self.grid().stride();
        if stride <= 0.0 {
            return invalid(format!("cell_size + border_width must be positive, got {stride}"));
        }
        if !self.max_font_size.is_finite() || self.max_font_size <= 0.0 {
            return invalid(format!("max_font_size must be positive, got {}", self.max_font_size));
        }
        for (name, v) in [("trail_opacity", self.trail_opacity), ("prime_opacity", self.prime_opacity)] {
            if !(0.0..=1.0).contains(&v) {
                return invalid(format!("{name} must be within 0..=1, got {v}"));
            }
        }
        if !self.resize_debounce_ms.is_finite() || self.resize_debounce_ms < 0.0 {
            return invalid(format!(
                "resize_debounce_ms must be non-negative, got {}",
                self.resize_debounce_ms
            ));
        }
        Ok(())
    }
}
