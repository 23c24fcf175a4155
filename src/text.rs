//! Text to grid rasterization.
//!
//! Text is drawn centred on an offscreen surface at the largest font size
//! that fits, then the surface is sampled once per grid stride. Every sample
//! with non-zero alpha becomes a lit cell.

use crate::color::Rgba;
use crate::font::{self, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::grid::{Grid, GridCoord};
use crate::raster::SoftCanvas;
use crate::surface::{Canvas, Layer, Viewport};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontSpec {
    pub weight: String,
    pub family: String,
}

impl FontSpec {
    pub fn new(weight: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            weight: weight.into(),
            family: family.into(),
        }
    }

    pub fn is_bold(&self) -> bool {
        match self.weight.trim() {
            "bold" | "bolder" => true,
            w => w.parse::<u32>().map_or(false, |n| n >= 600),
        }
    }

    /// CSS `font` shorthand at `size` px.
    pub fn css(&self, size: f64) -> String {
        format!("{} {}px {}", self.weight, size, self.family)
    }
}

/// Anything that can turn text into the set of grid cells it covers.
pub trait TextRasterizer {
    /// Follow a viewport change.
    fn adjust(&mut self, viewport: Viewport);

    /// Grid cells covered by `text`, row-major. Empty text covers nothing.
    fn rasterize(&mut self, text: &str, font: &FontSpec, grid: &Grid, max_font_size: f64) -> Vec<GridCoord>;
}

/// Largest size not above `max` at which text measuring `measured_at_max`
/// (at size `max`) fills 80% of `width`.
pub fn fit_font_size(width: f64, measured_at_max: f64, max: f64) -> f64 {
    if measured_at_max <= 0.0 {
        return max;
    }
    max.min(max * (width / measured_at_max) * 0.8)
}

/// Sample a `width × height` alpha source at every `stride` pixels.
pub fn sample_alpha<F>(width: u32, height: u32, stride: f64, alpha: F) -> Vec<GridCoord>
where
    F: Fn(u32, u32) -> u8,
{
    let step = stride.round().max(1.0) as u32;
    let mut matrix = Vec::new();

    for i in (0..height).step_by(step as usize) {
        for j in (0..width).step_by(step as usize) {
            if alpha(j, i) > 0 {
                matrix.push(GridCoord::new((i / step) as i32, (j / step) as i32));
            }
        }
    }
    matrix
}

/// Ems per glyph unit; a glyph is 7 units tall, so cap height is 0.7em.
const UNIT_PER_EM: f64 = 0.1;
/// Horizontal advance in units: glyph plus one unit of spacing.
const ADVANCE: f64 = (GLYPH_WIDTH + 1) as f64;

/// Renders with the built-in 5×7 font. The family is ignored.
pub struct BitmapRasterizer {
    layer: Layer<SoftCanvas>,
}

impl BitmapRasterizer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            layer: Layer::unscaled(SoftCanvas::new(), viewport),
        }
    }

    fn measure(text: &str, size: f64) -> f64 {
        let n = text.chars().count() as f64;
        ((ADVANCE * n - 1.0) * size * UNIT_PER_EM).max(0.0)
    }
}

impl TextRasterizer for BitmapRasterizer {
    fn adjust(&mut self, viewport: Viewport) {
        self.layer.adjust(viewport);
    }

    fn rasterize(&mut self, text: &str, font: &FontSpec, grid: &Grid, max_font_size: f64) -> Vec<GridCoord> {
        if text.is_empty() {
            return Vec::new();
        }

        let bold = font.is_bold();
        self.layer.repaint(|ctx, m| {
            let size = fit_font_size(m.width, Self::measure(text, max_font_size), max_font_size);
            let unit = size * UNIT_PER_EM;
            let inset = if bold { 0.0 } else { unit * 0.15 };

            let left = m.width / 2.0 - Self::measure(text, size) / 2.0;
            let top = m.height / 2.0 - GLYPH_HEIGHT as f64 * unit / 2.0;

            ctx.set_fill(Rgba::WHITE);
            for (i, c) in text.chars().enumerate() {
                let Some(g) = font::glyph(c) else {
                    continue;
                };
                let x0 = left + i as f64 * ADVANCE * unit;
                for (col, row) in font::lit_pixels(&g) {
                    ctx.fill_rect(
                        x0 + col as f64 * unit + inset,
                        top + row as f64 * unit + inset,
                        unit - 2.0 * inset,
                        unit - 2.0 * inset,
                    );
                }
            }
        });

        let canvas = self.layer.canvas();
        sample_alpha(canvas.width(), canvas.height(), grid.stride(), |x, y| canvas.alpha_at(x, y))
    }
}
