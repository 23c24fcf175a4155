//! Software canvas.
//!
//! A `tiny_skia::Pixmap` with the subset of Canvas 2D semantics the engine
//! relies on: a save/restore state stack, global alpha, source-over and
//! additive ("lighter") compositing, a uniform scale and a radial gradient
//! standing in for shadow blur.

use crate::color::Rgba;
use crate::error::EngineError;
use crate::surface::{Blend, Canvas, Metrics};
use std::path::Path;
use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, GradientStop, Paint, PathBuilder, Pixmap, PixmapPaint, Point,
    RadialGradient, Rect, SpreadMode, Transform,
};

#[derive(Clone, Copy, Debug, PartialEq)]
struct PaintState {
    alpha: f32,
    blend: Blend,
    fill: Rgba,
    glow: Option<(Rgba, f64)>,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            blend: Blend::SourceOver,
            fill: Rgba::rgb(0, 0, 0),
            glow: None,
        }
    }
}

fn blend_mode(blend: Blend) -> BlendMode {
    match blend {
        Blend::SourceOver => BlendMode::SourceOver,
        Blend::Lighter => BlendMode::Plus,
    }
}

#[derive(Clone, Debug, Default)]
pub struct SoftCanvas {
    // `None` while the buffer has a zero dimension.
    pixmap: Option<Pixmap>,
    scale: f32,
    state: PaintState,
    stack: Vec<PaintState>,
}

impl SoftCanvas {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            ..Self::default()
        }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.as_ref().map_or(0, Pixmap::width)
    }

    pub fn height(&self) -> u32 {
        self.pixmap.as_ref().map_or(0, Pixmap::height)
    }

    /// Alpha of a device pixel, `0` outside the buffer.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.pixmap
            .as_ref()
            .and_then(|p| p.pixel(x, y))
            .map_or(0, |c| c.alpha())
    }

    /// Straight-alpha color of a device pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        match self.pixmap.as_ref().and_then(|p| p.pixel(x, y)) {
            Some(c) if c.alpha() > 0 => {
                let c = c.demultiply();
                Rgba {
                    r: c.red(),
                    g: c.green(),
                    b: c.blue(),
                    a: c.alpha(),
                }
            }
            _ => Rgba::TRANSPARENT,
        }
    }

    /// The whole buffer as straight RGBA bytes, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        match &self.pixmap {
            Some(p) => p.clone().take_demultiplied(),
            None => Vec::new(),
        }
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let pixmap = self
            .pixmap
            .as_ref()
            .ok_or_else(|| EngineError::Surface("nothing to save, the canvas is empty".into()))?;
        pixmap
            .save_png(path)
            .map_err(|e| EngineError::Surface(format!("png export failed: {e}")))
    }

    fn color(&self, color: Rgba, opacity: f32) -> Color {
        let mut c = Color::from_rgba8(color.r, color.g, color.b, color.a);
        c.apply_opacity(self.state.alpha * opacity);
        c
    }

    fn solid(&self, color: Rgba) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(self.color(color, 1.0));
        paint.blend_mode = blend_mode(self.state.blend);
        paint
    }

    /// Device-space rect for a logical one; `None` when empty.
    fn device_rect(&self, x: f64, y: f64, w: f64, h: f64) -> Option<Rect> {
        let s = self.scale;
        Rect::from_xywh(x as f32 * s, y as f32 * s, w as f32 * s, h as f32 * s)
    }

    fn fill_disc(&mut self, cx: f32, cy: f32, r: f32, paint: &Paint) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        if let Some(path) = PathBuilder::from_circle(cx, cy, r) {
            pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    /// Halo from the disc edge out to `r + blur`, falling off quadratically
    /// from half the glow color's alpha.
    fn glow_paint(&self, cx: f32, cy: f32, r: f32, blur: f32, glow: Rgba) -> Option<Paint<'static>> {
        let reach = r + blur;
        let edge = r / reach;
        let mid = edge + (1.0 - edge) / 2.0;
        let stops = vec![
            GradientStop::new(0.0, self.color(glow, 0.5)),
            GradientStop::new(edge, self.color(glow, 0.5)),
            GradientStop::new(mid, self.color(glow, 0.125)),
            GradientStop::new(1.0, self.color(glow, 0.0)),
        ];
        let center = Point::from_xy(cx, cy);
        let shader = RadialGradient::new(center, 0.0, center, reach, stops, SpreadMode::Pad, Transform::identity())?;

        Some(Paint {
            shader,
            blend_mode: blend_mode(self.state.blend),
            ..Paint::default()
        })
    }
}

impl Canvas for SoftCanvas {
    fn resize(&mut self, metrics: &Metrics) {
        self.pixmap = Pixmap::new(metrics.real_width, metrics.real_height);
        self.scale = metrics.scale as f32;
        self.state = PaintState::default();
        self.stack.clear();
    }

    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.state.alpha = alpha.clamp(0.0, 1.0) as f32;
    }

    fn set_blend(&mut self, blend: Blend) {
        self.state.blend = blend;
    }

    fn set_fill(&mut self, color: Rgba) {
        self.state.fill = color;
    }

    fn set_glow(&mut self, color: Rgba, blur: f64) {
        self.state.glow = (blur > 0.0).then_some((color, blur));
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let Some(rect) = self.device_rect(x, y, w, h) else {
            return;
        };
        let paint = Paint {
            blend_mode: BlendMode::Clear,
            anti_alias: false,
            ..Paint::default()
        };
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let Some(rect) = self.device_rect(x, y, w, h) else {
            return;
        };
        let paint = self.solid(self.state.fill);
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) {
        let s = self.scale;
        let (cx, cy) = (x as f32 * s, y as f32 * s);
        // Sub-pixel electrons still light the pixel they sit on.
        let r = (radius as f32 * s).max(0.5);

        if let Some((glow, blur)) = self.state.glow {
            if let Some(paint) = self.glow_paint(cx, cy, r, blur as f32 * s, glow) {
                self.fill_disc(cx, cy, r + blur as f32 * s, &paint);
            }
        }

        let paint = self.solid(self.state.fill);
        self.fill_disc(cx, cy, r, &paint);
    }

    fn draw_canvas(&mut self, source: &Self, source_width: f64, source_height: f64, width: f64, height: f64) {
        let (Some(pixmap), Some(src)) = (self.pixmap.as_mut(), source.pixmap.as_ref()) else {
            return;
        };
        if source_width <= 0.0 || source_height <= 0.0 {
            return;
        }

        let s = self.scale as f64;
        let sx = (width * s / source_width) as f32;
        let sy = (height * s / source_height) as f32;
        let paint = PixmapPaint {
            opacity: self.state.alpha,
            blend_mode: blend_mode(self.state.blend),
            quality: FilterQuality::Nearest,
        };
        pixmap.draw_pixmap(0, 0, src.as_ref(), &paint, Transform::from_scale(sx, sy), None);
    }
}
