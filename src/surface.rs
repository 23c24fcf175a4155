//! Render surfaces.
//!
//! A [`Layer`] is a full-viewport drawing surface over some [`Canvas`]
//! backend. Every paint goes through [`Layer::paint`], which brackets the
//! drawing closure with `save`/`restore` so no alpha, blend mode, fill or
//! glow setting leaks from one paint into the next.

use crate::color::Rgba;
use crate::error::EngineError;

/// How a drawn pixel combines with what is already there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Blend {
    /// Normal alpha compositing.
    #[default]
    SourceOver,
    /// Additive; overlapping paints brighten.
    Lighter,
}

impl Blend {
    pub fn as_composite_operation(self) -> &'static str {
        match self {
            Blend::SourceOver => "source-over",
            Blend::Lighter => "lighter",
        }
    }
}

/// Host viewport in CSS pixels plus its device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }
}

/// Dimensions handed to paint closures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    /// Logical size, in CSS pixels.
    pub width: f64,
    pub height: f64,
    /// Backing buffer size, in device pixels.
    pub real_width: u32,
    pub real_height: u32,
    pub scale: f64,
}

/// The 2D drawing capability a layer needs from its backend.
///
/// Coordinates are logical; the backend applies the scale given to
/// [`Canvas::resize`]. State setters affect subsequent draws until the
/// matching [`Canvas::restore`].
pub trait Canvas {
    /// Reallocate the backing buffer to `real_width × real_height` device
    /// pixels, displayed at the logical `width × height`, and reset all
    /// drawing state.
    fn resize(&mut self, metrics: &Metrics);

    fn save(&mut self);
    fn restore(&mut self);

    fn set_alpha(&mut self, alpha: f64);
    fn set_blend(&mut self, blend: Blend);
    fn set_fill(&mut self, color: Rgba);
    /// Blurred halo drawn around filled shapes. A zero blur disables it.
    fn set_glow(&mut self, color: Rgba, blur: f64);

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn fill_circle(&mut self, x: f64, y: f64, radius: f64);

    /// Draw the `source_width × source_height` device-pixel region of
    /// `source` scaled into the logical rect `(0, 0, width, height)`.
    fn draw_canvas(&mut self, source: &Self, source_width: f64, source_height: f64, width: f64, height: f64)
    where
        Self: Sized;

    /// Attach to the host container. Backends without one succeed trivially.
    fn mount(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Detach from the host container. Must tolerate being detached already.
    fn unmount(&mut self) {}
}

type ResizeHandler<C> = Box<dyn FnMut(&mut C, &Metrics)>;

pub struct Layer<C: Canvas> {
    canvas: C,
    metrics: Metrics,
    disable_scale: bool,
    mounted: bool,
    listening: bool,
    resize_handlers: Vec<ResizeHandler<C>>,
    resize_count: u64,
}

impl<C: Canvas> Layer<C> {
    pub fn new(canvas: C, viewport: Viewport) -> Self {
        Self::with_scaling(canvas, viewport, true)
    }

    /// A layer that ignores the device pixel ratio, one buffer pixel per
    /// logical pixel. Used for offscreen text measurement.
    pub fn unscaled(canvas: C, viewport: Viewport) -> Self {
        Self::with_scaling(canvas, viewport, false)
    }

    fn with_scaling(canvas: C, viewport: Viewport, scaled: bool) -> Self {
        let mut layer = Self {
            canvas,
            metrics: Metrics {
                width: 0.0,
                height: 0.0,
                real_width: 0,
                real_height: 0,
                scale: 1.0,
            },
            disable_scale: !scaled,
            mounted: false,
            listening: true,
            resize_handlers: Vec::new(),
            resize_count: 0,
        };
        layer.adjust(viewport);
        layer
    }

    /// Resize the backing buffer to the viewport. Clears the surface.
    pub fn adjust(&mut self, viewport: Viewport) {
        let scale = if self.disable_scale {
            1.0
        } else {
            viewport.device_pixel_ratio.max(f64::MIN_POSITIVE)
        };

        let real_width = (viewport.width * scale).max(0.0) as u32;
        let real_height = (viewport.height * scale).max(0.0) as u32;

        self.metrics = Metrics {
            width: viewport.width,
            height: viewport.height,
            real_width,
            real_height,
            scale,
        };
        self.canvas.resize(&self.metrics);
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn clear(&mut self) {
        let Metrics { width, height, .. } = self.metrics;
        self.canvas.clear_rect(0.0, 0.0, width, height);
    }

    pub fn paint<F>(&mut self, draw: F) -> &mut Self
    where
        F: FnOnce(&mut C, &Metrics),
    {
        let metrics = self.metrics;
        self.canvas.save();
        draw(&mut self.canvas, &metrics);
        self.canvas.restore();
        self
    }

    pub fn repaint<F>(&mut self, draw: F) -> &mut Self
    where
        F: FnOnce(&mut C, &Metrics),
    {
        self.clear();
        self.paint(draw)
    }

    /// Composite `background` over this layer at `opacity`.
    pub fn blend_background(&mut self, background: &Layer<C>, opacity: f64) -> &mut Self {
        let source = background.metrics;
        let source_canvas = &background.canvas;

        self.paint(|ctx, m| {
            ctx.set_blend(Blend::SourceOver);
            ctx.set_alpha(opacity);
            ctx.draw_canvas(
                source_canvas,
                source.real_width as f64,
                source.real_height as f64,
                m.width,
                m.height,
            );
        })
    }

    pub fn on_resize<F>(&mut self, handler: F)
    where
        F: FnMut(&mut C, &Metrics) + 'static,
    {
        self.resize_handlers.push(Box::new(handler));
        self.listening = true;
    }

    /// Apply a (debounced) viewport change. Layers nobody listens to are
    /// left alone, as are layers that were removed.
    pub fn handle_resize(&mut self, viewport: Viewport) -> bool {
        if !self.listening || self.resize_handlers.is_empty() {
            return false;
        }

        self.adjust(viewport);
        self.resize_count += 1;

        let metrics = self.metrics;
        for handler in self.resize_handlers.iter_mut() {
            self.canvas.save();
            handler(&mut self.canvas, &metrics);
            self.canvas.restore();
        }
        true
    }

    /// Number of resizes applied through [`Layer::handle_resize`].
    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }

    pub fn render_into_view(&mut self) -> Result<(), EngineError> {
        self.canvas.mount()?;
        self.mounted = true;
        self.listening = true;
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Detach and stop reacting to resizes. Safe to call repeatedly.
    pub fn remove(&mut self) {
        self.listening = false;
        self.resize_handlers.clear();

        if !self.mounted {
            return;
        }
        self.canvas.unmount();
        self.mounted = false;
    }
}
