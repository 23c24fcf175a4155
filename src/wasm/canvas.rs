use crate::color::Rgba;
use crate::error::EngineError;
use crate::grid::{Grid, GridCoord};
use crate::surface::{Blend, Canvas, Layer, Metrics, Viewport};
use crate::text::{fit_font_size, sample_alpha, FontSpec, TextRasterizer};
use wasm_bindgen::JsCast;
use web_sys::{window, CanvasRenderingContext2d, Element, HtmlCanvasElement};

/// Current window size and device pixel ratio.
pub fn viewport() -> Viewport {
    let Some(w) = window() else {
        return Viewport::new(0.0, 0.0, 1.0);
    };
    let dimension = |v: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>| {
        v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
    };
    Viewport::new(
        dimension(w.inner_width()),
        dimension(w.inner_height()),
        w.device_pixel_ratio(),
    )
}

/// A `<canvas>` with its 2D context, optionally attached to a container.
pub struct WebCanvas {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    container: Option<Element>,
}

impl WebCanvas {
    pub fn new(container: Option<Element>) -> Result<Self, EngineError> {
        let document = window()
            .and_then(|w| w.document())
            .ok_or_else(|| EngineError::Surface("no document".into()))?;

        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into().map_err(|_| {
            EngineError::Surface("created element is not a canvas".into())
        })?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| EngineError::Surface("no 2d context".into()))?
            .dyn_into()
            .map_err(|_| EngineError::Surface("not a 2d context".into()))?;

        Ok(Self {
            canvas,
            ctx,
            container,
        })
    }

    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.ctx
    }

    pub fn element(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl Canvas for WebCanvas {
    fn resize(&mut self, metrics: &Metrics) {
        // Setting the size resets the context, transform included.
        self.canvas.set_width(metrics.real_width);
        self.canvas.set_height(metrics.real_height);

        // CSS size is the logical viewport, not the truncated buffer size.
        let style = self.canvas.style();
        let css = |v: f64| format!("{}px", v);
        style.set_property("width", &css(metrics.width)).ok();
        style.set_property("height", &css(metrics.height)).ok();

        self.ctx.scale(metrics.scale, metrics.scale).ok();
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn set_blend(&mut self, blend: Blend) {
        self.ctx
            .set_global_composite_operation(blend.as_composite_operation())
            .ok();
    }

    fn set_fill(&mut self, color: Rgba) {
        self.ctx.set_fill_style_str(&color.css());
    }

    fn set_glow(&mut self, color: Rgba, blur: f64) {
        self.ctx.set_shadow_color(&color.css());
        self.ctx.set_shadow_blur(blur);
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.clear_rect(x, y, w, h);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.fill_rect(x, y, w, h);
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) {
        self.ctx.begin_path();
        self.ctx.arc(x, y, radius, 0.0, std::f64::consts::TAU).ok();
        self.ctx.close_path();
        self.ctx.fill();
    }

    fn draw_canvas(&mut self, source: &Self, source_width: f64, source_height: f64, width: f64, height: f64) {
        self.ctx
            .draw_image_with_html_canvas_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                &source.canvas,
                0.0,
                0.0,
                source_width,
                source_height,
                0.0,
                0.0,
                width,
                height,
            )
            .ok();
    }

    fn mount(&mut self) -> Result<(), EngineError> {
        let Some(container) = &self.container else {
            return Ok(());
        };

        let style = self.canvas.style();
        style.set_property("position", "absolute")?;
        style.set_property("left", "0px")?;
        style.set_property("top", "0px")?;

        container.append_child(&self.canvas)?;
        Ok(())
    }

    fn unmount(&mut self) {
        if let Some(container) = &self.container {
            // Already detached is fine.
            container.remove_child(&self.canvas).ok();
        }
    }
}

/// Measures and draws text with the browser's font engine on an offscreen,
/// unscaled canvas.
pub struct WebTextRasterizer {
    layer: Layer<WebCanvas>,
}

impl WebTextRasterizer {
    pub fn new(viewport: Viewport) -> Result<Self, EngineError> {
        Ok(Self {
            layer: Layer::unscaled(WebCanvas::new(None)?, viewport),
        })
    }
}

impl TextRasterizer for WebTextRasterizer {
    fn adjust(&mut self, viewport: Viewport) {
        self.layer.adjust(viewport);
    }

    fn rasterize(&mut self, text: &str, font: &FontSpec, grid: &Grid, max_font_size: f64) -> Vec<GridCoord> {
        if text.is_empty() {
            return Vec::new();
        }

        self.layer.repaint(|canvas, m| {
            let ctx = canvas.context();
            ctx.set_text_align("center");
            ctx.set_text_baseline("middle");
            ctx.set_font(&font.css(max_font_size));

            let measured = ctx.measure_text(text).map(|t| t.width()).unwrap_or(0.0);
            let size = fit_font_size(m.width, measured, max_font_size);

            ctx.set_font(&font.css(size));
            ctx.fill_text(text, m.width / 2.0, m.height / 2.0).ok();
        });

        let m = self.layer.metrics();
        let data = match self
            .layer
            .canvas()
            .context()
            .get_image_data(0.0, 0.0, m.real_width as f64, m.real_height as f64)
        {
            Ok(image) => image.data(),
            Err(e) => {
                log::warn!("text sampling failed: {:?}", e);
                return Vec::new();
            }
        };

        let width = m.real_width;
        sample_alpha(m.real_width, m.real_height, grid.stride(), |x, y| {
            data.get(((y * width + x) * 4 + 3) as usize).copied().unwrap_or(0)
        })
    }
}
