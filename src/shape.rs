//! The shape controller.
//!
//! Owns the background and main layers, both pools and the text rasterizer,
//! and turns high-level effects (printed text, explosions, spirals, pointer
//! ink) into cells and electrons. A driver calls [`ShapeController::frame`]
//! once per displayed frame.

use crate::cell::{Cell, CellOptions};
use crate::color::Rgba;
use crate::config::EngineConfig;
use crate::electron::ElectronOptions;
use crate::error::EngineError;
use crate::grid::{Grid, GridCoord};
use crate::pool::Pools;
use crate::surface::{Canvas, Layer, Metrics, Viewport};
use crate::text::{FontSpec, TextRasterizer};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Electrons closer than this to expiry are dropped before an explosion.
const EXPLODE_STRIP_LIMIT: f64 = 1000.0;
/// Upper bound on cells lit by one explosion of a text matrix.
const EXPLODE_MAX_CELLS: usize = 50;
/// Degrees between consecutive spiral cells.
const SPIRAL_STEP_DEG: f64 = 15.0;
/// Reveal stagger between consecutive spiral cells, ms.
const SPIRAL_STAGGER_MS: f64 = 16.0;
/// Earliest first repaint of a freshly printed text cell, ms.
const PRINT_STAGGER_MS: u32 = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Alive,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpiralOptions {
    /// Starting radius in cells; defaults to a third of the shorter side.
    pub radius: Option<f64>,
    /// Radius change per step.
    pub increment: f64,
    /// Walk clockwise on screen instead of counter-clockwise.
    pub reverse: bool,
    pub life_time: f64,
    pub electron_count: usize,
    pub force_electrons: bool,
}

impl Default for SpiralOptions {
    fn default() -> Self {
        Self {
            radius: None,
            increment: 0.0,
            reverse: false,
            life_time: 250.0,
            electron_count: 1,
            force_electrons: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub id: i32,
    pub x: f64,
    pub y: f64,
}

/// De-duplication state for the ink effect.
#[derive(Debug, Default)]
struct PointerTracker {
    last_cell: Option<GridCoord>,
    touches: HashMap<i32, (f64, f64)>,
}

impl PointerTracker {
    /// Record `coord` and report whether it repeats the previous one.
    fn is_same_cell(&mut self, coord: GridCoord) -> bool {
        self.last_cell.replace(coord) == Some(coord)
    }

    /// Keep touches that are new or moved since last seen.
    fn filter_touches(&mut self, touches: &[TouchPoint]) -> Vec<TouchPoint> {
        touches
            .iter()
            .filter(|t| {
                let previous = self.touches.insert(t.id, (t.x, t.y));
                previous != Some((t.x, t.y))
            })
            .copied()
            .collect()
    }

    fn end_touches(&mut self, ended: Option<&[i32]>) {
        match ended {
            Some(ids) => ids.iter().for_each(|id| {
                self.touches.remove(id);
            }),
            None => self.touches.clear(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames: u64,
    /// Full grid paints onto the background layer.
    pub grid_draws: u64,
    /// Times the main layer was reset to the dimmed grid.
    pub primes: u64,
    /// Ambient cooldowns that ran out, whether or not a cell fit.
    pub ambient_rolls: u64,
}

pub struct ShapeController<C: Canvas, R: TextRasterizer> {
    config: EngineConfig,
    grid: Grid,
    bg: Layer<C>,
    main: Layer<C>,
    rasterizer: R,
    pools: Pools,
    rng: SmallRng,
    state: Lifecycle,
    last_text: String,
    last_matrix: Option<Vec<GridCoord>>,
    next_random_at: f64,
    pending_resize: Option<(Viewport, f64)>,
    pointer: PointerTracker,
    stats: RenderStats,
}

fn draw_grid<C: Canvas>(ctx: &mut C, m: &Metrics, grid: Grid, background: Rgba, border: Rgba) {
    ctx.set_fill(background);
    ctx.fill_rect(0.0, 0.0, m.width, m.height);

    ctx.set_fill(border);
    let stride = grid.stride();

    // horizontal lines
    let mut h = grid.cell_size;
    while h < m.height {
        ctx.fill_rect(0.0, h, m.width, grid.border_width);
        h += stride;
    }

    // vertical lines
    let mut w = grid.cell_size;
    while w < m.width {
        ctx.fill_rect(w, 0.0, grid.border_width, m.height);
        w += stride;
    }
}

impl<C: Canvas, R: TextRasterizer> ShapeController<C, R> {
    pub fn new(config: EngineConfig, bg: C, main: C, rasterizer: R, viewport: Viewport, seed: u64) -> Self {
        let grid = config.grid();
        let max_electrons = config.max_electrons;
        Self {
            config,
            grid,
            bg: Layer::new(bg, viewport),
            main: Layer::new(main, viewport),
            rasterizer,
            pools: Pools::new(max_electrons),
            rng: SmallRng::seed_from_u64(seed),
            state: Lifecycle::Idle,
            last_text: String::new(),
            last_matrix: None,
            next_random_at: 0.0,
            pending_resize: None,
            pointer: PointerTracker::default(),
            stats: RenderStats::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state == Lifecycle::Alive
    }

    pub fn pools(&self) -> &Pools {
        &self.pools
    }

    pub fn main_layer(&self) -> &Layer<C> {
        &self.main
    }

    pub fn background_layer(&self) -> &Layer<C> {
        &self.bg
    }

    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    pub fn last_matrix(&self) -> Option<&[GridCoord]> {
        self.last_matrix.as_deref()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    fn ensure_alive(&self) -> Result<(), EngineError> {
        match self.state {
            Lifecycle::Alive => Ok(()),
            Lifecycle::Idle => Err(EngineError::NotInitialized),
        }
    }

    /// Start rendering. Calling it again while alive does nothing.
    pub fn init(&mut self, now: f64) -> Result<(), EngineError> {
        if self.is_alive() {
            return Ok(());
        }
        self.config.validate()?;

        let grid = self.grid;
        let (background, border) = (self.config.palette.background, self.config.palette.border);
        self.bg
            .on_resize(move |ctx, m| draw_grid(ctx, m, grid, background, border));

        self.main.render_into_view()?;

        self.bg
            .paint(|ctx, m| draw_grid(ctx, m, grid, background, border));
        self.stats.grid_draws += 1;
        self.prime_main();

        self.next_random_at = now;
        self.state = Lifecycle::Alive;

        let m = self.main.metrics();
        log::info!(
            "shape controller alive: {}x{} @{}x",
            m.width,
            m.height,
            m.scale
        );
        Ok(())
    }

    /// Stop rendering and drop all state. Calling it while idle does nothing.
    pub fn destroy(&mut self) {
        if !self.is_alive() {
            return;
        }

        self.bg.remove();
        self.main.remove();

        self.pools.clear();
        self.last_matrix = None;
        self.last_text.clear();
        self.pending_resize = None;
        self.pointer = PointerTracker::default();
        self.state = Lifecycle::Idle;

        log::info!("shape controller destroyed after {} frames", self.stats.frames);
    }

    /// Reset the main layer to white under a strong grid wash, wiping trails.
    fn prime_main(&mut self) {
        self.main.paint(|ctx, m| {
            ctx.set_fill(Rgba::WHITE);
            ctx.fill_rect(0.0, 0.0, m.width, m.height);
        });
        self.main.blend_background(&self.bg, self.config.prime_opacity);
        self.stats.primes += 1;
    }

    /// Queue a viewport change; it is applied by the first frame at least
    /// `resize_debounce_ms` after the last request.
    pub fn resize(&mut self, viewport: Viewport, now: f64) {
        self.pending_resize = Some((viewport, now + self.config.resize_debounce_ms));
    }

    fn apply_pending_resize(&mut self, now: f64) -> Result<(), EngineError> {
        let viewport = match self.pending_resize {
            Some((viewport, due)) if now >= due => viewport,
            _ => return Ok(()),
        };
        self.pending_resize = None;

        if self.bg.handle_resize(viewport) {
            self.stats.grid_draws += 1;
        }
        self.main.adjust(viewport);
        self.prime_main();
        self.rasterizer.adjust(viewport);

        log::info!("resized to {}x{}", viewport.width, viewport.height);

        if self.last_text.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.last_text);
        self.last_matrix = None;
        self.print(&text, now).map(|_| ())
    }

    pub fn default_font(&self) -> FontSpec {
        FontSpec::new("bold", self.config.font_family.clone())
    }

    /// Grid cells covered by `text` drawn as large as fits the viewport.
    pub fn get_text_matrix(&mut self, text: &str, font: Option<&FontSpec>) -> Vec<GridCoord> {
        let fallback;
        let font = match font {
            Some(f) => f,
            None => {
                fallback = self.default_font();
                &fallback
            }
        };
        self.rasterizer
            .rasterize(text, font, &self.grid, self.config.max_font_size)
    }

    fn text_electron_options(&mut self, life_time: std::ops::RangeInclusive<u32>) -> ElectronOptions {
        ElectronOptions {
            speed: 2.0,
            color: self.config.palette.font,
            life_time: self.rng.gen_range(life_time) as f64,
        }
    }

    fn cell_options(&mut self) -> CellOptions {
        CellOptions {
            background: self.config.palette.font,
            electron_count: self.rng.gen_range(1..=4),
            force_electrons: false,
            electron_options: self.text_electron_options(300..=500),
        }
    }

    fn explode_options(&mut self) -> CellOptions {
        CellOptions {
            electron_options: self.text_electron_options(500..=1500),
            ..self.cell_options()
        }
    }

    fn new_cell(&self, coord: GridCoord, options: CellOptions) -> Cell {
        Cell::new(coord, options, self.grid).with_repaint_interval(self.config.repaint_interval)
    }

    /// Spell `text` in pinned cells. Returns how many cells were pinned.
    ///
    /// Empty text clears the screen, releasing whatever was shown with a
    /// reverse spiral.
    pub fn print(&mut self, text: &str, now: f64) -> Result<usize, EngineError> {
        self.ensure_alive()?;

        let was_showing = !self.last_text.is_empty();
        self.clear(now)?;

        if text.is_empty() {
            if was_showing {
                self.spiral(
                    SpiralOptions {
                        reverse: true,
                        life_time: 500.0,
                        electron_count: 2,
                        ..SpiralOptions::default()
                    },
                    now,
                )?;
            }
            return Ok(0);
        }

        self.spiral(SpiralOptions::default(), now)?;

        self.last_text = text.to_string();
        let mut matrix = self.get_text_matrix(text, None);
        // Light cells in random order rather than reading order.
        matrix.shuffle(&mut self.rng);

        let max_wait = self.config.repaint_interval[1];
        for &coord in &matrix {
            let options = self.cell_options();
            let mut cell = self.new_cell(coord, options);
            cell.schedule_update(now, &mut self.rng, PRINT_STAGGER_MS, max_wait);
            cell.pin(&mut self.pools.cells, now, None);
        }

        let count = matrix.len();
        self.last_matrix = Some(matrix);
        log::debug!("printed {:?} as {} cells", text, count);
        Ok(count)
    }

    /// Unpin everything; a previously printed text bursts apart.
    /// Returns the size of the burst.
    pub fn clear(&mut self, now: f64) -> Result<usize, EngineError> {
        self.ensure_alive()?;

        self.last_text.clear();
        let matrix = self.last_matrix.take();
        self.pools.cells.clear();

        match matrix {
            Some(matrix) => self.explode(Some(&matrix), now),
            None => Ok(0),
        }
    }

    /// One-shot burst of highlighted cells, from `matrix` when given and at
    /// random spots otherwise. Returns how many cells lit.
    pub fn explode(&mut self, matrix: Option<&[GridCoord]>, now: f64) -> Result<usize, EngineError> {
        self.ensure_alive()?;

        self.pools.electrons.strip_old(now, EXPLODE_STRIP_LIMIT);

        let lit = match matrix {
            Some(matrix) => {
                let len = matrix.len();
                let max = EXPLODE_MAX_CELLS.min(self.rng.gen_range(len / 20..=len / 10));

                for &coord in matrix.iter().take(max) {
                    let options = self.explode_options();
                    let mut cell = self.new_cell(coord, options);
                    cell.paint_next_to(&mut self.main, &mut self.pools.electrons, now, &mut self.rng);
                }
                max
            }
            None => {
                let max = self.rng.gen_range(10..=20);
                let mut lit = 0;
                for _ in 0..max {
                    let options = self.explode_options();
                    if self.create_random_cell(options, now) {
                        lit += 1;
                    }
                }
                lit
            }
        };

        log::debug!("explode: {} cells", lit);
        Ok(lit)
    }

    /// One revolution of staggered cells around the viewport centre.
    /// Returns the placements in reveal order.
    pub fn spiral(&mut self, options: SpiralOptions, now: f64) -> Result<Vec<GridCoord>, EngineError> {
        self.ensure_alive()?;

        let m = self.main.metrics();
        let (cols, rows) = self.grid.dimensions(m.width, m.height);
        let (ox, oy) = (cols / 2, rows / 2);

        let mut deg = self.rng.gen_range(0..=360) as f64;
        let mut r = options
            .radius
            .unwrap_or_else(|| (cols.min(rows) / 3) as f64);

        let step = if options.reverse {
            SPIRAL_STEP_DEG
        } else {
            -SPIRAL_STEP_DEG
        };
        let steps = (360.0 / SPIRAL_STEP_DEG) as usize;

        let highlight = self.config.palette.highlight;
        let cell_options = CellOptions {
            electron_count: options.electron_count,
            force_electrons: options.force_electrons,
            background: highlight,
            electron_options: ElectronOptions {
                life_time: options.life_time,
                speed: 3.0,
                color: highlight,
            },
        };

        let mut placements = Vec::with_capacity(steps);
        for k in 1..=steps {
            let rad = deg.to_radians();
            let coord = GridCoord::new(
                oy + (r * rad.sin()).floor() as i32,
                ox + (r * rad.cos()).floor() as i32,
            );

            self.new_cell(coord, cell_options)
                .delay(&mut self.pools.cells, now, k as f64 * SPIRAL_STAGGER_MS);
            placements.push(coord);

            deg += step;
            r += options.increment;
        }

        Ok(placements)
    }

    /// Paint a one-shot cell somewhere on screen, unless the electron pool
    /// is already full.
    fn create_random_cell(&mut self, options: CellOptions, now: f64) -> bool {
        if self.pools.electrons.is_full() {
            return false;
        }

        let m = self.main.metrics();
        let stride = self.grid.stride();
        let row = self.rng.gen_range(0..=(m.height / stride).floor() as i32);
        let col = self.rng.gen_range(0..=(m.width / stride).floor() as i32);

        let mut cell = self.new_cell(GridCoord::new(row, col), options);
        cell.paint_next_to(&mut self.main, &mut self.pools.electrons, now, &mut self.rng);
        true
    }

    fn activate_random(&mut self, now: f64) {
        if now < self.next_random_at {
            return;
        }

        let [from, to] = self.config.ambient_interval;
        self.next_random_at = now + self.rng.gen_range(from..=to.max(from)) as f64;
        self.stats.ambient_rolls += 1;

        let options = CellOptions::ambient(&mut self.rng, &self.config.palette);
        self.create_random_cell(options, now);
    }

    /// Render one frame: trail wash, pinned cells, electrons, ambient spark.
    pub fn frame(&mut self, now: f64) -> Result<(), EngineError> {
        self.ensure_alive()?;
        self.apply_pending_resize(now)?;

        self.main.blend_background(&self.bg, self.config.trail_opacity);

        self.pools
            .cells
            .sweep_and_paint(&mut self.main, &mut self.pools.electrons, now, &mut self.rng);
        self.pools
            .electrons
            .sweep_and_paint(&mut self.main, now, &mut self.rng);

        self.activate_random(now);
        self.stats.frames += 1;
        Ok(())
    }

    /// Pin a single cell with the given look, e.g. for scripted reveals.
    pub fn pin_cell(&mut self, coord: GridCoord, options: CellOptions, now: f64) -> Result<(), EngineError> {
        self.ensure_alive()?;
        self.new_cell(coord, options)
            .pin(&mut self.pools.cells, now, None);
        Ok(())
    }

    /// Replace the main layer with flat font-colored blocks at `(x, y)`
    /// grid positions.
    pub fn paint_blocks(&mut self, blocks: &[(i32, i32)]) -> Result<(), EngineError> {
        self.ensure_alive()?;

        let grid = self.grid;
        let color = self.config.palette.font;
        self.main.repaint(|ctx, _| {
            ctx.set_fill(color);
            for &(x, y) in blocks {
                let [px, py] = grid.origin(GridCoord::new(y, x));
                ctx.fill_rect(px, py, grid.cell_size, grid.cell_size);
            }
        });
        Ok(())
    }

    /// Highlighted, forced cell under the pointer. Moves within the same
    /// cell are ignored. Returns whether a cell was painted.
    fn ink(&mut self, x: f64, y: f64, is_move: bool, now: f64) -> Result<bool, EngineError> {
        self.ensure_alive()?;

        let coord = self.grid.coord_at(x, y);
        if is_move && self.pointer.is_same_cell(coord) {
            return Ok(false);
        }

        let highlight = self.config.palette.highlight;
        let options = CellOptions {
            background: highlight,
            force_electrons: true,
            electron_count: if is_move { 2 } else { 4 },
            electron_options: ElectronOptions {
                speed: 3.0,
                life_time: if is_move { 500.0 } else { 1000.0 },
                color: highlight,
            },
        };

        let mut cell = self.new_cell(coord, options);
        cell.paint_next_to(&mut self.main, &mut self.pools.electrons, now, &mut self.rng);
        Ok(true)
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, now: f64) -> Result<bool, EngineError> {
        self.ink(x, y, false, now)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, now: f64) -> Result<bool, EngineError> {
        self.ink(x, y, true, now)
    }

    /// Returns how many touches painted.
    pub fn touch_start(&mut self, touches: &[TouchPoint], now: f64) -> Result<usize, EngineError> {
        self.touches(touches, false, now)
    }

    pub fn touch_move(&mut self, touches: &[TouchPoint], now: f64) -> Result<usize, EngineError> {
        self.touches(touches, true, now)
    }

    fn touches(&mut self, touches: &[TouchPoint], is_move: bool, now: f64) -> Result<usize, EngineError> {
        self.ensure_alive()?;

        let mut painted = 0;
        for t in self.pointer.filter_touches(touches) {
            if self.ink(t.x, t.y, is_move, now)? {
                painted += 1;
            }
        }
        Ok(painted)
    }

    /// Forget ended touches; `None` forgets all of them.
    pub fn touch_end(&mut self, ended: Option<&[i32]>) {
        self.pointer.end_touches(ended);
    }
}
