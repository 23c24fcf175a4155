//! Cells: lit grid squares that shed electrons from their corners.

use crate::color::Rgba;
use crate::config::Palette;
use crate::electron::{Electron, ElectronOptions};
use crate::grid::{Grid, GridCoord};
use crate::pool::{CellPool, ElectronPool};
use crate::surface::{Blend, Canvas, Layer};
use rand::seq::SliceRandom;
use rand::Rng;

/// Pin lifetime used when none is given, `2^31 - 1` ms.
pub const PIN_FOREVER: f64 = i32::MAX as f64;

/// Default repaint window, ms.
pub const REPAINT_INTERVAL: [u32; 2] = [300, 500];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellOptions {
    /// Electrons spawned per repaint, clamped to the four corners.
    pub electron_count: usize,
    pub background: Rgba,
    /// Spawn even when the electron pool is at capacity.
    pub force_electrons: bool,
    pub electron_options: ElectronOptions,
}

impl Default for CellOptions {
    fn default() -> Self {
        Self {
            electron_count: 1,
            background: Palette::default().electron,
            force_electrons: false,
            electron_options: ElectronOptions::default(),
        }
    }
}

impl CellOptions {
    /// Background-activity cell: 1 to 4 electrons in the electron color.
    pub fn ambient<R: Rng + ?Sized>(rng: &mut R, palette: &Palette) -> Self {
        Self {
            electron_count: rng.gen_range(1..=4),
            background: palette.electron,
            force_electrons: false,
            electron_options: ElectronOptions {
                color: palette.electron,
                ..ElectronOptions::default()
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct Cell {
    coord: GridCoord,
    start_x: f64,
    start_y: f64,
    grid: Grid,
    background: Rgba,
    electron_count: usize,
    force_electrons: bool,
    electron_options: ElectronOptions,
    repaint_interval: [u32; 2],
    expire_at: Option<f64>,
    next_update: Option<f64>,
}

impl Cell {
    pub fn new(coord: GridCoord, options: CellOptions, grid: Grid) -> Self {
        let [start_x, start_y] = grid.origin(coord);
        Self {
            coord,
            start_x,
            start_y,
            grid,
            background: options.background,
            electron_count: options.electron_count.min(4),
            force_electrons: options.force_electrons,
            electron_options: options.electron_options,
            repaint_interval: REPAINT_INTERVAL,
            expire_at: None,
            next_update: None,
        }
    }

    /// Override the `[from, to]` ms window used by [`Cell::schedule_update`].
    pub fn with_repaint_interval(mut self, interval: [u32; 2]) -> Self {
        self.repaint_interval = interval;
        self
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn electron_count(&self) -> usize {
        self.electron_count
    }

    pub fn expire_at(&self) -> Option<f64> {
        self.expire_at
    }

    pub fn next_update(&self) -> Option<f64> {
        self.next_update
    }

    /// Hand the cell to the pinned pool for `life_time` ms, or
    /// [`PIN_FOREVER`] when `None`.
    pub fn pin(mut self, pool: &mut CellPool, now: f64, life_time: Option<f64>) {
        self.expire_at = Some(now + life_time.unwrap_or(PIN_FOREVER));
        pool.push(self);
    }

    /// Pin for `1.5 × ms` and hold the first repaint back by `ms`.
    pub fn delay(mut self, pool: &mut CellPool, now: f64, ms: f64) {
        self.next_update = Some(now + ms);
        self.pin(pool, now, Some(ms * 1.5));
    }

    /// Set the next repaint to `now + uniform(min, max)` ms. A `max` below
    /// `min` is treated as `min`.
    pub fn schedule_update<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R, min: u32, max: u32) {
        let wait = rng.gen_range(min..=max.max(min));
        self.next_update = Some(now + wait as f64);
    }

    pub fn is_due(&self, now: f64) -> bool {
        self.next_update.map_or(true, |t| now >= t)
    }

    /// Repaint if due: reschedule, spawn electrons and light the square.
    /// Returns whether anything was painted.
    pub fn paint_next_to<C: Canvas, R: Rng + ?Sized>(
        &mut self,
        layer: &mut Layer<C>,
        electrons: &mut ElectronPool,
        now: f64,
        rng: &mut R,
    ) -> bool {
        if !self.is_due(now) {
            return false;
        }

        let [min, max] = self.repaint_interval;
        self.schedule_update(now, rng, min, max);
        self.create_electrons(electrons, now, rng);

        let (x, y, size, background) = (self.start_x, self.start_y, self.grid.cell_size, self.background);
        layer.paint(|ctx, _| {
            ctx.set_blend(Blend::Lighter);
            ctx.set_fill(background);
            ctx.fill_rect(x, y, size, size);
        });
        true
    }

    /// Spawn electrons at distinct corners. Returns how many were spawned.
    pub fn create_electrons<R: Rng + ?Sized>(&self, electrons: &mut ElectronPool, now: f64, rng: &mut R) -> usize {
        if self.electron_count == 0 {
            return 0;
        }

        let count = match electrons.reserve(self.electron_count, self.force_electrons) {
            Ok(n) => n,
            Err(e) => {
                log::trace!("cell {:?}: {}", self.coord, e);
                return 0;
            }
        };

        let mut corners = self.grid.corner_offsets();
        corners.shuffle(rng);

        for [dx, dy] in corners.into_iter().take(count) {
            electrons.push(Electron::new(
                self.start_x + dx,
                self.start_y + dy,
                self.electron_options,
                &self.grid,
                now,
                rng,
            ));
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::SoftCanvas;
    use crate::surface::Viewport;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn layer() -> Layer<SoftCanvas> {
        Layer::new(SoftCanvas::new(), Viewport::new(120.0, 120.0, 1.0))
    }

    fn options(count: usize, force: bool) -> CellOptions {
        CellOptions {
            electron_count: count,
            force_electrons: force,
            background: Rgba::WHITE,
            ..CellOptions::default()
        }
    }

    #[test]
    fn electron_count_is_clamped_to_corners() {
        let cell = Cell::new(GridCoord::new(0, 0), options(9, false), Grid::default());
        assert_eq!(cell.electron_count(), 4);
    }

    #[test]
    fn paint_is_gated_by_next_update() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut layer = layer();
        let mut pool = ElectronPool::new(30);
        let mut cell = Cell::new(GridCoord::new(1, 1), options(0, false), Grid::default());

        assert!(cell.paint_next_to(&mut layer, &mut pool, 1000.0, &mut rng));
        let next = cell.next_update().unwrap_or_default();
        assert!((1300.0..=1500.0).contains(&next));

        for t in [1000.0, 1100.0, next - 1.0] {
            assert!(!cell.paint_next_to(&mut layer, &mut pool, t, &mut rng));
            assert_eq!(cell.next_update(), Some(next));
        }

        assert!(cell.paint_next_to(&mut layer, &mut pool, next, &mut rng));
        assert!(cell.next_update().unwrap_or_default() > next);
    }

    #[test]
    fn paint_lights_the_square() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut layer = layer();
        let mut pool = ElectronPool::new(30);
        let mut cell = Cell::new(GridCoord::new(2, 3), options(0, false), Grid::default());
        cell.paint_next_to(&mut layer, &mut pool, 0.0, &mut rng);

        assert_eq!(layer.canvas().alpha_at(36, 24), 255);
        assert_eq!(layer.canvas().alpha_at(45, 33), 255);
        assert_eq!(layer.canvas().alpha_at(46, 34), 0);
    }

    #[test]
    fn electrons_spawn_on_distinct_corners() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut pool = ElectronPool::new(30);
        let cell = Cell::new(GridCoord::new(1, 1), options(4, false), Grid::default());

        assert_eq!(cell.create_electrons(&mut pool, 0.0, &mut rng), 4);
        let starts: HashSet<_> = pool
            .iter()
            .map(|e| {
                let [x, y] = e.position();
                (x as i64, y as i64)
            })
            .collect();
        let expected: HashSet<_> = [(11, 11), (11, 23), (23, 11), (23, 23)].into_iter().collect();
        assert_eq!(starts, expected);
    }

    #[test]
    fn unforced_spawns_respect_headroom() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut pool = ElectronPool::new(5);
        let cell = Cell::new(GridCoord::new(0, 0), options(4, false), Grid::default());

        assert_eq!(cell.create_electrons(&mut pool, 0.0, &mut rng), 4);
        assert_eq!(cell.create_electrons(&mut pool, 0.0, &mut rng), 1);
        assert_eq!(cell.create_electrons(&mut pool, 0.0, &mut rng), 0);
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn forced_spawns_bypass_capacity() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut pool = ElectronPool::new(2);
        let cell = Cell::new(GridCoord::new(0, 0), options(4, true), Grid::default());

        assert_eq!(cell.create_electrons(&mut pool, 0.0, &mut rng), 4);
        assert_eq!(cell.create_electrons(&mut pool, 0.0, &mut rng), 4);
        assert_eq!(pool.len(), 8);
    }

    #[test]
    fn delay_pins_for_one_and_a_half_times() {
        let mut pool = CellPool::new();
        Cell::new(GridCoord::new(0, 0), options(1, false), Grid::default()).delay(&mut pool, 100.0, 32.0);

        let cell = pool.iter().next().cloned();
        assert_eq!(cell.as_ref().and_then(Cell::next_update), Some(132.0));
        assert_eq!(cell.as_ref().and_then(Cell::expire_at), Some(148.0));
    }

    #[test]
    fn pin_defaults_to_forever() {
        let mut pool = CellPool::new();
        Cell::new(GridCoord::new(0, 0), options(1, false), Grid::default()).pin(&mut pool, 0.0, None);
        assert_eq!(pool.iter().next().and_then(Cell::expire_at), Some(PIN_FOREVER));
    }
}
