//! Live electrons and pinned cells.
//!
//! Both pools are swept once per frame: anything at or past its expiry is
//! dropped, everything else paints.

use crate::cell::Cell;
use crate::electron::Electron;
use crate::error::EngineError;
use crate::surface::{Canvas, Layer};
use rand::Rng;

pub struct ElectronPool {
    items: Vec<Electron>,
    capacity: usize,
}

impl ElectronPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn headroom(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    pub fn is_full(&self) -> bool {
        self.headroom() == 0
    }

    /// How many of `requested` electrons may be spawned now. Forced spawns
    /// ignore the capacity.
    pub fn reserve(&self, requested: usize, force: bool) -> Result<usize, EngineError> {
        if force || requested == 0 {
            return Ok(requested);
        }
        match self.headroom() {
            0 => Err(EngineError::ResourceExhausted {
                requested,
                capacity: self.capacity,
            }),
            room => Ok(requested.min(room)),
        }
    }

    pub fn push(&mut self, electron: Electron) {
        self.items.push(electron);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Electron> {
        self.items.iter()
    }

    /// Drop electrons with less than `limit` ms to live.
    pub fn strip_old(&mut self, now: f64, limit: f64) {
        self.items.retain(|e| e.expire_at() - now >= limit);
    }

    pub fn sweep(&mut self, now: f64) {
        self.items.retain(|e| now < e.expire_at());
    }

    pub fn sweep_and_paint<C: Canvas, R: Rng + ?Sized>(&mut self, layer: &mut Layer<C>, now: f64, rng: &mut R) {
        self.sweep(now);
        for electron in self.items.iter_mut() {
            electron.paint_next_to(layer, now, rng);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Default)]
pub struct CellPool {
    items: Vec<Cell>,
}

impl CellPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, cell: Cell) {
        self.items.push(cell);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.items.iter()
    }

    pub fn sweep(&mut self, now: f64) {
        self.items.retain(|c| c.expire_at().map_or(true, |t| now < t));
    }

    /// Sweep, then let every surviving cell repaint. Cells spawn into
    /// `electrons` as they fire.
    pub fn sweep_and_paint<C: Canvas, R: Rng + ?Sized>(
        &mut self,
        layer: &mut Layer<C>,
        electrons: &mut ElectronPool,
        now: f64,
        rng: &mut R,
    ) {
        self.sweep(now);
        for cell in self.items.iter_mut() {
            cell.paint_next_to(layer, electrons, now, rng);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// The two pools a controller owns.
pub struct Pools {
    pub electrons: ElectronPool,
    pub cells: CellPool,
}

impl Pools {
    pub fn new(max_electrons: usize) -> Self {
        Self {
            electrons: ElectronPool::new(max_electrons),
            cells: CellPool::new(),
        }
    }

    pub fn clear(&mut self) {
        self.electrons.clear();
        self.cells.clear();
    }
}
