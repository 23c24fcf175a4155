//! Electrons: glowing points that wander the grid lines and fade out.

use crate::color::Rgba;
use crate::config::STEP_LENGTH;
use crate::grid::Grid;
use crate::surface::{Blend, Canvas, Layer};
use rand::Rng;
use std::collections::HashSet;

/// Extra destination draws allowed when the first one was already visited.
pub const MAX_RETARGET_ATTEMPTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElectronOptions {
    /// Milliseconds from spawn to fully faded.
    pub life_time: f64,
    /// Pixels moved per axis per tick.
    pub speed: f64,
    pub color: Rgba,
}

impl Default for ElectronOptions {
    fn default() -> Self {
        Self {
            life_time: 3000.0,
            speed: STEP_LENGTH,
            color: Rgba::rgb(0x00, 0xb0, 0x7c),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Electron {
    life_time: f64,
    expire_at: f64,
    speed: f64,
    color: Rgba,
    radius: f64,
    current: [f64; 2],
    destination: [f64; 2],
    trails: [[f64; 2]; 4],
    visited: HashSet<(i64, i64)>,
}

fn key([x, y]: [f64; 2]) -> (i64, i64) {
    (x.round() as i64, y.round() as i64)
}

impl Electron {
    pub fn new<R: Rng + ?Sized>(
        x: f64,
        y: f64,
        options: ElectronOptions,
        grid: &Grid,
        now: f64,
        rng: &mut R,
    ) -> Self {
        // A non-positive speed would never reach its first waypoint.
        let speed = if options.speed > 0.0 {
            options.speed
        } else {
            log::warn!("electron speed {} is not positive, using {}", options.speed, STEP_LENGTH);
            STEP_LENGTH
        };

        let mut electron = Self {
            life_time: options.life_time,
            expire_at: now + options.life_time,
            speed,
            color: options.color,
            radius: grid.border_width / 2.0,
            current: [x, y],
            destination: [x, y],
            trails: grid.move_trails(),
            visited: HashSet::new(),
        };
        let first = electron.random_path(rng);
        electron.set_dest(first);
        electron
    }

    pub fn position(&self) -> [f64; 2] {
        self.current
    }

    pub fn destination(&self) -> [f64; 2] {
        self.destination
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn expire_at(&self) -> f64 {
        self.expire_at
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    fn random_path<R: Rng + ?Sized>(&self, rng: &mut R) -> [f64; 2] {
        let [dx, dy] = self.trails[rng.gen_range(0..self.trails.len())];
        [self.current[0] + dx, self.current[1] + dy]
    }

    fn has_visited(&self, dest: [f64; 2]) -> bool {
        self.visited.contains(&key(dest))
    }

    fn set_dest(&mut self, dest: [f64; 2]) {
        self.destination = dest;
        self.visited.insert(key(dest));
    }

    fn arrived(&self) -> bool {
        let half = self.speed / 2.0;
        (self.current[0] - self.destination[0]).abs() <= half
            && (self.current[1] - self.destination[1]).abs() <= half
    }

    /// Advance one tick and return the new position.
    ///
    /// Overshooting a waypoint by up to `speed / 2` is accepted; the next
    /// waypoint is measured from wherever the electron actually is.
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> [f64; 2] {
        if self.arrived() {
            let mut dest = self.random_path(rng);
            let mut attempts = 1;
            while self.has_visited(dest) && attempts <= MAX_RETARGET_ATTEMPTS {
                attempts += 1;
                dest = self.random_path(rng);
            }
            // Out of attempts: a revisited node is fine.
            self.set_dest(dest);
        }

        for axis in 0..2 {
            let delta = self.destination[axis] - self.current[axis];
            if delta != 0.0 {
                self.current[axis] += delta.signum() * self.speed;
            }
        }

        self.current
    }

    /// Remaining lifetime fraction, `1.0` at spawn down to `0.0` at expiry.
    pub fn opacity(&self, now: f64) -> f64 {
        if self.life_time <= 0.0 {
            return 0.0;
        }
        ((self.expire_at - now).max(0.0) / self.life_time).min(1.0)
    }

    pub fn paint_next_to<C: Canvas, R: Rng + ?Sized>(&mut self, layer: &mut Layer<C>, now: f64, rng: &mut R) {
        let [x, y] = self.next(rng);
        let (alpha, color, radius) = (self.opacity(now), self.color, self.radius);

        layer.paint(|ctx, _| {
            ctx.set_alpha(alpha);
            ctx.set_fill(color);
            ctx.set_glow(color, radius * 5.0);
            ctx.set_blend(Blend::Lighter);
            ctx.fill_circle(x, y, radius);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn spawn(speed: f64, rng: &mut SmallRng) -> Electron {
        let options = ElectronOptions {
            speed,
            ..ElectronOptions::default()
        };
        Electron::new(-1.0, -1.0, options, &Grid::default(), 0.0, rng)
    }

    #[test]
    fn first_destination_is_one_stride_away() {
        let mut rng = SmallRng::seed_from_u64(1);
        let e = spawn(1.0, &mut rng);
        let [dx, dy] = e.destination();
        let moved = (dx + 1.0).abs() + (dy + 1.0).abs();
        assert_eq!(moved, 12.0);
    }

    #[test]
    fn converges_by_exactly_speed_per_tick() {
        let mut rng = SmallRng::seed_from_u64(7);
        for speed in [1.0, 2.0, 3.0, 5.0] {
            let mut e = spawn(speed, &mut rng);
            for _ in 0..200 {
                let before = e.position();
                let dest_before = e.destination();
                let retarget = (before[0] - dest_before[0]).abs() <= speed / 2.0
                    && (before[1] - dest_before[1]).abs() <= speed / 2.0;
                let after = e.next(&mut rng);
                let dest = e.destination();

                for axis in 0..2 {
                    let step = after[axis] - before[axis];
                    if dest[axis] == before[axis] {
                        assert_eq!(step, 0.0);
                    } else {
                        assert_eq!(step.abs(), speed);
                        assert_eq!(step.signum(), (dest[axis] - before[axis]).signum());
                    }
                }
                if !retarget {
                    assert_eq!(dest, dest_before, "destination only changes on arrival");
                }
            }
        }
    }

    #[test]
    fn retargets_on_arrival() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut e = spawn(3.0, &mut rng);
        let first = e.destination();
        for _ in 0..4 {
            e.next(&mut rng);
        }
        // 12 px at 3 px/tick: arrived, next tick picks a new waypoint.
        assert_eq!(e.position(), first);
        e.next(&mut rng);
        assert_ne!(e.destination(), first);
    }

    #[test]
    fn exhausted_retries_accept_a_revisited_node() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut e = spawn(1.0, &mut rng);
        e.destination = e.current;
        let trails = e.trails;
        for [dx, dy] in trails {
            e.visited.insert(key([e.current[0] + dx, e.current[1] + dy]));
        }

        // The spawn waypoint is one of the four neighbours.
        assert_eq!(e.visited.len(), 4);

        e.next(&mut rng);
        let dest = e.destination();
        assert_eq!((dest[0] + 1.0).abs() + (dest[1] + 1.0).abs(), 12.0);
        assert_eq!(e.visited.len(), 4, "the accepted node was already known");
    }

    #[test]
    fn opacity_fades_to_zero_at_expiry() {
        let mut rng = SmallRng::seed_from_u64(5);
        let e = spawn(1.0, &mut rng);
        let mut last = f64::INFINITY;
        for t in (0..=3000).step_by(100) {
            let o = e.opacity(t as f64);
            assert!(o <= last);
            last = o;
        }
        assert_eq!(e.opacity(0.0), 1.0);
        assert_eq!(e.opacity(3000.0), 0.0);
        assert_eq!(e.opacity(9000.0), 0.0);
    }

    #[test]
    fn zero_speed_falls_back_to_step_length() {
        let mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(spawn(0.0, &mut rng).speed(), STEP_LENGTH);
    }
}
