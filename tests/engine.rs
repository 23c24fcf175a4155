#![cfg(not(target_arch = "wasm32"))]

use glow_grid::prelude::*;
use glow_grid::sequence::{SpiralKind, Stage, MORSE_TEXT};
use glow_grid::{FontSpec, GridCoord, TouchPoint};
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

type Soft = ShapeController<SoftCanvas, BitmapRasterizer>;

const FRAME_MS: f64 = 16.0;

fn controller_at(width: f64, height: f64, seed: u64) -> Soft {
    controller_with(EngineConfig::default(), width, height, seed)
}

fn controller_with(config: EngineConfig, width: f64, height: f64, seed: u64) -> Soft {
    let viewport = Viewport::new(width, height, 1.0);
    ShapeController::new(
        config,
        SoftCanvas::new(),
        SoftCanvas::new(),
        BitmapRasterizer::new(viewport),
        viewport,
        seed,
    )
}

fn alive(seed: u64) -> Soft {
    let mut shape = controller_at(400.0, 300.0, seed);
    shape.init(0.0).unwrap();
    shape
}

fn distance(a: GridCoord, b: GridCoord) -> f64 {
    (((a.row - b.row).pow(2) + (a.col - b.col).pow(2)) as f64).sqrt()
}

fn centre(shape: &Soft) -> GridCoord {
    let m = shape.main_layer().metrics();
    let (cols, rows) = shape.grid().dimensions(m.width, m.height);
    GridCoord::new(rows / 2, cols / 2)
}

#[derive(Clone, Default)]
struct Beeper(Rc<Cell<usize>>);

impl AudioCue for Beeper {
    fn play(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn operations_need_init() {
    let mut shape = controller_at(400.0, 300.0, 1);
    assert!(matches!(shape.print("HI", 0.0), Err(EngineError::NotInitialized)));
    assert!(matches!(shape.frame(0.0), Err(EngineError::NotInitialized)));
    assert!(matches!(shape.pointer_down(1.0, 1.0, 0.0), Err(EngineError::NotInitialized)));

    shape.init(0.0).unwrap();
    shape.print("HI", 0.0).unwrap();
    shape.destroy();

    assert!(!shape.is_alive());
    assert!(shape.last_text().is_empty());
    assert!(shape.pools().cells.is_empty());
    assert!(matches!(shape.explode(None, 10.0), Err(EngineError::NotInitialized)));
    assert!(matches!(shape.spiral(SpiralOptions::default(), 10.0), Err(EngineError::NotInitialized)));
}

#[test]
fn init_rejects_a_zero_stride_grid() {
    let config = EngineConfig {
        cell_size: 0.0,
        border_width: 0.0,
        ..EngineConfig::default()
    };
    let mut shape = controller_with(config, 400.0, 300.0, 1);

    assert!(matches!(shape.init(0.0), Err(EngineError::InvalidConfig(_))));
    assert!(!shape.is_alive());
    assert_eq!(shape.stats().grid_draws, 0);
    assert!(!shape.main_layer().is_mounted());
}

#[test]
fn init_twice_draws_once() {
    let mut shape = alive(2);
    shape.init(5.0).unwrap();

    let stats = shape.stats();
    assert_eq!(stats.grid_draws, 1);
    assert_eq!(stats.primes, 1);
    assert!(shape.main_layer().is_mounted());

    // Destroy is just as idempotent, and a later init starts over.
    shape.destroy();
    shape.destroy();
    assert!(!shape.main_layer().is_mounted());
    shape.init(10.0).unwrap();
    assert!(shape.is_alive());
    assert_eq!(shape.stats().grid_draws, 2);
}

#[test]
fn ambient_and_text_cells_respect_the_electron_cap() {
    let mut shape = alive(3);
    shape.print("HELLO", 0.0).unwrap();

    // The opening spiral spawns forced electrons; let them burn out.
    let settled = 44;
    for frame in 1..settled {
        shape.frame(frame as f64 * FRAME_MS).unwrap();
    }

    let capacity = shape.pools().electrons.capacity();
    for frame in settled..settled + 300 {
        shape.frame(frame as f64 * FRAME_MS).unwrap();
        assert!(shape.pools().electrons.len() <= capacity, "frame {}", frame);
    }
}

#[test]
fn forced_ink_may_exceed_the_cap() {
    let mut shape = alive(4);
    let stride = shape.grid().stride();

    for i in 0..10 {
        assert!(shape.pointer_down(i as f64 * stride + 1.0, 1.0, 0.0).unwrap());
    }
    assert_eq!(shape.pools().electrons.len(), 40);
    assert!(shape.pools().electrons.len() > shape.pools().electrons.capacity());
}

#[test]
fn pointer_moves_within_a_cell_are_ignored() {
    let mut shape = alive(5);

    assert!(shape.pointer_move(5.0, 5.0, 0.0).unwrap());
    assert!(!shape.pointer_move(6.0, 6.0, 1.0).unwrap());
    assert!(shape.pointer_move(20.0, 5.0, 2.0).unwrap());
    // Presses always paint.
    assert!(shape.pointer_down(20.0, 5.0, 3.0).unwrap());
}

#[test]
fn touches_paint_once_per_position() {
    let mut shape = alive(6);
    let a = TouchPoint { id: 1, x: 5.0, y: 5.0 };
    let b = TouchPoint { id: 2, x: 100.0, y: 100.0 };

    assert_eq!(shape.touch_start(&[a, b], 0.0).unwrap(), 2);
    assert_eq!(shape.touch_move(&[a, b], 1.0).unwrap(), 0);

    shape.touch_end(None);
    assert_eq!(shape.touch_move(&[a, b], 2.0).unwrap(), 2);
}

#[test]
fn empty_text_has_no_matrix() {
    let mut shape = alive(7);
    assert!(shape.get_text_matrix("", None).is_empty());
    assert!(!shape.get_text_matrix("HI", None).is_empty());
}

#[test]
fn printed_text_is_pinned_until_cleared() {
    let mut shape = alive(8);
    let n = shape.print("HELLO", 0.0).unwrap();

    assert!(n > 0);
    assert_eq!(shape.last_text(), "HELLO");
    assert_eq!(shape.last_matrix().map(<[GridCoord]>::len), Some(n));
    // Text cells plus one default spiral.
    assert_eq!(shape.pools().cells.len(), n + 24);

    let burst = shape.clear(10.0).unwrap();
    assert!(shape.pools().cells.is_empty());
    assert!(shape.last_text().is_empty());
    assert!(shape.last_matrix().is_none());
    assert!(burst >= (n / 20).min(50), "burst {} for {} cells", burst, n);
    assert!(burst <= (n / 10).min(50), "burst {} for {} cells", burst, n);

    // Nothing left to burst.
    assert_eq!(shape.clear(20.0).unwrap(), 0);
}

#[test]
fn printing_nothing_releases_with_a_reverse_spiral() {
    let mut shape = alive(9);
    shape.print("HI", 0.0).unwrap();

    assert_eq!(shape.print("", 100.0).unwrap(), 0);
    assert_eq!(shape.pools().cells.len(), 24);
    assert!(shape.last_matrix().is_none());

    // The last spiral cell is pinned for 24 × 16 × 1.5 ms.
    shape.frame(100.0 + 577.0).unwrap();
    assert!(shape.pools().cells.is_empty());
}

#[test]
fn printing_nothing_on_a_blank_screen_does_nothing() {
    let mut shape = alive(10);
    assert_eq!(shape.print("", 0.0).unwrap(), 0);
    assert!(shape.pools().cells.is_empty());
}

#[test]
fn ring_keeps_its_radius() {
    let mut shape = alive(11);
    let placements = shape
        .spiral(
            SpiralOptions {
                radius: Some(6.0),
                ..SpiralOptions::default()
            },
            0.0,
        )
        .unwrap();

    assert_eq!(placements.len(), 24);
    assert_eq!(shape.pools().cells.len(), 24);

    let c = centre(&shape);
    for p in &placements {
        let d = distance(*p, c);
        assert!((4.5..=7.5).contains(&d), "{:?} is {} from {:?}", p, d, c);
    }
}

#[test]
fn staggered_spiral_cells_reveal_in_order() {
    let mut shape = alive(12);
    shape.spiral(SpiralOptions::default(), 0.0).unwrap();

    let updates: Vec<f64> = shape.pools().cells.iter().filter_map(|c| c.next_update()).collect();
    assert_eq!(updates.len(), 24);
    assert!(updates.windows(2).all(|w| w[1] - w[0] == 16.0));
    assert_eq!(updates[0], 16.0);
}

#[test]
fn galaxy_arm_grows_outwards() {
    let mut shape = alive(13);
    let placements = shape.spiral(SpiralKind::Galaxy.options(), 0.0).unwrap();
    let c = centre(&shape);

    assert_eq!(placements[0], c);
    let first = distance(placements[1], c);
    let last = distance(placements[23], c);
    assert!(last > first);
    assert!(last >= 21.0, "last arm cell only {} out", last);
}

#[test]
fn resize_is_debounced_and_reprints() {
    let mut shape = alive(14);
    shape.print("HI", 0.0).unwrap();
    let before = shape.stats();

    shape.resize(Viewport::new(500.0, 320.0, 1.0), 10.0);
    shape.resize(Viewport::new(520.0, 320.0, 1.0), 20.0);
    shape.frame(50.0).unwrap();
    assert_eq!(shape.background_layer().resize_count(), 0);

    shape.frame(120.0).unwrap();
    let after = shape.stats();
    assert_eq!(after.grid_draws, before.grid_draws + 1);
    assert_eq!(after.primes, before.primes + 1);
    assert_eq!(shape.background_layer().resize_count(), 1);
    assert_eq!(shape.main_layer().metrics().width, 520.0);

    assert_eq!(shape.last_text(), "HI");
    let matrix = shape.last_matrix().unwrap();
    let unique: HashSet<_> = matrix.iter().collect();
    assert_eq!(unique.len(), matrix.len());
}

#[test]
fn frames_draw_the_grid_under_the_main_layer() {
    let mut shape = alive(15);
    for frame in 1..=10 {
        shape.frame(frame as f64 * FRAME_MS).unwrap();
    }
    assert_eq!(shape.stats().frames, 10);

    let main = shape.main_layer().canvas();
    assert_eq!(main.width(), 400);
    assert_eq!(main.alpha_at(200, 150), 255);
}

#[test]
fn queue_types_one_letter_at_a_time() {
    let mut director = Director::new(alive(16), Silent);

    director.dispatch("#queue", 0.0).unwrap();
    assert_eq!(director.shape().last_text(), "C");

    director.advance(500.0).unwrap();
    assert_eq!(director.shape().last_text(), "C");

    director.advance(1001.0).unwrap();
    assert_eq!(director.shape().last_text(), "CU");

    director.dispatch("#clear", 1100.0).unwrap();
    assert!(director.sequence().is_none());
    assert!(director.shape().last_text().is_empty());
}

#[test]
fn spiral_sequences_cancel_each_other() {
    let mut director = Director::new(alive(17), Silent);

    director.dispatch("#galaxy", 0.0).unwrap();
    assert_eq!(
        director.sequence().map(|s| s.stage().clone()),
        Some(Stage::Spiral(SpiralKind::Galaxy))
    );

    director.advance(16.0).unwrap();
    director.dispatch("#RING", 20.0).unwrap();
    assert_eq!(
        director.sequence().map(|s| s.stage().clone()),
        Some(Stage::Spiral(SpiralKind::Ring))
    );

    director.dispatch("#destroy", 30.0).unwrap();
    assert!(director.sequence().is_none());
    assert!(!director.shape().is_alive());

    // Idle ticks are no-ops.
    director.advance(40.0).unwrap();
    assert_eq!(director.shape().stats().frames, 1);
}

#[test]
fn unknown_input_prints_the_fallback() {
    let mut director = Director::new(alive(18), Silent);
    director.dispatch("hello there", 0.0).unwrap();
    assert_eq!(director.shape().last_text(), glow_grid::command::FALLBACK_TEXT);
}

#[test]
fn missingno_ends_in_morse() {
    let beeps = Beeper::default();
    let mut director = Director::new(alive(19), beeps.clone());

    let morse = director
        .shape_mut()
        .get_text_matrix(MORSE_TEXT, Some(&FontSpec::new("bold", "Arial")))
        .len();
    let expected_beeps = MORSE_TEXT
        .chars()
        .take(morse)
        .filter(|c| matches!(c, '.' | '-'))
        .count();

    director.dispatch("MissingNo", 0.0).unwrap();

    let mut saw_greeting = false;
    let mut t = 0.0;
    while director.sequence().is_some() && t < 120_000.0 {
        t += 25.0;
        director.advance(t).unwrap();

        if director.shape().last_text().starts_with("EU") {
            saw_greeting = true;
        }
        if t < 1300.0 {
            assert!(matches!(
                director.sequence().map(|s| s.stage()),
                Some(Stage::Sprite { .. })
            ));
        }
    }

    assert!(saw_greeting);
    assert!(director.sequence().is_none(), "still running at {}", t);
    assert_eq!(beeps.0.get(), expected_beeps);
    // Morse cells stay pinned once the greeting has faded.
    assert_eq!(director.shape().pools().cells.len(), morse);
}

#[test]
fn random_bursts_light_ten_to_twenty_cells() {
    let roomy = EngineConfig {
        max_electrons: 1000,
        ..EngineConfig::default()
    };
    for seed in 0..8 {
        let mut shape = controller_with(roomy.clone(), 400.0, 300.0, seed);
        shape.init(0.0).unwrap();

        let lit = shape.explode(None, 0.0).unwrap();
        assert!((10..=20).contains(&lit), "seed {}: {} cells", seed, lit);
        assert!(shape.pools().electrons.len() >= lit);
    }
}

#[test]
fn random_bursts_stop_at_the_electron_cap() {
    // Default capacity: cells stop lighting once the pool fills up.
    let mut shape = alive(21);
    let lit = shape.explode(None, 0.0).unwrap();
    assert!(lit <= 20);
    assert!(shape.pools().electrons.len() <= shape.pools().electrons.capacity());

    // A pool already full of forced ink leaves no room at all.
    let mut shape = alive(22);
    let stride = shape.grid().stride();
    for i in 0..10 {
        shape.pointer_down(i as f64 * stride + 1.0, 1.0, 0.0).unwrap();
    }
    assert!(shape.pools().electrons.is_full());
    assert_eq!(shape.explode(None, 0.0).unwrap(), 0);
}

#[test]
fn printed_cells_first_repaint_within_the_stagger() {
    let mut shape = alive(23);
    let now = 100.0;
    let n = shape.print("HELLO", now).unwrap();

    // The release spiral is time limited; the text is pinned for good.
    let text: Vec<_> = shape
        .pools()
        .cells
        .iter()
        .filter(|c| c.expire_at().map_or(false, |t| t > now + 60_000.0))
        .collect();
    assert_eq!(text.len(), n);

    for cell in text {
        let next = cell.next_update().unwrap();
        assert!((now + 200.0..=now + 500.0).contains(&next), "{:?} at {}", cell.coord(), next);
    }
}

#[test]
fn ambient_cells_wait_out_their_cooldown() {
    let mut shape = alive(24);

    // Every frame within the first 300 ms shares one ambient roll.
    let mut t = 0.0;
    while t < 300.0 {
        shape.frame(t).unwrap();
        t += FRAME_MS;
    }
    assert_eq!(shape.stats().ambient_rolls, 1);

    let mut shape = alive(25);
    let mut rolls = Vec::new();
    let mut last = 0;
    for i in 0..1000 {
        let t = i as f64 * FRAME_MS;
        shape.frame(t).unwrap();
        if shape.stats().ambient_rolls > last {
            last = shape.stats().ambient_rolls;
            rolls.push(t);
        }
    }

    assert!(rolls.len() > 10);
    for gap in rolls.windows(2).map(|w| w[1] - w[0]) {
        assert!(gap >= 300.0, "gap {}", gap);
        assert!(gap < 1000.0 + FRAME_MS, "gap {}", gap);
    }
}
