//! Scripted effect sequences.
//!
//! Each sequence is a stage plus the time its next step is due. The director
//! calls [`Sequence::fire`] from its tick; a step runs at most once per call
//! and decides both the following stage and how long to wait for it.

use crate::cell::CellOptions;
use crate::color::Rgba;
use crate::electron::ElectronOptions;
use crate::error::EngineError;
use crate::grid::GridCoord;
use crate::shape::{ShapeController, SpiralOptions};
use crate::surface::Canvas;
use crate::text::{FontSpec, TextRasterizer};

pub const QUEUE_TEXT: &str = "CUIDADO";
pub const GREETING_TEXT: &str = "EU TE VEJO";
pub const MORSE_TEXT: &str = "..-. .- --.. / --- / .-..";

/// MissingNo as `(x, y)` grid blocks, revealed one per step.
pub const MISSINGNO_SPRITE: [(i32, i32); 14] = [
    (2, 3), (2, 4), (2, 5), (3, 3), (3, 4), (3, 5),
    (4, 3), (4, 5), (5, 3), (5, 5),
    (6, 4), (7, 4), (8, 4), (9, 4),
];

const SPRITE_STEP_MS: f64 = 100.0;
const SPRITE_HOLD_MS: f64 = 2000.0;
const GREETING_LINGER_MS: f64 = 1800.0;
const MORSE_STEP_MS: f64 = 50.0;
const SPIRAL_REDRAW_MS: f64 = 16.0;

/// Something that can make a short sound. Playback is fire-and-forget.
pub trait AudioCue {
    fn play(&mut self);
}

/// No audio.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl AudioCue for Silent {
    fn play(&mut self) {}
}

/// Delay after revealing the `shown`-th character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pace {
    /// `1000 + shown` ms.
    Leisurely,
    /// `500 + 50 × shown` ms.
    Brisk,
}

impl Pace {
    fn delay(self, shown: usize) -> f64 {
        match self {
            Pace::Leisurely => 1000.0 + shown as f64,
            Pace::Brisk => 500.0 + 50.0 * shown as f64,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpiralKind {
    /// Growing arm from the centre.
    Galaxy,
    /// Fixed-radius ring.
    Ring,
}

impl SpiralKind {
    pub fn options(self) -> SpiralOptions {
        match self {
            SpiralKind::Galaxy => SpiralOptions {
                radius: Some(0.0),
                increment: 1.0,
                life_time: 100.0,
                electron_count: 1,
                ..SpiralOptions::default()
            },
            SpiralKind::Ring => SpiralOptions::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    /// Print one more character of `text` per step.
    Typewriter {
        text: String,
        shown: usize,
        pace: Pace,
        /// Once complete, wait this long and continue with the stage.
        then: Option<(f64, Box<Stage>)>,
    },
    /// Clear the screen, then continue.
    Fade { then: Box<Stage> },
    /// Reveal one more sprite block per step.
    Sprite { shown: usize },
    /// Pin one text-matrix cell per step, sounding the cue on Morse symbols.
    Morse {
        text: String,
        matrix: Option<Vec<GridCoord>>,
        index: usize,
    },
    /// Redraw a spiral every step, forever.
    Spiral(SpiralKind),
    Done,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    stage: Stage,
    next_fire: f64,
}

impl Sequence {
    pub fn new(stage: Stage, now: f64) -> Self {
        Self {
            stage,
            next_fire: now,
        }
    }

    /// Type out `CUIDADO`.
    pub fn queue(now: f64) -> Self {
        Self::new(
            Stage::Typewriter {
                text: QUEUE_TEXT.to_string(),
                shown: 0,
                pace: Pace::Leisurely,
                then: None,
            },
            now,
        )
    }

    pub fn galaxy(now: f64) -> Self {
        Self::new(Stage::Spiral(SpiralKind::Galaxy), now)
    }

    pub fn ring(now: f64) -> Self {
        Self::new(Stage::Spiral(SpiralKind::Ring), now)
    }

    /// Sprite reveal, greeting, then the Morse message.
    pub fn missingno(now: f64) -> Self {
        Self::new(Stage::Sprite { shown: 0 }, now)
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn next_fire(&self) -> f64 {
        self.next_fire
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Run the pending step if it is due. A failing step ends the sequence.
    pub fn fire<C, R, A>(
        &mut self,
        now: f64,
        shape: &mut ShapeController<C, R>,
        audio: &mut A,
    ) -> Result<(), EngineError>
    where
        C: Canvas,
        R: TextRasterizer,
        A: AudioCue + ?Sized,
    {
        if self.is_done() || now < self.next_fire {
            return Ok(());
        }

        let stage = std::mem::replace(&mut self.stage, Stage::Done);
        let (stage, wait) = Self::step(stage, now, shape, audio)?;
        self.stage = stage;
        self.next_fire = now + wait;
        Ok(())
    }

    fn step<C, R, A>(
        stage: Stage,
        now: f64,
        shape: &mut ShapeController<C, R>,
        audio: &mut A,
    ) -> Result<(Stage, f64), EngineError>
    where
        C: Canvas,
        R: TextRasterizer,
        A: AudioCue + ?Sized,
    {
        let next = match stage {
            Stage::Typewriter {
                text,
                shown,
                pace,
                then,
            } if shown < text.chars().count() => {
                let shown = shown + 1;
                let prefix: String = text.chars().take(shown).collect();
                shape.print(&prefix, now)?;
                (
                    Stage::Typewriter {
                        text,
                        shown,
                        pace,
                        then,
                    },
                    pace.delay(shown),
                )
            }
            Stage::Typewriter {
                then: Some((linger, then)),
                ..
            } => (Stage::Fade { then }, linger),
            Stage::Typewriter { then: None, .. } => (Stage::Done, 0.0),

            Stage::Fade { then } => {
                shape.clear(now)?;
                (*then, 0.0)
            }

            Stage::Sprite { shown } if shown < MISSINGNO_SPRITE.len() => {
                let shown = shown + 1;
                shape.paint_blocks(&MISSINGNO_SPRITE[..shown])?;
                (Stage::Sprite { shown }, SPRITE_STEP_MS)
            }
            Stage::Sprite { .. } => (
                Stage::Typewriter {
                    text: GREETING_TEXT.to_string(),
                    shown: 0,
                    pace: Pace::Brisk,
                    then: Some((
                        GREETING_LINGER_MS,
                        Box::new(Stage::Morse {
                            text: MORSE_TEXT.to_string(),
                            matrix: None,
                            index: 0,
                        }),
                    )),
                },
                SPRITE_HOLD_MS,
            ),

            Stage::Morse {
                text,
                matrix,
                index,
            } => {
                let matrix = match matrix {
                    Some(m) => m,
                    None => shape.get_text_matrix(&text, Some(&FontSpec::new("bold", "Arial"))),
                };
                let Some(&coord) = matrix.get(index) else {
                    return Ok((Stage::Done, 0.0));
                };

                shape.pin_cell(coord, morse_cell(), now)?;
                if matches!(text.chars().nth(index), Some('.' | '-')) {
                    audio.play();
                }

                (
                    Stage::Morse {
                        text,
                        matrix: Some(matrix),
                        index: index + 1,
                    },
                    MORSE_STEP_MS,
                )
            }

            Stage::Spiral(kind) => {
                shape.spiral(kind.options(), now)?;
                (Stage::Spiral(kind), SPIRAL_REDRAW_MS)
            }

            Stage::Done => (Stage::Done, 0.0),
        };
        Ok(next)
    }
}

/// Plain red cell, no electrons.
fn morse_cell() -> CellOptions {
    CellOptions {
        background: Rgba::rgb(0xff, 0x00, 0x00),
        electron_count: 0,
        force_electrons: false,
        electron_options: ElectronOptions::default(),
    }
}
