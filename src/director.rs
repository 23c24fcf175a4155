//! Command dispatch and the per-frame tick.

use crate::command::Command;
use crate::error::EngineError;
use crate::sequence::{AudioCue, Sequence};
use crate::shape::ShapeController;
use crate::surface::Canvas;
use crate::text::TextRasterizer;

/// Owns the controller, the audio cue and at most one running sequence.
///
/// Sequences are mutually exclusive: any command cancels the running one
/// before it takes effect.
pub struct Director<C: Canvas, R: TextRasterizer, A: AudioCue> {
    shape: ShapeController<C, R>,
    audio: A,
    sequence: Option<Sequence>,
}

impl<C: Canvas, R: TextRasterizer, A: AudioCue> Director<C, R, A> {
    pub fn new(shape: ShapeController<C, R>, audio: A) -> Self {
        Self {
            shape,
            audio,
            sequence: None,
        }
    }

    pub fn shape(&self) -> &ShapeController<C, R> {
        &self.shape
    }

    pub fn shape_mut(&mut self) -> &mut ShapeController<C, R> {
        &mut self.shape
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    /// Parse and run one line of user input.
    pub fn dispatch(&mut self, input: &str, now: f64) -> Result<(), EngineError> {
        let command = Command::parse(input);
        log::info!("command {:?}", command);
        self.run(command, now)
    }

    pub fn run(&mut self, command: Command, now: f64) -> Result<(), EngineError> {
        if self.sequence.take().is_some() {
            log::debug!("cancelled running sequence");
        }

        match command {
            Command::Destroy => {
                self.shape.destroy();
                Ok(())
            }
            Command::Init => self.shape.init(now),
            Command::Explode => self.shape.explode(None, now).map(drop),
            Command::Clear => self.shape.clear(now).map(drop),
            Command::Queue => self.start(Sequence::queue(now), now),
            Command::Galaxy => {
                self.shape.clear(now)?;
                self.start(Sequence::galaxy(now), now)
            }
            Command::Ring => {
                self.shape.clear(now)?;
                self.start(Sequence::ring(now), now)
            }
            Command::MissingNo => self.start(Sequence::missingno(now), now),
            Command::Print(text) => self.shape.print(&text, now).map(drop),
        }
    }

    fn start(&mut self, sequence: Sequence, now: f64) -> Result<(), EngineError> {
        self.sequence = Some(sequence);
        self.step_sequence(now)
    }

    fn step_sequence(&mut self, now: f64) -> Result<(), EngineError> {
        let Some(sequence) = self.sequence.as_mut() else {
            return Ok(());
        };

        let result = sequence.fire(now, &mut self.shape, &mut self.audio);
        if result.is_err() || sequence.is_done() {
            self.sequence = None;
        }
        result
    }

    /// One tick of the driver loop: advance the running sequence, then
    /// render a frame. Does nothing while the controller is idle.
    pub fn advance(&mut self, now: f64) -> Result<(), EngineError> {
        if !self.shape.is_alive() {
            return Ok(());
        }

        if let Err(e) = self.step_sequence(now) {
            log::warn!("sequence stopped: {}", e);
        }
        self.shape.frame(now)
    }
}
