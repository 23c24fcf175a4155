//! Headless driver: renders a printed message on the software canvas and
//! writes the final frame to a PNG.
//!
//! ```text
//! glow_grid [TEXT] [FRAMES] [OUTPUT]
//! ```
//!
//! `TEXT` may also be one of the page commands (`#galaxy`, `missingno`, ...).

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(e) = host::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

// The browser entry point lives in the library.
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod host {
    use glow_grid::prelude::*;
    use std::env;
    use std::error::Error;

    const FRAME_MS: f64 = 1000.0 / 60.0;
    const WIDTH: f64 = 640.0;
    const HEIGHT: f64 = 360.0;

    pub fn run() -> Result<(), Box<dyn Error>> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        let mut args = env::args().skip(1);
        let text = args.next().unwrap_or_else(|| "HELLO".to_string());
        let frames: u32 = match args.next() {
            Some(n) => n.parse()?,
            None => 120,
        };
        let output = args.next().unwrap_or_else(|| "glow_grid.png".to_string());

        let viewport = Viewport::new(WIDTH, HEIGHT, 1.0);
        let shape = ShapeController::new(
            EngineConfig::default(),
            SoftCanvas::new(),
            SoftCanvas::new(),
            BitmapRasterizer::new(viewport),
            viewport,
            rand_seed(),
        );
        let mut director = Director::new(shape, Silent);

        director.run(Command::Init, 0.0)?;
        match Command::parse(&text) {
            Command::Print(_) => {
                let cells = director.shape_mut().print(&text, 0.0)?;
                log::info!("{:?} covers {} cells", text, cells);
            }
            command => director.run(command, 0.0)?,
        }

        for frame in 1..=frames {
            director.advance(frame as f64 * FRAME_MS)?;
        }

        director.shape().main_layer().canvas().save_png(&output)?;

        let stats = director.shape().stats();
        log::info!(
            "wrote {} after {} frames ({} electrons live)",
            output,
            stats.frames,
            director.shape().pools().electrons.len()
        );
        Ok(())
    }

    fn rand_seed() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(7)
    }
}
