use crate::sequence::AudioCue;
use web_sys::HtmlAudioElement;

/// Served from `static/sound.wav`, an 80 ms 880 Hz beep.
pub const CUE_URL: &str = "./sound.wav";

/// A short clip restarted from the beginning on every cue. The cue is
/// optional: a clip that fails to load or play is logged and skipped.
pub struct WebAudioCue {
    audio: Option<HtmlAudioElement>,
}

impl WebAudioCue {
    pub fn new(url: &str) -> Self {
        let audio = match HtmlAudioElement::new_with_src(url) {
            Ok(audio) => Some(audio),
            Err(e) => {
                log::warn!("audio cue unavailable: {:?}", e);
                None
            }
        };
        Self { audio }
    }
}

impl AudioCue for WebAudioCue {
    fn play(&mut self) {
        let Some(audio) = &self.audio else {
            return;
        };
        audio.set_current_time(0.0);
        // The returned promise is dropped; a blocked autoplay only logs in
        // the browser console.
        if let Err(e) = audio.play() {
            log::debug!("audio cue failed: {:?}", e);
        }
    }
}
