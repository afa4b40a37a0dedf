use std::sync::Mutex;

use tracing::debug;

use crate::clips::{Clip, ClipBank, ClipId};
use crate::controller::ClipSink;

// ── Clip player ───────────────────────────────────────────────────────────────

/// One-shot player for a single clip.  Every call is a no-op when the slot
/// holds no clip.
#[derive(Clone, Debug, Default)]
pub struct ClipPlayer {
    clip:        Option<Clip>,
    position:    f64,
    pub playing: bool,
}

impl ClipPlayer {
    pub fn new(clip: Option<Clip>) -> Self {
        Self { clip, position: 0.0, playing: false }
    }

    pub fn is_loaded(&self) -> bool { self.clip.is_some() }

    #[cfg(test)]
    pub fn position(&self) -> f64 { self.position }

    /// Seek to the start and play.
    pub fn launch(&mut self) {
        if self.clip.is_some() {
            self.position = 0.0;
            self.playing  = true;
        }
    }

    /// Pause and rewind.
    pub fn stop_and_reset(&mut self) {
        self.playing  = false;
        self.position = 0.0;
    }

    pub fn release(&mut self) {
        self.stop_and_reset();
        self.clip = None;
    }

    /// Next output sample at `out_rate`, linearly interpolated when the clip
    /// was recorded at another rate.
    pub fn next_sample(&mut self, out_rate: f32) -> f32 {
        if !self.playing { return 0.0; }
        let Some(clip) = &self.clip else { return 0.0 };

        let idx = self.position as usize;
        if idx >= clip.samples.len() {
            self.stop_and_reset();
            return 0.0;
        }
        let frac = (self.position - idx as f64) as f32;
        let a = clip.samples[idx];
        let b = clip.samples.get(idx + 1).copied().unwrap_or(0.0);

        self.position += clip.sample_rate as f64 / out_rate.max(1.0) as f64;
        a + (b - a) * frac
    }
}

// ── Mixer ─────────────────────────────────────────────────────────────────────

pub struct Mixer {
    pub sample_rate: f32,
    pub volume:      f32,
    players:         Vec<ClipPlayer>,
}

impl Mixer {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate, volume: 0.5, players: vec![ClipPlayer::default(); ClipId::COUNT] }
    }

    /// Replace every player with one for the matching bank slot.
    pub fn load(&mut self, bank: ClipBank) {
        self.players = bank.into_slots().into_iter().map(ClipPlayer::new).collect();
    }

    #[cfg(test)]
    pub fn player(&self, id: ClipId) -> Option<&ClipPlayer> {
        self.players.get(id.index())
    }

    pub fn launch(&mut self, id: ClipId) {
        match self.players.get_mut(id.index()) {
            Some(p) if p.is_loaded() => p.launch(),
            _ => debug!(clip = %id.name(), "no clip loaded, skipping"),
        }
    }

    pub fn stop_all(&mut self) {
        self.players.iter_mut().for_each(ClipPlayer::stop_and_reset);
    }

    pub fn release(&mut self) {
        self.players.iter_mut().for_each(ClipPlayer::release);
    }

    pub fn loaded_clips(&self) -> usize {
        self.players.iter().filter(|p| p.is_loaded()).count()
    }

    pub fn generate_sample(&mut self) -> f32 {
        let sr = self.sample_rate;
        let mix: f32 = self.players.iter_mut().map(|p| p.next_sample(sr)).sum();
        (mix * self.volume).tanh()
    }
}

impl ClipSink for Mutex<Mixer> {
    fn launch(&self, clip: ClipId) { self.lock().unwrap().launch(clip); }

    fn stop_all(&self) { self.lock().unwrap().stop_all(); }

    fn release(&self) { self.lock().unwrap().release(); }
}
