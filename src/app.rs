use std::sync::{Arc, Mutex};

use ratatui::layout::{Position, Rect};
use tracing::error;

use crate::clips::ClipId;
use crate::controller::{BeatController, PlayState};
use crate::mixer::Mixer;
use crate::pattern::Beat;
use crate::ui;

// ── App state ─────────────────────────────────────────────────────────────────

pub struct App {
    pub controller:  BeatController,
    pub mixer:       Arc<Mutex<Mixer>>,
    pub should_quit: bool,
    pub status_msg:  String,
}

impl App {
    pub fn new(controller: BeatController, mixer: Arc<Mutex<Mixer>>) -> Self {
        Self { controller, mixer, should_quit: false, status_msg: String::new() }
    }

    // ── Transport ─────────────────────────────────────────────────────────

    pub fn toggle_play(&mut self) {
        self.status_msg = match self.controller.toggle() {
            Ok(PlayState::Playing) => "Playing".to_string(),
            Ok(PlayState::Stopped) => "Stopped".to_string(),
            Err(e) => {
                error!("cannot start beat timer: {}", e);
                format!("Timer error: {}", e)
            }
        };
    }

    /// Left click at terminal cell `(col, row)`; toggles when it lands on the
    /// button drawn inside `screen`.
    pub fn click(&mut self, col: u16, row: u16, screen: Rect) {
        if ui::button_area(screen).contains(Position::new(col, row)) {
            self.toggle_play();
        }
    }

    pub fn volume_up(&mut self) {
        let mut m = self.mixer.lock().unwrap();
        m.volume = (m.volume + 0.05).min(1.0);
        self.status_msg = format!("Volume: {:.0}%", m.volume * 100.0);
    }

    pub fn volume_down(&mut self) {
        let mut m = self.mixer.lock().unwrap();
        m.volume = (m.volume - 0.05).max(0.0);
        self.status_msg = format!("Volume: {:.0}%", m.volume * 100.0);
    }

    // ── UI read helpers ───────────────────────────────────────────────────

    pub fn is_playing(&self) -> bool { self.controller.is_playing() }

    pub fn button_label(&self) -> &'static str {
        if self.is_playing() { "Stop" } else { "Start" }
    }

    pub fn volume(&self) -> f32 { self.mixer.lock().unwrap().volume }

    pub fn loaded_clips(&self) -> usize { self.mixer.lock().unwrap().loaded_clips() }

    pub fn last_beat(&self) -> Option<Beat> { self.controller.last_beat() }

    /// Beats per minute implied by the tick interval.
    pub fn bpm(&self) -> f32 {
        60_000.0 / (self.controller.interval().as_millis().max(1) as f32)
    }

    pub fn note_label(&self, beat: &Beat) -> String {
        match beat.sounding_note() {
            Some(n) => format!("{} ({}, {} ms)", ClipId::Note(n).name(), beat.duration.name(),
                               beat.duration.nominal(self.controller.interval()).as_millis()),
            None    => "rest".to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clips::ClipBank;
    use std::time::Duration;

    pub(crate) fn test_app() -> App {
        let mut mixer = Mixer::new(44_100.0);
        mixer.load(ClipBank::synthesized(8_000));
        let mixer = Arc::new(Mutex::new(mixer));
        let controller = BeatController::new(mixer.clone(), Duration::from_secs(60), Some(5));
        App::new(controller, mixer)
    }

    #[test]
    fn button_label_follows_state() {
        let mut app = test_app();
        assert_eq!(app.button_label(), "Start");
        app.toggle_play();
        assert_eq!(app.button_label(), "Stop");
        assert_eq!(app.status_msg, "Playing");
        app.toggle_play();
        assert_eq!(app.button_label(), "Start");
        assert_eq!(app.controller.phase(), 0);
    }

    #[test]
    fn click_outside_button_is_ignored() {
        let mut app = test_app();
        let screen = Rect::new(0, 0, 80, 24);
        app.click(0, 0, screen);
        assert!(!app.is_playing());
        let button = ui::button_area(screen);
        app.click(button.x + 1, button.y + 1, screen);
        assert!(app.is_playing());
        app.click(button.x + 1, button.y + 1, screen);
        assert!(!app.is_playing());
    }

    #[test]
    fn volume_is_clamped() {
        let mut app = test_app();
        for _ in 0..30 { app.volume_up(); }
        assert_eq!(app.volume(), 1.0);
        for _ in 0..30 { app.volume_down(); }
        assert_eq!(app.volume(), 0.0);
    }

    #[test]
    fn tempo_and_note_labels() {
        use crate::pattern::{percussion_for_phase, DurationClass};

        let app = test_app();
        assert_eq!(app.bpm(), 1.0);
        assert_eq!(app.loaded_clips(), ClipId::COUNT);

        let mut beat = Beat { phase: 0, percussion: percussion_for_phase(0), note: 4, duration: DurationClass::Half };
        assert_eq!(app.note_label(&beat), "G4 (half, 120000 ms)");
        beat.duration = DurationClass::Rest;
        assert_eq!(app.note_label(&beat), "rest");
    }
}
