use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::clips::ClipId;
use crate::pattern::{Beat, Groove};

/// Default tick interval (200 BPM).
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(300);

/// Anything that can play clips by id.
pub trait ClipSink: Send + Sync {
    /// Rewind the clip and start it.  Unknown or missing clips are ignored.
    fn launch(&self, clip: ClipId);
    /// Pause and rewind every clip.
    fn stop_all(&self);
    /// Drop every clip resource.
    fn release(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState { Stopped, Playing }

// ── Repeating timer ───────────────────────────────────────────────────────────

/// Background thread calling `on_tick` once immediately and then on every
/// later multiple of `interval`.  Boundaries missed during a stall are
/// skipped, not replayed.  Dropping it cancels.
struct Ticker {
    stop:   Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    fn spawn<F>(interval: Duration, mut on_tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("beat-timer".into())
            .spawn(move || {
                let mut deadline = Instant::now();
                loop {
                    on_tick();
                    let now = Instant::now();
                    deadline += interval;
                    while deadline <= now { deadline += interval; }
                    let wait = deadline - now;
                    match rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
            })?;
        Ok(Self { stop: Some(tx), handle: Some(handle) })
    }

    fn cancel(&mut self) {
        // Closing the channel wakes the thread out of its wait.
        self.stop.take();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) { self.cancel(); }
}

// ── Controller ────────────────────────────────────────────────────────────────

fn play_tick(groove: &Mutex<Groove>, sink: &dyn ClipSink) -> Beat {
    let beat = groove.lock().unwrap().advance();
    for &drum in beat.percussion {
        sink.launch(ClipId::Drum(drum));
    }
    if let Some(note) = beat.sounding_note() {
        sink.launch(ClipId::Note(note));
    }
    debug!(phase = beat.phase, note = beat.note, duration = beat.duration.name(), "tick");
    beat
}

/// Start/stop state machine driving the groove from a repeating timer.
pub struct BeatController {
    sink:     Arc<dyn ClipSink>,
    groove:   Arc<Mutex<Groove>>,
    ticker:   Option<Ticker>,
    interval: Duration,
}

impl BeatController {
    pub fn new(sink: Arc<dyn ClipSink>, interval: Duration, seed: Option<u64>) -> Self {
        Self {
            sink,
            groove: Arc::new(Mutex::new(Groove::new(seed))),
            ticker: None,
            interval,
        }
    }

    pub fn state(&self) -> PlayState {
        if self.ticker.is_some() { PlayState::Playing } else { PlayState::Stopped }
    }

    pub fn is_playing(&self) -> bool { self.state() == PlayState::Playing }

    pub fn interval(&self) -> Duration { self.interval }

    pub fn phase(&self) -> u8 { self.groove.lock().unwrap().phase() }

    pub fn last_beat(&self) -> Option<Beat> { self.groove.lock().unwrap().last }

    pub fn toggle(&mut self) -> io::Result<PlayState> {
        match self.state() {
            PlayState::Stopped => self.start()?,
            PlayState::Playing => self.stop(),
        }
        Ok(self.state())
    }

    pub fn start(&mut self) -> io::Result<()> {
        if self.is_playing() { return Ok(()); }
        self.groove.lock().unwrap().reset();

        let groove = Arc::clone(&self.groove);
        let sink   = Arc::clone(&self.sink);
        let ticker = Ticker::spawn(self.interval, move || { play_tick(&groove, sink.as_ref()); })?;
        self.ticker = Some(ticker);
        info!(interval_ms = self.interval.as_millis() as u64, "playback started");
        Ok(())
    }

    pub fn stop(&mut self) {
        let Some(mut ticker) = self.ticker.take() else { return };
        ticker.cancel();
        self.groove.lock().unwrap().reset();
        self.sink.stop_all();
        info!("playback stopped");
    }
}

impl Drop for BeatController {
    fn drop(&mut self) {
        if let Some(mut ticker) = self.ticker.take() { ticker.cancel(); }
        self.sink.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Drum;

    #[derive(Default)]
    struct RecordingSink {
        launched: Mutex<Vec<ClipId>>,
        stops:    Mutex<usize>,
        released: Mutex<bool>,
    }

    impl RecordingSink {
        fn launched(&self) -> Vec<ClipId> { self.launched.lock().unwrap().clone() }
    }

    impl ClipSink for RecordingSink {
        fn launch(&self, clip: ClipId) { self.launched.lock().unwrap().push(clip); }
        fn stop_all(&self) { *self.stops.lock().unwrap() += 1; }
        fn release(&self) { *self.released.lock().unwrap() = true; }
    }

    fn wait_for_launches(sink: &RecordingSink, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while sink.launched().len() < n && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Records when each tick's hi-hat lands and stalls inside the second one.
    #[derive(Default)]
    struct StallingSink {
        hats:  Mutex<Vec<Instant>>,
        stall: Duration,
    }

    impl ClipSink for StallingSink {
        fn launch(&self, clip: ClipId) {
            if clip != ClipId::Drum(Drum::HiHat) { return; }
            let count = {
                let mut hats = self.hats.lock().unwrap();
                hats.push(Instant::now());
                hats.len()
            };
            if count == 2 { thread::sleep(self.stall); }
        }
        fn stop_all(&self) {}
        fn release(&self) {}
    }

    fn controller(interval: Duration) -> (Arc<RecordingSink>, BeatController) {
        let sink = Arc::new(RecordingSink::default());
        let ctrl = BeatController::new(sink.clone(), interval, Some(3));
        (sink, ctrl)
    }

    #[test]
    fn toggling_twice_returns_to_stopped_on_downbeat() {
        let (sink, mut ctrl) = controller(Duration::from_secs(60));
        assert_eq!(ctrl.state(), PlayState::Stopped);
        assert_eq!(ctrl.toggle().unwrap(), PlayState::Playing);
        wait_for_launches(&sink, 1);
        assert_eq!(ctrl.phase(), 1);
        assert!(ctrl.last_beat().is_some());
        assert_eq!(ctrl.toggle().unwrap(), PlayState::Stopped);
        assert_eq!(ctrl.phase(), 0);
        assert!(ctrl.last_beat().is_none());
        assert_eq!(*sink.stops.lock().unwrap(), 1);
    }

    #[test]
    fn first_tick_fires_immediately_on_the_downbeat() {
        let (sink, mut ctrl) = controller(Duration::from_secs(60));
        ctrl.start().unwrap();
        wait_for_launches(&sink, 1);
        ctrl.stop();
        let launched = sink.launched();
        assert_eq!(&launched[..2], &[ClipId::Drum(Drum::Kick), ClipId::Drum(Drum::HiHat)]);
    }

    #[test]
    fn ticks_play_percussion_and_gated_notes() {
        let (sink, ctrl) = controller(Duration::from_secs(60));
        let mut notes = 0;
        for expected_phase in [0u8, 1, 2, 3, 0, 1] {
            let before = sink.launched().len();
            let beat = play_tick(&ctrl.groove, sink.as_ref());
            assert_eq!(beat.phase, expected_phase);
            let new = &sink.launched()[before..];
            let drums: Vec<ClipId> = beat.percussion.iter().map(|&d| ClipId::Drum(d)).collect();
            assert_eq!(&new[..drums.len()], drums.as_slice());
            match beat.sounding_note() {
                Some(n) => { assert_eq!(new.last(), Some(&ClipId::Note(n))); notes += 1; }
                None    => assert_eq!(new.len(), drums.len()),
            }
        }
        assert!(notes <= 6);
        assert_eq!(ctrl.phase(), 2);
    }

    #[test]
    fn stop_halts_the_timer() {
        let (sink, mut ctrl) = controller(Duration::from_millis(10));
        ctrl.start().unwrap();
        thread::sleep(Duration::from_millis(60));
        ctrl.stop();
        let count = sink.launched().len();
        assert!(count >= 2);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(sink.launched().len(), count);
        assert!(!ctrl.is_playing());
    }

    #[test]
    fn stalled_tick_skips_missed_beats() {
        let interval = Duration::from_millis(50);
        let sink = Arc::new(StallingSink { stall: Duration::from_millis(300), ..Default::default() });
        let mut ctrl = BeatController::new(sink.clone(), interval, Some(3));
        ctrl.start().unwrap();
        thread::sleep(Duration::from_millis(600));
        ctrl.stop();

        let hats = sink.hats.lock().unwrap().clone();
        assert!(hats.len() >= 4, "only {} ticks", hats.len());
        // One tick per boundary: at most about 600 / 50 ticks, never a burst.
        assert!(hats.len() <= 9, "{} ticks, missed beats were replayed", hats.len());
        for pair in hats.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= interval / 2, "back-to-back ticks {:?} apart", gap);
        }
    }

    #[test]
    fn restart_begins_again_at_phase_zero() {
        let (sink, mut ctrl) = controller(Duration::from_secs(60));
        play_tick(&ctrl.groove, sink.as_ref());
        play_tick(&ctrl.groove, sink.as_ref());
        assert_eq!(ctrl.phase(), 2);
        ctrl.start().unwrap();
        ctrl.stop();
        ctrl.start().unwrap();
        ctrl.stop();
        assert_eq!(ctrl.phase(), 0);
    }

    #[test]
    fn teardown_releases_clips() {
        let (sink, mut ctrl) = controller(Duration::from_millis(20));
        ctrl.start().unwrap();
        drop(ctrl);
        assert!(*sink.released.lock().unwrap());
    }
}
