use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of beats in one percussion cycle.
pub const PHASES: u8 = 4;

/// Number of melodic notes the groove picks from.
pub const NOTE_COUNT: usize = 8;

// ── Percussion ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Drum { Kick, Snare, HiHat }

impl Drum {
    pub const ALL: [Drum; 3] = [Self::Kick, Self::Snare, Self::HiHat];

    pub fn name(self) -> &'static str {
        match self {
            Self::Kick => "Kick", Self::Snare => "Snare", Self::HiHat => "Hi-Hat",
        }
    }
}

/// Drums struck on a given beat.  Pure function of `phase % 4`.
pub fn percussion_for_phase(phase: u8) -> &'static [Drum] {
    match phase % PHASES {
        0 => &[Drum::Kick, Drum::HiHat],
        2 => &[Drum::Snare, Drum::HiHat],
        _ => &[Drum::HiHat],
    }
}

// ── Duration class ────────────────────────────────────────────────────────────

/// Randomly drawn note length.  Only decides whether the note sounds; the
/// clip itself always plays out in full.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DurationClass { Quarter, Half, Eighth, Rest }

impl DurationClass {
    pub const ALL: [DurationClass; 4] = [Self::Quarter, Self::Half, Self::Eighth, Self::Rest];

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn gates_note(self) -> bool { self != Self::Rest }

    /// Nominal length relative to one tick.
    pub fn nominal(self, interval: Duration) -> Duration {
        match self {
            Self::Quarter => interval,
            Self::Half    => interval * 2,
            Self::Eighth  => interval / 2,
            Self::Rest    => Duration::ZERO,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Quarter => "quarter", Self::Half => "half",
            Self::Eighth  => "eighth",  Self::Rest => "rest",
        }
    }
}

// ── Groove ────────────────────────────────────────────────────────────────────

/// What a single tick played.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Beat {
    pub phase:      u8,
    pub percussion: &'static [Drum],
    pub note:       usize,
    pub duration:   DurationClass,
}

impl Beat {
    /// Melodic note index, or `None` when the duration class is a rest.
    pub fn sounding_note(&self) -> Option<usize> {
        self.duration.gates_note().then_some(self.note)
    }
}

/// Beat-phase counter plus the randomness behind note choice.
pub struct Groove {
    phase:    u8,
    rng:      StdRng,
    pub last: Option<Beat>,
}

impl Groove {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None    => StdRng::from_entropy(),
        };
        Self { phase: 0, rng, last: None }
    }

    pub fn phase(&self) -> u8 { self.phase }

    /// Produce the beat for the current phase and move to the next one.
    pub fn advance(&mut self) -> Beat {
        let beat = Beat {
            phase:      self.phase,
            percussion: percussion_for_phase(self.phase),
            note:       self.rng.gen_range(0..NOTE_COUNT),
            duration:   DurationClass::random(&mut self.rng),
        };
        self.phase = (self.phase + 1) % PHASES;
        self.last = Some(beat);
        beat
    }

    pub fn reset(&mut self) {
        self.phase = 0;
        self.last  = None;
    }
}
