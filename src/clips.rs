use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;

use hound::{SampleFormat, WavReader};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, warn};

use crate::pattern::{Drum, NOTE_COUNT};

/// MIDI notes of the melodic clips: C major from C4 up to C5.
const NOTE_MIDI: [u8; NOTE_COUNT] = [60, 62, 64, 65, 67, 69, 71, 72];
const NOTE_STEMS: [&str; NOTE_COUNT] = ["c1", "d", "e", "f", "g", "a", "h", "c"];
const NOISE_SEED: u64 = 0x5eed;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("cannot read {path}: {source}")]
    Wav { path: String, source: hound::Error },
    #[error("{0} contains no audio")]
    Empty(String),
}

// ── Clip identifiers ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClipId {
    Drum(Drum),
    Note(usize),
}

impl ClipId {
    pub const COUNT: usize = 3 + NOTE_COUNT;

    pub fn all() -> impl Iterator<Item = ClipId> {
        Drum::ALL.into_iter().map(ClipId::Drum).chain((0..NOTE_COUNT).map(ClipId::Note))
    }

    /// Stable slot index, `0..COUNT`.
    pub fn index(self) -> usize {
        match self {
            Self::Drum(Drum::Kick)  => 0,
            Self::Drum(Drum::Snare) => 1,
            Self::Drum(Drum::HiHat) => 2,
            Self::Note(n)           => 3 + n,
        }
    }

    /// File stem looked up in a sample directory.
    pub fn stem(self) -> &'static str {
        match self {
            Self::Drum(Drum::Kick)  => "kick_a",
            Self::Drum(Drum::Snare) => "snare_g",
            Self::Drum(Drum::HiHat) => "hihat5",
            Self::Note(n)           => NOTE_STEMS.get(n).copied().unwrap_or("?"),
        }
    }

    pub fn name(self) -> String {
        match self {
            Self::Drum(d) => d.name().to_string(),
            Self::Note(n) => NOTE_MIDI.get(n).map(|&m| note_name(m)).unwrap_or_else(|| "?".to_string()),
        }
    }
}

// ── Clip ──────────────────────────────────────────────────────────────────────

/// An immutable mono sample buffer, cheap to clone.
#[derive(Clone, Debug)]
pub struct Clip {
    pub samples:     Arc<[f32]>,
    pub sample_rate: u32,
}

impl Clip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples: samples.into(), sample_rate }
    }

    pub fn len(&self) -> usize { self.samples.len() }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    /// Read a WAV file, downmixing every channel to mono.
    pub fn load_wav(path: &Path) -> Result<Self, ClipError> {
        let wav_err = |source| ClipError::Wav { path: path.display().to_string(), source };
        let reader = WavReader::open(path).map_err(wav_err)?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>().map_err(wav_err)?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader.into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(wav_err)?
            }
        };

        let channels = spec.channels.max(1) as usize;
        let mono: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        if mono.is_empty() {
            return Err(ClipError::Empty(path.display().to_string()));
        }
        Ok(Self::new(mono, spec.sample_rate))
    }
}

// ── Clip bank ─────────────────────────────────────────────────────────────────

/// The fixed set of named clips.  Any slot may be empty.
pub struct ClipBank {
    slots: Vec<Option<Clip>>,
}

impl ClipBank {
    pub fn empty() -> Self {
        Self { slots: vec![None; ClipId::COUNT] }
    }

    /// Render the built-in kit in memory.
    pub fn synthesized(sample_rate: u32) -> Self {
        let sr = sample_rate as f32;
        let mut rng = StdRng::seed_from_u64(NOISE_SEED);
        let mut bank = Self::empty();
        bank.insert(ClipId::Drum(Drum::Kick),  Clip::new(render_kick(sr), sample_rate));
        bank.insert(ClipId::Drum(Drum::Snare), Clip::new(render_snare(sr, &mut rng), sample_rate));
        bank.insert(ClipId::Drum(Drum::HiHat), Clip::new(render_hihat(sr, &mut rng), sample_rate));
        for (i, &midi) in NOTE_MIDI.iter().enumerate() {
            bank.insert(ClipId::Note(i), Clip::new(render_tone(sr, note_to_freq(midi)), sample_rate));
        }
        bank
    }

    /// Load `<stem>.wav` for every clip.  Failures leave the slot empty.
    pub fn from_dir(dir: &Path) -> Self {
        let mut bank = Self::empty();
        for id in ClipId::all() {
            let path = dir.join(format!("{}.wav", id.stem()));
            match Clip::load_wav(&path) {
                Ok(clip) => {
                    debug!(clip = %id.name(), frames = clip.len(), rate = clip.sample_rate, "loaded clip");
                    bank.insert(id, clip);
                }
                Err(e) => warn!(clip = %id.name(), "clip unavailable: {}", e),
            }
        }
        bank
    }

    pub fn insert(&mut self, id: ClipId, clip: Clip) {
        self.slots[id.index()] = Some(clip);
    }

    #[cfg(test)]
    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn loaded(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn into_slots(self) -> Vec<Option<Clip>> { self.slots }
}

// ── Built-in kit ──────────────────────────────────────────────────────────────

fn render(sr: f32, seconds: f32, mut f: impl FnMut(f32) -> f32) -> Vec<f32> {
    let n = (sr * seconds) as usize;
    (0..n).map(|i| f(i as f32 / sr)).collect()
}

/// Sine with a falling pitch sweep, 150 Hz down to 50 Hz.
fn render_kick(sr: f32) -> Vec<f32> {
    let mut phase = 0.0f32;
    render(sr, 0.35, |t| {
        let freq = 50.0 + 100.0 * (-t * 30.0).exp();
        phase += freq / sr;
        (phase * 2.0 * PI).sin() * (-t * 9.0).exp() * 0.9
    })
}

fn render_snare(sr: f32, rng: &mut StdRng) -> Vec<f32> {
    render(sr, 0.2, |t| {
        let noise: f32 = rng.gen_range(-1.0..1.0);
        let tone = (t * 180.0 * 2.0 * PI).sin() * (-t * 25.0).exp();
        (noise * 0.6 * (-t * 18.0).exp() + tone * 0.4) * 0.8
    })
}

/// First-difference high pass over white noise.
fn render_hihat(sr: f32, rng: &mut StdRng) -> Vec<f32> {
    let mut prev = 0.0f32;
    render(sr, 0.06, |t| {
        let noise: f32 = rng.gen_range(-1.0..1.0);
        let hp = noise - prev;
        prev = noise;
        hp * 0.25 * (-t * 60.0).exp()
    })
}

fn render_tone(sr: f32, freq: f32) -> Vec<f32> {
    render(sr, 0.6, |t| {
        let attack = (t / 0.005).min(1.0);
        let body = (t * freq * 2.0 * PI).sin() + 0.3 * (t * freq * 4.0 * PI).sin();
        body * attack * (-t * 5.0).exp() * 0.35
    })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

pub fn note_to_freq(note: u8) -> f32 {
    440.0 * 2f32.powf((note as f32 - 69.0) / 12.0)
}

pub fn note_name(note: u8) -> String {
    let names = ["C","C#","D","D#","E","F","F#","G","G#","A","A#","B"];
    format!("{}{}", names[(note % 12) as usize], (note / 12) as i32 - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::tempdir;

    #[test]
    fn ids_cover_every_slot_once() {
        let mut seen: Vec<usize> = ClipId::all().map(ClipId::index).collect();
        seen.sort();
        assert_eq!(seen, (0..ClipId::COUNT).collect::<Vec<_>>());
        assert_eq!(ClipId::Note(0).stem(), "c1");
        assert_eq!(ClipId::Note(7).stem(), "c");
        assert_eq!(ClipId::Note(7).name(), "C5");
    }

    #[test]
    fn synthesized_kit_is_complete_and_bounded() {
        let bank = ClipBank::synthesized(44_100);
        assert_eq!(bank.loaded(), ClipId::COUNT);
        for id in ClipId::all() {
            let clip = bank.get(id).unwrap();
            assert!(!clip.is_empty(), "{:?} is empty", id);
            let peak = clip.samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
            assert!(peak > 0.01 && peak <= 1.0, "{:?} peak {}", id, peak);
        }
    }

    #[test]
    fn loads_wav_and_skips_missing_files() {
        let dir = tempdir().unwrap();
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(dir.path().join("kick_a.wav"), spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(i16::MAX / 2).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let bank = ClipBank::from_dir(dir.path());
        assert_eq!(bank.loaded(), 1);
        let kick = bank.get(ClipId::Drum(Drum::Kick)).unwrap();
        assert_eq!(kick.len(), 100);
        assert_eq!(kick.sample_rate, 22_050);
        assert!((kick.samples[0] - 0.25).abs() < 0.01);
        assert!(bank.get(ClipId::Drum(Drum::Snare)).is_none());
    }

    #[test]
    fn empty_wav_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hihat5.wav");
        let spec = WavSpec { channels: 1, sample_rate: 44_100, bits_per_sample: 32, sample_format: SampleFormat::Float };
        WavWriter::create(&path, spec).unwrap().finalize().unwrap();
        assert!(matches!(Clip::load_wav(&path), Err(ClipError::Empty(_))));
    }
}
