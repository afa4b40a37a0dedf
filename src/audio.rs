use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use crate::mixer::Mixer;

/// Keeps the output stream alive; the stream stops when this is dropped.
pub struct AudioEngine {
    _stream: Stream,
}

impl AudioEngine {
    pub fn new(mixer: Arc<Mutex<Mixer>>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No output device found")?;

        let config = device
            .default_output_config()
            .context("No default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        info!(device = %device.name().unwrap_or_default(), sample_rate, channels, "audio output");

        mixer.lock().unwrap().sample_rate = sample_rate;

        let mixer_clone = Arc::clone(&mixer);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), mixer_clone, channels)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), mixer_clone, channels)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), mixer_clone, channels)?,
            fmt => anyhow::bail!("Unsupported sample format: {:?}", fmt),
        };

        stream.play().context("Failed to start audio stream")?;

        Ok(Self { _stream: stream })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: Arc<Mutex<Mixer>>,
    channels: usize,
) -> Result<Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let err_fn = |err| error!("Audio stream error: {}", err);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut mixer = mixer.lock().unwrap();
            for frame in data.chunks_mut(channels) {
                let value = T::from_sample(mixer.generate_sample());
                frame.fill(value);
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
