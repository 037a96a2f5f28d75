use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{error, info};

use super::RingConsumer;
use crate::error::{Result, SynthError};

// Larger device buffers are filled in several passes.
const SCRATCH_SAMPLES: usize = 8192;

/// Names of every output device on the default host
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.output_devices().map_err(|e| SynthError::Device(e.to_string()))?;
    Ok(devices.filter_map(|device| device.name().ok()).collect())
}

/// An opened output device. Audio starts with `start` and stops when the
/// value is dropped.
pub struct OutputDevice {
    device: cpal::Device,
    name: String,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
}

impl OutputDevice {
    /// Open the named device, or the host default when `name` is `None`.
    pub fn open(name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        info!("using audio host {}", host.id().name());

        let device = match name {
            Some(wanted) => host
                .output_devices()
                .map_err(|e| SynthError::Device(e.to_string()))?
                .find(|device| device.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| SynthError::Device(format!("output device '{wanted}' not found")))?,
            None => host.default_output_device().ok_or(SynthError::NoOutputDevice)?,
        };
        let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());

        let supported = device
            .default_output_config()
            .map_err(|e| SynthError::Device(e.to_string()))?;
        let sample_format = supported.sample_format();
        let config = StreamConfig::from(supported);
        info!(
            "output device '{name}': {} Hz, {} channels, {sample_format:?}",
            config.sample_rate.0, config.channels
        );

        Ok(Self {
            device,
            name,
            config,
            sample_format,
            stream: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> usize {
        usize::from(self.config.channels)
    }

    /// Build and start the stream. The callback drains `consumer`; a device
    /// error clears `active` so the other threads wind down.
    pub fn start(&mut self, consumer: RingConsumer, active: Arc<AtomicBool>) -> Result<()> {
        let stream = match self.sample_format {
            SampleFormat::F32 => create_stream::<f32>(&self.device, &self.config, consumer, active),
            SampleFormat::I16 => create_stream::<i16>(&self.device, &self.config, consumer, active),
            SampleFormat::U16 => create_stream::<u16>(&self.device, &self.config, consumer, active),
            other => Err(SynthError::UnsupportedFormat(format!("{other:?}"))),
        }?;
        stream.play().map_err(|e| SynthError::Device(e.to_string()))?;
        info!("audio stream started on '{}'", self.name);
        self.stream = Some(stream);
        Ok(())
    }
}

fn create_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: RingConsumer,
    active: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let mut scratch = vec![0.0f32; SCRATCH_SAMPLES];
    let err_fn = move |err: cpal::StreamError| {
        error!("audio stream error: {err}");
        active.store(false, Ordering::Release);
    };

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                fill_output(data, &mut scratch, &mut consumer);
            },
            err_fn,
            None,
        )
        .map_err(|e| SynthError::Device(e.to_string()))
}

/// Drain `consumer` into a device buffer through `scratch`, converting each
/// sample to the device format. Never allocates.
fn fill_output<T>(data: &mut [T], scratch: &mut [f32], consumer: &mut RingConsumer)
where
    T: SizedSample + FromSample<f32>,
{
    for chunk in data.chunks_mut(scratch.len().max(1)) {
        let samples = &mut scratch[..chunk.len()];
        consumer.pop_into(samples);
        for (out, sample) in chunk.iter_mut().zip(samples.iter()) {
            *out = T::from_sample(*sample);
        }
    }
}
