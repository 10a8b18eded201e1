use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedBufferSize, SupportedStreamConfig};
use md_core::traits::BlockAnalyzer;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::AudioError;

/// Re-chunks capture callbacks into fixed-size blocks for a [`BlockAnalyzer`].
///
/// cpal does not guarantee the callback size, so samples are accumulated
/// until one block of `block_frames × channels` is complete. The buffer is
/// allocated once; pushing never allocates.
///
/// # Example
/// ```
/// use md_audio::capture::BlockAssembler;
/// use md_core::traits::BlockAnalyzer;
///
/// struct Count(usize);
/// impl BlockAnalyzer for Count {
///     fn process_block(&mut self, _b: &[f32], _c: usize) { self.0 += 1; }
///     fn block_frames(&self) -> usize { 4 }
/// }
/// let mut assembler = BlockAssembler::new(Count(0), 2);
/// assembler.push(&[0.0; 12]);
/// assert_eq!(assembler.blocks(), 1);
/// ```
pub struct BlockAssembler<A: BlockAnalyzer> {
    analyzer: A,
    channels: usize,
    buffer: Vec<f32>,
    filled: usize,
    blocks: u64,
}

impl<A: BlockAnalyzer> BlockAssembler<A> {
    /// Wrap `analyzer` for a stream of `channels` interleaved channels.
    #[must_use]
    pub fn new(analyzer: A, channels: usize) -> Self {
        let channels = channels.max(1);
        let len = analyzer.block_frames().max(1) * channels;
        Self {
            analyzer,
            channels,
            buffer: vec![0.0; len],
            filled: 0,
            blocks: 0,
        }
    }

    /// Append interleaved samples, analysing every block that completes.
    pub fn push(&mut self, mut data: &[f32]) {
        while !data.is_empty() {
            let take = (self.buffer.len() - self.filled).min(data.len());
            self.buffer[self.filled..self.filled + take].copy_from_slice(&data[..take]);
            self.filled += take;
            data = &data[take..];

            if self.filled == self.buffer.len() {
                self.analyzer.process_block(&self.buffer, self.channels);
                self.filled = 0;
                self.blocks += 1;
            }
        }
    }

    /// Blocks handed to the analyzer so far.
    #[must_use]
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    /// The wrapped analyzer.
    #[must_use]
    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }
}

/// An input device as reported by the audio host.
#[derive(Clone, Debug)]
pub struct InputDeviceInfo {
    /// Device name.
    pub name: String,
    /// `true` for the host's default input.
    pub is_default: bool,
    /// Highest channel count among the supported configurations.
    pub max_channels: u16,
    /// Whether some `f32` configuration accepts the requested sample rate.
    pub supports_rate: bool,
}

/// List the input devices of the default host.
///
/// # Errors
/// Returns an error if the host cannot enumerate its devices.
pub fn list_input_devices(sample_rate: u32) -> Result<Vec<InputDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host.input_devices()? {
        let name = match device.name() {
            Ok(n) => n,
            Err(e) => {
                log::debug!("Nom de périphérique illisible : {e}");
                continue;
            }
        };
        let (max_channels, supports_rate) = match device.supported_input_configs() {
            Ok(configs) => configs.fold((0u16, false), |(ch, ok), c| {
                let rate_ok = c.sample_format() == SampleFormat::F32
                    && (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&sample_rate);
                (ch.max(c.channels()), ok || rate_ok)
            }),
            Err(e) => {
                log::debug!("Configurations indisponibles pour {name}: {e}");
                (0, false)
            }
        };
        devices.push(InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            max_channels,
            supports_rate,
        });
    }

    log::debug!("{} périphériques d'entrée énumérés", devices.len());
    Ok(devices)
}

/// Live capture: one cpal input stream feeding a [`BlockAssembler`], plus an
/// optional output stream mirroring the input through an rtrb ring buffer.
///
/// Streams run until this value is dropped.
///
/// # Example
/// ```no_run
/// use md_core::config::AnalysisConfig;
/// use md_audio::analyzer::FrameAnalyzer;
/// use md_audio::capture::AudioCapture;
///
/// let config = AnalysisConfig::default();
/// let (analyzer, _windows) = FrameAnalyzer::new(&config);
/// let capture = AudioCapture::start(analyzer, config.sample_rate(), None, false).unwrap();
/// ```
pub struct AudioCapture {
    _input: cpal::Stream,
    _output: Option<cpal::Stream>,
    device_name: String,
    sample_rate: u32,
    channels: usize,
}

impl AudioCapture {
    /// Open the input device (default, or first whose name contains
    /// `device`), start the stream and feed `analyzer` with whole blocks.
    ///
    /// # Errors
    /// Returns an error if no matching device exists, if it has no `f32`
    /// configuration at `sample_rate`, or if the stream cannot be started.
    /// A pass-through failure is logged and capture continues without it.
    pub fn start<A: BlockAnalyzer>(
        analyzer: A,
        sample_rate: u32,
        device: Option<&str>,
        passthrough: bool,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let input_device = find_input_device(&host, device)?;
        let device_name = input_device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Périphérique d'entrée : {device_name}");

        let supported = input_config(&input_device, sample_rate)?;
        let channels = supported.channels() as usize;
        let block_frames = analyzer.block_frames();

        let mut stream_config: cpal::StreamConfig = supported.config();
        if let SupportedBufferSize::Range { min, max } = supported.buffer_size()
            && let Ok(frames) = u32::try_from(block_frames)
            && (*min..=*max).contains(&frames)
        {
            stream_config.buffer_size = cpal::BufferSize::Fixed(frames);
        }
        log::debug!(
            "Entrée : {channels} canaux @ {sample_rate}Hz, buffer {:?}",
            stream_config.buffer_size
        );

        // Deux secondes de marge pour la sortie.
        let (mut producer, consumer) = if passthrough {
            let (p, c) = RingBuffer::new(sample_rate as usize * channels * 2);
            (Some(p), Some(c))
        } else {
            (None, None)
        };

        // La sortie démarre avant l'entrée : un échec ne touche que le pass-through.
        let output = consumer.and_then(|c| {
            passthrough_or_disable(start_passthrough(&host, &stream_config, c), &mut producer)
        });

        let mut assembler = BlockAssembler::new(analyzer, channels);
        let input = input_device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Some(p) = producer.as_mut() {
                    mirror(p, data);
                }
                assembler.push(data);
            },
            |err| {
                log::error!("Audio input stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

        input
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        log::info!("Capture démarrée @ {sample_rate}Hz");

        Ok(Self {
            _input: input,
            _output: output,
            device_name,
            sample_rate,
            channels,
        })
    }

    /// Name of the capturing device.
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// The sample rate of the capture stream.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved channels delivered by the input stream.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }
}

/// Push what fits into the ring; overflow is dropped (the output lags).
#[inline]
fn mirror(producer: &mut Producer<f32>, data: &[f32]) {
    for &s in data {
        if producer.push(s).is_err() {
            break;
        }
    }
}

fn find_input_device(host: &cpal::Host, wanted: Option<&str>) -> Result<cpal::Device> {
    match wanted {
        None => Ok(host.default_input_device().ok_or(AudioError::NoInputDevice)?),
        Some(name) => {
            let found = host
                .input_devices()?
                .find(|d| d.name().is_ok_and(|n| n.contains(name)));
            Ok(found.ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))?)
        }
    }
}

/// First `f32` configuration accepting `sample_rate`, stereo preferred over mono.
fn input_config(device: &cpal::Device, sample_rate: u32) -> Result<SupportedStreamConfig> {
    let configs: Vec<_> = device.supported_input_configs()?.collect();
    let fits = |c: &&cpal::SupportedStreamConfigRange| {
        c.sample_format() == SampleFormat::F32
            && (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&sample_rate)
    };

    let best = configs
        .iter()
        .filter(fits)
        .find(|c| c.channels() == 2)
        .or_else(|| configs.iter().filter(fits).find(|c| c.channels() == 1))
        .or_else(|| configs.iter().find(fits))
        .ok_or_else(|| {
            AudioError::UnsupportedFormat(format!("aucune configuration f32 à {sample_rate}Hz"))
        })?;

    Ok(best.clone().with_sample_rate(cpal::SampleRate(sample_rate)))
}

/// Keep a started pass-through stream, or log why it failed and stop
/// mirroring into its ring.
fn passthrough_or_disable<S>(
    started: Result<S>,
    producer: &mut Option<Producer<f32>>,
) -> Option<S> {
    match started {
        Ok(stream) => {
            log::info!("Pass-through actif vers la sortie par défaut");
            Some(stream)
        }
        Err(e) => {
            log::warn!("Pass-through désactivé : {e}");
            *producer = None;
            None
        }
    }
}

/// Build and play the output stream draining `consumer`.
fn start_passthrough(
    host: &cpal::Host,
    input_config: &cpal::StreamConfig,
    mut consumer: Consumer<f32>,
) -> Result<cpal::Stream> {
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;
    let config = cpal::StreamConfig {
        channels: input_config.channels,
        sample_rate: input_config.sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for slot in data.iter_mut() {
                    *slot = consumer.pop().unwrap_or(0.0);
                }
            },
            |err| {
                log::error!("Audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))?;
    stream
        .play()
        .map_err(|e| AudioError::StreamError(e.to_string()))?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the first sample of every block it receives.
    struct Recorder {
        frames: usize,
        firsts: Vec<f32>,
        lengths: Vec<usize>,
    }

    impl BlockAnalyzer for Recorder {
        fn process_block(&mut self, interleaved: &[f32], _channels: usize) {
            self.firsts.push(interleaved[0]);
            self.lengths.push(interleaved.len());
        }
        fn block_frames(&self) -> usize {
            self.frames
        }
    }

    fn recorder(frames: usize) -> Recorder {
        Recorder {
            frames,
            firsts: Vec::new(),
            lengths: Vec::new(),
        }
    }

    #[test]
    fn ragged_callbacks_become_whole_blocks() {
        let mut assembler = BlockAssembler::new(recorder(4), 2);
        let samples: Vec<f32> = (0..40).map(|i| i as f32).collect();
        // Callback sizes that never line up with the block size.
        for chunk in samples.chunks(7) {
            assembler.push(chunk);
        }
        assert_eq!(assembler.blocks(), 5);
        assert_eq!(assembler.analyzer().firsts, vec![0.0, 8.0, 16.0, 24.0, 32.0]);
        assert!(assembler.analyzer().lengths.iter().all(|&l| l == 8));
    }

    #[test]
    fn incomplete_block_is_held_back() {
        let mut assembler = BlockAssembler::new(recorder(4), 1);
        assembler.push(&[1.0, 2.0, 3.0]);
        assert_eq!(assembler.blocks(), 0);
        assembler.push(&[4.0]);
        assert_eq!(assembler.blocks(), 1);
    }

    #[test]
    fn large_callback_emits_several_blocks() {
        let mut assembler = BlockAssembler::new(recorder(2), 1);
        assembler.push(&[0.0; 9]);
        assert_eq!(assembler.blocks(), 4);
    }

    #[test]
    fn failed_passthrough_stops_mirroring() {
        let (producer, _consumer) = RingBuffer::<f32>::new(4);
        let mut producer = Some(producer);
        let started: Result<u8> = Err(AudioError::StreamError("play".into()).into());
        assert!(passthrough_or_disable(started, &mut producer).is_none());
        assert!(producer.is_none());
    }

    #[test]
    fn started_passthrough_keeps_mirroring() {
        let (producer, _consumer) = RingBuffer::<f32>::new(4);
        let mut producer = Some(producer);
        assert_eq!(passthrough_or_disable(Ok(7u8), &mut producer), Some(7));
        assert!(producer.is_some());
    }

    #[test]
    fn mirror_drops_overflow() {
        let (mut producer, mut consumer) = RingBuffer::<f32>::new(3);
        mirror(&mut producer, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(consumer.pop().ok(), Some(1.0));
        assert_eq!(consumer.slots(), 2);
    }
}
