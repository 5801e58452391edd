use crate::pitch::note_to_freq;

/// One scheduled tone. `note` may be fractional when playback is detuned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub note: f64,
    pub start_offset_secs: f64,
    pub duration_secs: f64,
}

impl Tone {
    pub fn freq(&self) -> f64 {
        note_to_freq(self.note)
    }
}

/// Something that can make a tone audible
pub trait ToneSink {
    fn play_tone(&mut self, tone: Tone);
}

/// Drops every tone. Used when no output device is available.
#[derive(Debug, Default)]
pub struct SilentSink {
    played: usize,
}

impl SilentSink {
    pub fn played(&self) -> usize {
        self.played
    }
}

impl ToneSink for SilentSink {
    fn play_tone(&mut self, tone: Tone) {
        self.played += 1;
        tracing::trace!(note = tone.note, freq = tone.freq(), "tone dropped (silent output)");
    }
}

#[cfg(feature = "audio")]
pub use synth::Synth;

#[cfg(feature = "audio")]
mod synth {
    use super::{Tone, ToneSink};
    use crate::error::{HarkError, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::sync::mpsc;

    /// A command sent to the audio thread
    enum AudioCommand {
        Voice {
            freq: f64,
            delay_samples: usize,
            len_samples: usize,
        },
    }

    /// A sawtooth voice that waits `delay` samples and then sounds for `remaining`
    struct Voice {
        freq: f64,
        phase: f64,
        delay: usize,
        remaining: usize,
    }

    impl Voice {
        fn next_sample(&mut self, sample_rate: f64) -> f64 {
            if self.delay > 0 {
                self.delay -= 1;
                return 0.0;
            }
            if self.remaining == 0 {
                return 0.0;
            }
            self.remaining -= 1;
            let value = 2.0 * (self.phase - (self.phase + 0.5).floor());
            self.phase += self.freq / sample_rate;
            value
        }

        fn is_done(&self) -> bool {
            self.delay == 0 && self.remaining == 0
        }
    }

    /// Sawtooth synthesizer on the default output device.
    /// The stream stops when this is dropped.
    pub struct Synth {
        _stream: cpal::Stream,
        tx: mpsc::Sender<AudioCommand>,
        sample_rate: f64,
    }

    impl Synth {
        pub fn new(volume: f32) -> Result<Self> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| HarkError::Audio("no output audio device available".into()))?;

            let config = device.default_output_config().map_err(|e| {
                HarkError::Audio(format!("failed to get default output config: {e}"))
            })?;

            let sample_rate = config.sample_rate() as f64;
            let channels = (config.channels() as usize).max(1);
            let gain = volume as f64;

            let (tx, rx) = mpsc::channel::<AudioCommand>();
            let mut voices: Vec<Voice> = Vec::new();

            let stream = device
                .build_output_stream(
                    &config.into(),
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        while let Ok(AudioCommand::Voice {
                            freq,
                            delay_samples,
                            len_samples,
                        }) = rx.try_recv()
                        {
                            voices.push(Voice {
                                freq,
                                phase: 0.0,
                                delay: delay_samples,
                                remaining: len_samples,
                            });
                        }

                        for frame in data.chunks_mut(channels) {
                            let value: f64 = voices
                                .iter_mut()
                                .map(|v| v.next_sample(sample_rate))
                                .sum();
                            let sample = (value * gain) as f32;
                            for out in frame.iter_mut() {
                                *out = sample;
                            }
                        }

                        voices.retain(|v| !v.is_done());
                    },
                    move |err| {
                        tracing::error!(%err, "audio stream error");
                    },
                    None,
                )
                .map_err(|e| HarkError::Audio(format!("failed to build output stream: {e}")))?;

            stream
                .play()
                .map_err(|e| HarkError::Audio(format!("failed to play stream: {e}")))?;

            tracing::info!(sample_rate, channels, "audio output ready");

            Ok(Self {
                _stream: stream,
                tx,
                sample_rate,
            })
        }
    }

    impl ToneSink for Synth {
        fn play_tone(&mut self, tone: Tone) {
            let cmd = AudioCommand::Voice {
                freq: tone.freq(),
                delay_samples: (tone.start_offset_secs.max(0.0) * self.sample_rate) as usize,
                len_samples: (tone.duration_secs.max(0.0) * self.sample_rate) as usize,
            };
            if self.tx.send(cmd).is_err() {
                tracing::warn!("audio thread disconnected");
            }
        }
    }
}
