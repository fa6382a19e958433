//! Device-backed playback engine
//!
//! Decodes the whole source into memory, resamples it to the device rate and
//! plays it from a shared [`Playhead`] inside the cpal callback. The stream
//! lives on its own thread for the lifetime of the engine.

use crate::audio::decoder::SimpleDecoder;
use crate::audio::output::AudioOutput;
use crate::audio::resampler::Resampler;
use crate::audio::types::{AudioFrame, DecodedAudio};
use crate::engine::{FinishedNotifier, MediaSource, PlaybackEngine};
use crate::error::{Error, Result};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Playback cursor shared with the audio callback
#[derive(Debug, Default)]
pub struct Playhead {
    audio: Option<Arc<DecodedAudio>>,
    cursor: usize,
    playing: bool,
    finished_sent: bool,
    notifier: Option<FinishedNotifier>,
}

impl Playhead {
    /// Replace the loaded track; paused at frame 0
    pub fn load(&mut self, audio: DecodedAudio) {
        self.audio = Some(Arc::new(audio));
        self.cursor = 0;
        self.playing = false;
        self.finished_sent = false;
    }

    /// Start or resume. A playhead parked at the end restarts from 0.
    pub fn start(&mut self) {
        let Some(audio) = &self.audio else {
            return;
        };
        if self.cursor >= audio.frames() {
            self.cursor = 0;
        }
        self.playing = true;
        self.finished_sent = false;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Move to `position_ms`, clamped to the track
    pub fn seek(&mut self, position_ms: i64) {
        if let Some(audio) = &self.audio {
            self.cursor = audio.ms_to_frame(position_ms);
            self.finished_sent = false;
        }
    }

    /// Produce the next output frame and advance.
    ///
    /// Reaching the last frame while playing pauses the playhead and sends
    /// exactly one finished notification.
    pub fn next_frame(&mut self) -> AudioFrame {
        if !self.playing {
            return AudioFrame::zero();
        }
        let Some(audio) = &self.audio else {
            return AudioFrame::zero();
        };

        let frame = audio.frame(self.cursor).unwrap_or_else(AudioFrame::zero);
        if self.cursor < audio.frames() {
            self.cursor += 1;
        }

        if self.cursor >= audio.frames() {
            self.playing = false;
            if !self.finished_sent {
                self.finished_sent = true;
                if let Some(notifier) = &self.notifier {
                    if !notifier.notify() {
                        debug!("Finished notification dropped: no listener");
                    }
                }
            }
        }

        frame
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position_ms(&self) -> i64 {
        self.audio
            .as_ref()
            .map_or(0, |audio| audio.frame_to_ms(self.cursor))
    }

    pub fn duration_ms(&self) -> i64 {
        self.audio.as_ref().map_or(0, |audio| audio.duration_ms())
    }

    pub fn set_notifier(&mut self, notifier: FinishedNotifier) {
        self.notifier = Some(notifier);
    }

    /// Drop the track and the notifier
    pub fn clear(&mut self) {
        *self = Playhead::default();
    }
}

/// [`PlaybackEngine`] that plays through a cpal output device
pub struct DeviceEngine {
    playhead: Arc<Mutex<Playhead>>,
    output_rate: u32,
    shutdown_tx: Option<mpsc::Sender<()>>,
    audio_thread: Option<JoinHandle<()>>,
}

impl DeviceEngine {
    /// Open the output device and start its (silent) stream.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `volume`: Output volume, clamped to [0.0, 1.0]
    pub fn open(device_name: Option<String>, volume: f32) -> Result<Self> {
        let playhead = Arc::new(Mutex::new(Playhead::default()));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let callback_playhead = Arc::clone(&playhead);
        let audio_thread = std::thread::Builder::new()
            .name("ultra-audio".to_string())
            .spawn(move || {
                let started = AudioOutput::new(device_name.as_deref(), volume).and_then(|mut output| {
                    output.start(move || lock_playhead(&callback_playhead).next_frame())?;
                    Ok(output)
                });

                match started {
                    Ok(output) => {
                        info!(
                            "Audio output running on {} at {}Hz",
                            output.device_name(),
                            output.sample_rate()
                        );
                        if ready_tx.send(Ok(output.sample_rate())).is_err() {
                            return;
                        }
                        // Returns on shutdown or when the engine is dropped
                        let _ = shutdown_rx.recv();
                        drop(output);
                        debug!("Audio thread exiting");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })?;

        let output_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = audio_thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = audio_thread.join();
                return Err(Error::AudioOutput(
                    "Audio thread exited before reporting readiness".to_string(),
                ));
            }
        };

        Ok(Self {
            playhead,
            output_rate,
            shutdown_tx: Some(shutdown_tx),
            audio_thread: Some(audio_thread),
        })
    }

    /// Sample rate tracks are resampled to
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    fn playhead(&self) -> MutexGuard<'_, Playhead> {
        lock_playhead(&self.playhead)
    }
}

fn lock_playhead(playhead: &Mutex<Playhead>) -> MutexGuard<'_, Playhead> {
    playhead.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PlaybackEngine for DeviceEngine {
    fn load(&mut self, source: &MediaSource) -> Result<()> {
        if self.audio_thread.is_none() {
            return Err(Error::AlreadyReleased);
        }

        let path = source.local_path().ok_or_else(|| Error::Source {
            source_name: source.to_string(),
            message: "unsupported URI scheme; only paths and file:// URIs can be played"
                .to_string(),
        })?;

        // Stop the old track before the (slow) decode
        self.playhead().pause();

        let decoded = SimpleDecoder::decode_file(&path)?;
        let samples = Resampler::resample(
            &decoded.samples,
            decoded.sample_rate,
            self.output_rate,
            2,
        )?;
        let audio = DecodedAudio::new(samples, self.output_rate);
        debug!(
            "Prepared {} ({} frames at {}Hz)",
            source,
            audio.frames(),
            audio.sample_rate
        );

        self.playhead().load(audio);
        Ok(())
    }

    fn start(&mut self) {
        self.playhead().start();
    }

    fn pause(&mut self) {
        self.playhead().pause();
    }

    fn stop(&mut self) {
        let mut playhead = self.playhead();
        playhead.pause();
        playhead.seek(0);
    }

    fn seek(&mut self, position_ms: i64) {
        self.playhead().seek(position_ms);
    }

    fn is_playing(&self) -> bool {
        self.playhead().is_playing()
    }

    fn position_ms(&self) -> i64 {
        self.playhead().position_ms()
    }

    fn duration_ms(&self) -> i64 {
        self.playhead().duration_ms()
    }

    fn set_finished_notifier(&mut self, notifier: FinishedNotifier) {
        self.playhead().set_notifier(notifier);
    }

    fn release(&mut self) {
        self.playhead().clear();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.audio_thread.take() {
            if handle.join().is_err() {
                warn!("Audio thread panicked during shutdown");
            }
        }
    }
}

impl Drop for DeviceEngine {
    fn drop(&mut self) {
        self.release();
    }
}
