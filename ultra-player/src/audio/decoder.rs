//! Audio decoder using symphonia
//!
//! Decodes MP3, FLAC, AAC, Vorbis and WAV files to interleaved stereo f32.
//! The whole file is decoded up front; alarm tracks are short and seeking in
//! memory keeps positions exact.

use crate::audio::types::DecodedAudio;
use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Simple whole-file audio decoder.
pub struct SimpleDecoder;

impl SimpleDecoder {
    /// Decode entire audio file to stereo PCM at the file's own sample rate.
    ///
    /// Mono sources are duplicated to both channels; sources with more than
    /// two channels keep the first two.
    ///
    /// # Errors
    /// - Failed to open file
    /// - Unsupported audio format
    /// - No decodable audio in the file
    pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
        debug!("Decoding entire file: {}", path.display());

        let file = std::fs::File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open file {}: {}", path.display(), e)))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Extension hint helps the probe pick a format reader
        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext_str);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

        let channels = codec_params
            .channels
            .map(|c| c.count())
            .ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;

        debug!(
            "Audio format: sample_rate={}, channels={}",
            sample_rate, channels
        );

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of file");
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("Decoder reset required mid-stream, stopping decode");
                    break;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let buf = sample_buf.get_or_insert_with(|| {
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec())
                    });
                    buf.copy_interleaved_ref(decoded);
                    Self::push_stereo(buf.samples(), channels, &mut samples);
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(Error::Decode(format!("Decoder failed: {}", e)));
                }
            }
        }

        if samples.is_empty() {
            return Err(Error::Decode(format!(
                "No audio decoded from {}",
                path.display()
            )));
        }

        debug!("Decoded {} stereo frames", samples.len() / 2);

        Ok(DecodedAudio::new(samples, sample_rate))
    }

    /// Append interleaved `channels`-wide samples to `output` as stereo
    fn push_stereo(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
        match channels {
            0 => {}
            1 => {
                for &sample in interleaved {
                    output.push(sample);
                    output.push(sample);
                }
            }
            _ => {
                for frame in interleaved.chunks_exact(channels) {
                    output.push(frame[0]);
                    output.push(frame[1]);
                }
            }
        }
    }
}
