//! PCM16 audio framing for voice mode.
//!
//! Captured audio goes out as base64 little-endian 16-bit PCM at 16 kHz; audio
//! coming back is decoded into per-channel float samples and queued for playback
//! so that buffers never overlap.

use base64::Engine;

pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("Audio payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("{len} bytes is not a whole number of 16-bit frames for {channels} channel(s)")]
    Misaligned { len: usize, channels: usize },
}

/// One outbound chunk of captured audio.
#[derive(Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBlob {
    pub data: String,
    pub mime_type: String,
}

impl std::fmt::Debug for AudioBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioBlob")
            .field("data", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Decoded audio, one sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Encode mono float samples in [-1, 1] as base64 PCM16.
///
/// Samples are scaled by 32768 and saturate at the i16 range, so a full-scale
/// 1.0 becomes 32767 rather than wrapping around.
pub fn encode_pcm16(samples: &[f32]) -> AudioBlob {
    let bytes: Vec<u8> = samples
        .iter()
        .flat_map(|sample| ((sample * 32768.0) as i16).to_le_bytes())
        .collect();
    AudioBlob {
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
        mime_type: format!("audio/pcm;rate={CAPTURE_SAMPLE_RATE}"),
    }
}

/// Decode base64 interleaved PCM16 into per-channel samples in [-1, 1).
pub fn decode_pcm16(data: &str, sample_rate: u32, channels: usize) -> Result<AudioBuffer, AudioError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;
    if channels == 0 || bytes.len() % (2 * channels) != 0 {
        return Err(AudioError::Misaligned {
            len: bytes.len(),
            channels,
        });
    }
    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let channels = (0..channels)
        .map(|channel| {
            samples
                .iter()
                .skip(channel)
                .step_by(channels)
                .map(|&sample| sample as f32 / 32768.0)
                .collect()
        })
        .collect();
    Ok(AudioBuffer {
        sample_rate,
        channels,
    })
}

/// Assigns start times to inbound buffers so they play back to back.
///
/// Each buffer starts at the later of "now" and the end of the previously
/// scheduled buffer; start times never go backwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaybackScheduler {
    next_start: f64,
}

impl PlaybackScheduler {
    /// Schedule a buffer lasting `duration` seconds, given the playback clock `now`.
    pub fn schedule(&mut self, now: f64, duration: f64) -> f64 {
        let start = self.next_start.max(now);
        self.next_start = start + duration;
        start
    }

    /// When the next buffer would start if it arrived right away.
    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    /// Forget the queue, e.g. when the voice session ends.
    pub fn reset(&mut self) {
        self.next_start = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_little_endian_and_saturates() {
        let blob = encode_pcm16(&[0.0, 0.5, -1.0, 1.0]);
        assert_eq!(blob.mime_type, "audio/pcm;rate=16000");
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&blob.data)
            .unwrap();
        assert_eq!(
            bytes,
            [
                0x00, 0x00, // 0
                0x00, 0x40, // 16384
                0x00, 0x80, // -32768
                0xff, 0x7f, // saturated 32767
            ]
        );
    }

    #[test]
    fn decodes_and_deinterleaves_stereo() {
        let pcm: Vec<u8> = [16384i16, -16384, 0, 32767]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let data = base64::engine::general_purpose::STANDARD.encode(pcm);
        let buffer = decode_pcm16(&data, PLAYBACK_SAMPLE_RATE, 2).unwrap();
        assert_eq!(buffer.channels.len(), 2);
        assert_eq!(buffer.channels[0], vec![0.5, 0.0]);
        assert_eq!(buffer.channels[1][0], -0.5);
        assert_eq!(buffer.frame_count(), 2);
    }

    #[test]
    fn duration_follows_sample_rate() {
        let data = base64::engine::general_purpose::STANDARD.encode(vec![0u8; 48_000]);
        let buffer = decode_pcm16(&data, PLAYBACK_SAMPLE_RATE, 1).unwrap();
        assert_eq!(buffer.duration(), 1.0);
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(matches!(
            decode_pcm16("not base64!", PLAYBACK_SAMPLE_RATE, 1),
            Err(AudioError::InvalidBase64(_))
        ));
        let odd = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3]);
        assert!(matches!(
            decode_pcm16(&odd, PLAYBACK_SAMPLE_RATE, 1),
            Err(AudioError::Misaligned { len: 3, channels: 1 })
        ));
        assert!(decode_pcm16("", PLAYBACK_SAMPLE_RATE, 0).is_err());
    }

    #[test]
    fn back_to_back_buffers_never_overlap() {
        let mut scheduler = PlaybackScheduler::default();
        let first = scheduler.schedule(2.0, 0.75);
        // The second buffer arrives before the first has finished playing
        let second = scheduler.schedule(2.1, 0.5);
        assert_eq!(first, 2.0);
        assert_eq!(second, first + 0.75);
        assert_eq!(scheduler.next_start(), 3.25);
    }

    #[test]
    fn late_buffers_start_now() {
        let mut scheduler = PlaybackScheduler::default();
        scheduler.schedule(0.0, 1.0);
        assert_eq!(scheduler.schedule(5.0, 1.0), 5.0);
        scheduler.reset();
        assert_eq!(scheduler.next_start(), 0.0);
    }
}
