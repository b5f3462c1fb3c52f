/// Sound decoding
///
/// PCM WAV goes through `hound`. Everything else (MP3, OGG, FLAC, AAC and the
/// IMA ADPCM WAV files older projects ship with) goes through `symphonia`.
use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{AudioError, Result};

use super::source::AudioBuffer;

/// Turns encoded sound bytes into planar samples
pub trait SoundDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer>;
}

/// Tries `hound` first, then `symphonia`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDecoder;

impl SoundDecoder for DefaultDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer> {
        match decode_pcm_wav(bytes) {
            Ok(buffer) => Ok(buffer),
            Err(err) => {
                tracing::debug!("PCM WAV decode failed ({}), probing with symphonia", err);
                decode_with_symphonia(bytes)
            }
        }
    }
}

fn decode_pcm_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| AudioError::DecodeFailed(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| AudioError::DecodeFailed(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| AudioError::DecodeFailed(e.to_string()))?
        }
    };

    Ok(AudioBuffer::from_interleaved(
        spec.sample_rate,
        spec.channels as usize,
        &samples,
    ))
}

fn decode_with_symphonia(bytes: &[u8]) -> Result<AudioBuffer> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::DecodeFailed(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::DecodeFailed("no supported audio tracks".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodeFailed(e.to_string()))?;

    let mut interleaved: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(AudioError::DecodeFailed(err.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channel_count = spec.channels.count();
                let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                samples.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(samples.samples());
            }
            // Corrupt packets are skipped
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
            Err(err) => return Err(AudioError::DecodeFailed(err.to_string())),
        }
    }

    if sample_rate == 0 || channel_count == 0 {
        return Err(AudioError::DecodeFailed(
            "stream did not report a sample rate or channel layout".to_string(),
        ));
    }

    Ok(AudioBuffer::from_interleaved(
        sample_rate,
        channel_count,
        &interleaved,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(spec: hound::WavSpec, write: impl FnOnce(&mut hound::WavWriter<&mut Cursor<Vec<u8>>>)) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_int_wav() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |w| {
            for _ in 0..100 {
                w.write_sample(16384_i16).unwrap();
                w.write_sample(-16384_i16).unwrap();
            }
        });

        let buffer = DefaultDecoder.decode(&bytes).unwrap();
        assert_eq!(buffer.sample_rate(), 22050);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 100);
        assert!((buffer.channel(0).unwrap()[0] - 0.5).abs() < 1e-4);
        assert!((buffer.channel(1).unwrap()[0] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decode_float_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let bytes = wav_bytes(spec, |w| {
            for _ in 0..80 {
                w.write_sample(0.25_f32).unwrap();
            }
        });

        let buffer = DefaultDecoder.decode(&bytes).unwrap();
        assert_eq!(buffer.frames(), 80);
        assert!((buffer.duration_secs() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_garbage_fails() {
        let result = DefaultDecoder.decode(b"definitely not audio");
        assert!(matches!(result, Err(AudioError::DecodeFailed(_))));
    }
}
