//! Wraps raw PCM speech in a WAV container a browser `<audio>` element can play.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

use super::GatewayError;
use crate::interview::GreetingAudio;

const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Sample rate of an `audio/L16;codec=pcm;rate=24000` style MIME type, or
/// `None` when the audio is not raw PCM.
fn pcm_sample_rate(mime_type: &str) -> Option<u32> {
    let mut params = mime_type.split(';').map(str::trim);
    let base = params.next()?.to_ascii_lowercase();
    if base != "audio/l16" && base != "audio/pcm" {
        return None;
    }

    let rate = params
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(DEFAULT_SAMPLE_RATE);
    Some(rate)
}

/// Encodes mono 16-bit little-endian PCM as WAV.
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    let mut writer = WavWriter::new(Cursor::new(&mut buffer), spec)?;
    for sample in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
    }
    writer.finalize()?;

    Ok(buffer)
}

/// Turns base64 PCM into base64 WAV. Other formats pass through unchanged.
pub fn playable_greeting(mime_type: &str, data: &str) -> Result<GreetingAudio, GatewayError> {
    let Some(sample_rate) = pcm_sample_rate(mime_type) else {
        return Ok(GreetingAudio {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        });
    };

    let pcm = BASE64
        .decode(data)
        .map_err(|e| GatewayError::Upstream(format!("speech audio is not valid base64: {e}")))?;
    let wav = pcm_to_wav(&pcm, sample_rate)
        .map_err(|e| GatewayError::Upstream(format!("failed to encode speech audio: {e}")))?;

    Ok(GreetingAudio {
        mime_type: "audio/wav".to_string(),
        data: BASE64.encode(wav),
    })
}
