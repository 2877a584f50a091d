//! Audio decoding via symphonia

use std::io::Cursor;

use bytes::Bytes;
use symphonia::core::audio::SampleBuffer as PcmBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use kuchi_core::{KuchiError, KuchiResult};

use crate::SampleBuffer;

/// Decode a complete audio payload into a mono buffer.
///
/// `extension` is a format hint ("mp3", "wav"); probing still inspects the
/// payload when it is absent or wrong.
pub fn decode_audio(payload: Bytes, extension: Option<&str>) -> KuchiResult<SampleBuffer> {
    if payload.is_empty() {
        return Err(KuchiError::Decode("empty payload".into()));
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(payload)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let mut format = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| KuchiError::Decode(format!("unrecognised audio: {e}")))?
        .format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| KuchiError::Decode("no audio track".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| KuchiError::Decode(format!("unsupported codec: {e}")))?;

    let mut mono = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(KuchiError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count().max(1);
                if sample_rate == 0 {
                    sample_rate = spec.rate;
                }
                let mut pcm = PcmBuffer::<f32>::new(decoded.capacity() as u64, spec);
                pcm.copy_interleaved_ref(decoded);
                mono.extend(
                    pcm.samples()
                        .chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                );
            }
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(error = %e, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(KuchiError::Decode(e.to_string())),
        }
    }

    if mono.is_empty() || sample_rate == 0 {
        return Err(KuchiError::Decode("no audio frames decoded".into()));
    }

    Ok(SampleBuffer::new(mono, sample_rate))
}
