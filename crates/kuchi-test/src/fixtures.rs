//! Audio and catalog fixtures

use std::io::Cursor;

use bytes::Bytes;

use kuchi_audio::{AudioSource, SampleBuffer, Segment, UtteranceSynthesizer};
use kuchi_core::{KuchiError, KuchiResult, SpeakerCatalog};

pub const FIXTURE_RATE: u32 = 16_000;

/// Speaker list in the shape `/get-speakers` serves
pub const SPEAKERS_JSON: &str = r#"[
    {"name": "四国めたん", "speaker_uuid": "7ffcb7ce-00ec-4bdc-82cd-45a8889e43ff", "styles": [
        {"name": "ノーマル", "id": 2}, {"name": "あまあま", "id": 0},
        {"name": "ツンツン", "id": 6}, {"name": "セクシー", "id": 4}
    ]},
    {"name": "ずんだもん", "speaker_uuid": "388f246b-8c41-4ac1-8e2d-5d79f3ff56d9", "styles": [
        {"name": "ノーマル", "id": 3}, {"name": "あまあま", "id": 1}
    ]},
    {"name": "春日部つむぎ", "speaker_uuid": "35b2c544-660e-401e-b503-0e14c635303a", "styles": [
        {"name": "ノーマル", "id": 8}
    ]},
    {"name": "雨晴はう", "speaker_uuid": "3474ee95-c274-47f9-aa1a-8322163d96f1", "styles": [
        {"name": "ノーマル", "id": 10}
    ]},
    {"name": "波音リツ", "speaker_uuid": "b1a81618-b27b-40d2-b0ea-27a9ad408c4b", "styles": [
        {"name": "ノーマル", "id": 9}
    ]},
    {"name": "玄野武宏", "speaker_uuid": "c30dc15a-0992-4f8d-8bb8-ad3b314e6a6f", "styles": [
        {"name": "ノーマル", "id": 11}
    ]}
]"#;

pub fn speaker_catalog() -> SpeakerCatalog {
    match SpeakerCatalog::from_json(SPEAKERS_JSON) {
        Ok(catalog) => catalog,
        Err(e) => panic!("fixture catalog: {e}"),
    }
}

/// Sine tone
pub fn tone(freq: f32, millis: u64, amplitude: f32) -> SampleBuffer {
    let len = (FIXTURE_RATE as u64 * millis / 1000) as usize;
    let samples = (0..len)
        .map(|i| {
            let t = i as f32 / FIXTURE_RATE as f32;
            (2.0 * std::f32::consts::PI * freq * t).sin() * amplitude
        })
        .collect();
    SampleBuffer::new(samples, FIXTURE_RATE)
}

/// Syllable-like bursts separated by short pauses
pub fn syllables(count: usize, syllable_ms: u64, pause_ms: u64) -> SampleBuffer {
    let segments: Vec<Segment> = (0..count)
        .flat_map(|i| {
            let pitch = 150.0 + 20.0 * (i % 4) as f32;
            [Segment::voiced(syllable_ms, pitch, 0.9), Segment::silence(pause_ms)]
        })
        .collect();
    UtteranceSynthesizer::default().render(&segments)
}

/// 16-bit mono WAV
pub fn wav_bytes(buffer: &SampleBuffer) -> KuchiResult<Bytes> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| KuchiError::Decode(e.to_string()))?;
        for &sample in buffer.samples() {
            let s = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            writer
                .write_sample(s)
                .map_err(|e| KuchiError::Decode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| KuchiError::Decode(e.to_string()))?;
    }
    Ok(Bytes::from(cursor.into_inner()))
}

/// An encoded WAV source, as a TTS engine would hand it over
pub fn wav_source(buffer: &SampleBuffer) -> KuchiResult<AudioSource> {
    Ok(AudioSource::Encoded {
        data: wav_bytes(buffer)?,
        extension: Some("wav".into()),
    })
}
