//! AudioSourceLoader - fetch and decode one utterance
//!
//! No retry happens here; whoever produced the URL owns retry policy.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;

use kuchi_core::{KuchiError, KuchiResult};

use crate::{decode_audio, AudioContext, ContextPool, SampleBuffer};

/// Where the audio for an utterance comes from
pub enum AudioSource {
    /// Remote resource, fetched over HTTP
    Url(String),
    /// Local file
    File(PathBuf),
    /// Encoded payload already in memory
    Encoded { data: Bytes, extension: Option<String> },
    /// Already decoded samples
    Decoded(SampleBuffer),
    /// Samples that another task will deliver later
    Deferred(oneshot::Receiver<KuchiResult<SampleBuffer>>),
}

impl AudioSource {
    pub fn url(url: impl Into<String>) -> Self {
        AudioSource::Url(url.into())
    }

    /// A source plus the sender that completes it
    pub fn deferred() -> (oneshot::Sender<KuchiResult<SampleBuffer>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, AudioSource::Deferred(rx))
    }

    fn describe(&self) -> String {
        match self {
            AudioSource::Url(url) => url.clone(),
            AudioSource::File(path) => path.display().to_string(),
            AudioSource::Encoded { data, .. } => format!("<{} encoded bytes>", data.len()),
            AudioSource::Decoded(buffer) => format!("<{} samples>", buffer.len()),
            AudioSource::Deferred(_) => "<deferred>".to_string(),
        }
    }
}

impl fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioSource({})", self.describe())
    }
}

impl From<SampleBuffer> for AudioSource {
    fn from(buffer: SampleBuffer) -> Self {
        AudioSource::Decoded(buffer)
    }
}

/// A decoded utterance and the context that owns it
#[derive(Debug)]
pub struct LoadedAudio {
    pub buffer: SampleBuffer,
    pub context: AudioContext,
}

impl LoadedAudio {
    pub fn duration(&self) -> Duration {
        self.buffer.duration()
    }
}

/// Fetches and decodes audio, one context per load
#[derive(Clone, Debug)]
pub struct AudioSourceLoader {
    client: reqwest::Client,
    pool: ContextPool,
}

impl AudioSourceLoader {
    pub fn new(pool: ContextPool) -> Self {
        Self::with_client(reqwest::Client::new(), pool)
    }

    pub fn with_client(client: reqwest::Client, pool: ContextPool) -> Self {
        Self { client, pool }
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// Load a source. The returned context must be released by the caller.
    pub async fn load(&self, source: AudioSource) -> KuchiResult<LoadedAudio> {
        let context = self.pool.allocate();
        let label = source.describe();

        let buffer = match source {
            AudioSource::Url(url) => {
                let (data, extension) = self.fetch(&url).await?;
                decode_blocking(data, extension).await?
            }
            AudioSource::File(path) => {
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_string);
                let data = tokio::task::spawn_blocking(move || std::fs::read(&path))
                    .await
                    .map_err(|e| KuchiError::Decode(e.to_string()))?
                    .map_err(|e| KuchiError::fetch(label.clone(), e))?;
                decode_blocking(Bytes::from(data), extension).await?
            }
            AudioSource::Encoded { data, extension } => decode_blocking(data, extension).await?,
            AudioSource::Decoded(buffer) => buffer,
            AudioSource::Deferred(rx) => rx
                .await
                .map_err(|_| KuchiError::fetch(label.clone(), "audio producer went away"))??,
        };

        if buffer.is_empty() || buffer.sample_rate() == 0 {
            return Err(KuchiError::Decode(format!("{label}: no playable samples")));
        }

        tracing::debug!(
            source = %label,
            context = context.id(),
            duration_ms = buffer.duration().as_millis() as u64,
            "audio loaded"
        );

        Ok(LoadedAudio { buffer, context })
    }

    async fn fetch(&self, url: &str) -> KuchiResult<(Bytes, Option<String>)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| KuchiError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KuchiError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let extension = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(extension_for_mime)
            .or_else(|| extension_from_url(url));

        let data = response.bytes().await.map_err(|e| KuchiError::fetch(url, e))?;
        Ok((data, extension))
    }
}

async fn decode_blocking(data: Bytes, extension: Option<String>) -> KuchiResult<SampleBuffer> {
    tokio::task::spawn_blocking(move || decode_audio(data, extension.as_deref()))
        .await
        .map_err(|e| KuchiError::Decode(e.to_string()))?
}

fn extension_for_mime(mime: &str) -> Option<String> {
    let essence = mime.split(';').next()?.trim();
    let ext = match essence {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        _ => return None,
    };
    Some(ext.to_string())
}

fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    (!ext.is_empty() && ext.len() <= 4).then(|| ext.to_ascii_lowercase())
}
