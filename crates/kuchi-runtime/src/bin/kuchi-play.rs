//! kuchi-play - drive one utterance through the lip-sync pipeline headless
//!
//! ```text
//! kuchi-play --voice 2 --slot a --source hello.wav
//! kuchi-play --voice 3 --catalog speakers.json --source https://example.com/line.mp3
//! kuchi-play --voice 2                      # synthetic utterance
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use kuchi_audio::{sample_utterance, AudioOutput, AudioSource, SilentOutput};
use kuchi_core::{CharacterSlot, KuchiConfig, KuchiResult, SpeakerCatalog, VoiceId};
use kuchi_runtime::{logging, Director};
use kuchi_visual::{AssetPaths, SceneSurface, SpriteNode};

const DEMO_CATALOG: &str = r#"[
    {"name": "四国めたん", "speaker_uuid": "7ffcb7ce-00ec-4bdc-82cd-45a8889e43ff", "styles": [
        {"name": "ノーマル", "id": 2}, {"name": "あまあま", "id": 0}, {"name": "ツンツン", "id": 6}
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
    ]}
]"#;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Voice (style) id to speak with
    #[arg(long)]
    voice: u32,

    /// Slot to play on: a/left or b/right
    #[arg(long, default_value = "a", value_parser = parse_slot)]
    slot: CharacterSlot,

    /// Audio file or http(s) URL. Defaults to a synthetic utterance.
    #[arg(long)]
    source: Option<String>,

    /// JSON speaker list as served by /get-speakers
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for blink timing
    #[arg(long)]
    seed: Option<u64>,

    /// Play through the default output device
    #[cfg(feature = "device")]
    #[arg(long)]
    device: bool,
}

fn parse_slot(raw: &str) -> Result<CharacterSlot, String> {
    CharacterSlot::parse(raw).ok_or_else(|| format!("unknown slot {raw:?}, expected a or b"))
}

#[cfg(feature = "device")]
fn output(args: &Args) -> Arc<dyn AudioOutput> {
    if args.device {
        Arc::new(kuchi_audio::CpalOutput::new())
    } else {
        Arc::new(SilentOutput)
    }
}

#[cfg(not(feature = "device"))]
fn output(_args: &Args) -> Arc<dyn AudioOutput> {
    Arc::new(SilentOutput)
}

fn source(raw: Option<&str>) -> AudioSource {
    match raw {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => AudioSource::url(url),
        Some(path) => AudioSource::File(PathBuf::from(path)),
        None => AudioSource::from(sample_utterance()),
    }
}

async fn run(args: Args) -> KuchiResult<()> {
    let config = match &args.config {
        Some(path) => KuchiConfig::from_json_file(path)?,
        None => KuchiConfig::default(),
    };
    logging::init(&config.logging)?;

    let catalog = match &args.catalog {
        Some(path) => {
            let body = std::fs::read_to_string(path)
                .map_err(|e| kuchi_core::KuchiError::Catalog(format!("{}: {e}", path.display())))?;
            SpeakerCatalog::from_json(&body)?
        }
        None => SpeakerCatalog::from_json(DEMO_CATALOG)?,
    };

    let scene = Arc::new(SceneSurface::new(AssetPaths::from(&config.assets)));
    let mut director = Director::new(&config, catalog, scene.clone(), output(&args))?;
    if let Some(seed) = args.seed {
        director = director.with_blink_seed(seed);
    }

    let voice = VoiceId::new(args.voice);
    director.assign(args.slot, voice).await?;

    let report = director
        .play(args.slot, source(args.source.as_deref()), voice)
        .await;

    for sprite in scene.writes_for(args.slot, SpriteNode::Mouth) {
        tracing::info!(slot = %args.slot, %sprite, "mouth");
    }
    for sprite in scene.writes_for(args.slot, SpriteNode::Eyes) {
        tracing::info!(slot = %args.slot, %sprite, "eyes");
    }

    println!(
        "session {} on {} ({}): {} after {:?}, {} ticks, {} failed",
        report.session,
        report.slot.side(),
        report.voice,
        report.status,
        report.elapsed,
        report.lipsync.ticks,
        report.lipsync.ticks_failed,
    );

    director.shutdown().await;
    report.into_result().map(|_| ())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("kuchi-play: {e}");
            ExitCode::FAILURE
        }
    }
}
