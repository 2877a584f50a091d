//! Test rig - a director over an in-memory scene

use std::sync::Arc;

use kuchi_audio::SilentOutput;
use kuchi_core::{CharacterSlot, ControlScope, ElementId, KuchiConfig, KuchiResult, SpeakerCatalog};
use kuchi_runtime::Director;
use kuchi_visual::{AssetPaths, SceneSurface, SpriteNode, SpriteRef};

use crate::speaker_catalog;

pub struct TestRig {
    pub director: Director,
    pub scene: Arc<SceneSurface>,
    pub paths: AssetPaths,
}

impl TestRig {
    pub fn new(scope: ControlScope) -> KuchiResult<Self> {
        Self::with_catalog(scope, speaker_catalog())
    }

    pub fn with_catalog(scope: ControlScope, catalog: SpeakerCatalog) -> KuchiResult<Self> {
        let config = KuchiConfig {
            controls: scope,
            ..KuchiConfig::default()
        };
        let paths = AssetPaths::from(&config.assets);
        let scene = Arc::new(SceneSurface::new(paths.clone()));
        let director = Director::new(&config, catalog, scene.clone(), Arc::new(SilentOutput))?
            .with_blink_seed(0x6b75_6368);
        Ok(Self {
            director,
            scene,
            paths,
        })
    }

    /// File names of every accepted mouth write on a slot
    pub fn mouth_files(&self, slot: CharacterSlot) -> Vec<String> {
        file_names(&self.scene.writes_for(slot, SpriteNode::Mouth))
    }

    /// Mouth writes that landed on one element
    pub fn mouth_writes_on(&self, slot: CharacterSlot, element: ElementId) -> usize {
        self.scene
            .writes()
            .iter()
            .filter(|w| w.slot == slot && w.element == element && w.node == SpriteNode::Mouth)
            .count()
    }
}

pub fn file_names(sprites: &[SpriteRef]) -> Vec<String> {
    sprites
        .iter()
        .map(|s| s.as_str().rsplit('/').next().unwrap_or_default().to_string())
        .collect()
}
