//! Speaker catalog
//!
//! Built once from the speaker list the chat backend serves. Each style of a
//! speaker is a separate synthetic voice; the style id is the voice id used
//! for synthesis and for gating animation.

use std::collections::HashMap;

use serde::Deserialize;

use crate::{CharacterFamily, KuchiError, KuchiResult, VoiceId, VoiceProfile};

/// Style preferred when a speaker is first selected
pub const PREFERRED_STYLE: &str = "あまあま";

#[derive(Debug, Clone, Deserialize)]
pub struct SpeakerStyle {
    pub name: String,
    pub id: VoiceId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Speaker {
    pub name: String,
    pub speaker_uuid: String,
    #[serde(default)]
    pub styles: Vec<SpeakerStyle>,
}

/// Voice id to character family mapping
#[derive(Debug, Clone, Default)]
pub struct SpeakerCatalog {
    speakers: Vec<Speaker>,
    profiles: HashMap<VoiceId, VoiceProfile>,
}

impl SpeakerCatalog {
    /// Parse the JSON speaker list
    pub fn from_json(body: &str) -> KuchiResult<Self> {
        let speakers: Vec<Speaker> =
            serde_json::from_str(body).map_err(|e| KuchiError::Catalog(e.to_string()))?;
        Ok(Self::from_speakers(speakers))
    }

    pub fn from_speakers(speakers: Vec<Speaker>) -> Self {
        let mut profiles = HashMap::new();

        for speaker in &speakers {
            let Some(family) = CharacterFamily::from_display_name(&speaker.name) else {
                tracing::debug!(speaker = %speaker.name, "speaker has no sprite set, voices stay unanimated");
                continue;
            };
            for style in &speaker.styles {
                if let Some(previous) = profiles.insert(
                    style.id,
                    VoiceProfile::new(style.id, family, style.name.clone()),
                ) {
                    tracing::warn!(voice = %style.id, previous = %previous.family, "duplicate style id in catalog");
                }
            }
        }

        SpeakerCatalog { speakers, profiles }
    }

    /// Catalog with the given profiles and no speaker metadata
    pub fn from_profiles(profiles: impl IntoIterator<Item = VoiceProfile>) -> Self {
        SpeakerCatalog {
            speakers: Vec::new(),
            profiles: profiles.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn profile(&self, voice: VoiceId) -> Option<&VoiceProfile> {
        self.profiles.get(&voice)
    }

    /// Character family that animates for this voice, if any
    pub fn family_of(&self, voice: VoiceId) -> Option<CharacterFamily> {
        self.profiles.get(&voice).map(|p| p.family)
    }

    /// Whether any speaker offers this voice, animated or not
    pub fn contains(&self, voice: VoiceId) -> bool {
        self.profiles.contains_key(&voice)
            || self
                .speakers
                .iter()
                .any(|s| s.styles.iter().any(|style| style.id == voice))
    }

    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn speaker(&self, uuid: &str) -> Option<&Speaker> {
        self.speakers.iter().find(|s| s.speaker_uuid == uuid)
    }

    pub fn speaker_by_family(&self, family: CharacterFamily) -> Option<&Speaker> {
        self.speakers
            .iter()
            .find(|s| CharacterFamily::from_display_name(&s.name) == Some(family))
    }

    /// Default style for a speaker: the preferred style, else the first one
    pub fn default_style(&self, uuid: &str) -> Option<VoiceId> {
        let speaker = self.speaker(uuid)?;
        speaker
            .styles
            .iter()
            .find(|s| s.name == PREFERRED_STYLE)
            .or_else(|| speaker.styles.first())
            .map(|s| s.id)
    }

    /// Number of animated voices
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
