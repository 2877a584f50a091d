//! Character families and voice profiles
//!
//! A character family owns one sprite set (eyes, mouth, base). Several voice
//! styles of one speaker share a family. Display names from the catalog are
//! mapped to a family exactly once, here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::VoiceId;

/// Closed set of animated characters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CharacterFamily {
    Metan,
    Zundamon,
    Tsumugi,
    Hau,
    Ritsu,
    WhiteCul,
}

impl CharacterFamily {
    pub const ALL: [CharacterFamily; 6] = [
        CharacterFamily::Metan,
        CharacterFamily::Zundamon,
        CharacterFamily::Tsumugi,
        CharacterFamily::Hau,
        CharacterFamily::Ritsu,
        CharacterFamily::WhiteCul,
    ];

    /// Prefix of every sprite file for this character
    pub fn asset_prefix(self) -> &'static str {
        match self {
            CharacterFamily::Metan => "metan",
            CharacterFamily::Zundamon => "zunda",
            CharacterFamily::Tsumugi => "tsumugi",
            CharacterFamily::Hau => "hau",
            CharacterFamily::Ritsu => "ritsu",
            CharacterFamily::WhiteCul => "whiteCul",
        }
    }

    /// Speaker name as it appears in the catalog
    pub fn display_name(self) -> &'static str {
        match self {
            CharacterFamily::Metan => "四国めたん",
            CharacterFamily::Zundamon => "ずんだもん",
            CharacterFamily::Tsumugi => "春日部つむぎ",
            CharacterFamily::Hau => "雨晴はう",
            CharacterFamily::Ritsu => "波音リツ",
            CharacterFamily::WhiteCul => "WhiteCUL",
        }
    }

    /// Map a catalog display name to a family
    pub fn from_display_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|family| family.display_name().eq_ignore_ascii_case(name))
    }

    /// Map an asset prefix back to a family
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|family| family.asset_prefix().eq_ignore_ascii_case(prefix))
    }
}

impl fmt::Display for CharacterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.asset_prefix())
    }
}

/// One synthetic voice. Immutable once loaded from the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceProfile {
    /// Provider style id
    pub id: VoiceId,
    /// Character that speaks with this voice
    pub family: CharacterFamily,
    /// Style name ("ノーマル", "あまあま", ...)
    pub style: String,
}

impl VoiceProfile {
    pub fn new(id: VoiceId, family: CharacterFamily, style: impl Into<String>) -> Self {
        Self {
            id,
            family,
            style: style.into(),
        }
    }

    #[inline]
    pub fn asset_prefix(&self) -> &'static str {
        self.family.asset_prefix()
    }
}
