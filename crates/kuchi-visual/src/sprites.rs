//! Sprite paths
//!
//! `{base}/{prefix}_mouse_{open|open_middle|close_middle|close}.png` and
//! `{base}/{prefix}_eye_{open|close}.png`. The "mouse" spelling is part of
//! the asset packs and must stay.

use std::fmt;
use std::sync::Arc;

use kuchi_core::{AssetConfig, CharacterFamily};

use crate::MouthState;

/// Eye sprite choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EyeState {
    #[default]
    Open,
    Closed,
}

impl EyeState {
    pub fn sprite_suffix(self) -> &'static str {
        match self {
            EyeState::Open => "open",
            EyeState::Closed => "close",
        }
    }
}

/// A sprite URL
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SpriteRef(Arc<str>);

impl SpriteRef {
    pub fn new(url: impl Into<Arc<str>>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SpriteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sprite({})", self.0)
    }
}

impl fmt::Display for SpriteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds sprite paths under one asset base
#[derive(Debug, Clone)]
pub struct AssetPaths {
    base: String,
}

impl AssetPaths {
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn mouth(&self, family: CharacterFamily, state: MouthState) -> SpriteRef {
        SpriteRef::new(format!(
            "{}/{}_mouse_{}.png",
            self.base,
            family.asset_prefix(),
            state.sprite_suffix()
        ))
    }

    pub fn eyes(&self, family: CharacterFamily, state: EyeState) -> SpriteRef {
        SpriteRef::new(format!(
            "{}/{}_eye_{}.png",
            self.base,
            family.asset_prefix(),
            state.sprite_suffix()
        ))
    }

    /// Every sprite a family needs, mouth ladder first
    pub fn all_for(&self, family: CharacterFamily) -> Vec<SpriteRef> {
        MouthState::ALL
            .iter()
            .map(|&m| self.mouth(family, m))
            .chain([EyeState::Open, EyeState::Closed].iter().map(|&e| self.eyes(family, e)))
            .collect()
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::from(&AssetConfig::default())
    }
}

impl From<&AssetConfig> for AssetPaths {
    fn from(config: &AssetConfig) -> Self {
        Self::new(config.base.clone())
    }
}
