/// Sound owners
///
/// An owner is whatever asked a bank to play a sound, typically a sprite.
/// The bank only needs a stable identity and the owner's effect values.
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::effects::EffectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}

/// Effect values an owner carries, keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectSettings {
    values: HashMap<EffectKind, f64>,
}

impl EffectSettings {
    pub fn get(&self, kind: EffectKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }

    pub fn set(&mut self, kind: EffectKind, value: f64) {
        self.values.insert(kind, value);
    }

    pub fn remove(&mut self, kind: EffectKind) -> Option<f64> {
        self.values.remove(&kind)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Anything that can own sounds in a bank
pub trait SoundOwner {
    fn owner_id(&self) -> OwnerId;

    /// Effect settings, consulted first
    fn sound_effects(&self) -> Option<&EffectSettings> {
        None
    }

    /// Direct value for a kind, used when the settings have none
    fn effect_value(&self, _kind: EffectKind) -> Option<f64> {
        None
    }
}

/// Which owners a bank-wide stop applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnerFilter {
    #[default]
    All,
    Owner(OwnerId),
}

impl OwnerFilter {
    pub fn matches(&self, owner: OwnerId) -> bool {
        match self {
            OwnerFilter::All => true,
            OwnerFilter::Owner(id) => *id == owner,
        }
    }
}

/// Plain owner with an id and settings, for hosts without their own type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicOwner {
    pub id: u64,
    #[serde(default)]
    pub effects: EffectSettings,
}

impl BasicOwner {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            effects: EffectSettings::default(),
        }
    }

    pub fn with_effect(mut self, kind: EffectKind, value: f64) -> Self {
        self.effects.set(kind, value);
        self
    }
}

impl SoundOwner for BasicOwner {
    fn owner_id(&self) -> OwnerId {
        OwnerId(self.id)
    }

    fn sound_effects(&self) -> Option<&EffectSettings> {
        Some(&self.effects)
    }
}
