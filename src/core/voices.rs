//! Voice lookup tables, validated once at startup.
//!
//! Requests name voices by preset key or conversion target. Unknown keys are
//! rejected here, before any quota check or provider call.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::config::{VoicePreset, VoiceTable};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("voice preset with empty key")]
    EmptyKey,

    #[error("voice preset '{0}' has no provider voice id")]
    EmptyVoiceId(String),

    #[error("duplicate voice preset '{0}'")]
    DuplicateKey(String),

    #[error("default voice '{0}' is not a synthesis preset")]
    UnknownDefault(String),

    #[error("conversion target '{0}' has no provider voice id")]
    EmptyConversionTarget(&'static str),
}

/// Target of a voice conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionTarget {
    Male,
    Female,
}

impl ConversionTarget {
    pub const ALL: [ConversionTarget; 2] = [ConversionTarget::Male, ConversionTarget::Female];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(ConversionTarget::Male),
            "female" => Some(ConversionTarget::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionTarget::Male => "male",
            ConversionTarget::Female => "female",
        }
    }
}

/// A resolved voice, ready to hand to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogVoice {
    pub key: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub voice_id: String,
}

impl From<&VoicePreset> for CatalogVoice {
    fn from(preset: &VoicePreset) -> Self {
        Self {
            key: preset.key.clone(),
            name: preset.name.clone(),
            description: preset.description.clone(),
            voice_id: preset.voice_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    synthesis: Vec<CatalogVoice>,
    synthesis_index: HashMap<String, usize>,
    default_synthesis: String,
    cloned: Vec<CatalogVoice>,
    cloned_index: HashMap<String, usize>,
    conversion_male: CatalogVoice,
    conversion_female: CatalogVoice,
}

type PresetIndex = (Vec<CatalogVoice>, HashMap<String, usize>);

fn index_presets(presets: &[VoicePreset]) -> Result<PresetIndex, CatalogError> {
    let mut voices = Vec::with_capacity(presets.len());
    let mut index = HashMap::with_capacity(presets.len());
    for preset in presets {
        if preset.key.trim().is_empty() {
            return Err(CatalogError::EmptyKey);
        }
        if preset.voice_id.trim().is_empty() {
            return Err(CatalogError::EmptyVoiceId(preset.key.clone()));
        }
        if index.insert(preset.key.clone(), voices.len()).is_some() {
            return Err(CatalogError::DuplicateKey(preset.key.clone()));
        }
        voices.push(CatalogVoice::from(preset));
    }
    Ok((voices, index))
}

impl VoiceCatalog {
    pub fn from_table(table: &VoiceTable) -> Result<Self, CatalogError> {
        let (synthesis, synthesis_index) = index_presets(&table.synthesis)?;
        let (cloned, cloned_index) = index_presets(&table.cloned)?;

        if !synthesis_index.contains_key(&table.default_synthesis) {
            return Err(CatalogError::UnknownDefault(table.default_synthesis.clone()));
        }
        if table.conversion_male.trim().is_empty() {
            return Err(CatalogError::EmptyConversionTarget("male"));
        }
        if table.conversion_female.trim().is_empty() {
            return Err(CatalogError::EmptyConversionTarget("female"));
        }

        Ok(Self {
            synthesis,
            synthesis_index,
            default_synthesis: table.default_synthesis.clone(),
            cloned,
            cloned_index,
            conversion_male: CatalogVoice {
                key: "male".to_string(),
                name: "Male Voice".to_string(),
                description: "Convert to a male voice".to_string(),
                voice_id: table.conversion_male.clone(),
            },
            conversion_female: CatalogVoice {
                key: "female".to_string(),
                name: "Female Voice".to_string(),
                description: "Convert to a female voice".to_string(),
                voice_id: table.conversion_female.clone(),
            },
        })
    }

    /// Synthesis preset by key; `None` selects the default preset.
    pub fn synthesis_voice(&self, key: Option<&str>) -> Option<&CatalogVoice> {
        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(&self.default_synthesis);
        self.synthesis_index.get(key).map(|&i| &self.synthesis[i])
    }

    pub fn cloned_voice(&self, key: &str) -> Option<&CatalogVoice> {
        self.cloned_index.get(key.trim()).map(|&i| &self.cloned[i])
    }

    pub fn conversion_voice(&self, target: ConversionTarget) -> &CatalogVoice {
        match target {
            ConversionTarget::Male => &self.conversion_male,
            ConversionTarget::Female => &self.conversion_female,
        }
    }

    pub fn synthesis_voices(&self) -> &[CatalogVoice] {
        &self.synthesis
    }

    pub fn cloned_voices(&self) -> &[CatalogVoice] {
        &self.cloned
    }

    pub fn conversion_voices(&self) -> [&CatalogVoice; 2] {
        [&self.conversion_male, &self.conversion_female]
    }

    pub fn default_synthesis_key(&self) -> &str {
        &self.default_synthesis
    }
}
