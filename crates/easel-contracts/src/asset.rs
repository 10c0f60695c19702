use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for an image artifact. The refinement core never decodes
/// the asset itself; collaborators resolve refs to real pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AssetRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Descriptive context shared by synthesis and scoring: what the asset should
/// depict and which references it must stay faithful to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetContext {
    pub description: String,
    #[serde(default)]
    pub defining_traits: Vec<String>,
    #[serde(default)]
    pub situational_traits: Vec<String>,
    pub pose: Option<String>,
    pub style: Option<String>,
    #[serde(default)]
    pub reference_assets: Vec<AssetRef>,
}

impl AssetContext {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }
}
