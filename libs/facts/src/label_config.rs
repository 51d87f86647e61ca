//! Selection of which derived tags are applied to workers.

use serde::{Deserialize, Serialize};

/// The kinds of tag a fact record derives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKind {
    /// `x86_64`
    Architecture,
    /// `Linux`
    Name,
    /// `Linux-x86_64`
    ArchitectureName,
    /// `Linux-5.15.0`
    NameVersion,
    /// `Linux-x86_64-5.15.0`
    ArchitectureNameVersion,
    /// Human readable OS name, e.g. `Windows_11`.
    DisplayName,
    /// Windows feature update, e.g. `23H2`.
    WindowsFeatureUpdate,
}

impl TagKind {
    /// All kinds, in derivation order.
    pub const ALL: [TagKind; 7] = [
        TagKind::Architecture,
        TagKind::Name,
        TagKind::ArchitectureName,
        TagKind::NameVersion,
        TagKind::ArchitectureNameVersion,
        TagKind::DisplayName,
        TagKind::WindowsFeatureUpdate,
    ];
}

/// Per-kind switches for derived tags.
///
/// Every kind is enabled by default. Missing keys in a serialized config
/// keep their default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub architecture: bool,
    pub name: bool,
    pub architecture_name: bool,
    pub name_version: bool,
    pub architecture_name_version: bool,
    pub display_name: bool,
    pub windows_feature_update: bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            architecture: true,
            name: true,
            architecture_name: true,
            name_version: true,
            architecture_name_version: true,
            display_name: true,
            windows_feature_update: true,
        }
    }
}

impl LabelConfig {
    /// Returns true if tags of this kind should be applied.
    pub fn includes(&self, kind: TagKind) -> bool {
        match kind {
            TagKind::Architecture => self.architecture,
            TagKind::Name => self.name,
            TagKind::ArchitectureName => self.architecture_name,
            TagKind::NameVersion => self.name_version,
            TagKind::ArchitectureNameVersion => self.architecture_name_version,
            TagKind::DisplayName => self.display_name,
            TagKind::WindowsFeatureUpdate => self.windows_feature_update,
        }
    }
}
