//! Normalized platform facts for one worker.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::label_config::{LabelConfig, TagKind};
use crate::tag::Tag;

/// Platform facts collected from a worker.
///
/// Values are normalized by the collector before a record is built, so the
/// derived tags never contain whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactRecord {
    architecture: String,
    os_family_name: String,
    os_version: String,
    os_display_name: String,
    #[serde(default)]
    windows_feature_update: String,
}

impl FactRecord {
    /// Creates a record from already normalized values.
    pub fn new(
        architecture: impl Into<String>,
        os_family_name: impl Into<String>,
        os_version: impl Into<String>,
        os_display_name: impl Into<String>,
        windows_feature_update: impl Into<String>,
    ) -> Self {
        Self {
            architecture: architecture.into(),
            os_family_name: os_family_name.into(),
            os_version: os_version.into(),
            os_display_name: os_display_name.into(),
            windows_feature_update: windows_feature_update.into(),
        }
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    /// OS family or distribution name, e.g. `Linux`, `Ubuntu`, `windows`.
    pub fn name(&self) -> &str {
        &self.os_family_name
    }

    pub fn version(&self) -> &str {
        &self.os_version
    }

    /// Human readable OS name as reported by the worker process.
    pub fn display_name(&self) -> &str {
        &self.os_display_name
    }

    /// Windows feature update identifier, empty when not applicable.
    pub fn windows_feature_update(&self) -> &str {
        &self.windows_feature_update
    }

    /// `{name}-{architecture}`
    pub fn architecture_name(&self) -> String {
        format!("{}-{}", self.os_family_name, self.architecture)
    }

    /// `{name}-{version}`
    pub fn name_version(&self) -> String {
        format!("{}-{}", self.os_family_name, self.os_version)
    }

    /// `{name}-{architecture}-{version}`
    pub fn architecture_name_version(&self) -> String {
        format!(
            "{}-{}-{}",
            self.os_family_name, self.architecture, self.os_version
        )
    }

    /// Returns the tag text for one kind, or `None` if the record has
    /// nothing for it.
    pub fn derive(&self, kind: TagKind) -> Option<String> {
        let text = match kind {
            TagKind::Architecture => self.architecture.clone(),
            TagKind::Name => self.os_family_name.clone(),
            TagKind::ArchitectureName => self.architecture_name(),
            TagKind::NameVersion => self.name_version(),
            TagKind::ArchitectureNameVersion => self.architecture_name_version(),
            TagKind::DisplayName => self.os_display_name.clone(),
            TagKind::WindowsFeatureUpdate => self.windows_feature_update.clone(),
        };
        (!text.is_empty()).then_some(text)
    }

    /// Tags selected by `config`.
    pub fn tags(&self, config: &LabelConfig) -> BTreeSet<Tag> {
        TagKind::ALL
            .iter()
            .filter(|kind| config.includes(**kind))
            .filter_map(|kind| self.derive(*kind))
            .map(Tag::from)
            .collect()
    }

    /// Every derived tag.
    pub fn all_tags(&self) -> BTreeSet<Tag> {
        self.tags(&LabelConfig::default())
    }
}
