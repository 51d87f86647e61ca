//! Pure derivation of a fact record from raw environment values.
//!
//! The collector never fails. Raw values that are missing or blank become
//! [`UNKNOWN_VALUE`], and an unreadable Windows feature update becomes an
//! empty string.

use tracing::debug;

use crate::record::FactRecord;

/// Sentinel for a value the worker could not report.
pub const UNKNOWN_VALUE: &str = "unknown";

/// Source of the Windows feature update identifier (e.g. `23H2`).
pub trait FeatureUpdateLookup {
    fn feature_update(&self) -> std::io::Result<String>;
}

/// A Linux distribution detected on the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Distribution name, e.g. `Ubuntu`.
    pub id: String,
    /// Distribution release, e.g. `22.04`.
    pub release: String,
}

/// Builds fact records from raw values plus optional OS-specific extras.
#[derive(Default)]
pub struct FactCollector<'a> {
    distribution: Option<&'a Distribution>,
    feature_update: Option<&'a dyn FeatureUpdateLookup>,
}

impl<'a> FactCollector<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a detected distribution for Linux workers.
    pub fn with_distribution(mut self, distribution: Option<&'a Distribution>) -> Self {
        self.distribution = distribution;
        self
    }

    /// Use a feature update source for Windows workers.
    pub fn with_feature_update(mut self, lookup: &'a dyn FeatureUpdateLookup) -> Self {
        self.feature_update = Some(lookup);
        self
    }

    /// Normalizes the raw values into a record.
    pub fn collect(
        &self,
        raw_arch: Option<&str>,
        raw_os_name: Option<&str>,
        raw_os_version: Option<&str>,
    ) -> FactRecord {
        let architecture = normalize(raw_arch);
        let display_name = normalize(raw_os_name);
        let version = normalize(raw_os_version);
        let lowered = display_name.to_ascii_lowercase();

        if lowered.starts_with("windows") {
            let feature_update = self.windows_feature_update();
            return FactRecord::new(architecture, "windows", version, display_name, feature_update);
        }

        if lowered.starts_with("mac") {
            return FactRecord::new(architecture, "mac", version, display_name, "");
        }

        if lowered == "linux" {
            if let Some(distribution) = self.distribution {
                let id = normalize(Some(&distribution.id));
                let release = normalize(Some(&distribution.release));
                if id != UNKNOWN_VALUE {
                    let release = if release == UNKNOWN_VALUE {
                        version
                    } else {
                        release
                    };
                    return FactRecord::new(architecture, id, release, display_name, "");
                }
            }
        }

        FactRecord::new(architecture, display_name.clone(), version, display_name, "")
    }

    fn windows_feature_update(&self) -> String {
        let Some(lookup) = self.feature_update else {
            return String::new();
        };

        match lookup.feature_update() {
            Ok(value) => {
                let value = value.trim();
                if value.is_empty() {
                    String::new()
                } else {
                    normalize(Some(value))
                }
            }
            Err(e) => {
                debug!(error = %e, "Windows feature update lookup failed");
                String::new()
            }
        }
    }
}

/// Collects facts from raw values with no OS-specific extras.
pub fn collect(
    raw_arch: Option<&str>,
    raw_os_name: Option<&str>,
    raw_os_version: Option<&str>,
) -> FactRecord {
    FactCollector::new().collect(raw_arch, raw_os_name, raw_os_version)
}

/// Trims a raw value and joins inner whitespace with `_`.
fn normalize(raw: Option<&str>) -> String {
    let words: Vec<&str> = raw.unwrap_or_default().split_whitespace().collect();
    if words.is_empty() {
        UNKNOWN_VALUE.to_string()
    } else {
        words.join("_")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::io;

    use proptest::prelude::*;

    use super::*;
    use crate::tag::Tag;

    struct FixedFeatureUpdate(&'static str);

    impl FeatureUpdateLookup for FixedFeatureUpdate {
        fn feature_update(&self) -> io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenRegistry;

    impl FeatureUpdateLookup for BrokenRegistry {
        fn feature_update(&self) -> io::Result<String> {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such value"))
        }
    }

    fn texts(tags: BTreeSet<Tag>) -> BTreeSet<String> {
        tags.into_iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_linux_scenario_tags() {
        let record = collect(Some("x86_64"), Some("Linux"), Some("5.15.0"));
        let expected: BTreeSet<String> = [
            "x86_64",
            "Linux",
            "Linux-x86_64",
            "Linux-5.15.0",
            "Linux-x86_64-5.15.0",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(texts(record.all_tags()), expected);
    }

    #[test]
    fn test_missing_values_become_unknown() {
        let record = collect(None, Some("   "), None);
        assert_eq!(record.architecture(), UNKNOWN_VALUE);
        assert_eq!(record.name(), UNKNOWN_VALUE);
        assert_eq!(record.version(), UNKNOWN_VALUE);
        assert_eq!(record.windows_feature_update(), "");
    }

    #[test]
    fn test_inner_whitespace_is_joined() {
        let record = collect(Some(" amd64 "), Some("FreeBSD"), Some("14.0 RELEASE"));
        assert_eq!(record.architecture(), "amd64");
        assert_eq!(record.version(), "14.0_RELEASE");
    }

    #[test]
    fn test_linux_distribution_replaces_family_and_version() {
        let ubuntu = Distribution {
            id: "Ubuntu".to_string(),
            release: "22.04".to_string(),
        };
        let record = FactCollector::new()
            .with_distribution(Some(&ubuntu))
            .collect(Some("amd64"), Some("Linux"), Some("5.15.0-91-generic"));
        assert_eq!(record.name(), "Ubuntu");
        assert_eq!(record.version(), "22.04");
        assert_eq!(record.display_name(), "Linux");
        assert_eq!(record.architecture_name_version(), "Ubuntu-amd64-22.04");
    }

    #[test]
    fn test_unknown_distribution_keeps_kernel_facts() {
        let unknown = Distribution {
            id: String::new(),
            release: "1.0".to_string(),
        };
        let record = FactCollector::new()
            .with_distribution(Some(&unknown))
            .collect(Some("x86_64"), Some("Linux"), Some("6.1.0"));
        assert_eq!(record.name(), "Linux");
        assert_eq!(record.version(), "6.1.0");
    }

    #[test]
    fn test_windows_feature_update() {
        let lookup = FixedFeatureUpdate(" 23H2\r\n");
        let record = FactCollector::new()
            .with_feature_update(&lookup)
            .collect(Some("amd64"), Some("Windows 11"), Some("10.0"));
        assert_eq!(record.name(), "windows");
        assert_eq!(record.display_name(), "Windows_11");
        assert_eq!(record.windows_feature_update(), "23H2");
    }

    #[test]
    fn test_windows_lookup_failure_degrades_to_empty() {
        let record = FactCollector::new()
            .with_feature_update(&BrokenRegistry)
            .collect(Some("amd64"), Some("Windows Server 2022"), Some("10.0"));
        assert_eq!(record.name(), "windows");
        assert_eq!(record.windows_feature_update(), "");
        assert!(!record.all_tags().contains(""));
    }

    #[test]
    fn test_feature_update_ignored_outside_windows() {
        let lookup = FixedFeatureUpdate("23H2");
        let record = FactCollector::new()
            .with_feature_update(&lookup)
            .collect(Some("aarch64"), Some("Mac OS X"), Some("14.4"));
        assert_eq!(record.name(), "mac");
        assert_eq!(record.windows_feature_update(), "");
    }

    proptest! {
        #[test]
        fn prop_collect_is_total_and_deterministic(
            arch in proptest::option::of(".{0,16}"),
            name in proptest::option::of(".{0,24}"),
            version in proptest::option::of(".{0,16}"),
        ) {
            let first = collect(arch.as_deref(), name.as_deref(), version.as_deref());
            let second = collect(arch.as_deref(), name.as_deref(), version.as_deref());
            prop_assert_eq!(first.all_tags(), second.all_tags());
            prop_assert!(!first.architecture().is_empty());
            prop_assert!(!first.name().is_empty());
            prop_assert!(first.all_tags().iter().all(|t| !t.as_str().contains(char::is_whitespace)));
        }
    }
}
