//! Parsers for Linux distribution release information.

use std::fs;
use std::io;
use std::path::Path;

use crate::collector::{Distribution, UNKNOWN_VALUE};

/// Output of `lsb_release -a`.
///
/// Only the `Distributor ID` and `Release` lines are read. Anything else in
/// the output is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsbRelease {
    distributor_id: String,
    release: String,
}

impl LsbRelease {
    pub fn parse(text: &str) -> Self {
        let mut distributor_id = None;
        let mut release = None;

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "Distributor ID" => distributor_id = Some(value.to_string()),
                "Release" => release = Some(value.to_string()),
                _ => {}
            }
        }

        Self {
            distributor_id: distributor_id.unwrap_or_else(|| UNKNOWN_VALUE.to_string()),
            release: release.unwrap_or_else(|| UNKNOWN_VALUE.to_string()),
        }
    }

    /// Reads saved `lsb_release -a` output from a file.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn distributor_id(&self) -> &str {
        &self.distributor_id
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    /// Returns the distribution, or `None` if the output named none.
    pub fn distribution(&self) -> Option<Distribution> {
        (self.distributor_id != UNKNOWN_VALUE).then(|| Distribution {
            id: self.distributor_id.clone(),
            release: self.release.clone(),
        })
    }
}

/// Contents of `/etc/os-release`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version_id: Option<String>,
}

impl OsRelease {
    /// Default location of the file.
    pub const PATH: &'static str = "/etc/os-release";

    pub fn parse(text: &str) -> Self {
        let mut out = Self::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "ID" => out.id = Some(value.to_string()),
                "NAME" => out.name = Some(value.to_string()),
                "VERSION_ID" => out.version_id = Some(value.to_string()),
                _ => {}
            }
        }

        out
    }

    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Returns the distribution, preferring the machine-readable `ID` over
    /// `NAME`.
    pub fn distribution(&self) -> Option<Distribution> {
        let id = self.id.as_ref().or(self.name.as_ref())?;
        Some(Distribution {
            id: id.clone(),
            release: self
                .version_id
                .clone()
                .unwrap_or_else(|| UNKNOWN_VALUE.to_string()),
        })
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
