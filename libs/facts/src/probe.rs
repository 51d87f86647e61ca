//! Worker-side fact probing.
//!
//! Runs inside the worker process and reads the raw values the collector
//! normalizes. Every failure here degrades to a missing value.

use std::io;
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collector::{Distribution, FactCollector, FeatureUpdateLookup};
use crate::record::FactRecord;
use crate::release::{LsbRelease, OsRelease};

/// The remote task a channel executes on the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectFacts;

impl CollectFacts {
    /// Runs the probe in the current process.
    pub fn run(&self) -> FactRecord {
        probe_local()
    }
}

/// Collects facts about the current process and host.
pub fn probe_local() -> FactRecord {
    let arch = std::env::consts::ARCH;
    let os_name = os_name();
    let os_version = os_version();
    let distribution = if std::env::consts::OS == "linux" {
        linux_distribution()
    } else {
        None
    };

    FactCollector::new()
        .with_distribution(distribution.as_ref())
        .with_feature_update(&RegistryFeatureUpdate)
        .collect(Some(arch), Some(os_name), os_version.as_deref())
}

fn os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Mac OS X",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

fn os_version() -> Option<String> {
    match std::env::consts::OS {
        "linux" => std::fs::read_to_string("/proc/sys/kernel/osrelease")
            .map_err(|e| debug!(error = %e, "Failed to read kernel release"))
            .ok(),
        "macos" => command_stdout("sw_vers", &["-productVersion"]),
        "windows" => command_stdout("cmd", &["/C", "ver"]).and_then(|out| windows_version(&out)),
        _ => command_stdout("uname", &["-r"]),
    }
}

fn linux_distribution() -> Option<Distribution> {
    if let Some(distribution) =
        command_stdout("lsb_release", &["-a"]).and_then(|out| LsbRelease::parse(&out).distribution())
    {
        return Some(distribution);
    }

    OsRelease::from_file(OsRelease::PATH)
        .map_err(|e| debug!(error = %e, "Failed to read os-release"))
        .ok()
        .and_then(|os| os.distribution())
}

/// Extracts `major.minor` from `ver` output such as
/// `Microsoft Windows [Version 10.0.22631.2861]`.
fn windows_version(output: &str) -> Option<String> {
    let start = output.find("Version ")? + "Version ".len();
    let rest = &output[start..];
    let end = rest.find(']').unwrap_or(rest.len());
    let mut parts = rest[..end].trim().split('.');
    let major = parts.next()?;
    let minor = parts.next()?;
    Some(format!("{major}.{minor}"))
}

fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    match Command::new(program).args(args).output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            debug!(program, status = %output.status, "Probe command failed");
            None
        }
        Err(e) => {
            debug!(program, error = %e, "Probe command unavailable");
            None
        }
    }
}

/// Reads the feature update from the Windows registry via `reg query`.
///
/// `DisplayVersion` (e.g. `23H2`) is preferred; older builds only carry
/// `ReleaseId` (e.g. `1809`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryFeatureUpdate;

impl RegistryFeatureUpdate {
    const KEY: &'static str = r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion";

    fn query(value_name: &str) -> io::Result<String> {
        let output = Command::new("reg")
            .args(["query", Self::KEY, "/v", value_name])
            .output()?;
        if !output.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("registry value {value_name} not found"),
            ));
        }
        parse_reg_value(&String::from_utf8_lossy(&output.stdout), value_name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unreadable registry value {value_name}"),
            )
        })
    }
}

impl FeatureUpdateLookup for RegistryFeatureUpdate {
    fn feature_update(&self) -> io::Result<String> {
        Self::query("DisplayVersion").or_else(|_| Self::query("ReleaseId"))
    }
}

/// Finds `<name>    REG_SZ    <value>` in `reg query` output.
fn parse_reg_value(output: &str, value_name: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        if fields.next()? != value_name {
            return None;
        }
        fields.next().filter(|kind| kind.starts_with("REG_"))?;
        let value = fields.collect::<Vec<_>>().join(" ");
        (!value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::UNKNOWN_VALUE;

    #[test]
    fn test_probe_local_is_complete() {
        let record = CollectFacts.run();
        assert_eq!(record.architecture(), std::env::consts::ARCH);
        assert_ne!(record.name(), UNKNOWN_VALUE);
        assert!(!record.all_tags().is_empty());
    }

    #[test]
    fn test_windows_version() {
        assert_eq!(
            windows_version("\r\nMicrosoft Windows [Version 10.0.22631.2861]\r\n").as_deref(),
            Some("10.0")
        );
        assert_eq!(windows_version("garbage"), None);
    }

    #[test]
    fn test_parse_reg_value() {
        let output = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\r\n    DisplayVersion    REG_SZ    23H2\r\n\r\n";
        assert_eq!(
            parse_reg_value(output, "DisplayVersion").as_deref(),
            Some("23H2")
        );
        assert_eq!(parse_reg_value(output, "ReleaseId"), None);
    }
}
