//! Discovery of the target USB mass-storage block device.
//!
//! Each supported platform has its own enumeration strategy behind the
//! [`DeviceEnumerator`] trait: macOS asks `diskutil` for external physical
//! whole-disks, Linux asks `lsblk` for block devices on the USB transport.
//! Both return candidate raw-device paths in the order the OS reported them;
//! the locator takes the first one and verifies it is readable.

use crate::error::DeviceError;
use serde::Deserialize;
use std::process::Command;

/// Transport token `lsblk` prints for USB-attached block devices.
const USB_TRANSPORT: &str = "usb";

/// A platform-specific strategy for listing candidate MSC device paths.
pub trait DeviceEnumerator {
    /// Candidate raw-device paths in OS-reported order, best match first.
    fn enumerate(&self) -> Result<Vec<String>, DeviceError>;

    /// Short description of what this strategy looks for, used in messages.
    fn description(&self) -> &'static str;
}

/// Selects the enumeration strategy for the current platform.
pub fn platform_enumerator() -> Result<Box<dyn DeviceEnumerator>, DeviceError> {
    if cfg!(target_os = "macos") {
        Ok(Box::new(ExternalPhysicalEnumerator))
    } else if cfg!(target_os = "linux") {
        Ok(Box::new(UsbTransportEnumerator))
    } else {
        Err(DeviceError::UnsupportedPlatform(std::env::consts::OS))
    }
}

/// Locates the first suitable MSC device on the current platform.
pub fn locate_msc_device() -> Result<String, DeviceError> {
    let enumerator = platform_enumerator()?;
    locate_with(enumerator.as_ref())
}

/// Takes the first candidate from `enumerator` and checks it is readable.
///
/// The readability check is a point-in-time precondition: the device can
/// still disappear between this check and a later open, in which case that
/// open fails with an I/O error of its own.
pub fn locate_with(enumerator: &dyn DeviceEnumerator) -> Result<String, DeviceError> {
    let candidates = enumerator.enumerate()?;

    let device = candidates
        .into_iter()
        .next()
        .ok_or_else(|| DeviceError::NotFound(enumerator.description().to_string()))?;

    check_readable(&device)?;

    Ok(device)
}

#[cfg(unix)]
fn check_readable(path: &str) -> Result<(), DeviceError> {
    use rustix::fs::{access, Access};

    access(path, Access::READ_OK).map_err(|_| DeviceError::PermissionDenied(path.to_string()))
}

#[cfg(not(unix))]
fn check_readable(path: &str) -> Result<(), DeviceError> {
    std::fs::OpenOptions::new()
        .read(true)
        .open(path)
        .map(|_| ())
        .map_err(|_| DeviceError::PermissionDenied(path.to_string()))
}

/// macOS: external, physically-attached whole-disks via `diskutil`.
pub struct ExternalPhysicalEnumerator;

#[derive(Debug, Deserialize)]
struct DiskutilList {
    #[serde(rename = "WholeDisks", default)]
    whole_disks: Vec<String>,
}

impl DeviceEnumerator for ExternalPhysicalEnumerator {
    fn enumerate(&self) -> Result<Vec<String>, DeviceError> {
        let output = Command::new("diskutil")
            .args(["list", "-plist", "external", "physical"])
            .output()
            .map_err(|e| DeviceError::Enumeration {
                command: "diskutil",
                source: e,
            })?;

        if !output.status.success() {
            return Err(DeviceError::Enumeration {
                command: "diskutil",
                source: std::io::Error::other(format!("exited with {}", output.status)),
            });
        }

        parse_diskutil_plist(&output.stdout)
    }

    fn description(&self) -> &'static str {
        "external physical disk (diskutil)"
    }
}

/// Parses `diskutil list -plist` output into raw whole-disk paths.
pub fn parse_diskutil_plist(bytes: &[u8]) -> Result<Vec<String>, DeviceError> {
    let doc: DiskutilList = plist::from_bytes(bytes).map_err(|e| DeviceError::Parse {
        command: "diskutil",
        message: e.to_string(),
    })?;

    Ok(doc.whole_disks.iter().map(|id| raw_disk_path(id)).collect())
}

/// Maps a diskutil whole-disk identifier (`disk4`) to its raw device node
/// (`/dev/rdisk4`), which bypasses the buffer cache for sector-level reads.
pub fn raw_disk_path(disk_id: &str) -> String {
    let number = disk_id.strip_prefix("disk").unwrap_or(disk_id);
    format!("/dev/rdisk{number}")
}

/// Linux: block devices on the USB transport via `lsblk`.
pub struct UsbTransportEnumerator;

impl DeviceEnumerator for UsbTransportEnumerator {
    fn enumerate(&self) -> Result<Vec<String>, DeviceError> {
        let output = Command::new("lsblk")
            .args(["-o", "NAME,TRAN"])
            .output()
            .map_err(|e| DeviceError::Enumeration {
                command: "lsblk",
                source: e,
            })?;

        if !output.status.success() {
            return Err(DeviceError::Enumeration {
                command: "lsblk",
                source: std::io::Error::other(format!("exited with {}", output.status)),
            });
        }

        Ok(parse_lsblk(&String::from_utf8_lossy(&output.stdout)))
    }

    fn description(&self) -> &'static str {
        "USB-transport block device (lsblk)"
    }
}

/// Parses `lsblk -o NAME,TRAN` output into device paths for USB rows.
///
/// The header row is skipped. A row counts only if it splits into exactly
/// two tokens (name, transport); anything else is skipped, best-effort.
/// Row order is preserved so the first USB device the kernel discovered
/// stays first.
pub fn parse_lsblk(text: &str) -> Vec<String> {
    let mut paths = Vec::new();

    for line in text.lines().skip(1) {
        let mut tokens = line.split_whitespace();
        let (Some(name), Some(transport), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            continue;
        };

        if transport == USB_TRANSPORT {
            paths.push(format!("/dev/{name}"));
        }
    }

    paths
}
