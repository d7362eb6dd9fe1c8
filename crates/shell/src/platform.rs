// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform-conditional behavior behind one trait.

use std::io::Read;
use std::path::Path;

use nx_core::Platform;

use crate::env;

/// Subsystem a program was linked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    Console,
    /// A GUI program that does not use standard streams.
    Windowed,
    Unknown,
}

nx_core::simple_display! {
    BinaryKind {
        Console => "console",
        Windowed => "windowed",
        Unknown => "unknown",
    }
}

/// What the engine needs to know about the OS it launches programs on.
pub trait PlatformCapabilities: Send + Sync {
    fn platform(&self) -> Platform;

    /// A full desktop OS with GUI programs and file associations.
    fn is_desktop(&self) -> bool;

    /// Whether `path` can be started directly rather than activated
    /// through the shell. Paths that do not exist are left to the OS.
    fn is_executable(&self, path: &Path) -> bool;

    fn binary_kind(&self, path: &Path) -> BinaryKind;

    /// Whether disposing a process handle leaves the process running, so a
    /// live child has to be killed during cleanup.
    fn kill_before_dispose(&self) -> bool;

    /// Program and arguments that open `target` with its default handler.
    fn shell_execute(&self, target: &str) -> (String, Vec<String>);
}

impl PlatformCapabilities for Platform {
    fn platform(&self) -> Platform {
        *self
    }

    fn is_desktop(&self) -> bool {
        matches!(self, Platform::WindowsDesktop)
    }

    fn is_executable(&self, path: &Path) -> bool {
        if !path.is_file() {
            return true;
        }
        if self.is_windows() {
            let Some(ext) = path.extension() else {
                return false;
            };
            let ext = format!(".{}", ext.to_string_lossy().to_ascii_lowercase());
            env::pathext().contains(&ext)
        } else {
            has_exec_bit(path)
        }
    }

    fn binary_kind(&self, path: &Path) -> BinaryKind {
        if self.is_windows() {
            classify_binary(path)
        } else {
            BinaryKind::Console
        }
    }

    fn kill_before_dispose(&self) -> bool {
        !self.is_windows()
    }

    fn shell_execute(&self, target: &str) -> (String, Vec<String>) {
        if self.is_windows() {
            // `start` takes the first quoted argument as a window title.
            let args = ["/c", "start", "", target].map(str::to_string).to_vec();
            (env::comspec(), args)
        } else if cfg!(target_os = "macos") {
            ("open".to_string(), vec![target.to_string()])
        } else {
            ("xdg-open".to_string(), vec![target.to_string()])
        }
    }
}

#[cfg(unix)]
fn has_exec_bit(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(true)
}

#[cfg(not(unix))]
fn has_exec_bit(_path: &Path) -> bool {
    true
}

const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";
/// COFF file header size following the signature.
const COFF_HEADER_LEN: usize = 20;
/// Offset of `Subsystem` within the optional header (PE32 and PE32+).
const SUBSYSTEM_OFFSET: usize = 68;
const IMAGE_SUBSYSTEM_WINDOWS_GUI: u16 = 2;
const IMAGE_SUBSYSTEM_WINDOWS_CUI: u16 = 3;

/// Read the PE optional header's subsystem field.
pub fn classify_binary(path: &Path) -> BinaryKind {
    let mut header = Vec::with_capacity(4096);
    let read = std::fs::File::open(path).and_then(|f| f.take(4096).read_to_end(&mut header));
    if read.is_err() {
        return BinaryKind::Unknown;
    }
    subsystem(&header)
}

fn subsystem(header: &[u8]) -> BinaryKind {
    if header.get(..2) != Some(b"MZ".as_slice()) {
        return BinaryKind::Unknown;
    }
    let Some(pe) = read_u32(header, 0x3C).map(|v| v as usize) else {
        return BinaryKind::Unknown;
    };
    if header.get(pe..pe + 4) != Some(PE_SIGNATURE.as_slice()) {
        return BinaryKind::Unknown;
    }
    match read_u16(header, pe + 4 + COFF_HEADER_LEN + SUBSYSTEM_OFFSET) {
        Some(IMAGE_SUBSYSTEM_WINDOWS_GUI) => BinaryKind::Windowed,
        Some(IMAGE_SUBSYSTEM_WINDOWS_CUI) => BinaryKind::Console,
        _ => BinaryKind::Unknown,
    }
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let raw = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
