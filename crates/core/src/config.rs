// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preferences and execution context for native command invocation.
//!
//! Both are plain values handed to the engine at construction; nothing here
//! is process-global, so tests can run independent contexts side by side.
//! A [`NativeConfig`] can be loaded from TOML:
//!
//! ```toml
//! [preferences]
//! native_error_action = true
//! argument_passing = "windows"
//!
//! [context]
//! server_side = false
//! supports_screen_scrape = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Operating-system family and session kind the engine runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Posix,
    /// Windows with an interactive desktop.
    WindowsDesktop,
    /// Windows without a desktop (server core, nano server).
    WindowsHeadless,
}

crate::simple_display! {
    Platform {
        Posix => "posix",
        WindowsDesktop => "windows-desktop",
        WindowsHeadless => "windows-headless",
    }
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::WindowsDesktop
        } else {
            Platform::Posix
        }
    }

    pub fn is_windows(self) -> bool {
        matches!(self, Platform::WindowsDesktop | Platform::WindowsHeadless)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// How arguments are handed to the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentPassing {
    /// Always a discrete argument list.
    Standard,
    /// Always one pre-quoted string.
    Legacy,
    /// Discrete, except for Windows programs known to parse their own
    /// command line.
    #[default]
    Windows,
}

/// User-facing preferences consulted while running a native command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Report a non-zero exit code as an error record.
    pub native_error_action: bool,
    pub argument_passing: ArgumentPassing,
    /// Capture console applications' output even when it would go to the
    /// console directly.
    pub always_capture_io: bool,
}

impl Preferences {
    crate::setters! {
        set {
            native_error_action: bool,
            argument_passing: ArgumentPassing,
            always_capture_io: bool,
        }
    }
}

/// Facts about the process hosting the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionContext {
    /// Running behind a remoting transport whose I/O channels must not be
    /// touched by user programs.
    pub server_side: bool,
    /// The host console can read back its screen buffer.
    pub supports_screen_scrape: bool,
    pub platform: Platform,
    /// The host process has a console attached.
    pub console_attached: bool,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            server_side: false,
            supports_screen_scrape: false,
            platform: Platform::current(),
            console_attached: true,
        }
    }
}

impl ExecutionContext {
    /// Context of the running process.
    pub fn detect() -> Self {
        use std::io::IsTerminal;
        Self {
            console_attached: std::io::stdout().is_terminal() || std::io::stderr().is_terminal(),
            ..Self::default()
        }
    }

    crate::setters! {
        set {
            server_side: bool,
            supports_screen_scrape: bool,
            platform: Platform,
            console_attached: bool,
        }
    }
}

/// On-disk configuration: preferences plus context overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    pub preferences: Preferences,
    pub context: ExecutionContext,
}

impl NativeConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&text)
    }

    /// Load the default config file, falling back to defaults when absent.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config_dir>/native-exec/native.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("native-exec").join("native.toml"))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
