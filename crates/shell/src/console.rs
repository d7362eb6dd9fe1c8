// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console allocation for console programs on a desktop platform.

use nx_core::{ExecutionContext, Preferences};

use crate::platform::{BinaryKind, PlatformCapabilities};

/// `CREATE_NO_WINDOW` process creation flag.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// How a console program's console is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsolePlan {
    /// Give the child a console of its own that is never shown.
    pub hide_console: bool,
    /// Redirect output and error even where they would go to the console.
    pub force_capture: bool,
}

impl ConsolePlan {
    /// Plan for a program of kind `binary`.
    ///
    /// Only console programs on a desktop platform are affected. A hidden
    /// console is allocated when the host has none of its own to share.
    pub fn for_program(
        platform: &dyn PlatformCapabilities,
        binary: BinaryKind,
        context: &ExecutionContext,
        preferences: &Preferences,
    ) -> Self {
        if !platform.is_desktop() || binary != BinaryKind::Console {
            return Self::default();
        }
        Self { hide_console: !context.console_attached, force_capture: preferences.always_capture_io }
    }

    /// Apply the plan to a command about to be spawned.
    pub fn apply(&self, command: &mut tokio::process::Command) {
        #[cfg(windows)]
        if self.hide_console {
            command.creation_flags(CREATE_NO_WINDOW);
        }
        #[cfg(not(windows))]
        let _ = command;
    }
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;
