// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variables read by the engine.

/// Executable extensions on Windows, used when `PATHEXT` is unset.
const DEFAULT_PATHEXT: &str = ".COM;.EXE;.BAT;.CMD;.VBS;.VBE;.JS;.JSE;.WSF;.WSH;.MSC;.CPL";

/// Executable extensions, lowercased, each with its leading dot.
pub fn pathext() -> Vec<String> {
    let raw = std::env::var("PATHEXT")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PATHEXT.to_string());
    raw.split(';')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            }
        })
        .collect()
}

/// Command interpreter used for shell activation on Windows.
pub fn comspec() -> String {
    std::env::var("ComSpec").ok().filter(|v| !v.is_empty()).unwrap_or_else(|| "cmd.exe".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
