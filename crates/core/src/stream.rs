// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logical output streams a native process can write to.

use serde::{Deserialize, Serialize};

/// The host stream a [`ProcessOutputRecord`](crate::ProcessOutputRecord) is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Output,
    Error,
    Verbose,
    Warning,
    Debug,
    Progress,
    Information,
    Unknown,
}

crate::simple_display! {
    StreamKind {
        Output => "output",
        Error => "error",
        Verbose => "verbose",
        Warning => "warning",
        Debug => "debug",
        Progress => "progress",
        Information => "information",
        Unknown => "unknown",
    }
}

impl StreamKind {
    /// Parse a sub-stream tag as written by the structured protocol.
    ///
    /// Matching is ASCII case-insensitive. Unrecognized tags yield `None`;
    /// the caller decides which parent stream they fall back to.
    pub fn from_tag(tag: &str) -> Option<StreamKind> {
        const TAGS: [(&str, StreamKind); 7] = [
            ("output", StreamKind::Output),
            ("error", StreamKind::Error),
            ("verbose", StreamKind::Verbose),
            ("warning", StreamKind::Warning),
            ("debug", StreamKind::Debug),
            ("progress", StreamKind::Progress),
            ("information", StreamKind::Information),
        ];
        let tag = tag.trim();
        TAGS.iter().find(|(name, _)| name.eq_ignore_ascii_case(tag)).map(|(_, kind)| *kind)
    }

    /// Tag written by the structured encoder (capitalized, as readers expect).
    pub fn wire_tag(self) -> &'static str {
        match self {
            StreamKind::Output => "Output",
            StreamKind::Error => "Error",
            StreamKind::Verbose => "Verbose",
            StreamKind::Warning => "Warning",
            StreamKind::Debug => "Debug",
            StreamKind::Progress => "Progress",
            StreamKind::Information => "Information",
            StreamKind::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
