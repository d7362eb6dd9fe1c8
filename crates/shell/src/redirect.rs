// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Which of a child's standard streams the engine takes over.

use nx_core::{Consumer, Invocation};

use crate::platform::BinaryKind;

/// Stream redirection decided once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Redirection {
    pub input: bool,
    pub output: bool,
    pub error: bool,
    /// Nothing is redirected: the child owns the console.
    pub standalone: bool,
    /// Started and left running; nothing is drained or waited on.
    pub background: bool,
}

/// Facts about the host and program that shape redirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectContext {
    pub server_side: bool,
    pub desktop: bool,
    pub binary: BinaryKind,
    /// Console-program capture forced by preference.
    pub force_capture: bool,
    pub transcribing: bool,
    pub screen_scrape: bool,
}

impl Default for RedirectContext {
    fn default() -> Self {
        Self {
            server_side: false,
            desktop: false,
            binary: BinaryKind::Console,
            force_capture: false,
            transcribing: false,
            screen_scrape: false,
        }
    }
}

/// Decide redirection for `invocation`.
pub fn decide(invocation: &Invocation, ctx: &RedirectContext) -> Redirection {
    let position = &invocation.position;
    let to_default = |consumer: &Option<Consumer>| consumer.as_ref().is_some_and(Consumer::is_default_sink);

    let mut r = Redirection {
        input: invocation.expects_input,
        output: !(position.is_last && to_default(&position.output_consumer)),
        error: position.error_merged || !to_default(&position.error_consumer),
        ..Redirection::default()
    };

    if ctx.server_side {
        r.input = true;
        r.output = true;
        r.error = true;
        return r;
    }

    if ctx.desktop && ctx.binary == BinaryKind::Console && ctx.force_capture {
        r.output = true;
        r.error = true;
    }

    if ctx.desktop && ctx.binary == BinaryKind::Windowed && position.is_last {
        r.output = false;
        r.error = false;
        r.background = true;
    }

    r.standalone = !r.input && !r.output && !r.error;

    // A transcript needs the output; without screen scraping the only way to
    // get it is to capture the streams.
    if r.standalone && !r.background && ctx.transcribing && !ctx.screen_scrape {
        r.output = true;
        r.error = true;
        r.standalone = false;
    }

    r
}

#[cfg(test)]
#[path = "redirect_tests.rs"]
mod tests;
