// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestration of one native command invocation.
//!
//! The host drives a [`NativeCommand`] through `begin`, any number of
//! `process_record` calls (one per upstream object) and `end`. Output is
//! forwarded to the host in the order each stream produced it; stdin is fed
//! from the upstream objects.

use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Instant;

use nx_core::{
    Coordinates, ErrorRecord, ExecutionContext, Host, HostError, Invocation, Preferences,
    ProcessOutputRecord, Value,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::console::ConsolePlan;
use crate::error::ExecError;
use crate::format::Formatter;
use crate::input::{ProcessInputWriter, StopFlag};
use crate::launch::{self, LaunchRequest, ProcessHandle};
use crate::multiplex::ProcessOutputMultiplexer;
use crate::platform::PlatformCapabilities;
use crate::redirect::{self, RedirectContext, Redirection};
use crate::scrape::capture_region;
use crate::terminate::{ProcessTerminator, SystemTerminator};

/// Lifecycle of a [`NativeCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Created,
    Preparing,
    Starting,
    Running { background: bool },
    Draining,
    Completed,
    StopRequested,
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited { code: i32 },
    /// Left running in the background; never waited on.
    Background { pid: Option<u32> },
}

impl ExitOutcome {
    pub fn code(&self) -> Option<i32> {
        match self {
            ExitOutcome::Exited { code } => Some(*code),
            ExitOutcome::Background { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stop handling
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StopState {
    stopped: bool,
    pid: Option<u32>,
    exited: bool,
    standalone: bool,
    input: Option<StopFlag>,
}

struct StopShared {
    state: Mutex<StopState>,
    terminator: Arc<dyn ProcessTerminator>,
    kill_tree: bool,
    /// Cancels the output readers once the process is killed.
    readers: CancellationToken,
}

/// Requests a stop from any thread. The kill sequence runs at most once.
#[derive(Clone)]
pub struct StopHandle(Arc<StopShared>);

impl StopHandle {
    fn new(terminator: Arc<dyn ProcessTerminator>, kill_tree: bool) -> Self {
        Self(Arc::new(StopShared {
            state: Mutex::new(StopState::default()),
            terminator,
            kill_tree,
            readers: CancellationToken::new(),
        }))
    }

    pub fn stop(&self) {
        {
            let mut state = self.0.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            if let (Some(pid), false) = (state.pid, state.exited) {
                if !state.standalone {
                    if let Some(input) = &state.input {
                        input.stop();
                    }
                }
                tracing::debug!(pid, tree = self.0.kill_tree, "stopping native command");
                if self.0.kill_tree {
                    self.0.terminator.kill_tree(pid);
                } else {
                    self.0.terminator.kill(pid);
                }
            }
        }
        self.0.readers.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.state.lock().stopped
    }

    fn mark_exited(&self) {
        self.0.state.lock().exited = true;
    }

    fn forget_process(&self) {
        let mut state = self.0.state.lock();
        state.pid = None;
        state.input = None;
    }
}

// ---------------------------------------------------------------------------
// NativeCommand
// ---------------------------------------------------------------------------

/// One invocation of an external program.
pub struct NativeCommand {
    invocation: Invocation,
    host: Arc<dyn Host>,
    context: ExecutionContext,
    preferences: Preferences,
    platform: Arc<dyn PlatformCapabilities>,
    formatter: Option<Box<dyn Formatter>>,
    cancel: Option<CancellationToken>,
    stop: StopHandle,
    state: CommandState,
    redirection: Redirection,
    handle: Option<ProcessHandle>,
    multiplexer: Option<ProcessOutputMultiplexer>,
    writer: Option<ProcessInputWriter>,
    scrape_start: Option<Coordinates>,
    span: tracing::Span,
    started: Option<Instant>,
    cleaned_up: bool,
}

impl NativeCommand {
    pub fn new(
        invocation: Invocation,
        host: Arc<dyn Host>,
        context: ExecutionContext,
        preferences: Preferences,
    ) -> Self {
        let span = tracing::info_span!(
            "native.cmd",
            cmd = %invocation.command_path,
            args = ?invocation.arguments,
            pid = tracing::field::Empty,
            exit_code = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );
        Self {
            platform: Arc::new(context.platform),
            stop: StopHandle::new(Arc::new(SystemTerminator), context.server_side),
            invocation,
            host,
            context,
            preferences,
            formatter: None,
            cancel: None,
            state: CommandState::Created,
            redirection: Redirection::default(),
            handle: None,
            multiplexer: None,
            writer: None,
            scrape_start: None,
            span,
            started: None,
            cleaned_up: false,
        }
    }

    pub fn with_platform(mut self, platform: Arc<dyn PlatformCapabilities>) -> Self {
        self.platform = platform;
        self
    }

    /// Replace the process terminator. Stop handles taken earlier keep the
    /// old one, so call this before [`stop_handle`](Self::stop_handle).
    pub fn with_terminator(mut self, terminator: Arc<dyn ProcessTerminator>) -> Self {
        self.stop = StopHandle::new(terminator, self.context.server_side);
        self
    }

    /// Stop the command when `token` is cancelled while output is drained.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Formatter for text written to stdin.
    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> CommandState {
        if self.stop.is_stopped() && self.state != CommandState::Completed {
            CommandState::StopRequested
        } else {
            self.state
        }
    }

    pub fn redirection(&self) -> Redirection {
        self.redirection
    }

    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().and_then(ProcessHandle::pid)
    }

    /// Run the whole invocation, feeding `input` to stdin.
    pub async fn run<I>(mut self, input: I) -> Result<ExitOutcome, ExecError>
    where
        I: IntoIterator<Item = Value>,
    {
        self.begin().await?;
        for value in input {
            self.process_record(&value).await?;
        }
        self.end().await
    }

    /// Decide redirection and start the process.
    pub async fn begin(&mut self) -> Result<(), ExecError> {
        if self.state != CommandState::Created {
            return Ok(());
        }
        let span = self.span.clone();
        self.start().instrument(span).await
    }

    async fn start(&mut self) -> Result<(), ExecError> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            self.stop.stop();
        }

        self.state = CommandState::Preparing;
        let path = Path::new(&self.invocation.command_path);
        let binary = self.platform.binary_kind(path);
        let console =
            ConsolePlan::for_program(&*self.platform, binary, &self.context, &self.preferences);
        let ctx = RedirectContext {
            server_side: self.context.server_side,
            desktop: self.platform.is_desktop(),
            binary,
            force_capture: console.force_capture,
            transcribing: self.host.is_transcribing(),
            screen_scrape: self.context.supports_screen_scrape && self.host.console().is_some(),
        };
        self.redirection = redirect::decide(&self.invocation, &ctx);
        tracing::debug!(redirection = ?self.redirection, %binary, "redirection decided");

        self.state = CommandState::Starting;
        let legacy = launch::uses_legacy_arguments(
            &self.invocation.command_path,
            self.preferences.argument_passing,
            self.platform.platform(),
        );
        let arguments = launch::build_arguments(&self.invocation, legacy);

        let mut handle = {
            let mut stop = self.stop.0.state.lock();
            if stop.stopped {
                return Err(ExecError::Stopped);
            }
            let handle = launch::launch(&LaunchRequest {
                invocation: &self.invocation,
                redirection: self.redirection,
                arguments,
                platform: &*self.platform,
                console,
            })?;
            stop.pid = handle.pid();
            stop.standalone = handle.standalone;
            handle
        };
        self.redirection = handle.redirection;
        self.started = Some(Instant::now());
        if let Some(pid) = handle.pid() {
            self.span.record("pid", pid);
        }

        if handle.standalone {
            self.host.notify_begin_application();
            handle.notified_begin = true;
            if self.host.is_transcribing() && self.context.supports_screen_scrape {
                self.scrape_start = self.host.console().map(|c| c.cursor_position());
            }
        }

        if !handle.background {
            let stdout = handle.take_stdout();
            let stderr = handle.take_stderr();
            if stdout.is_some() || stderr.is_some() {
                self.multiplexer = Some(ProcessOutputMultiplexer::start(
                    stdout,
                    stderr,
                    &self.invocation.file_name(),
                    self.stop.0.readers.clone(),
                ));
            }
        }

        if let Some(stdin) = handle.take_stdin() {
            let mut writer = ProcessInputWriter::new();
            if let Some(formatter) = self.formatter.take() {
                writer = writer.with_formatter(formatter);
            }
            let encoding = self.host.output_encoding().unwrap_or_default();
            writer.start(stdin, self.invocation.input_format, encoding).await;
            self.stop.0.state.lock().input = Some(writer.stop_flag());
            self.writer = Some(writer);
        }

        self.state = CommandState::Running { background: handle.background };
        self.handle = Some(handle);
        Ok(())
    }

    /// Write one upstream object to stdin, then forward whatever output is
    /// ready without waiting for more.
    pub async fn process_record(&mut self, value: &Value) -> Result<(), ExecError> {
        self.ensure_running()?;
        if let Some(writer) = &mut self.writer {
            writer.add(value).await;
        }
        self.consume_available()
    }

    /// Forward every record that is ready now.
    pub fn consume_available(&mut self) -> Result<(), ExecError> {
        let Some(multiplexer) = &self.multiplexer else {
            return Ok(());
        };
        while let Some(record) = multiplexer.queue().try_take() {
            self.emit(record)?;
        }
        Ok(())
    }

    /// Close stdin, forward all remaining output, wait for exit and report
    /// the exit code. Background processes return at once.
    pub async fn end(&mut self) -> Result<ExitOutcome, ExecError> {
        let span = self.span.clone();
        let result = self.finish().instrument(span).await;
        self.cleanup();
        result
    }

    async fn finish(&mut self) -> Result<ExitOutcome, ExecError> {
        self.ensure_running()?;
        if let Some(writer) = &mut self.writer {
            writer.done().await;
        }

        let Some(handle) = self.handle.as_ref() else {
            return Err(ExecError::InvocationFailed { message: "command was not started".to_string() });
        };
        let pid = handle.pid();
        if handle.background {
            self.state = CommandState::Completed;
            return Ok(ExitOutcome::Background { pid });
        }

        self.state = CommandState::Draining;
        let cancel = self.cancel.clone();
        if let Some(queue) = self.multiplexer.as_ref().map(|m| Arc::clone(m.queue())) {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancelled(&cancel) => None,
                    record = queue.take() => Some(record),
                };
                match next {
                    None => {
                        self.stop.stop();
                        return Err(ExecError::Stopped);
                    }
                    Some(Some(record)) => self.emit(record)?,
                    Some(None) => break,
                }
            }
        }

        let Some(handle) = self.handle.as_mut() else {
            return Err(ExecError::InvocationFailed { message: "command was not started".to_string() });
        };
        let waited = tokio::select! {
            biased;
            _ = cancelled(&cancel) => None,
            status = handle.wait() => Some(status),
        };
        let Some(status) = waited else {
            self.stop.stop();
            return Err(ExecError::Stopped);
        };
        self.stop.mark_exited();
        if self.stop.is_stopped() {
            return Err(ExecError::Stopped);
        }

        let code = match status {
            Ok(status) => exit_code(status),
            Err(e) => {
                tracing::warn!(error = %e, "waiting for process failed");
                -1
            }
        };
        self.span.record("exit_code", code);

        if let Some(start) = self.scrape_start {
            if let Some(console) = self.host.console() {
                let text = capture_region(console, start, console.cursor_position());
                if !text.is_empty() {
                    self.host.append_transcript(&text);
                }
            }
        }

        self.host.set_last_exit_code(code);
        if code != 0 && self.preferences.native_error_action {
            let record = ErrorRecord::non_zero_exit(&self.invocation.command_path, code, pid);
            self.emit(ProcessOutputRecord::error(record))?;
            self.host.set_execution_failed();
        }
        self.state = CommandState::Completed;
        Ok(ExitOutcome::Exited { code })
    }

    fn ensure_running(&self) -> Result<(), ExecError> {
        if self.stop.is_stopped() {
            return Err(ExecError::Stopped);
        }
        Ok(())
    }

    fn emit(&self, record: ProcessOutputRecord) -> Result<(), ExecError> {
        self.host.emit(record).map_err(|e| {
            if e == HostError::Stopped {
                self.stop.stop();
            }
            ExecError::from(e)
        })
    }

    /// Release everything exactly once.
    fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        if let Some(writer) = &mut self.writer {
            writer.dispose();
        }
        if let Some(multiplexer) = &self.multiplexer {
            multiplexer.stop();
        }
        if let Some(mut handle) = self.handle.take() {
            if handle.notified_begin {
                self.host.notify_end_application();
            }
            if self.platform.kill_before_dispose() && !handle.background {
                if let Ok(None) = handle.try_wait() {
                    if let Err(e) = handle.start_kill() {
                        tracing::debug!(error = %e, "kill during cleanup failed");
                    }
                }
            }
            self.stop.forget_process();
        }
        if let Some(started) = self.started {
            self.span.record("duration_ms", started.elapsed().as_millis() as u64);
        }
    }
}

impl Drop for NativeCommand {
    fn drop(&mut self) {
        self.cleanup();
    }
}

async fn cancelled(token: &Option<CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.code().or_else(|| status.signal().map(|s| 128 + s)).unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
