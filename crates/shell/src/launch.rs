// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starting the OS process for an invocation.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use nx_core::{ArgumentList, ArgumentPassing, Invocation, Platform};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::console::ConsolePlan;
use crate::error::ExecError;
use crate::platform::PlatformCapabilities;
use crate::redirect::Redirection;

/// Programs that parse their own command line and get it unsplit.
const LEGACY_PROGRAMS: [&str; 4] = ["cmd", "cscript", "wscript", "find"];
const LEGACY_EXTENSIONS: [&str; 5] = ["js", "wsf", "cmd", "bat", "vbs"];

/// `ERROR_BAD_EXE_FORMAT`: the file is not a valid executable image.
const ERROR_BAD_EXE_FORMAT: i32 = 193;

/// Everything needed to start one process.
pub struct LaunchRequest<'a> {
    pub invocation: &'a Invocation,
    pub redirection: Redirection,
    pub arguments: ArgumentList,
    pub platform: &'a dyn PlatformCapabilities,
    pub console: ConsolePlan,
}

/// A started child process plus the decisions it was started with.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
    pub command_path: String,
    pub arguments: ArgumentList,
    pub redirection: Redirection,
    pub background: bool,
    pub standalone: bool,
    /// The host was told a program took over its console.
    pub notified_begin: bool,
}

impl ProcessHandle {
    fn new(child: Child, command_path: &str, arguments: ArgumentList, redirection: Redirection) -> Self {
        Self {
            pid: child.id(),
            child,
            command_path: command_path.to_string(),
            arguments,
            redirection,
            background: redirection.background,
            standalone: redirection.standalone,
            notified_begin: false,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    pub fn start_kill(&mut self) -> std::io::Result<()> {
        self.child.start_kill()
    }
}

/// Start the process described by `req`.
///
/// A file that cannot be executed directly is opened through the shell,
/// but only when the invocation is not part of a pipeline. On a desktop
/// platform a file rejected as "not a valid executable" is retried once
/// through its file association, then opened through the shell if solo.
pub fn launch(req: &LaunchRequest<'_>) -> Result<ProcessHandle, ExecError> {
    let inv = req.invocation;
    let solo = inv.position.is_solo();

    if !req.platform.is_executable(Path::new(&inv.command_path)) {
        if !solo {
            return Err(ExecError::ActivationDenied { command: inv.command_path.clone() });
        }
        tracing::debug!(cmd = %inv.command_path, "not executable, activating through the shell");
        return shell_execute(req).map_err(|e| launch_failed(inv, e));
    }

    let mut command = build_command(&inv.command_path, &req.arguments, req);
    let err = match command.spawn() {
        Ok(child) => {
            return Ok(ProcessHandle::new(child, &inv.command_path, req.arguments.clone(), req.redirection));
        }
        Err(e) => e,
    };

    if !(req.platform.is_desktop() && err.raw_os_error() == Some(ERROR_BAD_EXE_FORMAT)) {
        return Err(launch_failed(inv, err));
    }

    tracing::debug!(cmd = %inv.command_path, "not a valid executable, trying its file association");
    if let Some(program) = resolve_association(Path::new(&inv.command_path)) {
        let arguments = prepend_argument(&inv.command_path, &req.arguments);
        match build_command(&program, &arguments, req).spawn() {
            Ok(child) => return Ok(ProcessHandle::new(child, &program, arguments, req.redirection)),
            Err(e) => tracing::debug!(program = %program, error = %e, "association start failed"),
        }
    }
    if solo {
        tracing::debug!(cmd = %inv.command_path, "activating through the shell");
        return shell_execute(req).map_err(|e| launch_failed(inv, e));
    }
    Err(launch_failed(inv, err))
}

fn build_command(program: &str, arguments: &ArgumentList, req: &LaunchRequest<'_>) -> Command {
    let mut command = Command::new(program);
    match arguments {
        ArgumentList::Discrete(args) => {
            command.args(args);
        }
        ArgumentList::Legacy(line) => apply_legacy(&mut command, line),
    }
    if let Some(dir) = working_directory(&req.invocation.location) {
        command.current_dir(dir);
    }
    let r = req.redirection;
    command.stdin(stdio(r.input)).stdout(stdio(r.output)).stderr(stdio(r.error));
    req.console.apply(&mut command);
    command
}

#[cfg(windows)]
fn apply_legacy(command: &mut Command, line: &str) {
    command.raw_arg(line);
}

#[cfg(not(windows))]
fn apply_legacy(command: &mut Command, line: &str) {
    match shell_words::split(line) {
        Ok(words) => {
            command.args(words);
        }
        Err(e) => {
            tracing::debug!(error = %e, "unbalanced quotes in argument string, splitting on whitespace");
            command.args(line.split_whitespace());
        }
    }
}

fn stdio(redirected: bool) -> Stdio {
    if redirected {
        Stdio::piped()
    } else {
        Stdio::inherit()
    }
}

/// Open the command path with its default handler, streams untouched.
fn shell_execute(req: &LaunchRequest<'_>) -> std::io::Result<ProcessHandle> {
    let inv = req.invocation;
    let (program, args) = req.platform.shell_execute(&inv.command_path);
    let mut command = Command::new(&program);
    command.args(&args).stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
    if let Some(dir) = working_directory(&inv.location) {
        command.current_dir(dir);
    }
    let child = command.spawn()?;
    let redirection = Redirection { standalone: true, ..Redirection::default() };
    Ok(ProcessHandle::new(child, &program, ArgumentList::Discrete(args), redirection))
}

fn launch_failed(inv: &Invocation, source: std::io::Error) -> ExecError {
    ExecError::LaunchFailed {
        command: inv.command_path.clone(),
        message: source.to_string(),
        position: inv.source_position.describe(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Whether `command_path` gets its arguments as one unsplit string.
pub fn uses_legacy_arguments(command_path: &str, passing: ArgumentPassing, platform: Platform) -> bool {
    match passing {
        ArgumentPassing::Standard => false,
        ArgumentPassing::Legacy => true,
        ArgumentPassing::Windows => platform.is_windows() && is_legacy_program(command_path),
    }
}

fn is_legacy_program(command_path: &str) -> bool {
    // Both separators, whatever the host OS.
    let name = command_path.rsplit(['/', '\\']).next().unwrap_or(command_path).to_ascii_lowercase();
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_string()),
        _ => (name.clone(), String::new()),
    };
    // `cmd.exe` and bare `cmd` both count; `foo.cmd` counts by extension.
    (LEGACY_PROGRAMS.contains(&stem.as_str()) && (ext.is_empty() || ext == "exe"))
        || LEGACY_EXTENSIONS.contains(&ext.as_str())
}

/// The argument form handed to the OS.
pub fn build_arguments(inv: &Invocation, legacy: bool) -> ArgumentList {
    if !legacy {
        return ArgumentList::Discrete(inv.arguments.clone());
    }
    let line = inv.raw_arguments.clone().unwrap_or_else(|| {
        inv.arguments.iter().map(|a| quote_argument(a)).collect::<Vec<_>>().join(" ")
    });
    ArgumentList::Legacy(line)
}

/// Quote one argument for a command line, backslash rules included.
pub fn quote_argument(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '"']) {
        return arg.to_string();
    }
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                out.push_str(&"\\".repeat(backslashes * 2 + 1));
                out.push('"');
                backslashes = 0;
            }
            c => {
                out.push_str(&"\\".repeat(backslashes));
                out.push(c);
                backslashes = 0;
            }
        }
    }
    out.push_str(&"\\".repeat(backslashes * 2));
    out.push('"');
    out
}

fn prepend_argument(first: &str, arguments: &ArgumentList) -> ArgumentList {
    match arguments {
        ArgumentList::Discrete(args) => {
            ArgumentList::Discrete(std::iter::once(first.to_string()).chain(args.iter().cloned()).collect())
        }
        ArgumentList::Legacy(line) if line.is_empty() => ArgumentList::Legacy(quote_argument(first)),
        ArgumentList::Legacy(line) => ArgumentList::Legacy(format!("{} {line}", quote_argument(first))),
    }
}

// ---------------------------------------------------------------------------
// Working directory
// ---------------------------------------------------------------------------

/// The host location as a working directory, if it exists on disk.
pub fn working_directory(location: &str) -> Option<PathBuf> {
    if location.is_empty() {
        return None;
    }
    let path = PathBuf::from(unescape_wildcards(location));
    path.is_dir().then_some(path)
}

/// Remove the backtick escaping of wildcard characters.
pub fn unescape_wildcards(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '`' {
            if let Some(&next) = chars.peek() {
                if matches!(next, '*' | '?' | '[' | ']' | '`') {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// File associations
// ---------------------------------------------------------------------------

/// Program registered to open files like `path`, via `assoc` and `ftype`.
fn resolve_association(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_string_lossy();
    let file_type = parse_assignment(&run_shell_builtin(&format!("assoc .{ext}"))?)?;
    let command = parse_assignment(&run_shell_builtin(&format!("ftype {file_type}"))?)?;
    parse_program(&expand_env_vars(&command))
}

fn run_shell_builtin(line: &str) -> Option<String> {
    let output = std::process::Command::new(crate::env::comspec()).args(["/c", line]).output().ok()?;
    output.status.success().then(|| String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Right-hand side of `name=value` output.
pub fn parse_assignment(output: &str) -> Option<String> {
    let (_, value) = output.lines().next()?.split_once('=')?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Program part of an open command such as `"C:\App\app.exe" "%1"`.
pub fn parse_program(command: &str) -> Option<String> {
    let command = command.trim();
    let program = match command.strip_prefix('"') {
        Some(rest) => rest.split('"').next()?,
        None => command.split_whitespace().next()?,
    };
    (!program.is_empty()).then(|| program.to_string())
}

/// Expand `%NAME%` references from the environment; unknown names stay.
pub fn expand_env_vars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => out.push_str(&rest[start..start + end + 2]),
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
