//! Shared helpers for the native execution specs.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

pub use nx_core::test_support::{HostCall, RecordingHost};
pub use nx_core::{
    ExecutionContext, Host, Invocation, Payload, PipelinePosition, Platform, Preferences,
    PsObject, StreamFormat, StreamKind, Value,
};
pub use nx_shell::{ExecError, ExitOutcome, NativeCommand};
pub use tempfile::TempDir;

/// The structured-protocol preamble line.
pub const SENTINEL: &str = nx_wire::CLIXML_SENTINEL;

/// A temporary directory holding executable scripts.
pub struct Scripts {
    dir: TempDir,
}

impl Scripts {
    pub fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write an executable `sh` script and return its path.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

/// Invocation of a script whose output the host captures.
pub fn captured(path: &Path) -> Invocation {
    Invocation::new(path.to_string_lossy()).position(PipelinePosition::captured())
}

pub fn posix() -> ExecutionContext {
    ExecutionContext { platform: Platform::Posix, ..ExecutionContext::default() }
}

/// Route engine logs to the test writer; filter with `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn native(invocation: Invocation, host: &Arc<RecordingHost>) -> NativeCommand {
    init_tracing();
    NativeCommand::new(invocation, Arc::clone(host) as Arc<dyn Host>, posix(), Preferences::default())
}

/// Run `invocation` to completion with no upstream input.
pub async fn run(
    invocation: Invocation,
    host: &Arc<RecordingHost>,
) -> Result<ExitOutcome, ExecError> {
    native(invocation, host).run(Vec::<Value>::new()).await
}

/// One protocol line carrying a string on the given sub-stream.
pub fn tagged(tag: &str, text: &str) -> String {
    format!(
        r#"{}<S S="{tag}">{text}</S>{}"#,
        nx_wire::OBJS_OPEN,
        nx_wire::OBJS_CLOSE
    )
}
