// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forced termination of a child process or its whole process tree.

use std::collections::HashMap;

use sysinfo::{Pid, System};

/// Kills processes on behalf of a stop request. Failures are swallowed.
pub trait ProcessTerminator: Send + Sync {
    /// Kill `root` and every descendant, children before parents.
    fn kill_tree(&self, root: u32);

    /// Kill the single process `pid`.
    fn kill(&self, pid: u32);
}

/// Terminator backed by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTerminator;

impl ProcessTerminator for SystemTerminator {
    fn kill_tree(&self, root: u32) {
        let mut system = System::new();
        system.refresh_processes();
        let edges = system
            .processes()
            .iter()
            .filter_map(|(pid, process)| process.parent().map(|parent| (pid.as_u32(), parent.as_u32())));
        for pid in kill_order(root, edges) {
            match system.process(Pid::from_u32(pid)) {
                Some(process) => {
                    if !process.kill() {
                        tracing::warn!(pid, "failed to kill process");
                    }
                }
                None => tracing::debug!(pid, "process already gone"),
            }
        }
    }

    fn kill(&self, pid: u32) {
        if kill_direct(pid) {
            return;
        }
        // The pid may have been reported before the process was fully set
        // up; one fresh lookup before giving up.
        let mut system = System::new();
        system.refresh_processes();
        match system.process(Pid::from_u32(pid)) {
            Some(process) => {
                if !process.kill() {
                    tracing::warn!(pid, "failed to kill process");
                }
            }
            None => tracing::debug!(pid, "process already gone"),
        }
    }
}

#[cfg(unix)]
fn kill_direct(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid as UnixPid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(UnixPid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(pid, error = %e, "SIGKILL failed");
            false
        }
    }
}

#[cfg(not(unix))]
fn kill_direct(_pid: u32) -> bool {
    false
}

/// Descendants of `root` in post-order (children before parents), ending
/// with `root` itself. `edges` are `(child, parent)` pairs.
pub fn kill_order(root: u32, edges: impl IntoIterator<Item = (u32, u32)>) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (child, parent) in edges {
        if child != parent {
            children.entry(parent).or_default().push(child);
        }
    }
    for list in children.values_mut() {
        list.sort_unstable();
    }

    let mut order = Vec::new();
    let mut seen = std::collections::HashSet::new();
    // Iterative post-order; `seen` guards against cycles from pid reuse.
    let mut stack = vec![(root, false)];
    while let Some((pid, expanded)) = stack.pop() {
        if expanded {
            order.push(pid);
            continue;
        }
        if !seen.insert(pid) {
            continue;
        }
        stack.push((pid, true));
        if let Some(kids) = children.get(&pid) {
            for &kid in kids.iter().rev() {
                stack.push((kid, false));
            }
        }
    }
    order
}

#[cfg(test)]
#[path = "terminate_tests.rs"]
mod tests;
