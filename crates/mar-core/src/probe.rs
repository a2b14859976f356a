use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::process::Command;
use tracing::debug;

/// Reports whether an executable is reachable on the host's search path.
///
/// Implementations never fail: anything that prevents a positive answer is
/// reported as `false`.
#[async_trait]
pub trait ShellProbe: Send + Sync {
    async fn is_available(&self, command: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Unix,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::Unix
        }
    }

    pub fn lookup_program(self) -> &'static str {
        match self {
            OsFamily::Windows => "where",
            OsFamily::Unix => "which",
        }
    }
}

/// Probe backed by `which`/`where`, one child process per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

#[async_trait]
impl ShellProbe for SystemProbe {
    async fn is_available(&self, command: &str) -> bool {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return false;
        }

        let program = OsFamily::current().lookup_program();
        let status = Command::new(program)
            .arg(trimmed)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) => {
                debug!(command = trimmed, program, success = status.success(), "shell probe");
                status.success()
            }
            Err(err) => {
                debug!(command = trimmed, program, error = %err, "shell probe failed to spawn");
                false
            }
        }
    }
}

/// Probe with a fixed answer. Counts how often it was asked.
#[derive(Debug, Default)]
pub struct StaticProbe {
    available: bool,
    calls: AtomicUsize,
}

impl StaticProbe {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShellProbe for StaticProbe {
    async fn is_available(&self, _command: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.available
    }
}
