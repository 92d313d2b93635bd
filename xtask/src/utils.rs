use anyhow::{Context, Result};
use cargo_metadata::MetadataCommand;
use parking_lot::Mutex;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

const MONITOR_INTERVAL: Duration = Duration::from_millis(100);

/// Shutdown signal types
#[derive(Debug)]
pub enum ShutdownSignal {
    CtrlC,
    ProcessExit { name: String, status: ExitStatus },
}

/// A wrapper around Child that kills the process when dropped
/// and can monitor the process in a separate thread
pub struct ManagedProcess {
    name: String,
    child: Arc<Mutex<Child>>,
}

impl ManagedProcess {
    pub fn new(name: String, child: Child) -> Self {
        Self {
            name,
            child: Arc::new(Mutex::new(child)),
        }
    }

    /// Spawn a monitoring thread that sends a shutdown signal when the process exits.
    /// The child stays owned by `self`, so dropping it still kills the process.
    pub fn spawn_monitor(&self, tx: mpsc::Sender<ShutdownSignal>) {
        let name = self.name.clone();
        let child = Arc::clone(&self.child);
        thread::spawn(move || loop {
            // poll so the lock is never held while the process runs
            let polled = child.lock().try_wait();
            match polled {
                Ok(Some(status)) => {
                    let _ = tx.send(ShutdownSignal::ProcessExit { name, status });
                    return;
                }
                Ok(None) => thread::sleep(MONITOR_INTERVAL),
                Err(e) => {
                    eprintln!("Error waiting for {name}: {e}");
                    return;
                }
            }
        });
    }

    fn kill(&self) -> io::Result<()> {
        let mut child = self.child.lock();
        match child.try_wait()? {
            Some(_) => Ok(()),
            None => child.kill(),
        }
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        if let Err(e) = self.kill() {
            eprintln!("Warning: Failed to kill {}: {e}", self.name);
        }
    }
}

/// Find the project root by looking for the workspace Cargo.toml next to xtask/
pub fn find_project_root() -> Result<PathBuf> {
    let current = env::current_dir().context("Failed to get current directory")?;

    // Look for Cargo.toml in current dir or parent dirs
    let mut path = current.as_path();
    loop {
        if path.join("Cargo.toml").exists() && path.join("xtask").is_dir() {
            return Ok(path.to_path_buf());
        }

        match path.parent() {
            Some(parent) => path = parent,
            None => {
                anyhow::bail!("Could not find project root (looking for Cargo.toml and xtask/)")
            }
        }
    }
}

/// All workspace members as (name, manifest path)
pub fn get_workspace_crates(project_root: &Path) -> Result<Vec<(String, String)>> {
    let metadata = MetadataCommand::new()
        .manifest_path(project_root.join("Cargo.toml"))
        .no_deps()
        .exec()
        .context("Failed to read cargo metadata")?;

    Ok(metadata
        .workspace_packages()
        .into_iter()
        .map(|package| (package.name.to_string(), package.manifest_path.to_string()))
        .collect())
}

/// Run `cargo <subcommand>` on one crate, optionally for a specific target
pub fn run_cargo_command(
    subcommand: &str,
    crate_name: &str,
    manifest_path: &str,
    target: Option<&str>,
    verb: &str,
) -> Result<()> {
    let target_desc = if target.is_some() { " (WASM)" } else { "" };
    println!("  {verb} {crate_name}{target_desc} ...");

    let mut args = vec![subcommand, "--quiet", "--manifest-path", manifest_path];
    if let Some(target) = target {
        args.extend_from_slice(&["--target", target]);
    }

    let output = Command::new("cargo")
        .args(&args)
        .output()
        .with_context(|| format!("Failed to run cargo {subcommand} on {crate_name}{target_desc}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("cargo {subcommand} failed on {crate_name}{target_desc}: {stderr}");
    }

    Ok(())
}

/// Run a tool with inherited stdio and fail if it does not exit cleanly
pub fn run_inherited(command: &mut Command, what: &str) -> Result<ExitStatus> {
    let status = command
        .status()
        .with_context(|| format!("Failed to run {what}"))?;

    if !status.success() {
        anyhow::bail!("{what} failed: {status}");
    }

    Ok(status)
}

/// Bail with an install hint if `tool` is not on PATH
pub fn require_tool(tool: &str, install_hint: &str) -> Result<()> {
    if which::which(tool).is_err() {
        anyhow::bail!("{tool} command not found - please install it with: {install_hint}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_drop_kills_running_process() {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();
        let process = ManagedProcess::new("sleeper".to_string(), child);
        let (tx, rx) = mpsc::channel();
        process.spawn_monitor(tx);

        drop(process);

        // the monitor sees the killed process exit
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(ShutdownSignal::ProcessExit { name, status }) => {
                assert_eq!(name, "sleeper");
                assert!(!status.success(), "pid {pid} should have been killed");
            }
            other => panic!("Expected the process to exit, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_monitor_reports_clean_exit() {
        let child = Command::new("true").spawn().unwrap();
        let process = ManagedProcess::new("true".to_string(), child);
        let (tx, rx) = mpsc::channel();
        process.spawn_monitor(tx);

        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(ShutdownSignal::ProcessExit { status, .. }) => assert!(status.success()),
            other => panic!("Expected a clean exit, got {other:?}"),
        }
    }
}
