use anyhow::{Context, Result};
use clap::ValueEnum;
use std::env;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;

use crate::utils::{
    ManagedProcess, ShutdownSignal, find_project_root, require_tool, run_inherited,
};

const WASM_TARGET: &str = "wasm32-unknown-unknown";
const WASM_CRATE: &str = "lilypad-wrapper";
const WASM_ARTIFACT: &str = "lilypad_wrapper.wasm";
const OUT_DIR: &str = "pkg";
const SMOKE_SCRIPT: &str = "demos/smoke.mjs";

/// JS glue flavours understood by the wasm-bindgen CLI
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BindgenTarget {
    Web,
    Nodejs,
    Bundler,
}

impl BindgenTarget {
    fn as_arg(self) -> &'static str {
        match self {
            BindgenTarget::Web => "web",
            BindgenTarget::Nodejs => "nodejs",
            BindgenTarget::Bundler => "bundler",
        }
    }
}

/// Compile the module for wasm32 and generate JS bindings into pkg/
pub fn build(release: bool, target: BindgenTarget) -> Result<()> {
    let project_root = find_project_root()?;
    env::set_current_dir(&project_root).context("Failed to change to project root directory")?;

    require_tool("wasm-bindgen", "cargo install wasm-bindgen-cli")?;

    let profile = if release { "release" } else { "debug" };
    println!("🔨 Building {WASM_CRATE} for {WASM_TARGET} ({profile})...");

    let mut cmd = Command::new("cargo");
    cmd.args(["build", "--lib", "-p", WASM_CRATE, "--target", WASM_TARGET]);
    if release {
        cmd.arg("--release");
    }
    cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    run_inherited(&mut cmd, "cargo build for wasm")?;

    let artifact = Path::new("target")
        .join(WASM_TARGET)
        .join(profile)
        .join(WASM_ARTIFACT);
    if !artifact.exists() {
        anyhow::bail!("Expected wasm artifact not found: {}", artifact.display());
    }

    println!("🧩 Generating {} bindings in {OUT_DIR}/...", target.as_arg());
    let mut cmd = Command::new("wasm-bindgen");
    cmd.arg(&artifact)
        .args(["--out-dir", OUT_DIR, "--target", target.as_arg()])
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    run_inherited(&mut cmd, "wasm-bindgen")?;

    println!("✅ Module ready in {OUT_DIR}/");
    Ok(())
}

/// Scenarios in the smoke script. Each needs a fresh process because the
/// module's start routine only runs once, when it is first loaded.
const SMOKE_SCENARIOS: &[&str] = &["default", "structured", "reserved", "invalid-config"];

/// Build for Node and run every smoke scenario against the real module
pub fn smoke() -> Result<()> {
    build(false, BindgenTarget::Nodejs)?;

    require_tool("node", "https://nodejs.org")?;

    let (tx, rx) = mpsc::channel::<ShutdownSignal>();

    let ctrl_c_tx = tx.clone();
    ctrlc::set_handler(move || {
        println!("\n🛑 Received Ctrl+C, stopping smoke test...");
        let _ = ctrl_c_tx.send(ShutdownSignal::CtrlC);
    })
    .context("Error setting Ctrl-C handler")?;

    for scenario in SMOKE_SCENARIOS {
        run_scenario(scenario, &tx, &rx)?;
    }

    println!("✅ Smoke test passed ({} scenarios)", SMOKE_SCENARIOS.len());
    Ok(())
}

fn run_scenario(
    scenario: &str,
    tx: &mpsc::Sender<ShutdownSignal>,
    rx: &mpsc::Receiver<ShutdownSignal>,
) -> Result<()> {
    println!("🧪 Running {SMOKE_SCRIPT} {scenario}...");
    let child = Command::new("node")
        .args([SMOKE_SCRIPT, scenario])
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .context("Failed to start node")?;

    // killed on drop, including when we bail on Ctrl+C
    let process = ManagedProcess::new(format!("smoke scenario `{scenario}`"), child);
    process.spawn_monitor(tx.clone());

    match rx.recv() {
        Ok(ShutdownSignal::CtrlC) => anyhow::bail!("Smoke test interrupted"),
        Ok(ShutdownSignal::ProcessExit { name, status }) => {
            if !status.success() {
                anyhow::bail!("{name} failed: {status}");
            }
        }
        Err(_) => anyhow::bail!("Smoke test monitor exited unexpectedly"),
    }

    Ok(())
}
