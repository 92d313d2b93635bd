use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::env;
use std::process::Command;

use crate::utils::{find_project_root, get_workspace_crates, run_cargo_command};

const WASM_TARGET: &str = "wasm32-unknown-unknown";

/// Which targets each crate is built for. `None` is the host target.
const CRATE_TARGETS: &[(&str, &[Option<&str>])] = &[
    ("xtask", &[None]),
    // the library ships as wasm; its native host binary and tests run natively
    ("lilypad-wrapper", &[None, Some(WASM_TARGET)]),
];

/// Run check, format, clippy, unit and doc tests
pub fn run_check(skip_fmt: bool) -> Result<()> {
    println!("🔧 Running comprehensive checks...");

    let project_root = find_project_root()?;
    env::set_current_dir(&project_root).context("Failed to change to project root directory")?;

    let crates = get_workspace_crates(&project_root)?;
    verify_crate_coverage(crates.iter().map(|(name, _)| name.as_str()))?;

    for (crate_name, manifest_path) in &crates {
        for target in targets_for(crate_name) {
            run_cargo_command("check", crate_name, manifest_path, *target, "Checking")?;
            run_clippy_on_crate(crate_name, manifest_path, *target)?;
        }
    }

    if skip_fmt {
        println!("📝 Skipping code formatting check (--skip-fmt)");
    } else {
        println!("📝 Checking code formatting...");
        run_quiet(&["fmt", "--all", "--", "--check"], "Code formatting check")?;
    }

    println!("🧪 Running tests...");
    run_quiet(&["test", "--quiet", "--workspace"], "Tests")?;

    println!("📚 Running doc tests...");
    run_quiet(&["test", "--quiet", "--workspace", "--doc"], "Doc tests")?;

    println!("✅ All checks passed successfully!");
    Ok(())
}

fn targets_for(crate_name: &str) -> &'static [Option<&'static str>] {
    CRATE_TARGETS
        .iter()
        .find(|(name, _)| *name == crate_name)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

fn run_quiet(args: &[&str], what: &str) -> Result<()> {
    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run cargo {}", args[0]))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{what} failed: {stderr}");
    }
    Ok(())
}

fn run_clippy_on_crate(crate_name: &str, manifest_path: &str, target: Option<&str>) -> Result<()> {
    let target_desc = if target.is_some() { " (WASM)" } else { "" };
    println!("  Running clippy on {crate_name}{target_desc} ...");

    let mut args = vec![
        "clippy",
        "--quiet",
        "--manifest-path",
        manifest_path,
        "--all-targets",
    ];
    if let Some(target) = target {
        args.extend_from_slice(&["--target", target]);
    }
    args.extend_from_slice(&["--", "-D", "warnings", "-W", "clippy::all"]);

    run_quiet(&args, &format!("Clippy on {crate_name}{target_desc}"))
}

/// Every workspace crate must have an entry in CRATE_TARGETS and vice versa
fn verify_crate_coverage<'a>(crates: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut expected: BTreeSet<&str> = CRATE_TARGETS.iter().map(|(name, _)| *name).collect();
    let mut uncategorized = Vec::new();

    for crate_name in crates {
        if !expected.remove(crate_name) {
            uncategorized.push(crate_name.to_string());
        }
    }

    if !expected.is_empty() {
        anyhow::bail!(
            "Expected crates not found in workspace: {}",
            expected.into_iter().collect::<Vec<_>>().join(", ")
        );
    }

    if !uncategorized.is_empty() {
        println!(
            "⚠️  Warning: Found uncategorized crates (not processed): {}",
            uncategorized.join(", ")
        );
        println!("   Consider adding them to CRATE_TARGETS in check.rs");
    }

    Ok(())
}
