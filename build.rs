// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=HONEY_SNAP_VERSION");

    // Packagers building from a tarball set the version explicitly
    let version = match std::env::var("HONEY_SNAP_VERSION") {
        Ok(v) => v,
        Err(_) => git_version().unwrap_or_else(|| env_version()),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

fn env_version() -> String {
    std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string())
}

/// `git describe` output reshaped to "0.1.0-abcdef1" or "0.1.0-dirty-abcdef1"
fn git_version() -> Option<String> {
    let described = run_git(&["describe", "--tags", "--always", "--match", "v*"])?;
    let described = described.strip_prefix('v').unwrap_or(&described).to_string();

    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    if parts.len() == 3 {
        // <tag>-<commits>-g<hash>
        let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
        return Some(format!("{}-dirty-{}", parts[2], hash));
    }

    if !described.contains('.') {
        // No tags at all: describe fell back to the bare hash
        return Some(format!("{}-{}", env_version(), described));
    }

    let hash = run_git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    Some(format!("{}-{}", described, hash))
}

fn run_git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
