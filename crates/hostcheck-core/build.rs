//! Embeds the source revision as `GIT_SHA`.
//!
//! `HOSTCHECK_GIT_SHA` pins the value for builds outside a git checkout
//! (release tarballs, container builds without `.git`).

use std::env;
use std::process::Command;

const PIN_VAR: &str = "HOSTCHECK_GIT_SHA";

fn describe() -> Option<String> {
    let out = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let rev = String::from_utf8(out.stdout).ok()?;
    let rev = rev.trim();
    (!rev.is_empty()).then(|| rev.to_owned())
}

fn main() {
    println!("cargo:rerun-if-env-changed={PIN_VAR}");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");

    let rev = env::var(PIN_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(describe)
        .unwrap_or_else(|| "unknown".to_owned());
    println!("cargo:rustc-env=GIT_SHA={rev}");
}
