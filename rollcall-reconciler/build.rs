//! Embeds `ROLLCALL_BUILD_ID` ("<commit> <profile> <utc time>") for the
//! startup log and the health endpoint.

use std::process::Command;

fn main() {
    let commit = git(&["describe", "--always", "--dirty", "--abbrev=10"])
        .unwrap_or_else(|| "nogit".to_string());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let built_at = chrono::Utc::now().format("%Y-%m-%dT%H:%MZ");

    println!(
        "cargo:rustc-env=ROLLCALL_BUILD_ID={} {} {}",
        commit, profile, built_at
    );
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
