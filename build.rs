use std::fs;
use std::path::Path;
use std::process::Command;

/// Bump the persisted build counter and return the new value
fn next_build_number(counter: &Path) -> u64 {
    let previous = fs::read_to_string(counter)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let next = previous + 1;
    fs::write(counter, next.to_string()).expect("Failed to write build number");
    next
}

fn short_git_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let build = next_build_number(Path::new("BUILD_NUMBER"));

    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

    let profile = match std::env::var("PROFILE").as_deref() {
        Ok("release") => "release",
        _ => "development",
    };

    println!("cargo:rustc-env=CIPHERBENCH_VERSION={}", version);
    println!("cargo:rustc-env=CIPHERBENCH_BUILD={}", build);
    println!("cargo:rustc-env=CIPHERBENCH_PROFILE={}", profile);
    println!("cargo:rustc-env=CIPHERBENCH_GIT_HASH={}", short_git_hash());

    println!("cargo:rerun-if-changed=BUILD_NUMBER");
    println!("cargo:rerun-if-env-changed=PROFILE");
}
