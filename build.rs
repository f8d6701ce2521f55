use std::process::Command;

/// Short commit hash of the checkout, if built from one.
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn main() {
    // Builds outside a checkout (e.g. container images) pass the hash in.
    let build_hash = std::env::var("TUNE_BUILD_HASH")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(git_short_hash)
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", build_hash);

    println!("cargo:rerun-if-env-changed=TUNE_BUILD_HASH");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");
}
