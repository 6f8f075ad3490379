use std::process::Command;

/// Version reported by `dots --version`: an explicit `DOTS_VERSION`, then the
/// nearest `v*` tag, then the crate version.
fn version() -> String {
    if let Ok(version) = std::env::var("DOTS_VERSION")
        && !version.is_empty()
    {
        return version;
    }
    git(&["describe", "--tags", "--match", "v*", "--dirty"])
        .map(|tag| tag.trim_start_matches('v').to_string())
        .or_else(|| {
            let commit = git(&["rev-parse", "--short", "HEAD"])?;
            Some(format!("{}+{commit}", env!("CARGO_PKG_VERSION")))
        })
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn main() {
    println!("cargo:rustc-env=DOTS_VERSION={}", version());
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
    println!("cargo:rerun-if-env-changed=DOTS_VERSION");
}
