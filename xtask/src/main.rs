// WayStay - Build Task Runner
// cargo xtask pattern over the backend crate

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use xshell::{Shell, cmd};

const BINARY: &str = "waystay";

fn main() -> Result<()> {
    let sh = Shell::new()?;
    let args: Vec<_> = std::env::args().skip(1).collect();
    let flag = |name: &str| args.iter().any(|a| a == name);

    match args.first().map(String::as_str) {
        Some("build") => build(&sh, flag("--release")),
        Some("test") => test(&sh, args.get(1).map(String::as_str)),
        Some("format") => format(&sh, flag("--check")),
        Some("clippy") => clippy(&sh),
        Some("run") => run(&sh, &args[1..]),
        Some("clean") => clean(&sh),
        Some("ci") => ci(&sh),
        Some("dist") => dist(&sh),
        _ => {
            print_help();
            Ok(())
        },
    }
}

fn print_help() {
    println!("WayStay - Build Commands:");
    println!();
    println!("Usage: cargo xtask <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  build [--release]   Build the backend");
    println!("  test [FILTER]       Run tests, optionally filtered by name");
    println!("  format [--check]    Format code (check mode doesn't modify)");
    println!("  clippy              Run clippy checks");
    println!("  run [ARGS...]       Run the server (args go to the binary)");
    println!("  clean               Clean build artifacts");
    println!("  ci                  Format check, clippy, release build, tests");
    println!("  dist                Package binary and sample config (tar.gz)");
    println!();
    println!("Examples:");
    println!("  cargo xtask run -- --port 9090");
    println!("  cargo xtask test ai_api_test");
}

fn build(sh: &Shell, release: bool) -> Result<()> {
    println!("🦀 Building backend{}...", if release { " (release)" } else { "" });
    let _dir = sh.push_dir(project_root());

    if release {
        cmd!(sh, "cargo build --release -p waystay").run().context("Failed to build backend in release mode")?;
    } else {
        cmd!(sh, "cargo build -p waystay").run().context("Failed to build backend")?;
    }

    println!("✅ Backend build complete");
    Ok(())
}

fn test(sh: &Shell, filter: Option<&str>) -> Result<()> {
    println!("🧪 Running tests...");
    let _dir = sh.push_dir(project_root());

    let filter = filter.filter(|f| !f.starts_with('-'));
    cmd!(sh, "cargo test -p waystay {filter...}").run().context("Tests failed")?;

    println!("✅ All tests passed!");
    Ok(())
}

fn format(sh: &Shell, check: bool) -> Result<()> {
    let _dir = sh.push_dir(project_root());

    if check {
        cmd!(sh, "cargo fmt --all -- --check").run().context("Rust code is not formatted")?;
        println!("✅ Rust code is properly formatted");
    } else {
        cmd!(sh, "cargo fmt --all").run().context("Failed to format Rust code")?;
        println!("✅ Rust code formatted");
    }
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    let _dir = sh.push_dir(project_root());

    cmd!(sh, "cargo clippy --release --all-targets -- --deny warnings --allow clippy::uninlined-format-args")
        .run()
        .context("Clippy checks failed")?;
    Ok(())
}

fn run(sh: &Shell, args: &[String]) -> Result<()> {
    println!("🚀 Starting WayStay backend...");
    let _dir = sh.push_dir(project_root().join("backend"));

    let args = args.iter().skip_while(|a| a.as_str() == "--");
    cmd!(sh, "cargo run -p waystay --").args(args).run().context("Failed to run application")?;
    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("🧹 Cleaning build artifacts...");
    let project = project_root();
    let _dir = sh.push_dir(&project);

    cmd!(sh, "cargo clean").run()?;
    let build_dir = project.join("build");
    if build_dir.exists() {
        sh.remove_path(&build_dir)?;
    }

    println!("✅ Clean complete!");
    Ok(())
}

fn ci(sh: &Shell) -> Result<()> {
    println!("🔄 Running CI pipeline...");

    println!("📝 [1/4] Checking code format...");
    format(sh, true)?;

    println!("🔍 [2/4] Running clippy checks...");
    clippy(sh)?;

    println!("🔨 [3/4] Building release...");
    build(sh, true)?;

    println!("🧪 [4/4] Running tests...");
    test(sh, None)?;

    println!("🎉 CI pipeline completed successfully!");
    Ok(())
}

/// Lay out `build/dist/{bin,conf,logs}` and tar it.
fn dist(sh: &Shell) -> Result<()> {
    build(sh, true)?;

    let project = project_root();
    let dist_dir = project.join("build/dist");
    for sub in ["bin", "conf", "logs"] {
        sh.create_dir(dist_dir.join(sub))?;
    }

    let binary = project.join("target/release").join(BINARY);
    if !binary.exists() {
        bail!("Release binary not found at {}", binary.display());
    }
    sh.copy_file(&binary, dist_dir.join("bin"))?;
    sh.copy_file(project.join("backend/conf/config.toml"), dist_dir.join("conf"))?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let package_name = format!("{}-{}.tar.gz", BINARY, timestamp);
    println!("📋 Creating tarball: {}...", package_name);

    let _dir = sh.push_dir(&dist_dir);
    cmd!(sh, "tar czf {package_name} bin conf logs").run().context("Failed to create tarball")?;

    let package_path = dist_dir.join(&package_name);
    println!("✅ Distribution package created: {}", package_path.display());
    println!("   Size: {} KB", std::fs::metadata(&package_path)?.len() / 1024);
    Ok(())
}

fn project_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.parent().unwrap_or(manifest_dir).to_path_buf()
}
