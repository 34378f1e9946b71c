//! Build automation for okteto-destroy
//!
//! Usage: cargo xtask <command>
//!
//! Available commands:
//! - build: Build the okteto binary
//! - test: Run unit and integration tests
//! - dist: Package the binary the way cargo-binstall expects it
//! - install: Install to system
//! - ci: Run CI checks

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use xshell::{cmd, Shell};

const BIN_NAME: &str = "okteto";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for okteto-destroy")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the okteto binary
    Build {
        #[arg(long)]
        release: bool,
    },
    /// Run tests
    Test {
        /// Run only the destroy scenarios under tests/
        #[arg(long)]
        integration: bool,
    },
    /// Create okteto-<target>.tar.gz under dist/
    Dist {
        /// Target triple (e.g., x86_64-unknown-linux-gnu)
        #[arg(long)]
        target: Option<String>,
    },
    /// Install to system
    Install {
        #[arg(long, default_value = "/usr/local")]
        prefix: String,
    },
    /// Run CI checks (format, clippy, test)
    Ci,
    /// Format code
    Format {
        #[arg(long)]
        check: bool,
    },
    Clippy,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    sh.change_dir(project_root()?);

    match cli.command {
        Commands::Build { release } => build(&sh, release),
        Commands::Test { integration } => test(&sh, integration),
        Commands::Dist { target } => dist(&sh, target),
        Commands::Install { prefix } => install(&sh, &prefix),
        Commands::Ci => ci(&sh),
        Commands::Format { check } => format(&sh, check),
        Commands::Clippy => clippy(&sh),
    }
}

fn build(sh: &Shell, release: bool) -> Result<()> {
    println!("🔨 Building {}...", BIN_NAME);

    if release {
        cmd!(sh, "cargo build --release --bin {BIN_NAME}").run()?;
        println!("✅ Release build completed: target/release/{}", BIN_NAME);
    } else {
        cmd!(sh, "cargo build --bin {BIN_NAME}").run()?;
        println!("✅ Debug build completed: target/debug/{}", BIN_NAME);
    }

    Ok(())
}

fn test(sh: &Shell, integration: bool) -> Result<()> {
    println!("🧪 Running tests...");

    if integration {
        cmd!(sh, "cargo test -p okteto-destroy --tests").run()?;
    } else {
        cmd!(sh, "cargo test --workspace").run()?;
    }

    println!("✅ All tests passed");
    Ok(())
}

fn host_target(sh: &Shell) -> Result<String> {
    let info = cmd!(sh, "rustc -vV").read()?;
    info.lines()
        .find_map(|line| line.strip_prefix("host: "))
        .map(str::to_string)
        .context("could not read the host target from rustc")
}

fn dist(sh: &Shell, target: Option<String>) -> Result<()> {
    println!("📦 Creating distribution package...");

    let (target_triple, binary_src) = match target {
        Some(triple) => {
            cmd!(sh, "cargo build --release --bin {BIN_NAME} --target {triple}").run()?;
            let src = project_root()?.join(format!("target/{}/release/{}", triple, BIN_NAME));
            (triple, src)
        }
        None => {
            cmd!(sh, "cargo build --release --bin {BIN_NAME}").run()?;
            let src = project_root()?.join(format!("target/release/{}", BIN_NAME));
            (host_target(sh)?, src)
        }
    };

    let dist_dir = project_root()?.join("dist");
    sh.create_dir(&dist_dir)?;
    sh.copy_file(&binary_src, dist_dir.join(BIN_NAME))?;

    // matches [package.metadata.binstall] pkg-url
    let archive_name = format!("{}-{}.tar.gz", BIN_NAME, target_triple);
    cmd!(sh, "tar -czf dist/{archive_name} -C dist {BIN_NAME}")
        .run()
        .context("Failed to create tarball")?;

    println!("✅ Distribution package created: dist/{}", archive_name);
    Ok(())
}

fn install(sh: &Shell, prefix: &str) -> Result<()> {
    println!("📥 Installing {} to {}...", BIN_NAME, prefix);

    let binary = project_root()?.join(format!("target/release/{}", BIN_NAME));
    if !binary.exists() {
        println!("Building release binary first...");
        cmd!(sh, "cargo build --release --bin {BIN_NAME}").run()?;
    }

    let bin_dir = Path::new(prefix).join("bin");
    sh.create_dir(&bin_dir)?;

    let install_path = bin_dir.join(BIN_NAME);
    sh.copy_file(&binary, &install_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&install_path, std::fs::Permissions::from_mode(0o755))?;
    }

    println!("✅ Installed to: {}", install_path.display());
    Ok(())
}

fn ci(sh: &Shell) -> Result<()> {
    println!("🔍 Running CI checks...");

    println!("\n📝 Checking formatting...");
    format(sh, true)?;

    println!("\n🔧 Running clippy...");
    clippy(sh)?;

    println!("\n🧪 Running tests...");
    test(sh, false)?;

    println!("\n✅ All CI checks passed!");
    Ok(())
}

fn format(sh: &Shell, check: bool) -> Result<()> {
    if check {
        cmd!(sh, "cargo fmt --all -- --check").run()?;
        println!("✅ Code formatting is correct");
    } else {
        cmd!(sh, "cargo fmt --all").run()?;
        println!("✅ Code formatted");
    }
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
    println!("✅ Clippy checks passed");
    Ok(())
}

fn project_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask must live inside the workspace")
}
