use std::path::{Path, PathBuf};
use std::process::Command;

use clap::{Parser, Subcommand};

/// portguard 빌드 태스크
#[derive(Parser)]
#[command(name = "xtask")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// XDP 커널 프로그램(portguard-ebpf) 빌드
    BuildEbpf {
        /// 릴리스 모드로 빌드
        #[arg(long)]
        release: bool,
    },
}

const EBPF_CRATE_DIR: &str = "crates/ebpf-engine/ebpf";
const EBPF_TARGET: &str = "bpfel-unknown-none";

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::BuildEbpf { release } => {
            if let Err(e) = build_ebpf(release) {
                eprintln!("eBPF build failed: {e}");
                std::process::exit(1);
            }
        }
    }
}

/// 워크스페이스 target 디렉토리에 빌드하여 `filter.object_path` 기본값과 경로를 맞춥니다.
fn build_ebpf(release: bool) -> Result<(), String> {
    let workspace_root = workspace_root();
    let target_dir = workspace_root.join("target");

    let mut cmd = Command::new("cargo");
    cmd.current_dir(workspace_root.join(EBPF_CRATE_DIR));
    cmd.args([
        "+nightly",
        "build",
        &format!("--target={EBPF_TARGET}"),
        "-Z",
        "build-std=core",
    ]);
    cmd.arg("--target-dir").arg(&target_dir);

    if release {
        cmd.arg("--release");
    }

    let status = cmd
        .status()
        .map_err(|e| format!("failed to run cargo: {e}"))?;
    if !status.success() {
        return Err(format!("cargo exited with {status}"));
    }

    let profile = if release { "release" } else { "debug" };
    let object = target_dir
        .join(EBPF_TARGET)
        .join(profile)
        .join("portguard-ebpf");
    println!("eBPF build succeeded: {}", object.display());
    Ok(())
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
