//! # run 子命令 CLI 定义
//!
//! 端到端流水线：下载 -> 弛豫 -> 导出 -> 模拟。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/run.rs`
//! - 复用 `cli/relax.rs`, `cli/simulate.rs`, `cli/export.rs` 的参数组

use clap::Args;
use std::path::PathBuf;

use crate::cli::export::ReflectionMode;
use crate::cli::relax::PhysicsArgs;
use crate::cli::simulate::{BeamlineArgs, EngineArgs};

/// run 子命令参数
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Crystallography database numeric identifier (e.g., 9000775)
    #[arg(long)]
    pub cod_id: String,

    /// Pseudopotential mapping 'Element=file.UPF' (repeatable);
    /// the files are downloaded into the workspace
    #[arg(long = "pseudo")]
    pub pseudo_map: Vec<String>,

    /// Workspace root directory
    #[arg(long, default_value = "beamflow_work")]
    pub workdir: PathBuf,

    /// Re-download input files even if they already exist
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Solver executable
    #[arg(long, default_value = "pw.x")]
    pub pw_exec: String,

    /// Converter executable
    #[arg(long, default_value = "cif2hkl")]
    pub cif2hkl_exec: String,

    /// Reflection calculation mode
    #[arg(long, value_enum, default_value = "nuc")]
    pub mode: ReflectionMode,

    #[command(flatten)]
    pub physics: PhysicsArgs,

    #[command(flatten)]
    pub beamline: BeamlineArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Extra directories prepended to the child process search path
    #[arg(long = "extra-bin")]
    pub extra_bin: Vec<PathBuf>,
}
