//! # fetch 子命令 CLI 定义
//!
//! 下载晶体结构 (CIF) 与赝势文件到工作区。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/fetch.rs`

use clap::Args;
use std::path::PathBuf;

/// fetch 子命令参数
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Crystallography database numeric identifier (e.g., 9000775)
    #[arg(long)]
    pub cod_id: String,

    /// Pseudopotential file names to download (repeatable)
    #[arg(long = "pseudo")]
    pub pseudo_files: Vec<String>,

    /// Workspace root directory
    #[arg(long, default_value = "beamflow_work")]
    pub workdir: PathBuf,

    /// Re-download even if files already exist
    #[arg(long, default_value_t = false)]
    pub force: bool,
}
