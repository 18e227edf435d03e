//! # export 子命令 CLI 定义
//!
//! 调用外部转换工具，把结构文件转成反射强度 (HKL) 文件。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/export.rs`

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 反射计算模式（转换工具的 --mode 选项）
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ReflectionMode {
    /// Neutron nuclear scattering
    Nuc,
    /// X-ray scattering
    Xra,
    /// Electron scattering
    Ele,
}

impl ReflectionMode {
    /// 转换工具命令行里的模式关键字
    pub fn keyword(&self) -> &'static str {
        match self {
            ReflectionMode::Nuc => "NUC",
            ReflectionMode::Xra => "XRA",
            ReflectionMode::Ele => "ELE",
        }
    }
}

impl std::fmt::Display for ReflectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// export 子命令参数
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Input structure file (.cif)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output reflection file (defaults to input with .hkl extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Converter executable
    #[arg(long, default_value = "cif2hkl")]
    pub exec: String,

    /// Reflection calculation mode
    #[arg(long, value_enum, default_value = "nuc")]
    pub mode: ReflectionMode,

    /// Extra directories prepended to the child process search path
    #[arg(long = "extra-bin")]
    pub extra_bin: Vec<PathBuf>,
}
