//! # simulate 子命令 CLI 定义
//!
//! 装配中子仪器并运行外部蒙特卡洛引擎。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs`, `cli/run.rs` 使用
//! - 参数传递给 `commands/simulate.rs`

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 图表输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PlotFormat {
    /// PNG bitmap
    Png,
    /// SVG vector graphics
    Svg,
}

impl PlotFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PlotFormat::Png => "png",
            PlotFormat::Svg => "svg",
        }
    }
}

/// 仪器几何与束流参数（simulate 与 run 共用）
#[derive(Args, Debug)]
pub struct BeamlineArgs {
    /// Instrument name
    #[arg(long, default_value = "beamflow_line")]
    pub name: String,

    /// Neutron wavelength (Angstrom)
    #[arg(long, default_value_t = 1.2)]
    pub wavelength: f64,

    /// Monochromator scattering vector magnitude (1/Angstrom)
    #[arg(long, default_value_t = 3.355)]
    pub mono_q: f64,

    /// Guide length (m)
    #[arg(long, default_value_t = 2.0)]
    pub guide_length: f64,

    /// Monochromator-to-sample distance (m)
    #[arg(long, default_value_t = 1.0)]
    pub sample_dist: f64,

    /// Sample-to-detector distance (m)
    #[arg(long, default_value_t = 1.0)]
    pub detector_dist: f64,
}

/// 模拟运行参数（simulate 与 run 共用）
#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Number of simulated particles
    #[arg(long, default_value_t = 1_000_000)]
    pub ncount: u64,

    /// MPI parallelism degree (0 = number of CPU cores)
    #[arg(long, default_value_t = 0)]
    pub mpi: usize,

    /// Engine executable
    #[arg(long, default_value = "mcrun")]
    pub mcrun_exec: String,

    /// Fail instead of auto-numbering when the output directory exists
    #[arg(long, default_value_t = false)]
    pub no_increment: bool,

    /// Plot output format
    #[arg(long, value_enum, default_value = "png")]
    pub plot_format: PlotFormat,
}

/// simulate 子命令参数
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Reflection intensity file consumed by the sample component
    #[arg(long)]
    pub hkl: PathBuf,

    /// Workspace root directory
    #[arg(long, default_value = "beamflow_work")]
    pub workdir: PathBuf,

    /// Engine output directory (defaults to <workdir>/sim/run)
    #[arg(long)]
    pub outdir: Option<PathBuf>,

    #[command(flatten)]
    pub beamline: BeamlineArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Extra directories prepended to the child process search path
    #[arg(long = "extra-bin")]
    pub extra_bin: Vec<PathBuf>,
}
