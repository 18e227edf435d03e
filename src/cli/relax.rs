//! # relax 子命令 CLI 定义
//!
//! 配置并运行外部 DFT 离子弛豫。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs`, `cli/run.rs` 使用
//! - 参数传递给 `commands/relax.rs`

use clap::{Args, ValueEnum};
use std::path::PathBuf;

use crate::solver::{IonDynamics, SmearingScheme};

/// 展宽方案选项
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SmearingArg {
    /// Gaussian smearing
    Gaussian,
    /// Methfessel-Paxton
    Mp,
    /// Marzari-Vanderbilt cold smearing
    Mv,
    /// Fermi-Dirac
    Fd,
}

impl From<SmearingArg> for SmearingScheme {
    fn from(value: SmearingArg) -> Self {
        match value {
            SmearingArg::Gaussian => SmearingScheme::Gaussian,
            SmearingArg::Mp => SmearingScheme::MethfesselPaxton,
            SmearingArg::Mv => SmearingScheme::MarzariVanderbilt,
            SmearingArg::Fd => SmearingScheme::FermiDirac,
        }
    }
}

/// 离子弛豫算法选项
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum IonDynamicsArg {
    /// BFGS quasi-Newton minimization
    Bfgs,
    /// Damped dynamics
    Damp,
}

impl From<IonDynamicsArg> for IonDynamics {
    fn from(value: IonDynamicsArg) -> Self {
        match value {
            IonDynamicsArg::Bfgs => IonDynamics::Bfgs,
            IonDynamicsArg::Damp => IonDynamics::Damp,
        }
    }
}

/// 求解器物理/数值参数（relax 与 run 共用）
#[derive(Args, Debug)]
pub struct PhysicsArgs {
    /// K-point mesh as three comma-separated values (e.g., '4,4,4')
    #[arg(long, default_value = "4,4,4")]
    pub kpoints: String,

    /// K-point mesh offset (e.g., '0,0,0' or '1,1,1')
    #[arg(long, default_value = "0,0,0")]
    pub kpoint_offset: String,

    /// Wavefunction cutoff (Ry)
    #[arg(long, default_value_t = 50.0)]
    pub ecutwfc: f64,

    /// Charge density cutoff (Ry)
    #[arg(long, default_value_t = 400.0)]
    pub ecutrho: f64,

    /// Smearing scheme
    #[arg(long, value_enum, default_value = "mv")]
    pub smearing: SmearingArg,

    /// Smearing width (Ry)
    #[arg(long, default_value_t = 0.02)]
    pub degauss: f64,

    /// SCF convergence threshold (Ry)
    #[arg(long, default_value_t = 1e-8)]
    pub conv_thr: f64,

    /// Charge mixing factor
    #[arg(long, default_value_t = 0.7)]
    pub mixing_beta: f64,

    /// Maximum SCF iterations per ionic step
    #[arg(long, default_value_t = 100)]
    pub electron_maxstep: u32,

    /// Ionic relaxation algorithm
    #[arg(long, value_enum, default_value = "bfgs")]
    pub ion_dynamics: IonDynamicsArg,

    /// Force convergence threshold for ionic steps (Ry/Bohr)
    #[arg(long, default_value_t = 1e-4)]
    pub forc_conv_thr: f64,

    /// Energy convergence threshold for ionic steps (Ry)
    #[arg(long, default_value_t = 1e-5)]
    pub etot_conv_thr: f64,
}

/// relax 子命令参数
#[derive(Args, Debug)]
pub struct RelaxArgs {
    /// Input structure file (.cif)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Workspace root directory
    #[arg(long, default_value = "beamflow_work")]
    pub workdir: PathBuf,

    /// Solver executable
    #[arg(long, default_value = "pw.x")]
    pub pw_exec: String,

    /// Job prefix for solver scratch files
    #[arg(long, default_value = "beamflow")]
    pub prefix: String,

    #[command(flatten)]
    pub physics: PhysicsArgs,

    /// Pseudopotential mapping 'Element=file.UPF' (repeatable)
    #[arg(long = "pseudo")]
    pub pseudo_map: Vec<String>,

    /// Pseudopotential directory (defaults to <workdir>/pseudo)
    #[arg(long)]
    pub pseudo_dir: Option<PathBuf>,

    /// Extra directories prepended to the child process search path
    #[arg(long = "extra-bin")]
    pub extra_bin: Vec<PathBuf>,

    /// Write relaxed structure to this path (defaults beside the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Export per-atom displacement table to CSV
    #[arg(long)]
    pub diff_csv: Option<PathBuf>,
}
