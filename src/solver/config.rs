//! # 弛豫作业配置
//!
//! 求解器的全部数值/分类参数，构造一次后不再修改。
//! 文件路径（赝势目录、临时输出目录）也在这里显式给出，
//! 不依赖进程工作目录的隐式状态。
//!
//! ## 依赖关系
//! - 被 `solver/input.rs`, `solver/runner.rs` 使用
//! - 被 `commands/relax.rs`, `commands/run.rs` 构造

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 展宽（smearing）方案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmearingScheme {
    Gaussian,
    MethfesselPaxton,
    MarzariVanderbilt,
    FermiDirac,
}

impl SmearingScheme {
    /// 求解器输入文件中的关键字
    pub fn keyword(&self) -> &'static str {
        match self {
            SmearingScheme::Gaussian => "gaussian",
            SmearingScheme::MethfesselPaxton => "mp",
            SmearingScheme::MarzariVanderbilt => "mv",
            SmearingScheme::FermiDirac => "fd",
        }
    }
}

impl std::fmt::Display for SmearingScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// 离子弛豫算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IonDynamics {
    Bfgs,
    Damp,
}

impl IonDynamics {
    pub fn keyword(&self) -> &'static str {
        match self {
            IonDynamics::Bfgs => "bfgs",
            IonDynamics::Damp => "damp",
        }
    }
}

impl std::fmt::Display for IonDynamics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// 弛豫作业配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// 作业前缀（求解器临时文件名）
    pub prefix: String,

    /// k 点网格
    pub kpoints: [u32; 3],

    /// k 点网格偏移 (0 或 1)
    pub kpoint_offset: [u32; 3],

    /// 波函数平面波截断 (Ry)
    pub ecutwfc: f64,

    /// 电荷密度截断 (Ry)
    pub ecutrho: f64,

    /// 展宽方案
    pub smearing: SmearingScheme,

    /// 展宽宽度 (Ry)
    pub degauss: f64,

    /// SCF 收敛阈值 (Ry)
    pub conv_thr: f64,

    /// 电荷混合系数
    pub mixing_beta: f64,

    /// 最大 SCF 迭代次数
    pub electron_maxstep: u32,

    /// 离子弛豫算法
    pub ion_dynamics: IonDynamics,

    /// 离子步力收敛阈值 (Ry/Bohr)
    pub forc_conv_thr: f64,

    /// 离子步能量收敛阈值 (Ry)
    pub etot_conv_thr: f64,

    /// 赝势目录
    pub pseudo_dir: PathBuf,

    /// 求解器临时输出目录
    pub outdir: PathBuf,

    /// 元素 -> 赝势文件名
    pub pseudopotentials: BTreeMap<String, String>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            prefix: "beamflow".to_string(),
            kpoints: [4, 4, 4],
            kpoint_offset: [0, 0, 0],
            ecutwfc: 50.0,
            ecutrho: 400.0,
            smearing: SmearingScheme::MarzariVanderbilt,
            degauss: 0.02,
            conv_thr: 1e-8,
            mixing_beta: 0.7,
            electron_maxstep: 100,
            ion_dynamics: IonDynamics::Bfgs,
            forc_conv_thr: 1e-4,
            etot_conv_thr: 1e-5,
            pseudo_dir: PathBuf::from("pseudo"),
            outdir: PathBuf::from("tmp"),
            pseudopotentials: BTreeMap::new(),
        }
    }
}
