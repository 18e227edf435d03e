//! # 弛豫计算结果数据模型
//!
//! 存储从求解器输出提取的标量结果与收敛状态。
//!
//! ## 依赖关系
//! - 被 `parsers/pwout.rs`, `solver/runner.rs` 使用
//! - 被 `commands/relax.rs`, `commands/run.rs` 使用

use serde::{Deserialize, Serialize};

/// Rydberg -> eV 换算
pub const RY_TO_EV: f64 = 13.605693122994;

/// 弛豫计算结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaxResult {
    /// 结构名称
    pub structure_name: String,

    /// 求解器是否正常结束 (输出含 JOB DONE)
    pub is_finished: bool,

    /// 电子自洽 (SCF) 是否收敛
    pub scf_converged: bool,

    /// 离子弛豫是否收敛 (到达几何优化终点)
    pub ions_converged: bool,

    /// 总能量 (Ry)
    pub total_energy_ry: Option<f64>,

    /// 费米能级 (eV)
    pub fermi_ev: Option<f64>,

    /// 压力 (kBar)
    pub pressure_kbar: Option<f64>,

    /// 原子数
    pub num_atoms: Option<usize>,

    /// 墙钟时间（求解器自报）
    pub wall_time: Option<String>,

    /// 弛豫后的原子位置 (元素, 分数坐标)，按输出顺序
    pub final_positions: Vec<(String, [f64; 3])>,
}

impl RelaxResult {
    pub fn new(structure_name: impl Into<String>) -> Self {
        RelaxResult {
            structure_name: structure_name.into(),
            is_finished: false,
            scf_converged: false,
            ions_converged: false,
            total_energy_ry: None,
            fermi_ev: None,
            pressure_kbar: None,
            num_atoms: None,
            wall_time: None,
            final_positions: Vec::new(),
        }
    }

    /// 总能量 (eV)
    pub fn total_energy_ev(&self) -> Option<f64> {
        self.total_energy_ry.map(|e| e * RY_TO_EV)
    }

    /// 每原子能量 (eV)
    pub fn energy_per_atom_ev(&self) -> Option<f64> {
        match (self.total_energy_ev(), self.num_atoms) {
            (Some(e), Some(n)) if n > 0 => Some(e / n as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_conversion() {
        let mut result = RelaxResult::new("Si");
        result.total_energy_ry = Some(-10.0);
        result.num_atoms = Some(2);

        let ev = result.total_energy_ev().unwrap();
        assert!((ev - (-136.05693122994)).abs() < 1e-9);

        let per_atom = result.energy_per_atom_ev().unwrap();
        assert!((per_atom - (-68.02846561497)).abs() < 1e-9);
    }

    #[test]
    fn test_per_atom_requires_count() {
        let mut result = RelaxResult::new("Si");
        result.total_energy_ry = Some(-10.0);

        assert!(result.energy_per_atom_ev().is_none());
    }
}
